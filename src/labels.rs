//! User-visible strings for the terminal dashboard, one table per locale.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
  #[default]
  En,
  Es,
}

impl FromStr for Locale {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "en" => Ok(Locale::En),
      "es" => Ok(Locale::Es),
      other => Err(format!("unknown locale '{}'", other)),
    }
  }
}

pub struct Labels {
  pub app_title: &'static str,
  pub tab_dashboard: &'static str,
  pub tab_jobs: &'static str,
  pub tab_logs: &'static str,
  pub form_title: &'static str,
  pub form_placeholder: &'static str,
  pub characters: &'static str,
  pub strategy: &'static str,
  pub round_robin: &'static str,
  pub least_loaded: &'static str,
  pub submitting: &'static str,
  pub stats_title: &'static str,
  pub total_engines: &'static str,
  pub mappers: &'static str,
  pub reducers: &'static str,
  pub map_queue: &'static str,
  pub reduce_queue: &'static str,
  pub total_jobs: &'static str,
  pub active_jobs: &'static str,
  pub engines_title: &'static str,
  pub no_engines: &'static str,
  pub no_mappers: &'static str,
  pub no_reducers: &'static str,
  pub jobs_title: &'static str,
  pub no_jobs: &'static str,
  pub shards: &'static str,
  pub top_words: &'static str,
  pub logs_title: &'static str,
  pub no_logs: &'static str,
  pub job_created: &'static str,
  pub job_failed: &'static str,
  pub empty_text: &'static str,
  pub sample_loaded: &'static str,
  pub file_loaded: &'static str,
  pub footer: &'static str,
}

const EN: Labels = Labels {
  app_title: "MapReduce Visual",
  tab_dashboard: "Dashboard",
  tab_jobs: "Jobs",
  tab_logs: "Logs",
  form_title: "Create MapReduce Job",
  form_placeholder: "Type text to analyze, or press F2 for a sample...",
  characters: "characters",
  strategy: "Balancing strategy",
  round_robin: "Round Robin",
  least_loaded: "Least Loaded",
  submitting: "Creating...",
  stats_title: "System Statistics",
  total_engines: "Total engines",
  mappers: "Mappers",
  reducers: "Reducers",
  map_queue: "Map queue",
  reduce_queue: "Reduce queue",
  total_jobs: "Total jobs",
  active_jobs: "Active jobs",
  engines_title: "Engines Status",
  no_engines: "No engines connected",
  no_mappers: "No mappers",
  no_reducers: "No reducers",
  jobs_title: "Jobs",
  no_jobs: "No jobs yet. Create your first job!",
  shards: "shards",
  top_words: "Top 10 words",
  logs_title: "Activity Log",
  no_logs: "No activity yet",
  job_created: "Job created",
  job_failed: "Failed to create job",
  empty_text: "Please enter some text",
  sample_loaded: "Sample text loaded",
  file_loaded: "File loaded",
  footer: "Tab/Shift-Tab: switch view | F2: sample | F3: strategy | Enter: start job | Esc: quit",
};

const ES: Labels = Labels {
  app_title: "MapReduce Visual",
  tab_dashboard: "Panel",
  tab_jobs: "Trabajos",
  tab_logs: "Registros",
  form_title: "Crear trabajo MapReduce",
  form_placeholder: "Escribe texto para analizar, o pulsa F2 para un ejemplo...",
  characters: "caracteres",
  strategy: "Estrategia de balanceo",
  round_robin: "Round Robin",
  least_loaded: "Menos cargado",
  submitting: "Creando...",
  stats_title: "Estadísticas del Sistema",
  total_engines: "Engines totales",
  mappers: "Mapeadores",
  reducers: "Reductores",
  map_queue: "Cola de mapeo",
  reduce_queue: "Cola de reducción",
  total_jobs: "Trabajos totales",
  active_jobs: "Trabajos activos",
  engines_title: "Estado de Engines",
  no_engines: "No hay engines conectados",
  no_mappers: "Sin mapeadores",
  no_reducers: "Sin reductores",
  jobs_title: "Trabajos",
  no_jobs: "Aún no hay trabajos. ¡Crea tu primer trabajo!",
  shards: "shards",
  top_words: "10 palabras más frecuentes",
  logs_title: "Registros de Actividades",
  no_logs: "Aún no hay actividades",
  job_created: "Trabajo creado",
  job_failed: "Error al crear el trabajo",
  empty_text: "Por favor ingresa algún texto",
  sample_loaded: "Texto de ejemplo cargado",
  file_loaded: "Archivo cargado",
  footer: "Tab/Shift-Tab: cambiar vista | F2: ejemplo | F3: estrategia | Enter: iniciar | Esc: salir",
};

impl Labels {
  pub fn for_locale(locale: Locale) -> &'static Labels {
    match locale {
      Locale::En => &EN,
      Locale::Es => &ES,
    }
  }
}
