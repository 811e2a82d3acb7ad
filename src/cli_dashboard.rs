//! Dashboard (job form, cluster statistics, engines by role)
//! Jobs (full job history, newest first)
//! Logs (activity stream, follows the newest entry)

use std::{
  env,
  fs::File,
  io,
  path::{Path, PathBuf},
  sync::{Mutex, mpsc},
  time::{Duration, Instant},
};

use crossterm::{
  event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent, KeyCode, KeyEventKind, KeyModifiers},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use tokio::runtime::{self, Runtime};
use tracing::{info, warn};
use tui::{
  Terminal,
  backend::{Backend, CrosstermBackend},
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Span, Spans},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};

use mrdash::{
  client::ResourceClient,
  config::Config,
  labels::Labels,
  models::{BalancingStrategy, Engine, Job, ResourceKind, Stats},
  poller::{Monitor, Phase, PollingController, PollingHandle},
  store::Snapshot,
  submission::{load_text_file, sample_text, submit, validate_text},
  views,
};

const NOTICE_TTL: Duration = Duration::from_secs(4);
const BAR_WIDTH: usize = 20;

enum SubmitEvent {
  Created(String),
  Failed(String),
}

struct Notice {
  text: String,
  success: bool,
  shown_at: Instant,
}

#[derive(Clone, Copy)]
enum DashboardTab {
  Dashboard,
  Jobs,
  Logs,
}

struct App {
  current_tab: DashboardTab,
  labels: &'static Labels,
  form_text: String,
  strategy: BalancingStrategy,
  submitting: bool,
  notice: Option<Notice>,
  jobs_state: ListState,
  logs_state: ListState,
  seen_logs_version: u64,
}

impl App {
  fn new(labels: &'static Labels) -> Self {
    Self {
      current_tab: DashboardTab::Dashboard,
      labels,
      form_text: String::new(),
      strategy: BalancingStrategy::default(),
      submitting: false,
      notice: None,
      jobs_state: ListState::default(),
      logs_state: ListState::default(),
      seen_logs_version: 0,
    }
  }

  fn next_tab(&mut self) {
    self.current_tab = match self.current_tab {
      DashboardTab::Dashboard => DashboardTab::Jobs,
      DashboardTab::Jobs => DashboardTab::Logs,
      DashboardTab::Logs => DashboardTab::Dashboard,
    }
  }

  fn previous_tab(&mut self) {
    self.current_tab = match self.current_tab {
      DashboardTab::Dashboard => DashboardTab::Logs,
      DashboardTab::Jobs => DashboardTab::Dashboard,
      DashboardTab::Logs => DashboardTab::Jobs,
    }
  }

  fn notify(&mut self, text: impl Into<String>, success: bool) {
    self.notice = Some(Notice {
      text: text.into(),
      success,
      shown_at: Instant::now(),
    });
  }

  fn expire_notice(&mut self) {
    if self.notice.as_ref().is_some_and(|n| n.shown_at.elapsed() >= NOTICE_TTL) {
      self.notice = None;
    }
  }

  fn start_submission(&mut self, rt: &Runtime, monitor: &Monitor, tx: &mpsc::Sender<SubmitEvent>) {
    if self.submitting {
      return;
    }
    if validate_text(&self.form_text).is_err() {
      self.notify(self.labels.empty_text, false);
      return;
    }
    self.submitting = true;
    let text = self.form_text.clone();
    let strategy = self.strategy;
    let monitor = monitor.clone();
    let tx = tx.clone();
    rt.spawn(async move {
      let event = match submit(&monitor, &text, strategy).await {
        Ok(job_id) => SubmitEvent::Created(job_id),
        Err(e) => SubmitEvent::Failed(e.to_string()),
      };
      let _ = tx.send(event);
    });
  }

  fn finish_submission(&mut self, event: SubmitEvent) {
    self.submitting = false;
    match event {
      SubmitEvent::Created(job_id) => {
        self.form_text.clear();
        self.notify(format!("{}: {}", self.labels.job_created, job_id), true);
      }
      SubmitEvent::Failed(reason) => {
        warn!(%reason, "submission failed");
        self.notify(self.labels.job_failed, false);
      }
    }
  }

  /// Keeps the log list pinned to the newest entry whenever the logs field changes.
  fn follow_logs(&mut self, logs_version: u64, log_count: usize) {
    if logs_version != self.seen_logs_version {
      self.seen_logs_version = logs_version;
      self.logs_state.select(log_count.checked_sub(1));
    }
  }
}

fn scroll(state: &mut ListState, len: usize, down: bool) {
  if len == 0 {
    state.select(None);
    return;
  }
  let current = state.selected().unwrap_or(0);
  let next = if down { (current + 1).min(len - 1) } else { current.saturating_sub(1) };
  state.select(Some(next));
}

fn init_logging(path: &Path) -> anyhow::Result<()> {
  let file = File::create(path)?;
  tracing_subscriber::fmt()
    .with_writer(Mutex::new(file))
    .with_ansi(false)
    .init();
  Ok(())
}

fn main() -> anyhow::Result<()> {
  let config = Config::from_env()?;
  init_logging(&config.log_file)?;
  let labels = Labels::for_locale(config.locale);

  // All async work shares one worker thread; the UI loop stays on this one.
  let rt = runtime::Builder::new_multi_thread()
    .worker_threads(1)
    .enable_all()
    .build()?;
  let client = ResourceClient::new(config.api_base()?, config.request_timeout)?;
  info!(api = %client.api_base(), period_ms = config.poll_interval.as_millis() as u64, "dashboard started");
  let polling = {
    let _guard = rt.enter();
    PollingController::new(Monitor::new(client), config.poll_interval).start()
  };

  let mut app = App::new(labels);
  if let Some(path) = env::args().nth(1).map(PathBuf::from) {
    match load_text_file(&path) {
      Ok(text) => {
        app.form_text = text;
        app.notify(labels.file_loaded, true);
      }
      Err(e) => {
        warn!(path = %path.display(), error = %e, "could not read input file");
        app.notify(format!("{}: {}", path.display(), e), false);
      }
    }
  }

  enable_raw_mode()?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend)?;

  let result = run_app(&mut terminal, &mut app, &rt, &polling);

  disable_raw_mode()?;
  execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
  terminal.show_cursor()?;

  rt.block_on(polling.stop());
  info!("dashboard stopped");
  result
}

fn run_app<B: Backend>(
  terminal: &mut Terminal<B>,
  app: &mut App,
  rt: &Runtime,
  polling: &PollingHandle,
) -> anyhow::Result<()> {
  let monitor = polling.monitor();
  let (tx, rx) = mpsc::channel::<SubmitEvent>();
  let tick_rate = Duration::from_millis(200);
  let mut last_tick = Instant::now();

  loop {
    if let Ok(event) = rx.try_recv() {
      app.finish_submission(event);
    }
    app.expire_notice();

    let snapshot = monitor.snapshot();
    app.follow_logs(monitor.store().version(ResourceKind::Logs), snapshot.logs.len());
    let phase = polling.phase();
    terminal.draw(|f| ui(f, app, &snapshot, phase))?;

    let timeout = tick_rate
      .checked_sub(last_tick.elapsed())
      .unwrap_or_else(|| Duration::from_secs(0));
    if event::poll(timeout)? {
      if let CEvent::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
          continue;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match (key.code, app.current_tab) {
          (KeyCode::Esc, _) => break,
          (KeyCode::Char('c'), _) if ctrl => break,
          (KeyCode::Tab, _) => app.next_tab(),
          (KeyCode::BackTab, _) => app.previous_tab(),
          (KeyCode::F(2), DashboardTab::Dashboard) => {
            app.form_text = sample_text();
            app.notify(app.labels.sample_loaded, true);
          }
          (KeyCode::F(3), DashboardTab::Dashboard) => app.strategy = app.strategy.toggle(),
          (KeyCode::Enter, DashboardTab::Dashboard) => app.start_submission(rt, monitor, &tx),
          (KeyCode::Backspace, DashboardTab::Dashboard) => {
            app.form_text.pop();
          }
          (KeyCode::Char(c), DashboardTab::Dashboard) if !ctrl => app.form_text.push(c),
          (KeyCode::Down, DashboardTab::Jobs) => scroll(&mut app.jobs_state, snapshot.jobs.len(), true),
          (KeyCode::Up, DashboardTab::Jobs) => scroll(&mut app.jobs_state, snapshot.jobs.len(), false),
          (KeyCode::Down, DashboardTab::Logs) => scroll(&mut app.logs_state, snapshot.logs.len(), true),
          (KeyCode::Up, DashboardTab::Logs) => scroll(&mut app.logs_state, snapshot.logs.len(), false),
          _ => {}
        }
      }
    }
    if last_tick.elapsed() >= tick_rate {
      last_tick = Instant::now();
    }
  }
  Ok(())
}

fn ui<B: Backend>(f: &mut tui::Frame<B>, app: &mut App, snapshot: &Snapshot, phase: Phase) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .margin(1)
    .constraints([
      Constraint::Length(3),
      Constraint::Min(0),
      Constraint::Length(3),
    ].as_ref())
    .split(f.size());

  let labels = app.labels;
  let tab_titles = [labels.tab_dashboard, labels.tab_jobs, labels.tab_logs];
  let tabs = Tabs::new(
    tab_titles
      .iter()
      .map(|t| Spans::from(Span::styled(*t, Style::default().fg(Color::Yellow))))
      .collect(),
  )
    .block(Block::default().borders(Borders::ALL).title(match phase {
      Phase::Polling => format!("{} ●", labels.app_title),
      Phase::Idle => format!("{} ○", labels.app_title),
    }))
    .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    .select(match app.current_tab {
      DashboardTab::Dashboard => 0,
      DashboardTab::Jobs => 1,
      DashboardTab::Logs => 2,
    });
  f.render_widget(tabs, chunks[0]);

  match app.current_tab {
    DashboardTab::Dashboard => render_dashboard(f, app, snapshot, chunks[1]),
    DashboardTab::Jobs => render_jobs(f, app, &snapshot.jobs, chunks[1]),
    DashboardTab::Logs => render_logs(f, app, snapshot, chunks[1]),
  }

  let footer = match &app.notice {
    Some(notice) => Paragraph::new(notice.text.as_str())
      .style(Style::default().fg(if notice.success { Color::Green } else { Color::Red })),
    None => Paragraph::new(labels.footer).style(Style::default().fg(Color::White)),
  }
    .block(Block::default().borders(Borders::ALL));
  f.render_widget(footer, chunks[2]);
}

fn render_dashboard<B: Backend>(f: &mut tui::Frame<B>, app: &App, snapshot: &Snapshot, area: Rect) {
  let columns = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
    .split(area);
  let left = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Min(6), Constraint::Length(4), Constraint::Length(9)].as_ref())
    .split(columns[0]);

  let labels = app.labels;
  let form = if app.form_text.is_empty() {
    Paragraph::new(Span::styled(labels.form_placeholder, Style::default().fg(Color::DarkGray)))
  } else {
    Paragraph::new(app.form_text.as_str())
  }
    .wrap(Wrap { trim: false })
    .block(Block::default().borders(Borders::ALL).title(labels.form_title));
  f.render_widget(form, left[0]);

  let strategy = match app.strategy {
    BalancingStrategy::RoundRobin => labels.round_robin,
    BalancingStrategy::LeastLoaded => labels.least_loaded,
  };
  let mut form_info = vec![
    Spans::from(Span::raw(format!("{} {}", app.form_text.chars().count(), labels.characters))),
    Spans::from(vec![
      Span::raw(format!("{}: ", labels.strategy)),
      Span::styled(strategy, Style::default().fg(Color::Cyan)),
    ]),
  ];
  if app.submitting {
    form_info.push(Spans::from(Span::styled(labels.submitting, Style::default().fg(Color::Yellow))));
  }
  f.render_widget(Paragraph::new(form_info).block(Block::default().borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)), left[1]);

  render_stats(f, labels, snapshot.stats.as_deref(), left[2]);
  render_engines(f, labels, &snapshot.engines, columns[1]);
}

fn render_stats<B: Backend>(f: &mut tui::Frame<B>, labels: &Labels, stats: Option<&Stats>, area: Rect) {
  let items: Vec<ListItem> = match stats {
    Some(s) => [
      (labels.total_engines, s.total_engines),
      (labels.mappers, s.mappers),
      (labels.reducers, s.reducers),
      (labels.map_queue, s.map_queue_size),
      (labels.reduce_queue, s.reduce_queue_size),
      (labels.total_jobs, s.total_jobs),
      (labels.active_jobs, s.active_jobs),
    ]
      .iter()
      .map(|(label, value)| {
        ListItem::new(Spans::from(vec![
          Span::styled(format!("{:>5} ", value), Style::default().add_modifier(Modifier::BOLD)),
          Span::raw(*label),
        ]))
      })
      .collect(),
    None => vec![],
  };
  let list = List::new(items).block(Block::default().borders(Borders::ALL).title(labels.stats_title));
  f.render_widget(list, area);
}

fn load_bar(engine: &Engine) -> String {
  let filled = usize::from(views::bar_percentage(engine)) * BAR_WIDTH / 100;
  format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn engine_item(engine: &Engine) -> ListItem<'_> {
  let class = views::engine_status_class(engine.status);
  let status = class.trim_start_matches("engine-");
  ListItem::new(vec![
    Spans::from(vec![
      Span::styled(engine.engine_id.as_str(), Style::default().add_modifier(Modifier::BOLD)),
      Span::raw(" "),
      Span::styled(status, Style::default().fg(class_color(class))),
    ]),
    Spans::from(Span::raw(format!(
      "{} {} / {} ({:.0}%)",
      load_bar(engine),
      engine.current_load,
      engine.capacity,
      views::load_percentage(engine)
    ))),
  ])
}

fn render_engines<B: Backend>(f: &mut tui::Frame<B>, labels: &Labels, engines: &[Engine], area: Rect) {
  if engines.is_empty() {
    let empty = Paragraph::new(labels.no_engines)
      .block(Block::default().borders(Borders::ALL).title(labels.engines_title));
    f.render_widget(empty, area);
    return;
  }

  let groups = views::group_engines_by_role(engines);
  let sections = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
    .split(area);

  for (group, title, empty_text, section) in [
    (&groups.mappers, labels.mappers, labels.no_mappers, sections[0]),
    (&groups.reducers, labels.reducers, labels.no_reducers, sections[1]),
  ] {
    let items: Vec<ListItem> = if group.is_empty() {
      vec![ListItem::new(Spans::from(Span::raw(empty_text)))]
    } else {
      group.iter().map(|e| engine_item(e)).collect()
    };
    let list = List::new(items).block(
      Block::default()
        .borders(Borders::ALL)
        .title(format!("{} - {} ({})", labels.engines_title, title, group.len())),
    );
    f.render_widget(list, section);
  }
}

/// Terminal color for a style class from [`views`].
fn class_color(class: &str) -> Color {
  match class {
    "status-map" => Color::Blue,
    "status-shuffle" => Color::Magenta,
    "status-reduce" => Color::Yellow,
    "status-done" | "engine-active" => Color::Green,
    "engine-idle" => Color::DarkGray,
    _ => Color::White,
  }
}

fn job_item<'a>(labels: &Labels, job: &'a Job) -> ListItem<'a> {
  let mut lines = vec![
    Spans::from(vec![
      Span::styled(format!("{} ", views::short_job_id(job)), Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
      Span::styled(views::status_label(job.status), Style::default().fg(class_color(views::status_color_class(job.status)))),
    ]),
    Spans::from(Span::raw(format!(
      "{} {} | {} {}",
      job.text_length, labels.characters, job.num_shards, labels.shards
    ))),
  ];
  if let Some(words) = views::top_words_for_display(job) {
    let ranked: Vec<String> = words.iter().map(|w| format!("{} {}", w.word, w.count)).collect();
    lines.push(Spans::from(vec![
      Span::styled(format!("{}: ", labels.top_words), Style::default().fg(Color::Green)),
      Span::raw(ranked.join(", ")),
    ]));
  }
  let mut footer = views::format_clock(&job.created_at);
  if job.duration_seconds.is_some() {
    footer.push_str(&format!("  {}", views::format_duration(job.duration_seconds)));
  }
  lines.push(Spans::from(Span::styled(footer, Style::default().fg(Color::DarkGray))));
  lines.push(Spans::from(Span::raw("")));
  ListItem::new(lines)
}

fn render_jobs<B: Backend>(f: &mut tui::Frame<B>, app: &mut App, jobs: &[Job], area: Rect) {
  let labels = app.labels;
  let title = format!("{} ({})", labels.jobs_title, jobs.len());
  if jobs.is_empty() {
    let empty = Paragraph::new(labels.no_jobs).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(empty, area);
    return;
  }
  let items: Vec<ListItem> = views::order_jobs_for_display(jobs)
    .into_iter()
    .map(|job| job_item(labels, job))
    .collect();
  let list = List::new(items)
    .block(Block::default().borders(Borders::ALL).title(title))
    .highlight_style(Style::default().bg(Color::Black));
  f.render_stateful_widget(list, area, &mut app.jobs_state);
}

fn render_logs<B: Backend>(f: &mut tui::Frame<B>, app: &mut App, snapshot: &Snapshot, area: Rect) {
  let labels = app.labels;
  if snapshot.logs.is_empty() {
    let empty = Paragraph::new(labels.no_logs).block(Block::default().borders(Borders::ALL).title(labels.logs_title));
    f.render_widget(empty, area);
    return;
  }
  let log_items: Vec<ListItem> = snapshot.logs.iter().map(|l| {
    ListItem::new(Spans::from(vec![
      Span::styled(views::format_clock(&l.timestamp), Style::default().fg(Color::Green)),
      Span::raw(" - "),
      Span::raw(l.message.as_str()),
    ]))
  }).collect();
  let logs_list = List::new(log_items)
    .block(Block::default().borders(Borders::ALL).title(labels.logs_title));
  f.render_stateful_widget(logs_list, area, &mut app.logs_state);
}
