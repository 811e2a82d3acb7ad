pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod labels;
pub mod models;
pub mod poller;
pub mod routes;
pub mod store;
pub mod submission;
pub mod views;
