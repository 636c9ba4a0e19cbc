//! Shared configuration and tabular storage for the pulso pipelines.

pub mod app_config;
pub mod candidates;
pub mod config;
pub mod error;
pub mod table;

pub use app_config::AppConfig;
pub use candidates::{load_candidates, CandidatesFile, FetchDefaults};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, TableError};
pub use table::Table;
