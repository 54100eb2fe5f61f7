pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::Cli;

pub use adapters::{http::RestBackend, storage::LocalStorage};
pub use config::{toml_config::TomlConfig, Settings};
pub use core::session::{ReconciliationSession, SessionOptions, SessionPhase};
pub use utils::error::{Result, StocktakeError};
