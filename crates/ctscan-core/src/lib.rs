//! Shared domain types, CSV city intake, and environment configuration for
//! the ctscan workspace.

pub mod app_config;
pub mod cities;
pub mod config;
pub mod error;
pub mod types;

pub use app_config::{AppConfig, Environment};
pub use cities::{load_cities, parse_cities_csv, MAX_CITIES};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, IntakeError};
pub use types::{City, LocationCoords, ScanCenter};
