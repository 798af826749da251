pub mod app_config;
pub mod config;
pub mod variants;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use variants::{
    Dimensions, ScrapingResult, Variant, VariantPrice, NOT_AVAILABLE, UNKNOWN_DIMENSION_VALUE,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
