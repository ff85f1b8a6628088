pub mod app_config;
pub mod config;
pub mod extraction;
pub mod history;
pub mod listing;
pub mod plans;
pub mod product;
pub mod prompts;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use extraction::{ExtractedAttributes, Extraction};
pub use history::{GenerationRecord, GenerationSettings, ScoreBand};
pub use listing::{FaqEntry, Listing, VisualCopy, VisualPackItem};
pub use plans::{is_exempt_email, Plan, TRIAL_DAYS};
pub use product::{Channel, ProductInput};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
    #[error("Missing required fields")]
    MissingRequiredFields,
    #[error("model output is not a JSON object")]
    NotAnObject,
    #[error("model output has no seoTitle")]
    MissingSeoTitle,
    #[error("model output does not match the listing shape: {0}")]
    MalformedListing(#[source] serde_json::Error),
}
