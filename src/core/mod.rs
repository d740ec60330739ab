mod config;
pub mod db;
pub mod error;

pub use config::{AppConfig, DEFAULT_MAX_DRAFT_LENGTH};
pub use error::PipelineError;
