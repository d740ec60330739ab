use tokio_rusqlite::Connection;

use crate::core::AppConfig;
use crate::drafts::Pipeline;

pub struct AppState {
    pub db: Connection,
    pub config: AppConfig,
    pub pipeline: Pipeline,
}

impl AppState {
    pub fn new(db: Connection, config: AppConfig) -> Self {
        let pipeline = Pipeline::from_config(db.clone(), &config);
        Self::with_pipeline(db, config, pipeline)
    }

    /// Use a pipeline built elsewhere, e.g. with a different mail
    /// provider or model backend.
    pub fn with_pipeline(db: Connection, config: AppConfig, pipeline: Pipeline) -> Self {
        Self {
            db,
            config,
            pipeline,
        }
    }
}
