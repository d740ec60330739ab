//! Background jobs. Each job runs forever in its own tokio task,
//! sleeping `interval()` between runs.

use std::time::Duration;

use async_trait::async_trait;
use tokio_rusqlite::Connection;

use crate::core::AppConfig;

mod draft_unread;

pub use draft_unread::{DraftUnreadThreads, draft_unread_threads};

#[async_trait]
pub trait PeriodicJob: Send + Sync {
    fn interval(&self) -> Duration;

    async fn run_job(&self, config: &AppConfig, db: &Connection);
}

pub fn spawn_periodic_job<J>(config: AppConfig, db: Connection, job: J)
where
    J: PeriodicJob + std::fmt::Debug + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(job.interval());
        loop {
            // The first tick completes immediately
            interval.tick().await;
            tracing::info!("Running periodic job {:?}", job);
            job.run_job(&config, &db).await;
        }
    });
}
