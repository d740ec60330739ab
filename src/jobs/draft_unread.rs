use std::time::Duration;

use async_trait::async_trait;
use tokio_rusqlite::Connection;

use super::PeriodicJob;
use crate::core::{AppConfig, PipelineError};
use crate::drafts::{DraftStatus, Pipeline, find_draft};
use crate::users::find_all_user_emails;

/// Prepares a draft for every unread thread that doesn't have an open
/// one yet, for every registered user.
#[derive(Debug)]
pub struct DraftUnreadThreads {
    interval: Duration,
}

impl DraftUnreadThreads {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.draft_job_interval_secs.max(1)),
        }
    }
}

/// Returns the number of drafts created. A failure on one thread is
/// logged and the rest are still attempted.
pub async fn draft_unread_threads(
    pipeline: &Pipeline,
    limit: usize,
) -> Result<usize, PipelineError> {
    let db = pipeline.db();
    let mut created = 0;

    for user_email in find_all_user_emails(db).await? {
        let unread = match pipeline.list_unread(&user_email, limit).await {
            Ok(unread) => unread,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", user_email, e);
                continue;
            }
        };

        for summary in unread {
            let existing = find_draft(db, &user_email, &summary.thread_id).await?;
            if existing.is_some_and(|d| d.status == DraftStatus::Draft) {
                continue;
            }

            match pipeline.draft_thread(&user_email, &summary.thread_id, None).await {
                Ok(_) => created += 1,
                Err(e) => tracing::warn!(
                    "Failed to draft thread {} for {}: {}",
                    summary.thread_id,
                    user_email,
                    e
                ),
            }
        }
    }

    Ok(created)
}

#[async_trait]
impl PeriodicJob for DraftUnreadThreads {
    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run_job(&self, config: &AppConfig, db: &Connection) {
        let pipeline = Pipeline::from_config(db.clone(), config);
        match draft_unread_threads(&pipeline, config.unread_fetch_limit).await {
            Ok(count) => tracing::info!("Drafted {} unread threads", count),
            Err(e) => tracing::error!("Draft unread threads job failed: {}", e),
        }
    }
}
