use anyhow::Result;

use crate::api::init_tracing;
use crate::core::AppConfig;
use crate::core::db::async_db;
use crate::jobs::{DraftUnreadThreads, PeriodicJob};

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum JobId {
    DraftUnread,
}

pub async fn run(id: JobId) -> Result<()> {
    // If using the CLI only and not the webserver, set up tracing to
    // output to stdout and stderr
    init_tracing();

    let config = AppConfig::from_env()?;
    let db = async_db(&config.db_path).await?;

    let job: Box<dyn PeriodicJob> = match id {
        JobId::DraftUnread => Box::new(DraftUnreadThreads::new(&config)),
    };

    println!("Running job: {:?}", id);
    job.run_job(&config, &db).await;
    println!("Job completed");

    Ok(())
}
