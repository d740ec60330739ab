use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod init;
pub mod job;
pub mod migrate;
pub mod serve;
pub mod user;

use job::JobId;

use crate::core::AppConfig;

#[derive(Subcommand)]
enum Command {
    /// Initialize the database
    Init {
        #[arg(long, action, default_value = "false")]
        db: bool,
    },
    /// Migrate the db schema
    Migrate {
        #[arg(long, action, default_value = "false")]
        db: bool,
    },
    /// Run the API server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,

        /// Don't run background jobs alongside the server
        #[arg(long, action, default_value = "false")]
        no_jobs: bool,
    },
    /// Manage registered users
    User {
        #[command(subcommand)]
        command: user::UserCommand,
    },
    /// Run a periodic job once
    Job {
        #[arg(long, value_enum)]
        id: JobId,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    // Storage paths have defaults, the Gmail credentials are checked by
    // the commands that talk to Gmail
    let db_path = AppConfig::default().db_path;

    // Handle each sub command
    match args.command {
        Some(Command::Init { db }) => {
            init::run(db, &db_path).await?;
        }
        Some(Command::Migrate { db }) => {
            migrate::run(db, &db_path).await?;
        }
        Some(Command::Serve {
            host,
            port,
            no_jobs,
        }) => {
            serve::run(host, port, !no_jobs).await?;
        }
        Some(Command::User { command }) => {
            user::run(command, &db_path).await?;
        }
        Some(Command::Job { id }) => {
            job::run(id).await?;
        }
        None => {}
    }

    Ok(())
}
