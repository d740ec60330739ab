use std::io::{self, Write};

use anyhow::{Result, anyhow};
use clap::Subcommand;

use crate::core::AppConfig;
use crate::core::db::async_db;
use crate::sessions::create_session;
use crate::users::{find_all_user_emails, upsert_user};

#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a user with a Gmail refresh token obtained from the
    /// OAuth consent flow, then print a session token
    Add {
        #[arg(long)]
        email: Option<String>,
    },
    /// Issue a new session token for a registered user
    Session {
        #[arg(long)]
        email: String,
    },
    /// List registered users
    List {},
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    let value = value.trim().to_owned();
    if value.is_empty() {
        return Err(anyhow!("No value entered"));
    }
    Ok(value)
}

pub async fn run(command: UserCommand, db_path: &str) -> Result<()> {
    let db = async_db(db_path).await?;
    let ttl_hours = AppConfig::default().session_ttl_hours;

    match command {
        UserCommand::Add { email } => {
            let email = match email {
                Some(email) => email,
                None => prompt("Enter the email address you are registering: ")?,
            };
            let refresh_token = prompt("Paste the Gmail refresh token: ")?;

            upsert_user(&db, &email, &refresh_token).await?;
            println!("Refresh token for {} saved to DB.", email);

            let token = create_session(&db, &email, ttl_hours).await?;
            println!("Session token (valid {}h): {}", ttl_hours, token);
        }
        UserCommand::Session { email } => {
            let registered = find_all_user_emails(&db).await?;
            if !registered.contains(&email) {
                return Err(anyhow!("Unknown user {}", email));
            }
            let token = create_session(&db, &email, ttl_hours).await?;
            println!("Session token (valid {}h): {}", ttl_hours, token);
        }
        UserCommand::List {} => {
            for email in find_all_user_emails(&db).await? {
                println!("{}", email);
            }
        }
    }

    Ok(())
}
