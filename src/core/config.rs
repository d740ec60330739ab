use std::env;

use anyhow::{Context, Result};

/// Longest draft body, in characters, accepted for dispatch.
pub const DEFAULT_MAX_DRAFT_LENGTH: usize = 50_000;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage_path: String,
    pub db_path: String,
    pub gmail_api_client_id: String,
    pub gmail_api_client_secret: String,
    pub gmail_api_base_url: String,
    pub google_oauth_token_url: String,
    pub openai_model: String,
    pub openai_api_hostname: String,
    pub openai_api_key: String,
    pub session_ttl_hours: i64,
    pub max_draft_length: usize,
    pub unread_fetch_limit: usize,
    pub draft_job_interval_secs: u64,
}

impl AppConfig {
    /// Read the configuration from the environment. The Gmail client
    /// credentials are required, everything else has a default.
    pub fn from_env() -> Result<Self> {
        let gmail_api_client_id =
            env::var("DRAFTLY_GMAIL_CLIENT_ID").context("Missing env var DRAFTLY_GMAIL_CLIENT_ID")?;
        let gmail_api_client_secret = env::var("DRAFTLY_GMAIL_CLIENT_SECRET")
            .context("Missing env var DRAFTLY_GMAIL_CLIENT_SECRET")?;

        Ok(Self {
            gmail_api_client_id,
            gmail_api_client_secret,
            ..Self::default()
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for AppConfig {
    fn default() -> Self {
        let storage_path = env::var("DRAFTLY_STORAGE_PATH").unwrap_or("./".to_string());
        let db_path = format!("{}/db", storage_path.trim_end_matches('/'));
        let gmail_api_base_url = env::var("DRAFTLY_GMAIL_API_URL")
            .unwrap_or_else(|_| "https://gmail.googleapis.com".to_string());
        let google_oauth_token_url = env::var("DRAFTLY_GOOGLE_TOKEN_URL")
            .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string());
        let openai_api_hostname = env::var("DRAFTLY_LLM_HOST")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let openai_api_key =
            env::var("OPENAI_API_KEY").unwrap_or_else(|_| "thiswontworkforopenai".to_string());
        let openai_model =
            env::var("DRAFTLY_LLM_MODEL").unwrap_or_else(|_| "gpt-4.1-mini".to_string());

        Self {
            storage_path,
            db_path,
            gmail_api_client_id: env::var("DRAFTLY_GMAIL_CLIENT_ID").unwrap_or_default(),
            gmail_api_client_secret: env::var("DRAFTLY_GMAIL_CLIENT_SECRET").unwrap_or_default(),
            gmail_api_base_url,
            google_oauth_token_url,
            openai_model,
            openai_api_hostname,
            openai_api_key,
            session_ttl_hours: env_or("DRAFTLY_SESSION_TTL_HOURS", 2),
            max_draft_length: env_or("DRAFTLY_MAX_DRAFT_LENGTH", DEFAULT_MAX_DRAFT_LENGTH),
            unread_fetch_limit: env_or("DRAFTLY_UNREAD_LIMIT", 5),
            draft_job_interval_secs: env_or("DRAFTLY_DRAFT_JOB_INTERVAL_SECS", 60 * 30),
        }
    }
}
