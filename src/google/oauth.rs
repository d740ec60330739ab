//! Exchange a stored refresh token for a short-lived access token.
//!
//! The consent flow that produces the refresh token happens elsewhere;
//! this only knows how to turn a registered user into a `Capability`.

use async_trait::async_trait;
use http::StatusCode;
use reqwest::Client;
use serde::Deserialize;
use tokio_rusqlite::Connection;

use super::provider::{Capability, ProviderError, ProviderErrorKind};
use crate::core::PipelineError;
use crate::users::find_refresh_token;

#[derive(Debug, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

/// Refresh an access token. A revoked or expired grant is classified
/// as an auth failure, anything else as transient.
pub async fn refresh_access_token(
    client: &Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<OAuthToken, ProviderError> {
    let params = [
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];
    let res = client.post(token_url).form(&params).send().await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();

    if !status.is_success() {
        let rejected = status == StatusCode::UNAUTHORIZED
            || text.contains("invalid_grant")
            || text.contains("invalid_client");
        let kind = if rejected {
            ProviderErrorKind::Auth
        } else {
            ProviderErrorKind::Transient
        };
        return Err(ProviderError::new(
            kind,
            format!("Token refresh failed: {} ({})", status, text),
        ));
    }

    serde_json::from_str(&text)
        .map_err(|e| ProviderError::transient(format!("Malformed token response: {}", e)))
}

/// Resolves a user identity to a live provider capability.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self, user_email: &str) -> Result<Capability, PipelineError>;
}

/// Looks up the user's refresh token and exchanges it with Google.
pub struct OAuthCredentialResolver {
    db: Connection,
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl OAuthCredentialResolver {
    pub fn new(db: Connection, token_url: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            db,
            client: Client::new(),
            token_url: token_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }
    }
}

#[async_trait]
impl CredentialResolver for OAuthCredentialResolver {
    async fn resolve(&self, user_email: &str) -> Result<Capability, PipelineError> {
        let refresh_token = find_refresh_token(&self.db, user_email)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("Unknown user {}", user_email)))?;

        let token = refresh_access_token(
            &self.client,
            &self.token_url,
            &self.client_id,
            &self.client_secret,
            &refresh_token,
        )
        .await?;

        Ok(Capability::new(token.access_token))
    }
}
