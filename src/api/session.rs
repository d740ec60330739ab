//! Session check run before every pipeline endpoint.

use std::sync::{Arc, RwLock};

use axum::extract::FromRequestParts;
use axum_extra::extract::CookieJar;
use http::request::Parts;

use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::core::PipelineError;
use crate::sessions::{SESSION_COOKIE, validate_session};

type SharedState = Arc<RwLock<AppState>>;

/// The user owning the request's session cookie.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub email: String,
    pub token: String,
}

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| PipelineError::Unauthenticated(String::from("Not logged in")))?;

        let db = state.read().expect("Unable to read shared state").db.clone();
        let email = validate_session(&db, &token).await?;

        Ok(CurrentUser { email, token })
    }
}
