//! API routes module

pub mod auth;
pub mod email;

use std::sync::{Arc, RwLock};

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<RwLock<AppState>>;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Session routes
        .nest("/auth", auth::router())
        // Email drafting routes
        .nest("/email", email::router())
}
