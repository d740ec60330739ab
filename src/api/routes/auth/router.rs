//! Router for the session API. Issuing sessions happens out of band
//! (see `draftly user add`).

use std::sync::{Arc, RwLock};

use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;

use super::public;
use crate::api::CurrentUser;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::sessions::{SESSION_COOKIE, delete_session};

type SharedState = Arc<RwLock<AppState>>;

async fn me_handler(user: CurrentUser) -> Json<public::MeResponse> {
    Json(public::MeResponse { email: user.email })
}

async fn logout_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<public::LogoutResponse>), ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let db = state.read().expect("Unable to read shared state").db.clone();
        delete_session(&db, cookie.value()).await?;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((
        jar,
        Json(public::LogoutResponse {
            message: String::from("Logged out"),
        }),
    ))
}

/// Create the auth router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/me", get(me_handler))
        .route("/logout", post(logout_handler))
}
