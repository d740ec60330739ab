//! Public types for the auth API
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}
