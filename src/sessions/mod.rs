//! Opaque session tokens issued to registered users.
//!
//! A user has at most one live session. Tokens are checked on every
//! pipeline request and expired rows are removed as they are found.

mod db;

pub use db::{create_session, delete_session, validate_session};

pub const SESSION_COOKIE: &str = "session_token";
