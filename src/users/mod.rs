//! Registered mailbox owners and their stored refresh tokens.

mod db;

pub use db::{
    find_all_user_emails, find_refresh_token, get_preferred_style, set_preferred_style,
    upsert_user,
};
