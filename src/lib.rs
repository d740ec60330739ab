pub mod ai;
pub mod api;
pub mod cli;
pub mod context;
pub mod core;
pub mod dispatch;
pub mod drafts;
pub mod google;
pub mod jobs;
pub mod openai;
pub mod sessions;
pub mod users;
