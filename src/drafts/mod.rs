//! Draft records and the pipeline that produces and dispatches them.

pub mod db;
mod models;
pub mod pipeline;

pub use db::{finalize_draft, find_draft, load_context, save_draft};
pub use models::{DraftRecord, DraftStatus, FinalizeOutcome, bare_address, reply_recipient};
pub use pipeline::{DispatchOutcome, DraftOutcome, Pipeline, SendRequest, UnreadSummary};
