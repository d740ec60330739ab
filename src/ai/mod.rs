pub mod draft;
pub mod prompt;

pub use draft::{GenerativeBackend, OpenAiBackend, generate_draft};
