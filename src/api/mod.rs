pub mod routes;
mod server;
pub use server::{app, init_tracing, serve};
pub mod public;
mod session;
pub use session::CurrentUser;
mod state;
pub use state::AppState;
