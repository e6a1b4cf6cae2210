//! TaskCore's HTTP surface: authentication, task and conversation
//! routes, health, and server lifecycle.

pub mod auth_routes;
pub mod chat_routes;
pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod task_routes;

pub use config::AppConfig;
pub use server::{build_router, build_state, start, ServerHandle};
pub use state::{AppState, CurrentUser};
