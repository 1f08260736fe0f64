//! HTTP surface and background-task wiring for the bridge binary.

pub mod background;
pub mod error;
pub mod health;
pub mod routes;
pub mod state;
pub mod webhook;

pub use routes::build_router;
pub use state::AppState;
