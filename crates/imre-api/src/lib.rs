//! IMRE API crate - axum HTTP surface over the conversation orchestrator.
//!
//! Exposes the chat entry point plus the auxiliary memory, session and
//! history reads.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
