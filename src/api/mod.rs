//! HTTP surface for the report QA service.
//!
//! A composable axum `Router` plus a small server lifecycle wrapper.
//! Routes are nested under `/api/`.

pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_server, ServerHandle};
pub use types::ApiContext;
