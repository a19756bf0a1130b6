//! # api-adapters
//!
//! The HTTP surface of corkboard: an axum router over the service layer,
//! plus the error-to-status mapping, cookie-session extractors and request
//! metrics. Everything web-facing sits behind the `web-axum` feature so
//! service consumers can depend on this crate without pulling the stack in.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod metrics;
#[cfg(feature = "web-axum")]
pub mod state;

#[cfg(feature = "web-axum")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "web-axum")]
pub use handlers::router;
#[cfg(feature = "web-axum")]
pub use state::AppState;
