//! HTTP API layer for qsticker.
//!
//! This crate provides the JSON API and the upstream image proxy:
//!
//! - **Endpoints**: catalog browsing, update triggers and the status log
//! - **Extractors**: public base URL derived from the incoming request
//! - **Middleware**: bearer token check for update endpoints
//! - **Proxy**: cached pass-through of provider preview images
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod proxy;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
