//! Loopback HTTPS server, routing, and lifecycle.
//!
//! # Responsibilities
//! - Bind the TLS listener on `localhost` (rustls, process certificate).
//! - Define the Axum router with the media routes and shared middleware.
//! - Supervise the listener: bind retries, restart on failure, and
//!   foreground/background transitions that keep the port.

pub mod handlers;
pub mod lifecycle;
pub mod listener;
pub mod middleware;
pub mod retry;
pub mod router;
pub mod state;
pub mod tls;

pub use lifecycle::{LifecycleState, MediaServer, ServerError};
pub use state::AppState;
