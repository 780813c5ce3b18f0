//! Structured logging for the media server.
//!
//! # Telemetry invariants
//!
//! - **No payloads, message ids or public keys** in any span attribute or log
//!   field. Request spans carry the method and path only.
//! - Log level is configurable via `MEDIA_SERVER_LOG_LEVEL` (default: `info`);
//!   `RUST_LOG` takes precedence when set.

pub mod init;

pub use init::init;
