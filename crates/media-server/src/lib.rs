//! Loopback-only HTTPS server for chat images, chat audio and identicons.
//!
//! The server presents a self-signed certificate generated once per process
//! ([`certificate`]), serves three GET endpoints ([`server::handlers`]), and
//! keeps its port across background/foreground cycles
//! ([`server::MediaServer`]).

pub mod certificate;
pub mod config;
pub mod identicon;
pub mod mime;
pub mod server;
pub mod store;
pub mod telemetry;
