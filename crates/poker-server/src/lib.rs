//! # poker-server
//!
//! Axum HTTP + `WebSocket` server and planning session broadcasting.
//!
//! - `WebSocket` hub: per-connection protocol loop, per-planning connection
//!   registry, state fan-out after every event
//! - Typed inbound envelope decoding with an explicit unknown-type fallback
//! - HTTP endpoints: health check, Prometheus metrics, static client assets
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod protocol;
pub mod server;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::HubError;
pub use server::{AppState, ServerHandle, build_router, start};
pub use websocket::hub::Hub;
