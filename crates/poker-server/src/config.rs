//! Server configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the planning poker server.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `8080`; `0` auto-assigns).
    pub port: u16,
    /// Directory holding the client application.
    pub static_dir: PathBuf,
    /// Outbound message queue size per `WebSocket` connection.
    pub max_send_queue: usize,
    /// Interval between active-session reports, in seconds.
    pub report_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            static_dir: PathBuf::from("./frontend"),
            max_send_queue: 256,
            report_interval_secs: 10,
        }
    }
}
