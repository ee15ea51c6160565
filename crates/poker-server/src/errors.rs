//! Hub error types.

use thiserror::Error;

use crate::websocket::connection::ConnectionId;

/// Errors raised while handling `WebSocket` traffic.
///
/// Neither variant is fatal to a connection: decode failures skip a single
/// message, write failures skip a single recipient.
#[derive(Debug, Error)]
pub enum HubError {
    /// An inbound envelope or payload could not be decoded.
    #[error("failed to decode {what}: {source}")]
    Decode {
        /// What was being decoded (`"envelope"` or an event type).
        what: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// A message could not be queued for a connection.
    #[error("failed to write to connection {connection_id}: {reason}")]
    TransportWrite {
        /// Recipient connection.
        connection_id: ConnectionId,
        /// Why the write failed.
        reason: &'static str,
    },
}

impl HubError {
    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode",
            Self::TransportWrite { .. } => "transport_write",
        }
    }
}
