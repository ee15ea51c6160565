//! `WebSocket` session lifecycle: handles a single connected client from
//! upgrade through disconnect.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use super::connection::{ClientConnection, ConnectionId};
use super::hub::{Attachment, Hub};
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL};

/// Run a `WebSocket` session for a connected client.
///
/// 1. Forwards queued broadcasts to the socket from a writer task
/// 2. Feeds inbound text frames to the hub in arrival order
/// 3. On close or read error, leaves the attached planning
#[instrument(skip_all, fields(connection_id = %connection_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    connection_id: ConnectionId,
    hub: Arc<Hub>,
    max_send_queue: usize,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(max_send_queue);
    let connection = Arc::new(ClientConnection::new(connection_id, send_tx));
    let mut attachment: Option<Attachment> = None;

    info!("client connected");
    hub.connection_opened();
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let writer = tokio::spawn(async move {
        while let Some(text) = send_rx.recv().await {
            if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_rx.next().await {
        let text = match msg {
            Message::Text(ref t) => t.to_string(),
            Message::Binary(ref data) => match std::str::from_utf8(data) {
                Ok(s) => s.to_owned(),
                Err(_) => {
                    debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                    continue;
                }
            },
            Message::Close(_) => {
                debug!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };
        hub.handle_message(&connection, &mut attachment, &text);
    }

    info!(
        dropped_messages = connection.drop_count(),
        "client disconnected"
    );
    hub.disconnect(&connection, attachment);
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    writer.abort();
}
