//! Event dispatch between connections and the planning service.
//!
//! Each connection carries an optional [`Attachment`] naming the planning and
//! player it currently speaks for. After every decodable event the hub
//! re-reads the attached planning and broadcasts it to all connections
//! registered for that planning.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use metrics::{counter, gauge};
use poker_core::{PlanningId, PlayerId};
use poker_service::PlanningService;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connection::ClientConnection;
use super::registry::SessionRegistry;
use crate::metrics::{PLANNING_SESSIONS_REGISTERED, WS_DECODE_ERRORS_TOTAL, WS_EVENTS_TOTAL};
use crate::protocol::{self, ClientEvent, Envelope, ServerEvent};

/// The planning and player a connection is currently bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// Attached planning.
    pub planning_id: PlanningId,
    /// Player this connection speaks for.
    pub player_id: PlayerId,
}

/// Bridges connections to the [`PlanningService`] and fans out state.
pub struct Hub {
    service: Arc<PlanningService>,
    registry: SessionRegistry,
    live_connections: AtomicUsize,
}

impl Hub {
    /// Create a hub over the given service.
    pub fn new(service: Arc<PlanningService>) -> Self {
        Self {
            service,
            registry: SessionRegistry::new(),
            live_connections: AtomicUsize::new(0),
        }
    }

    /// The underlying service.
    pub fn service(&self) -> &Arc<PlanningService> {
        &self.service
    }

    /// The per-planning connection registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Number of open transport connections.
    pub fn connection_count(&self) -> usize {
        self.live_connections.load(Ordering::Relaxed)
    }

    /// Record a newly accepted connection.
    pub fn connection_opened(&self) {
        let _ = self.live_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Handle one inbound text frame.
    ///
    /// A malformed envelope is dropped without broadcast. Otherwise, whether
    /// or not the payload decoded, an attached connection triggers a state
    /// broadcast tagged with the envelope's type.
    pub fn handle_message(
        &self,
        connection: &Arc<ClientConnection>,
        attachment: &mut Option<Attachment>,
        text: &str,
    ) {
        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(err) => {
                counter!(WS_DECODE_ERRORS_TOTAL).increment(1);
                warn!(connection_id = %connection.id, error = %err, "dropping malformed message");
                return;
            }
        };
        counter!(WS_EVENTS_TOTAL, "type" => event_label(&envelope.event_type)).increment(1);

        match ClientEvent::decode(&envelope) {
            Ok(event) => self.dispatch(connection, attachment, event),
            Err(err) => {
                counter!(WS_DECODE_ERRORS_TOTAL).increment(1);
                warn!(connection_id = %connection.id, error = %err, "failed to decode payload");
            }
        }

        if let Some(current) = attachment.as_ref() {
            self.broadcast_state(&current.planning_id, &envelope.event_type);
        }
    }

    fn dispatch(
        &self,
        connection: &Arc<ClientConnection>,
        attachment: &mut Option<Attachment>,
        event: ClientEvent,
    ) {
        match event {
            ClientEvent::Create(planning) => {
                if let Ok(created) = self.service.create(planning) {
                    let target = Attachment {
                        planning_id: created.id,
                        player_id: created.owner.id,
                    };
                    self.attach(connection, attachment, target);
                }
            }
            ClientEvent::Join(req) => {
                if let Ok((_, player)) = self.service.join(&req.planning_id, req.player) {
                    let target = Attachment {
                        planning_id: req.planning_id,
                        player_id: player.id,
                    };
                    self.attach(connection, attachment, target);
                }
            }
            ClientEvent::Vote(req) => {
                let _ = self.service.vote(&req.planning_id, &req.player_id, req.value);
            }
            ClientEvent::Reveal(req) => {
                let _ = self.service.reveal_votes(&req.planning_id);
            }
            ClientEvent::Reset(req) => {
                let _ = self.service.reset_votes(&req.planning_id);
            }
            ClientEvent::Close(req) => self.service.close(&req.planning_id),
            ClientEvent::Unknown(event_type) => {
                warn!(connection_id = %connection.id, event_type = %event_type, "ignoring unknown event type");
            }
        }
    }

    /// Bind a connection to a planning, leaving any previous registration.
    fn attach(
        &self,
        connection: &Arc<ClientConnection>,
        attachment: &mut Option<Attachment>,
        target: Attachment,
    ) {
        if let Some(previous) = attachment.as_ref() {
            if previous.planning_id != target.planning_id {
                self.registry.unregister(&previous.planning_id, &connection.id);
            }
        }
        self.registry.register(&target.planning_id, Arc::clone(connection));
        debug!(
            connection_id = %connection.id,
            planning_id = %target.planning_id,
            player_id = %target.player_id,
            "connection attached"
        );
        *attachment = Some(target);
    }

    /// Re-read a planning and broadcast it. A failed read skips the broadcast.
    pub fn broadcast_state(&self, planning_id: &PlanningId, event_type: &str) -> usize {
        match self.service.get_by_id(planning_id, None) {
            Ok(planning) => self.registry.broadcast(planning_id, &ServerEvent {
                event_type,
                payload: &planning,
            }),
            Err(err) => {
                debug!(planning_id = %planning_id, event_type, error = %err, "skipping broadcast");
                0
            }
        }
    }

    /// Clean up after a connection closes.
    ///
    /// Deregisters the connection and, if it was attached, removes its
    /// player. Remaining connections receive `player_left` unless the
    /// planning was destroyed.
    pub fn disconnect(&self, connection: &ClientConnection, attachment: Option<Attachment>) {
        let _ = self.live_connections.fetch_sub(1, Ordering::Relaxed);
        let Some(attachment) = attachment else {
            return;
        };
        self.registry.unregister(&attachment.planning_id, &connection.id);
        match self.service.leave(&attachment.planning_id, &attachment.player_id) {
            Ok(Some(planning)) => {
                let _ = self.registry.broadcast(&attachment.planning_id, &ServerEvent {
                    event_type: protocol::PLAYER_LEFT,
                    payload: &planning,
                });
            }
            Ok(None) => {
                debug!(planning_id = %attachment.planning_id, "last player left");
            }
            Err(_) => {}
        }
    }

    /// Periodically log the number of plannings with registered connections.
    ///
    /// Runs until `cancel` fires.
    pub fn spawn_session_reporter(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let count = hub.registry.session_count();
                        gauge!(PLANNING_SESSIONS_REGISTERED).set(count as f64);
                        info!(count, "active websocket sessions");
                    }
                }
            }
        })
    }
}

/// Bounded label for the events counter.
fn event_label(event_type: &str) -> &'static str {
    match event_type {
        protocol::CREATE => protocol::CREATE,
        protocol::JOIN => protocol::JOIN,
        protocol::VOTE => protocol::VOTE,
        protocol::REVEAL => protocol::REVEAL,
        protocol::RESET => protocol::RESET,
        protocol::CLOSE => protocol::CLOSE,
        _ => "unknown",
    }
}
