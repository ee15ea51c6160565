//! Per-planning registry of live connections used for state fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use parking_lot::Mutex;
use poker_core::PlanningId;
use tracing::{debug, error, warn};

use super::connection::{ClientConnection, ConnectionId};
use crate::metrics::WS_BROADCAST_DROPS_TOTAL;
use crate::protocol::ServerEvent;

type ConnectionSet = HashMap<ConnectionId, Arc<ClientConnection>>;

/// Maps each planning id to the connections attached to it.
///
/// One lock guards both membership changes and broadcasts, so broadcasts to
/// the same planning are delivered in lock acquisition order.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<PlanningId, ConnectionSet>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under a planning.
    pub fn register(&self, planning_id: &PlanningId, connection: Arc<ClientConnection>) {
        let mut sessions = self.sessions.lock();
        let _ = sessions
            .entry(planning_id.clone())
            .or_default()
            .insert(connection.id.clone(), connection);
    }

    /// Remove a connection from a planning. Empty sets are dropped.
    pub fn unregister(&self, planning_id: &PlanningId, connection_id: &ConnectionId) {
        let mut sessions = self.sessions.lock();
        if let Some(set) = sessions.get_mut(planning_id) {
            let _ = set.remove(connection_id);
            if set.is_empty() {
                let _ = sessions.remove(planning_id);
            }
        }
    }

    /// Send an event to every connection registered for a planning.
    ///
    /// A failed write to one connection is logged and skipped. Returns the
    /// number of connections the event was queued for.
    pub fn broadcast(&self, planning_id: &PlanningId, event: &ServerEvent<'_>) -> usize {
        let json = match event.to_json() {
            Ok(json) => Arc::new(json),
            Err(err) => {
                error!(planning_id = %planning_id, error = %err, "failed to serialize broadcast");
                return 0;
            }
        };

        let sessions = self.sessions.lock();
        let Some(set) = sessions.get(planning_id) else {
            return 0;
        };
        let mut delivered = 0;
        for connection in set.values() {
            match connection.send(Arc::clone(&json)) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
                    warn!(planning_id = %planning_id, error = %err, "broadcast write failed");
                }
            }
        }
        debug!(planning_id = %planning_id, event_type = event.event_type, delivered, "broadcast");
        delivered
    }

    /// Number of plannings with at least one registered connection.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Number of connections registered for a planning.
    pub fn connection_count(&self, planning_id: &PlanningId) -> usize {
        self.sessions.lock().get(planning_id).map_or(0, HashMap::len)
    }
}
