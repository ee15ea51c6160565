//! Wire protocol: inbound `{type, payload}` envelopes and outbound state
//! broadcasts.

use poker_core::{Planning, PlanningId, Player, PlayerId};
use serde::{Deserialize, Serialize};

use crate::errors::HubError;

/// Inbound `create` event type.
pub const CREATE: &str = "create";
/// Inbound `join` event type.
pub const JOIN: &str = "join";
/// Inbound `vote` event type.
pub const VOTE: &str = "vote";
/// Inbound `reveal` event type.
pub const REVEAL: &str = "reveal";
/// Inbound `reset` event type.
pub const RESET: &str = "reset";
/// Inbound `close` event type.
pub const CLOSE: &str = "close";
/// Outbound event sent after a connection drops out of a planning.
pub const PLAYER_LEFT: &str = "player_left";

/// Raw inbound message. The payload is decoded once the type is known.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    /// Event type tag.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Type-specific body.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Parse a text frame into an envelope.
    pub fn parse(text: &str) -> Result<Self, HubError> {
        serde_json::from_str(text).map_err(|source| HubError::Decode {
            what: "envelope".into(),
            source,
        })
    }
}

/// `join` payload.
#[derive(Clone, Debug, Deserialize)]
pub struct JoinRequest {
    /// Planning to join.
    #[serde(rename = "sessionId", alias = "planningId")]
    pub planning_id: PlanningId,
    /// Joining player; any supplied id is replaced server-side.
    pub player: Player,
}

/// `vote` payload.
#[derive(Clone, Debug, Deserialize)]
pub struct VoteRequest {
    /// Planning being voted in.
    #[serde(rename = "sessionId", alias = "planningId")]
    pub planning_id: PlanningId,
    /// Voting player.
    #[serde(rename = "playerId")]
    pub player_id: PlayerId,
    /// Estimate.
    pub value: i32,
}

/// Payload of `reveal`, `reset` and `close`.
#[derive(Clone, Debug, Deserialize)]
pub struct PlanningRef {
    /// Target planning.
    #[serde(rename = "sessionId", alias = "planningId")]
    pub planning_id: PlanningId,
}

/// A decoded inbound event.
#[derive(Clone, Debug)]
pub enum ClientEvent {
    /// Create a planning owned by the sender.
    Create(Planning),
    /// Join an existing planning.
    Join(JoinRequest),
    /// Record a hidden vote.
    Vote(VoteRequest),
    /// Expose all votes.
    Reveal(PlanningRef),
    /// Clear all votes.
    Reset(PlanningRef),
    /// Destroy the planning.
    Close(PlanningRef),
    /// A well-formed envelope with an unrecognized type.
    Unknown(String),
}

impl ClientEvent {
    /// Decode the envelope payload according to its type tag.
    pub fn decode(envelope: &Envelope) -> Result<Self, HubError> {
        let payload = &envelope.payload;
        let decode_err = |source| HubError::Decode {
            what: envelope.event_type.clone(),
            source,
        };
        let event = match envelope.event_type.as_str() {
            CREATE => Self::Create(Planning::deserialize(payload).map_err(decode_err)?),
            JOIN => Self::Join(JoinRequest::deserialize(payload).map_err(decode_err)?),
            VOTE => Self::Vote(VoteRequest::deserialize(payload).map_err(decode_err)?),
            REVEAL => Self::Reveal(PlanningRef::deserialize(payload).map_err(decode_err)?),
            RESET => Self::Reset(PlanningRef::deserialize(payload).map_err(decode_err)?),
            CLOSE => Self::Close(PlanningRef::deserialize(payload).map_err(decode_err)?),
            other => Self::Unknown(other.to_owned()),
        };
        Ok(event)
    }
}

/// Outbound state broadcast.
#[derive(Debug, Serialize)]
pub struct ServerEvent<'a> {
    /// Triggering event type, or [`PLAYER_LEFT`].
    #[serde(rename = "type")]
    pub event_type: &'a str,
    /// Full planning state.
    pub payload: &'a Planning,
}

impl ServerEvent<'_> {
    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
