//! The planning aggregate: players, owner, and the hidden/visible vote pair.
//!
//! Votes live in two maps. `hidden_votes` always holds the true values and is
//! never serialized. `votes` is what participants see: a `0` placeholder per
//! voter until the planning is revealed, then a copy of the hidden values.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{PlanningId, PlayerId};

/// `myVote` value for a caller who has not voted.
pub const NOT_VOTED: i32 = -1;

/// Placeholder shown in the visible votes for a player who voted before reveal.
const HIDDEN_PLACEHOLDER: i32 = 0;

fn not_voted() -> i32 {
    NOT_VOTED
}

/// A participant in a planning session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Server-assigned identifier.
    #[serde(default)]
    pub id: PlayerId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Whether this player owns the planning. Never serialized.
    #[serde(skip)]
    pub is_owner: bool,
}

impl Player {
    /// Create an unidentified player with the given display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PlayerId::default(),
            name: name.into(),
            is_owner: false,
        }
    }
}

/// A planning poker session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Planning {
    /// Session identifier; assigned by the service when empty.
    #[serde(default)]
    pub id: PlanningId,
    /// Opaque client timestamp.
    #[serde(rename = "lastConnected", default)]
    pub last_connected: String,
    /// Opaque creation timestamp.
    #[serde(default)]
    pub created_at: String,
    /// Current owner; always also present in `players` once joined.
    pub owner: Player,
    /// Players in join order.
    #[serde(default)]
    pub players: Vec<Player>,
    /// Whether hidden votes have been exposed.
    #[serde(default)]
    pub revealed: bool,
    /// Caller-specific vote, derived on read. Never meaningful in storage.
    #[serde(rename = "myVote", default = "not_voted")]
    pub my_vote: i32,
    /// Visible votes keyed by player id.
    #[serde(default)]
    pub votes: HashMap<PlayerId, i32>,
    /// True vote values keyed by player id.
    #[serde(skip)]
    pub hidden_votes: HashMap<PlayerId, i32>,
}

impl Default for Planning {
    fn default() -> Self {
        Self::new(Player::default())
    }
}

impl Planning {
    /// Create an empty planning description for the given owner.
    pub fn new(owner: Player) -> Self {
        Self {
            id: PlanningId::default(),
            last_connected: String::new(),
            created_at: String::new(),
            owner,
            players: Vec::new(),
            revealed: false,
            my_vote: NOT_VOTED,
            votes: HashMap::new(),
            hidden_votes: HashMap::new(),
        }
    }

    /// Look up a player by id.
    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == player_id)
    }

    /// The caller's own hidden vote, or [`NOT_VOTED`].
    pub fn vote_of(&self, player_id: &PlayerId) -> i32 {
        self.hidden_votes
            .get(player_id)
            .copied()
            .unwrap_or(NOT_VOTED)
    }

    /// Add a player. A player flagged as owner becomes the owner.
    ///
    /// A player whose id is already present replaces the existing entry in
    /// place, keeping ids unique.
    pub fn add_player(&mut self, player: Player) {
        if player.is_owner {
            for existing in &mut self.players {
                existing.is_owner = false;
            }
            self.owner = player.clone();
        }
        match self.players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) => *existing = player,
            None => self.players.push(player),
        }
    }

    /// Remove a player and their votes.
    ///
    /// Returns `false` when no players remain; the caller must then destroy
    /// the planning. If the owner left, ownership moves to the first
    /// remaining player.
    pub fn remove_player(&mut self, player_id: &PlayerId) -> bool {
        self.players.retain(|p| &p.id != player_id);
        let Some(first) = self.players.first_mut() else {
            return false;
        };
        let _ = self.votes.remove(player_id);
        let _ = self.hidden_votes.remove(player_id);
        if &self.owner.id == player_id {
            first.is_owner = true;
            self.owner = first.clone();
        }
        true
    }

    /// Record a hidden vote and mark the player as having voted.
    pub fn record_vote(&mut self, player_id: PlayerId, value: i32) {
        let _ = self.hidden_votes.insert(player_id.clone(), value);
        let _ = self.votes.insert(player_id, HIDDEN_PLACEHOLDER);
    }

    /// Expose all hidden votes.
    pub fn reveal(&mut self) {
        self.votes = self.hidden_votes.clone();
        self.revealed = true;
    }

    /// Clear every vote and hide the board again.
    pub fn reset_votes(&mut self) {
        self.votes.clear();
        self.hidden_votes.clear();
        self.revealed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, name: &str) -> Player {
        Player {
            id: PlayerId::from_raw(id),
            name: name.into(),
            is_owner: false,
        }
    }

    fn owner(id: &str, name: &str) -> Player {
        Player {
            is_owner: true,
            ..player(id, name)
        }
    }

    fn planning_with(players: &[Player]) -> Planning {
        let mut planning = Planning::new(Player::new("unused"));
        for p in players {
            planning.add_player(p.clone());
        }
        planning
    }

    #[test]
    fn add_owner_sets_owner() {
        let planning = planning_with(&[owner("a", "Alice")]);
        assert_eq!(planning.owner.id.as_str(), "a");
        assert_eq!(planning.players.len(), 1);
    }

    #[test]
    fn add_regular_player_keeps_owner() {
        let planning = planning_with(&[owner("a", "Alice"), player("b", "Bob")]);
        assert_eq!(planning.owner.id.as_str(), "a");
        assert_eq!(planning.players.len(), 2);
    }

    #[test]
    fn add_duplicate_id_replaces_entry() {
        let planning = planning_with(&[owner("a", "Alice"), player("b", "Bob"), player("b", "Robert")]);
        assert_eq!(planning.players.len(), 2);
        assert_eq!(planning.players[1].name, "Robert");
    }

    #[test]
    fn remove_last_player_reports_empty() {
        let mut planning = planning_with(&[owner("a", "Alice")]);
        assert!(!planning.remove_player(&PlayerId::from_raw("a")));
        assert!(planning.players.is_empty());
    }

    #[test]
    fn remove_owner_transfers_to_first_remaining() {
        let mut planning =
            planning_with(&[owner("a", "Alice"), player("b", "Bob"), player("c", "Carol")]);
        assert!(planning.remove_player(&PlayerId::from_raw("a")));
        assert_eq!(planning.owner.id.as_str(), "b");
        assert!(planning.owner.is_owner);
        assert!(planning.players[0].is_owner);
        assert_eq!(planning.players.len(), 2);
    }

    #[test]
    fn remove_player_drops_their_votes() {
        let mut planning = planning_with(&[owner("a", "Alice"), player("b", "Bob")]);
        planning.record_vote(PlayerId::from_raw("a"), 3);
        planning.record_vote(PlayerId::from_raw("b"), 8);
        assert!(planning.remove_player(&PlayerId::from_raw("b")));
        assert!(!planning.votes.contains_key(&PlayerId::from_raw("b")));
        assert!(!planning.hidden_votes.contains_key(&PlayerId::from_raw("b")));
        assert_eq!(planning.hidden_votes[&PlayerId::from_raw("a")], 3);
    }

    #[test]
    fn vote_is_hidden_until_reveal() {
        let mut planning = planning_with(&[owner("a", "Alice")]);
        let a = PlayerId::from_raw("a");
        planning.record_vote(a.clone(), 5);
        assert_eq!(planning.votes[&a], 0);
        assert_eq!(planning.hidden_votes[&a], 5);
        planning.reveal();
        assert!(planning.revealed);
        assert_eq!(planning.votes[&a], 5);
    }

    #[test]
    fn reset_clears_votes_and_reveal() {
        let mut planning = planning_with(&[owner("a", "Alice")]);
        planning.record_vote(PlayerId::from_raw("a"), 5);
        planning.reveal();
        planning.reset_votes();
        assert!(!planning.revealed);
        assert!(planning.votes.is_empty());
        assert!(planning.hidden_votes.is_empty());
        assert_eq!(planning.players.len(), 1);
    }

    #[test]
    fn vote_of_defaults_to_not_voted() {
        let mut planning = planning_with(&[owner("a", "Alice"), player("b", "Bob")]);
        planning.record_vote(PlayerId::from_raw("b"), 13);
        assert_eq!(planning.vote_of(&PlayerId::from_raw("b")), 13);
        assert_eq!(planning.vote_of(&PlayerId::from_raw("a")), NOT_VOTED);
        assert_eq!(planning.vote_of(&PlayerId::default()), NOT_VOTED);
    }

    #[test]
    fn serialization_hides_secret_fields() {
        let mut planning = planning_with(&[owner("a", "Alice")]);
        planning.id = PlanningId::from_raw("p1");
        planning.record_vote(PlayerId::from_raw("a"), 8);
        let json = serde_json::to_value(&planning).unwrap();
        assert_eq!(json["id"], "p1");
        assert_eq!(json["owner"]["name"], "Alice");
        assert_eq!(json["votes"]["a"], 0);
        assert_eq!(json["myVote"], NOT_VOTED);
        assert!(json.get("hidden_votes").is_none());
        assert!(json.get("hiddenVotes").is_none());
        assert!(json["owner"].get("is_owner").is_none());
        assert!(json.get("lastConnected").is_some());
        assert!(json.get("created_at").is_some());
    }

    #[test]
    fn deserialize_minimal_description() {
        let planning: Planning = serde_json::from_str(r#"{"owner":{"name":"Alice"}}"#).unwrap();
        assert!(planning.id.is_empty());
        assert_eq!(planning.owner.name, "Alice");
        assert!(planning.players.is_empty());
        assert_eq!(planning.my_vote, NOT_VOTED);
        assert!(!planning.revealed);
    }

    #[test]
    fn deserialize_without_owner_fails() {
        let result = serde_json::from_str::<Planning>(r#"{"id":"p1"}"#);
        assert!(result.is_err());
    }
}
