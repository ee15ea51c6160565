//! Storage contract for planning sessions.

use crate::errors::Result;
use crate::ids::{PlanningId, PlayerId};
use crate::planning::{Planning, Player};

/// Whole-session storage with a fixed set of structural mutations.
///
/// Every method is atomic with respect to every other method. Reads return
/// value copies; a caller's changes to a returned `Planning` are not visible
/// to the store.
pub trait PlanningRepository: Send + Sync {
    /// Insert a new planning. Fails with `AlreadyExists` on a duplicate id.
    fn create(&self, planning: Planning) -> Result<()>;

    /// Fetch a copy of a planning.
    fn get_by_id(&self, planning_id: &PlanningId) -> Result<Planning>;

    /// Append a player. A player flagged as owner becomes the owner.
    fn join(&self, planning_id: &PlanningId, player: Player) -> Result<Planning>;

    /// Remove a player.
    ///
    /// Returns `Ok(None)` when the last player left and the planning was
    /// destroyed.
    fn leave(&self, planning_id: &PlanningId, player_id: &PlayerId) -> Result<Option<Planning>>;

    /// Record a hidden vote regardless of the revealed state.
    fn vote(&self, planning_id: &PlanningId, player_id: &PlayerId, value: i32) -> Result<()>;

    /// Expose all hidden votes.
    fn reveal_votes(&self, planning_id: &PlanningId) -> Result<Planning>;

    /// Clear every vote and un-reveal.
    fn reset_votes(&self, planning_id: &PlanningId) -> Result<()>;

    /// Remove a planning. Absent ids are ignored.
    fn close(&self, planning_id: &PlanningId);

    /// Number of live plannings.
    fn count(&self) -> usize;
}
