//! # poker-store
//!
//! In-memory planning store. A single mutex guards the whole session map;
//! every operation holds it for its full duration, so concurrent requests
//! touching different plannings still serialize.

#![deny(unsafe_code)]

use std::collections::HashMap;

use parking_lot::Mutex;
use poker_core::{Planning, PlanningError, PlanningId, PlanningRepository, Player, PlayerId, Result};
use tracing::{debug, instrument};

/// Process-lifetime storage of live plannings.
#[derive(Default)]
pub struct InMemoryPlanningRepository {
    sessions: Mutex<HashMap<PlanningId, Planning>>,
}

impl InMemoryPlanningRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against a stored planning under the lock.
    fn with_planning<T>(
        &self,
        planning_id: &PlanningId,
        f: impl FnOnce(&mut Planning) -> T,
    ) -> Result<T> {
        let mut sessions = self.sessions.lock();
        let planning = sessions
            .get_mut(planning_id)
            .ok_or_else(|| PlanningError::NotFound(planning_id.clone()))?;
        Ok(f(planning))
    }
}

impl PlanningRepository for InMemoryPlanningRepository {
    #[instrument(skip_all, fields(planning_id = %planning.id))]
    fn create(&self, planning: Planning) -> Result<()> {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&planning.id) {
            return Err(PlanningError::AlreadyExists(planning.id));
        }
        let _ = sessions.insert(planning.id.clone(), planning);
        Ok(())
    }

    fn get_by_id(&self, planning_id: &PlanningId) -> Result<Planning> {
        self.with_planning(planning_id, |planning| planning.clone())
    }

    fn join(&self, planning_id: &PlanningId, player: Player) -> Result<Planning> {
        self.with_planning(planning_id, |planning| {
            planning.add_player(player);
            planning.clone()
        })
    }

    #[instrument(skip(self))]
    fn leave(&self, planning_id: &PlanningId, player_id: &PlayerId) -> Result<Option<Planning>> {
        let mut sessions = self.sessions.lock();
        let planning = sessions
            .get_mut(planning_id)
            .ok_or_else(|| PlanningError::NotFound(planning_id.clone()))?;
        if planning.remove_player(player_id) {
            return Ok(Some(planning.clone()));
        }
        let _ = sessions.remove(planning_id);
        debug!("last player left, planning destroyed");
        Ok(None)
    }

    fn vote(&self, planning_id: &PlanningId, player_id: &PlayerId, value: i32) -> Result<()> {
        self.with_planning(planning_id, |planning| {
            planning.record_vote(player_id.clone(), value);
        })
    }

    fn reveal_votes(&self, planning_id: &PlanningId) -> Result<Planning> {
        self.with_planning(planning_id, |planning| {
            planning.reveal();
            planning.clone()
        })
    }

    fn reset_votes(&self, planning_id: &PlanningId) -> Result<()> {
        self.with_planning(planning_id, Planning::reset_votes)
    }

    fn close(&self, planning_id: &PlanningId) {
        let _ = self.sessions.lock().remove(planning_id);
    }

    fn count(&self) -> usize {
        self.sessions.lock().len()
    }
}
