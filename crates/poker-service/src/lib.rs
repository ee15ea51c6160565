//! # poker-service
//!
//! Business rules for planning sessions, layered over a
//! [`PlanningRepository`]. The service is the repository's only caller: it
//! assigns identifiers, derives the caller's own vote, and ignores votes once
//! a planning is revealed. Repository errors are propagated unchanged.

#![deny(unsafe_code)]

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use poker_core::{
    NOT_VOTED, Planning, PlanningId, PlanningRepository, Player, PlayerId, Result,
};
use tracing::{debug, error};

/// Orchestrates planning operations.
pub struct PlanningService {
    repository: Arc<dyn PlanningRepository>,
}

impl PlanningService {
    /// Create a service over the given repository.
    pub fn new(repository: Arc<dyn PlanningRepository>) -> Self {
        Self { repository }
    }

    /// Create a planning and join its owner as the first player.
    ///
    /// Assigns an id when absent, starts with no players and no votes, and
    /// stamps `created_at` when the client left it empty. If joining the owner
    /// fails the planning stays stored; callers may `close` it.
    pub fn create(&self, mut planning: Planning) -> Result<Planning> {
        debug!(owner = %planning.owner.name, "creating planning");
        if planning.id.is_empty() {
            planning.id = PlanningId::generate();
        }
        if planning.created_at.is_empty() {
            planning.created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        }
        planning.players.clear();
        planning.votes.clear();
        planning.hidden_votes.clear();
        planning.revealed = false;
        planning.my_vote = NOT_VOTED;

        let planning_id = planning.id.clone();
        let mut owner = planning.owner.clone();
        if let Err(e) = self.repository.create(planning) {
            error!(planning_id = %planning_id, error = %e, "error creating planning");
            return Err(e);
        }
        debug!(planning_id = %planning_id, "planning created");

        owner.is_owner = true;
        let (created, _) = self.join(&planning_id, owner).inspect_err(|e| {
            error!(planning_id = %planning_id, error = %e, "error joining owner to planning");
        })?;
        Ok(created)
    }

    /// Fetch a planning with `my_vote` derived for `caller`.
    ///
    /// Without a caller, `my_vote` is [`NOT_VOTED`].
    pub fn get_by_id(&self, planning_id: &PlanningId, caller: Option<&PlayerId>) -> Result<Planning> {
        debug!(planning_id = %planning_id, "retrieving planning");
        let mut planning = self.repository.get_by_id(planning_id).inspect_err(|e| {
            error!(planning_id = %planning_id, error = %e, "error retrieving planning");
        })?;
        planning.my_vote = caller.map_or(NOT_VOTED, |id| planning.vote_of(id));
        Ok(planning)
    }

    /// Join a player under a freshly assigned id.
    ///
    /// Any client-supplied id is discarded. Returns the updated planning and
    /// the player as stored.
    pub fn join(&self, planning_id: &PlanningId, mut player: Player) -> Result<(Planning, Player)> {
        debug!(planning_id = %planning_id, player_name = %player.name, "player joining planning");
        player.id = PlayerId::generate();
        let planning = self
            .repository
            .join(planning_id, player.clone())
            .inspect_err(|e| {
                error!(
                    planning_id = %planning_id,
                    player_name = %player.name,
                    error = %e,
                    "error joining planning"
                );
            })?;
        debug!(planning_id = %planning_id, player_id = %player.id, "player joined");
        Ok((planning, player))
    }

    /// Remove a player. `Ok(None)` means the planning was destroyed.
    pub fn leave(&self, planning_id: &PlanningId, player_id: &PlayerId) -> Result<Option<Planning>> {
        debug!(planning_id = %planning_id, player_id = %player_id, "player leaving planning");
        let planning = self
            .repository
            .leave(planning_id, player_id)
            .inspect_err(|e| {
                error!(planning_id = %planning_id, player_id = %player_id, error = %e, "error leaving planning");
            })?;
        debug!(planning_id = %planning_id, player_id = %player_id, "player left");
        Ok(planning)
    }

    /// Record a vote. Once the planning is revealed this is a silent no-op.
    pub fn vote(&self, planning_id: &PlanningId, player_id: &PlayerId, value: i32) -> Result<()> {
        debug!(planning_id = %planning_id, player_id = %player_id, value, "player voting");
        let planning = self.repository.get_by_id(planning_id).inspect_err(|e| {
            error!(planning_id = %planning_id, error = %e, "error retrieving planning for voting");
        })?;
        if planning.revealed {
            debug!(planning_id = %planning_id, player_id = %player_id, "votes already revealed, ignoring vote");
            return Ok(());
        }
        self.repository
            .vote(planning_id, player_id, value)
            .inspect_err(|e| {
                error!(planning_id = %planning_id, player_id = %player_id, value, error = %e, "error recording vote");
            })?;
        debug!(planning_id = %planning_id, player_id = %player_id, "vote recorded");
        Ok(())
    }

    /// Expose every hidden vote.
    pub fn reveal_votes(&self, planning_id: &PlanningId) -> Result<Planning> {
        debug!(planning_id = %planning_id, "revealing votes");
        let planning = self.repository.reveal_votes(planning_id).inspect_err(|e| {
            error!(planning_id = %planning_id, error = %e, "error revealing votes");
        })?;
        debug!(planning_id = %planning_id, "votes revealed");
        Ok(planning)
    }

    /// Clear every vote and hide the board.
    pub fn reset_votes(&self, planning_id: &PlanningId) -> Result<()> {
        debug!(planning_id = %planning_id, "resetting votes");
        self.repository.reset_votes(planning_id).inspect_err(|e| {
            error!(planning_id = %planning_id, error = %e, "error resetting votes");
        })?;
        debug!(planning_id = %planning_id, "votes reset");
        Ok(())
    }

    /// Destroy a planning. Idempotent.
    pub fn close(&self, planning_id: &PlanningId) {
        debug!(planning_id = %planning_id, "closing planning");
        self.repository.close(planning_id);
    }

    /// Number of live plannings.
    pub fn active_plannings(&self) -> usize {
        self.repository.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::predicate::eq;
    use poker_core::PlanningError;

    mock! {
        pub Repo {}

        impl PlanningRepository for Repo {
            fn create(&self, planning: Planning) -> Result<()>;
            fn get_by_id(&self, planning_id: &PlanningId) -> Result<Planning>;
            fn join(&self, planning_id: &PlanningId, player: Player) -> Result<Planning>;
            fn leave(&self, planning_id: &PlanningId, player_id: &PlayerId) -> Result<Option<Planning>>;
            fn vote(&self, planning_id: &PlanningId, player_id: &PlayerId, value: i32) -> Result<()>;
            fn reveal_votes(&self, planning_id: &PlanningId) -> Result<Planning>;
            fn reset_votes(&self, planning_id: &PlanningId) -> Result<()>;
            fn close(&self, planning_id: &PlanningId);
            fn count(&self) -> usize;
        }
    }

    fn service(repo: MockRepo) -> PlanningService {
        PlanningService::new(Arc::new(repo))
    }

    fn planning_id() -> PlanningId {
        PlanningId::from_raw("p1")
    }

    fn stored(revealed: bool) -> Planning {
        let mut planning = Planning::new(Player::new("owner"));
        planning.id = planning_id();
        planning.revealed = revealed;
        planning
    }

    #[test]
    fn create_assigns_id_and_joins_owner() {
        let mut repo = MockRepo::new();
        let _ = repo
            .expect_create()
            .withf(|p| !p.id.is_empty() && p.players.is_empty() && !p.created_at.is_empty())
            .times(1)
            .returning(|_| Ok(()));
        let _ = repo
            .expect_join()
            .withf(|_, player| player.is_owner && !player.id.is_empty() && player.name == "test-owner")
            .times(1)
            .returning(|id, player| {
                let mut p = Planning::new(player.clone());
                p.id = id.clone();
                p.players.push(player);
                Ok(p)
            });

        let created = service(repo).create(Planning::new(Player::new("test-owner"))).unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(created.owner.name, "test-owner");
        assert_eq!(created.players.len(), 1);
    }

    #[test]
    fn create_keeps_supplied_id() {
        let mut repo = MockRepo::new();
        let _ = repo
            .expect_create()
            .withf(|p| p.id.as_str() == "fixed")
            .times(1)
            .returning(|_| Ok(()));
        let _ = repo
            .expect_join()
            .with(eq(PlanningId::from_raw("fixed")), mockall::predicate::always())
            .times(1)
            .returning(|id, player| {
                let mut p = Planning::new(player);
                p.id = id.clone();
                Ok(p)
            });

        let mut planning = Planning::new(Player::new("o"));
        planning.id = PlanningId::from_raw("fixed");
        let created = service(repo).create(planning).unwrap();
        assert_eq!(created.id.as_str(), "fixed");
    }

    #[test]
    fn create_error_skips_join() {
        let mut repo = MockRepo::new();
        let _ = repo
            .expect_create()
            .times(1)
            .returning(|p| Err(PlanningError::AlreadyExists(p.id)));
        let _ = repo.expect_join().never();

        let err = service(repo).create(Planning::new(Player::new("o"))).unwrap_err();
        assert!(matches!(err, PlanningError::AlreadyExists(_)));
    }

    #[test]
    fn create_fails_when_owner_join_fails() {
        let mut repo = MockRepo::new();
        let _ = repo.expect_create().times(1).returning(|_| Ok(()));
        let _ = repo
            .expect_join()
            .times(1)
            .returning(|id, _| Err(PlanningError::NotFound(id.clone())));
        let _ = repo.expect_close().never();

        let err = service(repo).create(Planning::new(Player::new("o"))).unwrap_err();
        assert!(matches!(err, PlanningError::NotFound(_)));
    }

    #[test]
    fn get_by_id_derives_my_vote() {
        let mut repo = MockRepo::new();
        let _ = repo
            .expect_get_by_id()
            .with(eq(planning_id()))
            .returning(|_| {
                let mut p = stored(false);
                p.record_vote(PlayerId::from_raw("bob"), 5);
                Ok(p)
            });
        let svc = service(repo);

        let bob = PlayerId::from_raw("bob");
        let alice = PlayerId::from_raw("alice");
        assert_eq!(svc.get_by_id(&planning_id(), Some(&bob)).unwrap().my_vote, 5);
        assert_eq!(svc.get_by_id(&planning_id(), Some(&alice)).unwrap().my_vote, NOT_VOTED);
        assert_eq!(svc.get_by_id(&planning_id(), None).unwrap().my_vote, NOT_VOTED);
    }

    #[test]
    fn get_by_id_error_propagates() {
        let mut repo = MockRepo::new();
        let _ = repo
            .expect_get_by_id()
            .returning(|id| Err(PlanningError::NotFound(id.clone())));

        let err = service(repo).get_by_id(&planning_id(), None).unwrap_err();
        assert_eq!(err, PlanningError::NotFound(planning_id()));
    }

    #[test]
    fn join_overwrites_client_id() {
        let mut repo = MockRepo::new();
        let _ = repo
            .expect_join()
            .withf(|_, player| player.id.as_str() != "client-chosen" && !player.is_owner)
            .times(1)
            .returning(|_, _| Ok(stored(false)));

        let player = Player {
            id: PlayerId::from_raw("client-chosen"),
            name: "Bob".into(),
            is_owner: false,
        };
        let (_, joined) = service(repo).join(&planning_id(), player).unwrap();
        assert_ne!(joined.id.as_str(), "client-chosen");
        assert!(joined.id.as_str().starts_with("player_"));
    }

    #[test]
    fn join_error_propagates() {
        let mut repo = MockRepo::new();
        let _ = repo
            .expect_join()
            .returning(|id, _| Err(PlanningError::NotFound(id.clone())));

        let result = service(repo).join(&planning_id(), Player::new("Bob"));
        assert!(matches!(result, Err(PlanningError::NotFound(_))));
    }

    #[test]
    fn leave_delegates() {
        let mut repo = MockRepo::new();
        let _ = repo
            .expect_leave()
            .with(eq(planning_id()), eq(PlayerId::from_raw("a")))
            .times(1)
            .returning(|_, _| Ok(None));

        let result = service(repo).leave(&planning_id(), &PlayerId::from_raw("a")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn vote_delegates_before_reveal() {
        let mut repo = MockRepo::new();
        let _ = repo.expect_get_by_id().returning(|_| Ok(stored(false)));
        let _ = repo
            .expect_vote()
            .with(eq(planning_id()), eq(PlayerId::from_raw("a")), eq(5))
            .times(1)
            .returning(|_, _, _| Ok(()));

        service(repo)
            .vote(&planning_id(), &PlayerId::from_raw("a"), 5)
            .unwrap();
    }

    #[test]
    fn vote_after_reveal_is_ignored() {
        let mut repo = MockRepo::new();
        let _ = repo.expect_get_by_id().returning(|_| Ok(stored(true)));
        let _ = repo.expect_vote().never();

        service(repo)
            .vote(&planning_id(), &PlayerId::from_raw("a"), 5)
            .unwrap();
    }

    #[test]
    fn vote_on_missing_planning_fails() {
        let mut repo = MockRepo::new();
        let _ = repo
            .expect_get_by_id()
            .returning(|id| Err(PlanningError::NotFound(id.clone())));
        let _ = repo.expect_vote().never();

        let result = service(repo).vote(&planning_id(), &PlayerId::from_raw("a"), 5);
        assert!(result.is_err());
    }

    #[test]
    fn reveal_votes_passes_through() {
        let mut repo = MockRepo::new();
        let _ = repo
            .expect_reveal_votes()
            .with(eq(planning_id()))
            .times(1)
            .returning(|_| {
                let mut p = stored(true);
                let _ = p.votes.insert(PlayerId::from_raw("player1"), 5);
                Ok(p)
            });

        let planning = service(repo).reveal_votes(&planning_id()).unwrap();
        assert!(planning.revealed);
        assert_eq!(planning.votes[&PlayerId::from_raw("player1")], 5);
    }

    #[test]
    fn reveal_votes_error_propagates() {
        let mut repo = MockRepo::new();
        let _ = repo
            .expect_reveal_votes()
            .returning(|id| Err(PlanningError::NotFound(id.clone())));

        assert!(service(repo).reveal_votes(&planning_id()).is_err());
    }

    #[test]
    fn reset_votes_passes_through() {
        let mut repo = MockRepo::new();
        let _ = repo
            .expect_reset_votes()
            .with(eq(planning_id()))
            .times(1)
            .returning(|_| Ok(()));

        service(repo).reset_votes(&planning_id()).unwrap();
    }

    #[test]
    fn reset_votes_error_propagates() {
        let mut repo = MockRepo::new();
        let _ = repo
            .expect_reset_votes()
            .returning(|id| Err(PlanningError::NotFound(id.clone())));

        assert!(service(repo).reset_votes(&planning_id()).is_err());
    }

    #[test]
    fn close_passes_through() {
        let mut repo = MockRepo::new();
        let _ = repo
            .expect_close()
            .with(eq(planning_id()))
            .times(1)
            .return_const(());

        service(repo).close(&planning_id());
    }

    #[test]
    fn active_plannings_reads_count() {
        let mut repo = MockRepo::new();
        let _ = repo.expect_count().return_const(3_usize);

        assert_eq!(service(repo).active_plannings(), 3);
    }
}
