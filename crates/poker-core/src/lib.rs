//! # poker-core
//!
//! Domain model for planning poker sessions.
//!
//! - Branded identifiers for plannings and players
//! - The `Planning` aggregate and its vote-visibility rules
//! - The `PlanningRepository` contract implemented by the session store
//! - Domain error types

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod planning;
pub mod repository;

pub use errors::{PlanningError, Result};
pub use ids::{PlanningId, PlayerId};
pub use planning::{NOT_VOTED, Planning, Player};
pub use repository::PlanningRepository;
