//! Domain error types.

use thiserror::Error;

use crate::ids::PlanningId;

/// Errors raised by planning store operations.
///
/// The service layer propagates these unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PlanningError {
    /// The referenced planning does not exist.
    #[error("planning {0} does not exist")]
    NotFound(PlanningId),
    /// A planning with this identifier already exists.
    #[error("planning {0} already exists")]
    AlreadyExists(PlanningId),
}

impl PlanningError {
    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
        }
    }
}

/// Result type for planning operations.
pub type Result<T> = std::result::Result<T, PlanningError>;
