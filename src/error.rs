use thiserror::Error;

use crate::api::ApiError;

/// Failures of list-view operations. None of them ends the session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LeadsError {
    /// Remote read failed; cached data stays visible.
    #[error("Failed to load leads: {0}")]
    Fetch(ApiError),
    /// Create/update/delete failed; no local state was changed.
    #[error("{0}")]
    Write(ApiError),
    /// Rejected before any remote call.
    #[error("{0}")]
    Validation(String),
}
