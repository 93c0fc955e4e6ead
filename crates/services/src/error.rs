//! Shared error types for the services crate.

use thiserror::Error;

use backend::BackendError;
use drill_core::model::DrillError;

/// Errors emitted by the session store and drill runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// No drill is loaded; callers treat this as a routing decision back to
    /// the entry screen, not a crash.
    #[error("no drill session is loaded")]
    NoSession,

    #[error(transparent)]
    Drill(#[from] DrillError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}
