//! Pipeline-level error taxonomy.
//!
//! Cancellation is not an error; it surfaces as `Transition::Cancelled`.

use thiserror::Error;

use crate::external::{LaunchError, RequestId, ResolutionError};
use crate::staging::StagingError;
use crate::store::PersistError;

/// No image could be obtained from a completed crop.
#[derive(Debug, Error)]
#[error("Image selection failed ({reason}); try selecting it with another gallery")]
pub struct SelectionError {
    pub reason: String,
}

impl SelectionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A pick or crop is still outstanding.
    #[error("Image acquisition already in progress (awaiting {0:?} result)")]
    Busy(RequestId),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl PipelineError {
    /// Local I/O failures that a retry may fix.
    pub fn is_transient_io(&self) -> bool {
        matches!(self, PipelineError::Staging(_) | PipelineError::Persist(_))
    }
}
