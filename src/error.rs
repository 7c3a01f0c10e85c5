use thiserror::Error;

use crate::{
    dao::storage::StorageError,
    dto::quiz_text::MalformedResponse,
    services::{generator::GeneratorError, plot::PlotError},
    state::InvalidTransition,
};

/// Errors surfaced by a quiz session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The generator answered, but not in the expected layout.
    #[error("the generated quiz was malformed: {0}")]
    MalformedResponse(#[from] MalformedResponse),
    /// The generation call itself failed.
    #[error("the quiz generator is unavailable: {0}")]
    GeneratorUnavailable(#[from] GeneratorError),
    /// Durable storage could not be read or written.
    #[error("quiz storage is unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),
    /// The score histogram could not be produced.
    #[error("score plot failed: {0}")]
    Plot(#[from] PlotError),
    /// A completion reached the state machine in a stage not waiting for it.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

impl SessionError {
    /// Whether the session cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::StorageUnavailable(_) | SessionError::InvalidTransition(_)
        )
    }
}
