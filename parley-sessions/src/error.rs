//! Error types for session operations

use parley_providers::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// No session is registered under the identifier
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The provider call failed; the message is the provider's own
    #[error("Provider call failed: {0}")]
    ProviderCallFailed(#[from] ProviderError),

    /// The provider's transcript does not extend the local history, or
    /// carries a system message past the first position
    #[error("Provider transcript diverges from session history: expected {expected} leading messages, decoded {received}")]
    HistoryDiverged { expected: usize, received: usize },

    /// The registry is at its configured session limit
    #[error("Session limit reached ({0})")]
    CapacityExceeded(usize),

    #[error(transparent)]
    History(#[from] parley_core::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
