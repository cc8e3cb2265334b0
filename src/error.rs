use thiserror::Error;

/// The seven error kinds the engine surfaces to its callers.
///
/// Propagation policy: `Validation`/`Auth` are rejected before any mutation.
/// `Conflict` is retried a bounded number of times inside a single mutation
/// before surfacing (see `retry::with_conflict_retry`). `Internal` implies a
/// bug and is always logged with full context before propagating.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not authorized: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("exhausted: requested {requested}, available {available}")]
    Exhausted { requested: usize, available: usize },

    #[error("dependency failure: {0}")]
    Dependency(String),

    #[error("internal invariant violation: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Error::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        log::error!("internal invariant violation: {msg}");
        Error::Internal(msg)
    }

    /// True for errors `retry::with_conflict_retry` is allowed to retry.
    pub fn is_retryable_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
