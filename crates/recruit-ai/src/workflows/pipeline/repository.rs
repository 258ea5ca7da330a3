use serde::Serialize;

use super::domain::{Candidate, CandidateUpdate};

/// Storage abstraction over the recruitment sheet, keyed by candidate email.
///
/// Implementations must not block indefinitely: every call either completes or
/// fails with a [`StoreError`].
pub trait CandidateStore: Send + Sync {
    /// Full snapshot in sheet order.
    fn get_all_candidates(&self) -> Result<Vec<Candidate>, StoreError>;

    /// Single-record partial update. Applying the same update twice leaves the
    /// record unchanged after the first call.
    fn update_candidate(&self, email: &str, update: &CandidateUpdate) -> Result<(), StoreError>;

    /// Append a new row. Fails with [`StoreError::Conflict`] when the email exists.
    fn add_candidate(&self, candidate: Candidate) -> Result<(), StoreError>;

    /// Look up one candidate by email (case-insensitive) from a fresh snapshot.
    fn find_candidate(&self, email: &str) -> Result<Candidate, StoreError> {
        self.get_all_candidates()?
            .into_iter()
            .find(|candidate| candidate.email.eq_ignore_ascii_case(email.trim()))
            .ok_or_else(|| StoreError::NotFound(email.to_string()))
    }
}

/// A single-record write that failed inside a batch. The batch carries on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateFailure {
    pub email: String,
    pub error: String,
}

impl CandidateFailure {
    pub fn new(email: impl Into<String>, error: &impl std::fmt::Display) -> Self {
        Self {
            email: email.into(),
            error: error.to_string(),
        }
    }
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("candidate {0} not found")]
    NotFound(String),
    #[error("candidate {0} already exists")]
    Conflict(String),
    #[error("store write rate limit exceeded")]
    RateLimited,
    #[error("malformed candidate sheet: {0}")]
    Malformed(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<csv::Error> for StoreError {
    fn from(err: csv::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}
