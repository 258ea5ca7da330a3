//! Candidate records, pipeline statuses, and the store contract backing them.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Candidate, CandidateField, CandidateStatus, CandidateUpdate, Round, RoundRecord,
    RoundResult, UnknownStatus,
};
pub use repository::{CandidateFailure, CandidateStore, StoreError};
pub use router::pipeline_router;
pub use service::{
    CandidateFilter, NewCandidate, PipelineError, PipelineService, PipelineSummary,
    ResetReport, RoundOutcome, StatusCount,
};
