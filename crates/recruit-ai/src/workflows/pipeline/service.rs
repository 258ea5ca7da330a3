use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{
    Candidate, CandidateField, CandidateStatus, CandidateUpdate, Round, RoundResult,
};
use super::repository::{CandidateFailure, CandidateStore, StoreError};
use crate::workflows::scheduling::WriteGovernor;

/// Candidate list filter; `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFilter {
    #[serde(default)]
    pub status: Option<CandidateStatus>,
    #[serde(default)]
    pub role: Option<String>,
}

impl CandidateFilter {
    pub fn matches(&self, candidate: &Candidate) -> bool {
        let status_ok = self.status.map_or(true, |status| candidate.status == status);
        let role_ok = self
            .role
            .as_deref()
            .map(str::trim)
            .filter(|role| !role.is_empty())
            .map_or(true, |role| candidate.role.eq_ignore_ascii_case(role));
        status_ok && role_ok
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCandidate {
    pub email: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub applied_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: CandidateStatus,
    pub count: usize,
}

/// Headline pipeline counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub total: usize,
    pub screening: usize,
    pub interviewing: usize,
    pub offers: usize,
    pub by_status: Vec<StatusCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundOutcome {
    pub email: String,
    pub round: Round,
    pub result: RoundResult,
    pub status: CandidateStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    pub reset: Vec<String>,
    pub failures: Vec<CandidateFailure>,
}

/// Status bookkeeping for the recruitment pipeline.
pub struct PipelineService<S> {
    store: Arc<S>,
    governor: Arc<WriteGovernor>,
}

impl<S> PipelineService<S>
where
    S: CandidateStore + 'static,
{
    pub fn new(store: Arc<S>, governor: Arc<WriteGovernor>) -> Self {
        Self { store, governor }
    }

    pub fn list(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>, PipelineError> {
        Ok(self
            .store
            .get_all_candidates()?
            .into_iter()
            .filter(|candidate| filter.matches(candidate))
            .collect())
    }

    pub fn get(&self, email: &str) -> Result<Candidate, PipelineError> {
        Ok(self.store.find_candidate(email)?)
    }

    pub fn summary(&self) -> Result<PipelineSummary, PipelineError> {
        let candidates = self.store.get_all_candidates()?;
        let count = |status: CandidateStatus| {
            candidates
                .iter()
                .filter(|candidate| candidate.status == status)
                .count()
        };

        let by_status: Vec<StatusCount> = CandidateStatus::ordered()
            .into_iter()
            .map(|status| StatusCount {
                status,
                count: count(status),
            })
            .collect();

        Ok(PipelineSummary {
            total: candidates.len(),
            screening: count(CandidateStatus::Screening),
            interviewing: count(CandidateStatus::L1Scheduled)
                + count(CandidateStatus::L1Done)
                + count(CandidateStatus::L2Scheduled),
            offers: count(CandidateStatus::OfferSent) + count(CandidateStatus::OfferAccepted),
            by_status,
        })
    }

    /// Register a new candidate in `Screening`.
    pub fn add_candidate(&self, new: NewCandidate) -> Result<Candidate, PipelineError> {
        let email = new.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(PipelineError::InvalidInput(format!(
                "'{}' is not an email address",
                new.email
            )));
        }
        if new.name.trim().is_empty() {
            return Err(PipelineError::InvalidInput("name must not be empty".to_string()));
        }

        let mut candidate = Candidate::new(email, new.name.trim(), new.role.trim());
        candidate.applied_date = new
            .applied_date
            .map(|date| date.trim().to_string())
            .filter(|date| !date.is_empty());

        self.store.add_candidate(candidate.clone())?;
        tracing::info!(email = %candidate.email, "candidate added");
        Ok(candidate)
    }

    /// Manual status edit. Only forward moves along the pipeline are accepted.
    pub fn update_status(
        &self,
        email: &str,
        status: CandidateStatus,
    ) -> Result<Candidate, PipelineError> {
        let mut candidate = self.store.find_candidate(email)?;
        if !candidate.status.can_advance_to(status) {
            return Err(PipelineError::InvalidTransition {
                email: candidate.email,
                from: candidate.status,
                to: status,
            });
        }

        let update = CandidateUpdate::status(status);
        self.store.update_candidate(&candidate.email, &update)?;
        candidate.apply(&update);
        tracing::info!(email = %candidate.email, %status, "status updated");
        Ok(candidate)
    }

    /// Record an interview outcome for a candidate holding a slot in `round`.
    pub fn record_round_result(
        &self,
        round: Round,
        email: &str,
        passed: bool,
    ) -> Result<RoundOutcome, PipelineError> {
        let candidate = self.store.find_candidate(email)?;
        let (result, status) = if passed {
            (RoundResult::Pass, round.passed_status())
        } else {
            (RoundResult::Fail, CandidateStatus::Rejected)
        };

        if candidate.status != round.scheduled_status() {
            return Err(PipelineError::InvalidTransition {
                email: candidate.email,
                from: candidate.status,
                to: status,
            });
        }

        let update = CandidateUpdate::status(status).set(round.result_field(), result.label());
        self.store.update_candidate(&candidate.email, &update)?;
        tracing::info!(email = %candidate.email, %round, result = result.label(), "round result recorded");

        Ok(RoundOutcome {
            email: candidate.email,
            round,
            result,
            status,
        })
    }

    /// Accept or decline an outstanding offer. Acceptance starts a fresh
    /// engagement episode.
    pub fn record_offer_response(
        &self,
        email: &str,
        accepted: bool,
    ) -> Result<Candidate, PipelineError> {
        let mut candidate = self.store.find_candidate(email)?;
        let status = if accepted {
            CandidateStatus::OfferAccepted
        } else {
            CandidateStatus::OfferDeclined
        };

        if candidate.status != CandidateStatus::OfferSent {
            return Err(PipelineError::InvalidTransition {
                email: candidate.email,
                from: candidate.status,
                to: status,
            });
        }

        let mut update = CandidateUpdate::status(status);
        if accepted {
            update = update.clear(CandidateField::Engagement);
        }
        self.store.update_candidate(&candidate.email, &update)?;
        candidate.apply(&update);
        tracing::info!(email = %candidate.email, %status, "offer response recorded");
        Ok(candidate)
    }

    /// Demo reset of one candidate back to `Screening`.
    pub fn reset_candidate(&self, email: &str) -> Result<Candidate, PipelineError> {
        let mut candidate = self.store.find_candidate(email)?;
        let update = CandidateUpdate::reset_to_screening();
        self.store.update_candidate(&candidate.email, &update)?;
        candidate.apply(&update);
        tracing::info!(email = %candidate.email, "candidate reset to screening");
        Ok(candidate)
    }

    /// Demo reset of every in-flight candidate, paced by the write governor.
    pub fn reset_all(&self) -> Result<ResetReport, PipelineError> {
        let mut report = ResetReport::default();
        let update = CandidateUpdate::reset_to_screening();

        for candidate in self.store.get_all_candidates()? {
            if !candidate.status.is_resettable() {
                continue;
            }

            self.governor.throttle();
            match self.store.update_candidate(&candidate.email, &update) {
                Ok(()) => report.reset.push(candidate.email),
                Err(error) => {
                    tracing::warn!(email = %candidate.email, %error, "reset failed");
                    report
                        .failures
                        .push(CandidateFailure::new(candidate.email, &error));
                }
            }
        }

        tracing::info!(reset = report.reset.len(), "pipeline reset");
        Ok(report)
    }
}

/// Error raised by the pipeline service.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("candidate {email} cannot move from {from} to {to}")]
    InvalidTransition {
        email: String,
        from: CandidateStatus,
        to: CandidateStatus,
    },
    #[error("invalid candidate: {0}")]
    InvalidInput(String),
}
