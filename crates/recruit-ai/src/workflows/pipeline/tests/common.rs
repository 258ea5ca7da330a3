use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;

use crate::workflows::pipeline::{
    pipeline_router, Candidate, CandidateStatus, CandidateStore, CandidateUpdate,
    PipelineService, StoreError,
};
use crate::workflows::engagement::GhostRisk;
use crate::workflows::scheduling::WriteGovernor;

#[derive(Debug, Default)]
pub(super) struct MemoryStore {
    candidates: Mutex<Vec<Candidate>>,
    writes: Mutex<Vec<(String, CandidateUpdate)>>,
}

impl MemoryStore {
    pub(super) fn with(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates: Mutex::new(candidates),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn candidate(&self, email: &str) -> Candidate {
        self.candidates
            .lock()
            .expect("store mutex")
            .iter()
            .find(|candidate| candidate.email == email)
            .cloned()
            .expect("candidate present")
    }

    pub(super) fn writes(&self) -> Vec<(String, CandidateUpdate)> {
        self.writes.lock().expect("writes mutex").clone()
    }
}

impl CandidateStore for MemoryStore {
    fn get_all_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        Ok(self.candidates.lock().expect("store mutex").clone())
    }

    fn update_candidate(&self, email: &str, update: &CandidateUpdate) -> Result<(), StoreError> {
        let mut guard = self.candidates.lock().expect("store mutex");
        let candidate = guard
            .iter_mut()
            .find(|candidate| candidate.email == email)
            .ok_or_else(|| StoreError::NotFound(email.to_string()))?;
        candidate.apply(update);
        self.writes
            .lock()
            .expect("writes mutex")
            .push((email.to_string(), update.clone()));
        Ok(())
    }

    fn add_candidate(&self, candidate: Candidate) -> Result<(), StoreError> {
        let mut guard = self.candidates.lock().expect("store mutex");
        if guard.iter().any(|existing| existing.email == candidate.email) {
            return Err(StoreError::Conflict(candidate.email));
        }
        guard.push(candidate);
        Ok(())
    }
}

/// Store whose writes fail for one email.
#[derive(Debug)]
pub(super) struct FlakyStore {
    pub(super) inner: MemoryStore,
    pub(super) failing_email: String,
}

impl CandidateStore for FlakyStore {
    fn get_all_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        self.inner.get_all_candidates()
    }

    fn update_candidate(&self, email: &str, update: &CandidateUpdate) -> Result<(), StoreError> {
        if email == self.failing_email {
            return Err(StoreError::RateLimited);
        }
        self.inner.update_candidate(email, update)
    }

    fn add_candidate(&self, candidate: Candidate) -> Result<(), StoreError> {
        self.inner.add_candidate(candidate)
    }
}

pub(super) fn candidate(email: &str, name: &str, status: CandidateStatus) -> Candidate {
    let mut candidate = Candidate::new(email, name, "Backend Engineer");
    candidate.status = status;
    candidate
}

pub(super) fn roster() -> Vec<Candidate> {
    let mut scheduled = candidate("arjun@example.com", "Arjun Sharma", CandidateStatus::L2Scheduled);
    scheduled.l1.date = Some("2025-10-06".to_string());
    scheduled.l1.time = Some("9:00 AM".to_string());
    scheduled.l1.result = Some("Pass".to_string());
    scheduled.l2.date = Some("2025-10-09".to_string());
    scheduled.l2.time = Some("2:00 PM".to_string());
    scheduled.ghost_risk = GhostRisk::new(70);

    let mut data = candidate("priya@example.com", "Priya Nair", CandidateStatus::OfferSent);
    data.role = "Data Engineer".to_string();

    vec![
        candidate("meera@example.com", "Meera Iyer", CandidateStatus::Screening),
        scheduled,
        data,
        candidate("rahul@example.com", "Rahul Verma", CandidateStatus::Joined),
        candidate("kiran@example.com", "Kiran Rao", CandidateStatus::Rejected),
    ]
}

pub(super) fn build_service(
    candidates: Vec<Candidate>,
) -> (Arc<PipelineService<MemoryStore>>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with(candidates));
    let service = Arc::new(PipelineService::new(
        store.clone(),
        Arc::new(WriteGovernor::unthrottled()),
    ));
    (service, store)
}

pub(super) fn router_with_service(service: Arc<PipelineService<MemoryStore>>) -> axum::Router {
    pipeline_router(service)
}

pub(super) async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}
