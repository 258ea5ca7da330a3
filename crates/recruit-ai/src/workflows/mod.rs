pub mod engagement;
pub mod pipeline;
pub mod scheduling;
pub mod sheets;

pub use engagement::{EngagementService, GhostRisk};
pub use pipeline::{Candidate, CandidateStatus, CandidateStore, PipelineService};
pub use scheduling::InterviewScheduler;
pub use sheets::SheetCandidateStore;
