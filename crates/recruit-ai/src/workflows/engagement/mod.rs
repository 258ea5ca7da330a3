//! Notice-period engagement: ghost-risk scoring, message selection, reply tracking,
//! and consolidated HR alerting for candidates who accepted an offer.

pub mod author;
pub mod inbox;
pub mod machine;
pub mod mailer;
pub mod monitor;
pub mod notify;
pub mod risk;
pub mod router;
pub mod service;
pub mod templates;

pub use author::OpenAiCompatibleAuthor;
pub use inbox::ImapReplyProbe;
pub use machine::{advance, EngagementState, ReplyEvidence, Transition};
pub use mailer::SmtpMailer;
pub use monitor::{
    run_monitor, MonitorLease, MonitorSettings, MonitorSummary, MonitorSwitch,
};
pub use notify::{AuthoringRequest, Mailer, MessageAuthor, NotifyError, ReplyCheck, ReplyProbe};
pub use risk::{time_bonus, GhostRisk, RiskBand};
pub use router::{engagement_router, EngagementApi};
pub use service::{
    AlertOutcome, CandidateTick, ComposedMessage, ContactReport,
    EngagementError, EngagementOverview, EngagementPolicy, EngagementService, RiskEntry,
    TickOptions, TickReport, TrackingResetReport,
};
pub use templates::{
    hr_alert, template_for, timeline, EngagementMessage, EngagementStage, EngagementTimeline,
    MessageSource, TimelineEntry,
};
