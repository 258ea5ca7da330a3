use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use recruit_ai::config::AppConfig;
use recruit_ai::error::AppError;
use recruit_ai::workflows::engagement::{
    EngagementError, EngagementPolicy, EngagementService, ImapReplyProbe, Mailer, MessageAuthor,
    NotifyError, OpenAiCompatibleAuthor, ReplyCheck, ReplyProbe, SmtpMailer,
};
use recruit_ai::workflows::pipeline::{
    Candidate, CandidateStatus, CandidateStore, CandidateUpdate, PipelineService, StoreError,
};
use recruit_ai::workflows::scheduling::{InterviewScheduler, WriteGovernor};
use recruit_ai::workflows::sheets::{
    DriveConnector, DriveSheetBackend, FileSheetBackend, SheetCandidateStore,
};
use serde::Deserialize;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryCandidateStore {
    candidates: Arc<Mutex<Vec<Candidate>>>,
}

impl InMemoryCandidateStore {
    pub(crate) fn with(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates: Arc::new(Mutex::new(candidates)),
        }
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, Vec<Candidate>> {
        self.candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for InMemoryCandidateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCandidateStore")
            .field("candidates", &self.guard().len())
            .finish()
    }
}

impl CandidateStore for InMemoryCandidateStore {
    fn get_all_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        Ok(self.guard().clone())
    }

    fn update_candidate(&self, email: &str, update: &CandidateUpdate) -> Result<(), StoreError> {
        let mut guard = self.guard();
        let candidate = guard
            .iter_mut()
            .find(|candidate| candidate.email.eq_ignore_ascii_case(email))
            .ok_or_else(|| StoreError::NotFound(email.to_string()))?;
        candidate.apply(update);
        Ok(())
    }

    fn add_candidate(&self, candidate: Candidate) -> Result<(), StoreError> {
        let mut guard = self.guard();
        if guard
            .iter()
            .any(|existing| existing.email.eq_ignore_ascii_case(&candidate.email))
        {
            return Err(StoreError::Conflict(candidate.email));
        }
        guard.push(candidate);
        Ok(())
    }
}

/// Store selected at startup: the Drive-hosted sheet, then a local CSV sheet, otherwise
/// a seeded in-memory roster.
#[derive(Debug)]
pub(crate) enum CandidateBackend {
    Memory(InMemoryCandidateStore),
    Sheet(SheetCandidateStore<FileSheetBackend>),
    Drive(SheetCandidateStore<DriveSheetBackend<DriveConnector>>),
}

impl CandidateStore for CandidateBackend {
    fn get_all_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        match self {
            Self::Memory(store) => store.get_all_candidates(),
            Self::Sheet(store) => store.get_all_candidates(),
            Self::Drive(store) => store.get_all_candidates(),
        }
    }

    fn update_candidate(&self, email: &str, update: &CandidateUpdate) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.update_candidate(email, update),
            Self::Sheet(store) => store.update_candidate(email, update),
            Self::Drive(store) => store.update_candidate(email, update),
        }
    }

    fn add_candidate(&self, candidate: Candidate) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.add_candidate(candidate),
            Self::Sheet(store) => store.add_candidate(candidate),
            Self::Drive(store) => store.add_candidate(candidate),
        }
    }
}

/// One message handed to the mail transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SentMail {
    pub(crate) to: String,
    pub(crate) subject: String,
    pub(crate) body: String,
}

/// Mailer used when SMTP is not configured: messages are logged and kept in an outbox.
#[derive(Default, Clone)]
pub(crate) struct OutboxMailer {
    sent: Arc<Mutex<Vec<SentMail>>>,
}

impl OutboxMailer {
    pub(crate) fn sent(&self) -> Vec<SentMail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Mailer for OutboxMailer {
    fn send_message(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        tracing::info!(%to, %subject, "outbox message recorded");
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}

pub(crate) enum OutboundMailer {
    Smtp(SmtpMailer),
    Outbox(OutboxMailer),
}

impl Mailer for OutboundMailer {
    fn send_message(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        match self {
            Self::Smtp(mailer) => mailer.send_message(to, subject, body),
            Self::Outbox(mailer) => mailer.send_message(to, subject, body),
        }
    }
}

/// Replies older than this are dropped as new ones arrive.
const INBOX_RETENTION_MINUTES: u32 = 24 * 60;

/// Replies delivered by the inbound-mail webhook. Keeps only replies inside the
/// retention window.
#[derive(Clone)]
pub(crate) struct InboxReplyProbe {
    replies: Arc<Mutex<Vec<(String, DateTime<Utc>)>>>,
    retention: Duration,
}

impl Default for InboxReplyProbe {
    fn default() -> Self {
        Self::retaining(INBOX_RETENTION_MINUTES)
    }
}

impl InboxReplyProbe {
    pub(crate) fn retaining(minutes: u32) -> Self {
        Self {
            replies: Arc::default(),
            retention: Duration::minutes(i64::from(minutes)),
        }
    }

    pub(crate) fn record_reply(&self, from: &str, received_at: DateTime<Utc>) {
        tracing::info!(%from, %received_at, "candidate reply recorded");
        self.record_at(from, received_at, Utc::now());
    }

    fn record_at(&self, from: &str, received_at: DateTime<Utc>, now: DateTime<Utc>) {
        let cutoff = now - self.retention;
        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        replies.retain(|(_, at)| *at >= cutoff);
        if received_at >= cutoff {
            replies.push((from.trim().to_ascii_lowercase(), received_at));
        }
    }

    fn retained(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn check_at(&self, from_address: &str, since_minutes: u32, now: DateTime<Utc>) -> ReplyCheck {
        let from = from_address.trim().to_ascii_lowercase();
        let cutoff = now - Duration::minutes(i64::from(since_minutes));
        let latest = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(sender, received_at)| *sender == from && *received_at >= cutoff)
            .map(|(_, received_at)| *received_at)
            .max();

        match latest {
            Some(received_at) => ReplyCheck::found(format!("reply received at {received_at}")),
            None => ReplyCheck::missing(format!("no reply in the last {since_minutes} minutes")),
        }
    }
}

impl std::fmt::Debug for InboxReplyProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboxReplyProbe")
            .field("replies", &self.retained())
            .field("retention", &self.retention)
            .finish()
    }
}

impl ReplyProbe for InboxReplyProbe {
    fn check_reply(
        &self,
        from_address: &str,
        since_minutes: u32,
    ) -> Result<ReplyCheck, NotifyError> {
        Ok(self.check_at(from_address, since_minutes, Utc::now()))
    }
}

/// Reply detection: webhook deliveries first, then the IMAP mailbox when mail is
/// configured.
pub(crate) struct ReplySources {
    inbox: InboxReplyProbe,
    imap: Option<ImapReplyProbe>,
}

impl ReplyProbe for ReplySources {
    fn check_reply(
        &self,
        from_address: &str,
        since_minutes: u32,
    ) -> Result<ReplyCheck, NotifyError> {
        let delivered = self.inbox.check_reply(from_address, since_minutes)?;
        match &self.imap {
            Some(imap) if !delivered.found => imap.check_reply(from_address, since_minutes),
            _ => Ok(delivered),
        }
    }
}

pub(crate) type Engagement = EngagementService<CandidateBackend, OutboundMailer, ReplySources>;

/// Every workflow service wired against the configured collaborators.
pub(crate) struct Services {
    pub(crate) pipeline: Arc<PipelineService<CandidateBackend>>,
    pub(crate) scheduler: Arc<InterviewScheduler<CandidateBackend>>,
    pub(crate) engagement: Arc<Engagement>,
    pub(crate) inbox: InboxReplyProbe,
    pub(crate) outbox: Option<OutboxMailer>,
}

impl Services {
    fn assemble(
        store: CandidateBackend,
        governor: WriteGovernor,
        mailer: OutboundMailer,
        imap: Option<ImapReplyProbe>,
        policy: EngagementPolicy,
        author: Option<Arc<dyn MessageAuthor>>,
    ) -> Self {
        let store = Arc::new(store);
        let governor = Arc::new(governor);
        let outbox = match &mailer {
            OutboundMailer::Outbox(outbox) => Some(outbox.clone()),
            OutboundMailer::Smtp(_) => None,
        };
        let inbox = InboxReplyProbe::retaining(
            policy.response_window_minutes.max(INBOX_RETENTION_MINUTES),
        );
        let replies = ReplySources {
            inbox: inbox.clone(),
            imap,
        };

        let mut engagement =
            EngagementService::new(store.clone(), Arc::new(mailer), Arc::new(replies), policy);
        if let Some(author) = author {
            engagement = engagement.with_author(author);
        }

        Self {
            pipeline: Arc::new(PipelineService::new(store.clone(), governor.clone())),
            scheduler: Arc::new(InterviewScheduler::new(store, governor)),
            engagement: Arc::new(engagement),
            inbox,
            outbox,
        }
    }

    /// Seeded in-memory roster, outbox mail and no write throttling.
    pub(crate) fn in_memory(policy: EngagementPolicy) -> Self {
        Self::assemble(
            CandidateBackend::Memory(InMemoryCandidateStore::with(demo_roster())),
            WriteGovernor::unthrottled(),
            OutboundMailer::Outbox(OutboxMailer::default()),
            None,
            policy,
            None,
        )
    }

    /// Builds blocking HTTP, SMTP, IMAP and Drive clients; call from a blocking context.
    pub(crate) fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let store = match (&config.storage.drive, &config.storage.sheet_path) {
            (Some(drive), _) => {
                tracing::info!(file_id = %drive.file_id, "using Drive-hosted candidate sheet");
                let backend = DriveSheetBackend::from_service_account(
                    &drive.service_account_key,
                    drive.file_id.clone(),
                )?;
                CandidateBackend::Drive(SheetCandidateStore::new(backend))
            }
            (None, Some(path)) => {
                tracing::info!(path = %path.display(), "using candidate sheet");
                CandidateBackend::Sheet(SheetCandidateStore::new(FileSheetBackend::new(path)))
            }
            (None, None) => {
                tracing::info!("no candidate sheet configured, using demo roster in memory");
                CandidateBackend::Memory(InMemoryCandidateStore::with(demo_roster()))
            }
        };

        let (mailer, imap) = match &config.mail {
            Some(mail) => {
                let smtp = SmtpMailer::new(mail).map_err(EngagementError::from)?;
                let imap = ImapReplyProbe::new(mail).map_err(EngagementError::from)?;
                tracing::info!(host = %mail.imap_host, "checking replies over IMAP");
                (OutboundMailer::Smtp(smtp), Some(imap))
            }
            None => {
                tracing::warn!("SMTP not configured, outgoing mail goes to the log");
                (OutboundMailer::Outbox(OutboxMailer::default()), None)
            }
        };

        let author = match &config.author {
            Some(author) => {
                let author: Arc<dyn MessageAuthor> =
                    Arc::new(OpenAiCompatibleAuthor::new(author).map_err(EngagementError::from)?);
                Some(author)
            }
            None => None,
        };

        Ok(Self::assemble(
            store,
            WriteGovernor::new(config.storage.write_interval),
            mailer,
            imap,
            config.engagement.clone(),
            author,
        ))
    }
}

pub(crate) fn demo_roster() -> Vec<Candidate> {
    let entries = [
        ("Arjun Sharma", "arjun.sharma@example.com", "Backend Engineer", CandidateStatus::Screening),
        ("Priya Nair", "priya.nair@example.com", "Data Engineer", CandidateStatus::Screening),
        ("Rahul Verma", "rahul.verma@example.com", "Frontend Engineer", CandidateStatus::Screening),
        ("Sneha Patel", "sneha.patel@example.com", "Product Designer", CandidateStatus::L1Done),
        ("Vikram Singh", "vikram.singh@example.com", "DevOps Engineer", CandidateStatus::OfferSent),
        ("Ananya Gupta", "ananya.gupta@example.com", "QA Engineer", CandidateStatus::OfferAccepted),
    ];

    entries
        .into_iter()
        .map(|(name, email, role, status)| {
            let mut candidate = Candidate::new(email, name, role);
            candidate.status = status;
            candidate.applied_date = Some("2025-09-22".to_string());
            candidate
        })
        .collect()
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[derive(Debug, Deserialize)]
pub(crate) struct InboundReply {
    pub(crate) from: String,
    #[serde(default)]
    pub(crate) received_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbox_honours_the_window() {
        let replies = InboxReplyProbe::default();
        let now = Utc::now();
        replies.record_reply("Priya.Nair@example.com", now - Duration::minutes(90));

        assert!(replies.check_at("priya.nair@example.com", 120, now).found);
        assert!(!replies.check_at("priya.nair@example.com", 60, now).found);
        assert!(!replies.check_at("arjun.sharma@example.com", 120, now).found);
    }

    #[test]
    fn inbox_drops_replies_past_retention() {
        let inbox = InboxReplyProbe::retaining(120);
        let now = Utc::now();
        inbox.record_at("arjun.sharma@example.com", now - Duration::minutes(150), now);
        assert_eq!(inbox.retained(), 0);

        inbox.record_at("priya.nair@example.com", now - Duration::minutes(100), now);
        inbox.record_at("ananya.gupta@example.com", now, now + Duration::minutes(30));
        assert_eq!(inbox.retained(), 1);
        assert!(inbox.check_at("ananya.gupta@example.com", 5, now).found);
        assert!(!inbox.check_at("priya.nair@example.com", 120, now).found);
    }

    #[test]
    fn reply_sources_without_imap_use_webhook_deliveries() {
        let inbox = InboxReplyProbe::default();
        let sources = ReplySources {
            inbox: inbox.clone(),
            imap: None,
        };
        assert!(!sources.check_reply("ananya.gupta@example.com", 60).expect("check").found);

        inbox.record_reply("ananya.gupta@example.com", Utc::now());
        assert!(sources.check_reply("ananya.gupta@example.com", 60).expect("check").found);
    }

    #[test]
    fn memory_store_reports_missing_candidates() {
        let store = InMemoryCandidateStore::with(demo_roster());
        let update = CandidateUpdate::status(CandidateStatus::Joined);
        assert!(matches!(
            store.update_candidate("nobody@example.com", &update),
            Err(StoreError::NotFound(_))
        ));
        store
            .update_candidate("ANANYA.GUPTA@example.com", &update)
            .expect("case-insensitive update");
    }

    #[test]
    fn outbox_keeps_every_message() {
        let outbox = OutboxMailer::default();
        outbox
            .send_message("hr@example.com", "subject", "body")
            .expect("send");
        assert_eq!(outbox.sent().len(), 1);
        assert_eq!(outbox.sent()[0].to, "hr@example.com");
    }

    #[test]
    fn parse_date_reports_bad_input() {
        assert!(parse_date("2025-10-06").is_ok());
        assert!(parse_date("06/10/2025").is_err());
    }
}
