use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::machine::{advance, EngagementState, ReplyEvidence, Transition};
use super::notify::{AuthoringRequest, Mailer, MessageAuthor, NotifyError, ReplyCheck, ReplyProbe};
use super::risk::{GhostRisk, RiskBand};
use super::templates::{
    hr_alert, template_for, timeline, EngagementMessage, EngagementStage, EngagementTimeline,
    MessageSource,
};
use crate::workflows::pipeline::{
    Candidate, CandidateFailure, CandidateField, CandidateStore, CandidateUpdate, StoreError,
};

/// Operator settings for the engagement machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementPolicy {
    pub response_window_minutes: u32,
    pub hr_email: String,
    pub company_name: String,
}

impl Default for EngagementPolicy {
    fn default() -> Self {
        Self {
            response_window_minutes: 120,
            hr_email: "hr@example.com".to_string(),
            company_name: "TechCorp".to_string(),
        }
    }
}

/// Per-tick overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickOptions {
    #[serde(default)]
    pub alerts_paused: bool,
    #[serde(default)]
    pub window_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateTick {
    pub email: String,
    pub name: String,
    pub from: EngagementState,
    pub to: EngagementState,
    pub risk_before: GhostRisk,
    pub risk_after: GhostRisk,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskEntry {
    pub email: String,
    pub name: String,
    pub risk: GhostRisk,
}

impl RiskEntry {
    fn of(candidate: &Candidate, risk: GhostRisk) -> Self {
        Self {
            email: candidate.email.clone(),
            name: candidate.name.clone(),
            risk,
        }
    }
}

/// What happened to the consolidated HR alert during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AlertOutcome {
    NotNeeded,
    AlreadyAlerted,
    Sent { recipients: Vec<String> },
    Suppressed { recipients: Vec<String> },
    Failed { recipients: Vec<String>, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub candidates: Vec<CandidateTick>,
    pub waiting: Vec<String>,
    pub responding: Vec<String>,
    pub silent: Vec<String>,
    pub high_risk: Vec<RiskEntry>,
    pub alert: AlertOutcome,
    pub failures: Vec<CandidateFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactReport {
    pub contacted: Vec<String>,
    pub failures: Vec<CandidateFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackingResetReport {
    pub cleared: Vec<String>,
    pub failures: Vec<CandidateFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedMessage {
    pub stage: EngagementStage,
    pub source: MessageSource,
    pub message: EngagementMessage,
}

/// Read-only engagement view for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngagementOverview {
    pub email: String,
    pub name: String,
    pub role: String,
    pub state: EngagementState,
    pub stored_risk: GhostRisk,
    pub displayed_risk: GhostRisk,
    pub band: RiskBand,
    pub days_into_notice: u32,
    pub stage: EngagementStage,
    pub message: EngagementMessage,
    pub timeline: EngagementTimeline,
}

/// Ghost-risk engagement for candidates in their notice period.
pub struct EngagementService<S, M, P> {
    store: Arc<S>,
    mailer: Arc<M>,
    replies: Arc<P>,
    author: Option<Arc<dyn MessageAuthor>>,
    policy: EngagementPolicy,
}

impl<S, M, P> EngagementService<S, M, P>
where
    S: CandidateStore + 'static,
    M: Mailer + 'static,
    P: ReplyProbe + 'static,
{
    pub fn new(store: Arc<S>, mailer: Arc<M>, replies: Arc<P>, policy: EngagementPolicy) -> Self {
        Self {
            store,
            mailer,
            replies,
            author: None,
            policy,
        }
    }

    pub fn with_author(mut self, author: Arc<dyn MessageAuthor>) -> Self {
        self.author = Some(author);
        self
    }

    pub fn policy(&self) -> &EngagementPolicy {
        &self.policy
    }

    pub fn has_author(&self) -> bool {
        self.author.is_some()
    }

    /// Candidates currently serving their notice period, in store order.
    pub fn notice_period(&self) -> Result<Vec<Candidate>, EngagementError> {
        Ok(self
            .store
            .get_all_candidates()?
            .into_iter()
            .filter(Candidate::in_notice_period)
            .collect())
    }

    pub fn overview(
        &self,
        email: &str,
        days_into_notice: u32,
    ) -> Result<EngagementOverview, EngagementError> {
        let candidate = self.notice_candidate(email)?;
        let stage = EngagementStage::for_day(days_into_notice);
        let displayed_risk = candidate.ghost_risk.displayed(days_into_notice);

        Ok(EngagementOverview {
            message: template_for(stage, &candidate),
            email: candidate.email,
            name: candidate.name,
            role: candidate.role,
            state: candidate.engagement,
            stored_risk: candidate.ghost_risk,
            displayed_risk,
            band: displayed_risk.band(),
            days_into_notice,
            stage,
            timeline: timeline(days_into_notice),
        })
    }

    /// Message for the candidate's day bucket. Falls back to the template when no author
    /// is configured or authoring fails.
    pub fn compose(
        &self,
        candidate: &Candidate,
        days_into_notice: u32,
        use_author: bool,
    ) -> ComposedMessage {
        let stage = EngagementStage::for_day(days_into_notice);

        if use_author {
            if let Some(author) = &self.author {
                let request = AuthoringRequest {
                    name: candidate.name.clone(),
                    role: candidate.role.clone(),
                    day_number: days_into_notice,
                    company: self.policy.company_name.clone(),
                };
                match author.generate_message(&request) {
                    Ok(message) => {
                        return ComposedMessage {
                            stage,
                            source: MessageSource::Authored,
                            message,
                        }
                    }
                    Err(error) => {
                        tracing::warn!(email = %candidate.email, %error, "authoring failed, using template");
                    }
                }
            }
        }

        ComposedMessage {
            stage,
            source: MessageSource::Template,
            message: template_for(stage, candidate),
        }
    }

    /// Send the day-bucket message to one candidate. An uncontacted candidate is
    /// marked `Emailed` once the send succeeds.
    pub fn send_engagement(
        &self,
        email: &str,
        days_into_notice: u32,
        use_author: bool,
    ) -> Result<ComposedMessage, EngagementError> {
        let candidate = self.notice_candidate(email)?;
        let composed = self.compose(&candidate, days_into_notice, use_author);

        self.mailer.send_message(
            &candidate.email,
            &composed.message.subject,
            &composed.message.body,
        )?;

        if !candidate.engagement.is_contacted() {
            self.write_state(&candidate, EngagementState::Emailed, candidate.ghost_risk)?;
        }

        Ok(composed)
    }

    /// Manual reply check. Never changes state.
    pub fn check_reply(
        &self,
        email: &str,
        window_minutes: Option<u32>,
    ) -> Result<ReplyCheck, EngagementError> {
        let candidate = self.notice_candidate(email)?;
        let window = window_minutes.unwrap_or(self.policy.response_window_minutes);
        Ok(self.replies.check_reply(&candidate.email, window)?)
    }

    /// Send the welcome template to every notice-period candidate not yet contacted.
    pub fn contact_pending(&self) -> Result<ContactReport, EngagementError> {
        let mut report = ContactReport::default();

        for candidate in self.notice_period()? {
            if candidate.engagement.is_contacted() {
                continue;
            }

            let message = template_for(EngagementStage::Welcome, &candidate);
            let result = self
                .mailer
                .send_message(&candidate.email, &message.subject, &message.body)
                .map_err(EngagementError::from)
                .and_then(|()| {
                    self.write_state(&candidate, EngagementState::Emailed, candidate.ghost_risk)
                });

            match result {
                Ok(()) => {
                    tracing::info!(email = %candidate.email, "welcome email sent");
                    report.contacted.push(candidate.email);
                }
                Err(error) => {
                    tracing::warn!(email = %candidate.email, %error, "initial contact failed");
                    report.failures.push(CandidateFailure::new(candidate.email, &error));
                }
            }
        }

        Ok(report)
    }

    /// One monitor tick over every notice-period candidate, in store order.
    pub fn tick(&self, options: TickOptions) -> Result<TickReport, EngagementError> {
        let window = options
            .window_minutes
            .unwrap_or(self.policy.response_window_minutes);

        let mut report = TickReport {
            candidates: Vec::new(),
            waiting: Vec::new(),
            responding: Vec::new(),
            silent: Vec::new(),
            high_risk: Vec::new(),
            alert: AlertOutcome::NotNeeded,
            failures: Vec::new(),
        };
        let mut pending_alerts: Vec<(Candidate, Transition)> = Vec::new();

        for candidate in self.notice_period()? {
            if !candidate.engagement.is_contacted() {
                report.waiting.push(candidate.name.clone());
                let transition =
                    advance(candidate.engagement, candidate.ghost_risk, &ReplyEvidence::NoReply);
                if transition.risk_after.exceeds_alert_threshold() {
                    report.high_risk.push(RiskEntry::of(&candidate, transition.risk_after));
                }
                if transition.needs_alert {
                    pending_alerts.push((candidate, transition));
                }
                continue;
            }

            let evidence = match self.replies.check_reply(&candidate.email, window) {
                Ok(check) if check.found => ReplyEvidence::Replied,
                Ok(_) => ReplyEvidence::NoReply,
                Err(error) => {
                    tracing::warn!(email = %candidate.email, %error, "reply check failed, treating as no reply");
                    ReplyEvidence::CheckFailed(error.to_string())
                }
            };
            let transition = advance(candidate.engagement, candidate.ghost_risk, &evidence);

            if let Err(error) = self.write_state(&candidate, transition.to, transition.risk_after) {
                tracing::warn!(email = %candidate.email, %error, "engagement update failed");
                report
                    .failures
                    .push(CandidateFailure::new(candidate.email.clone(), &error));
                continue;
            }

            tracing::debug!(
                email = %candidate.email,
                from = %transition.from,
                to = %transition.to,
                risk = transition.risk_after.value(),
                "engagement advanced"
            );

            if evidence.replied() {
                report.responding.push(candidate.name.clone());
            } else {
                report.silent.push(candidate.name.clone());
            }
            if transition.risk_after.exceeds_alert_threshold() {
                report.high_risk.push(RiskEntry::of(&candidate, transition.risk_after));
            }

            report.candidates.push(CandidateTick {
                email: candidate.email.clone(),
                name: candidate.name.clone(),
                from: transition.from,
                to: transition.to,
                risk_before: transition.risk_before,
                risk_after: transition.risk_after,
                reply_error: match &evidence {
                    ReplyEvidence::CheckFailed(error) => Some(error.clone()),
                    _ => None,
                },
            });

            if transition.needs_alert {
                pending_alerts.push((candidate, transition));
            }
        }

        report.alert = if !pending_alerts.is_empty() {
            self.escalate(&pending_alerts, options.alerts_paused, &mut report.failures)
        } else if report.high_risk.is_empty() {
            AlertOutcome::NotNeeded
        } else {
            AlertOutcome::AlreadyAlerted
        };

        Ok(report)
    }

    /// Clear engagement tracking for every notice-period candidate. A failed write is
    /// reported and the remaining candidates are still cleared.
    pub fn reset_tracking(&self) -> Result<TrackingResetReport, EngagementError> {
        let mut report = TrackingResetReport::default();
        for candidate in self.notice_period()? {
            if candidate.engagement == EngagementState::AwaitingFirstContact {
                continue;
            }
            match self.write_state(
                &candidate,
                EngagementState::AwaitingFirstContact,
                candidate.ghost_risk,
            ) {
                Ok(()) => report.cleared.push(candidate.email),
                Err(error) => {
                    tracing::warn!(email = %candidate.email, %error, "tracking reset failed");
                    report
                        .failures
                        .push(CandidateFailure::new(candidate.email, &error));
                }
            }
        }
        tracing::info!(
            cleared = report.cleared.len(),
            failed = report.failures.len(),
            "engagement tracking reset"
        );
        Ok(report)
    }

    fn escalate(
        &self,
        pending: &[(Candidate, Transition)],
        paused: bool,
        failures: &mut Vec<CandidateFailure>,
    ) -> AlertOutcome {
        let recipients: Vec<String> = pending
            .iter()
            .map(|(candidate, _)| candidate.email.clone())
            .collect();

        let outcome = if paused {
            tracing::info!(count = pending.len(), "hr alert suppressed while paused");
            AlertOutcome::Suppressed {
                recipients: recipients.clone(),
            }
        } else {
            let entries: Vec<(String, u8)> = pending
                .iter()
                .map(|(candidate, transition)| {
                    (candidate.name.clone(), transition.risk_after.value())
                })
                .collect();
            let message = hr_alert(&entries);

            match self
                .mailer
                .send_message(&self.policy.hr_email, &message.subject, &message.body)
            {
                Ok(()) => {
                    tracing::info!(count = pending.len(), hr = %self.policy.hr_email, "hr alert dispatched");
                    AlertOutcome::Sent {
                        recipients: recipients.clone(),
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "hr alert failed, will retry next tick");
                    return AlertOutcome::Failed {
                        recipients,
                        error: error.to_string(),
                    };
                }
            }
        };

        for (candidate, transition) in pending {
            if let Err(error) =
                self.write_state(candidate, transition.alerted_state(), transition.risk_after)
            {
                tracing::warn!(email = %candidate.email, %error, "failed to mark candidate alerted");
                failures.push(CandidateFailure::new(candidate.email.clone(), &error));
            }
        }

        outcome
    }

    fn notice_candidate(&self, email: &str) -> Result<Candidate, EngagementError> {
        let candidate = self.store.find_candidate(email)?;
        if !candidate.in_notice_period() {
            return Err(EngagementError::NotInNoticePeriod(candidate.email));
        }
        Ok(candidate)
    }

    fn write_state(
        &self,
        candidate: &Candidate,
        state: EngagementState,
        risk: GhostRisk,
    ) -> Result<(), EngagementError> {
        let update = CandidateUpdate::status(candidate.status)
            .set(CandidateField::GhostRisk, risk.to_string())
            .set(CandidateField::Engagement, state.column_value());
        self.store.update_candidate(&candidate.email, &update)?;
        Ok(())
    }
}

/// Error raised by the engagement service.
#[derive(Debug, thiserror::Error)]
pub enum EngagementError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error("candidate {0} is not in the notice period")]
    NotInNoticePeriod(String),
}
