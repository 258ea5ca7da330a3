//! Notice-period engagement: tick transitions, HR escalation, outreach and the periodic
//! monitor, exercised through the public service facade.

mod common {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use recruit_ai::workflows::engagement::{
        AuthoringRequest, EngagementMessage, EngagementPolicy, EngagementService,
        EngagementState, GhostRisk, Mailer, MessageAuthor, NotifyError, ReplyCheck, ReplyProbe,
    };
    use recruit_ai::workflows::pipeline::{
        Candidate, CandidateStatus, CandidateStore, CandidateUpdate, StoreError,
    };

    pub(super) const HR: &str = "hr@example.com";

    #[derive(Debug, Default)]
    pub(super) struct MemoryStore {
        candidates: Mutex<Vec<Candidate>>,
        rejecting: Mutex<HashSet<String>>,
    }

    impl MemoryStore {
        pub(super) fn with(candidates: Vec<Candidate>) -> Self {
            Self {
                candidates: Mutex::new(candidates),
                ..Self::default()
            }
        }

        pub(super) fn reject_writes_for(&self, email: &str) {
            self.rejecting
                .lock()
                .expect("store mutex")
                .insert(email.to_string());
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
    }

    impl CandidateStore for MemoryStore {
        fn get_all_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
            Ok(self.candidates.lock().expect("store mutex").clone())
        }

        fn update_candidate(
            &self,
            email: &str,
            update: &CandidateUpdate,
        ) -> Result<(), StoreError> {
            if self.rejecting.lock().expect("store mutex").contains(email) {
                return Err(StoreError::RateLimited);
            }
            let mut guard = self.candidates.lock().expect("store mutex");
            let candidate = guard
                .iter_mut()
                .find(|candidate| candidate.email == email)
                .ok_or_else(|| StoreError::NotFound(email.to_string()))?;
            candidate.apply(update);
            Ok(())
        }

        fn add_candidate(&self, candidate: Candidate) -> Result<(), StoreError> {
            self.candidates
                .lock()
                .expect("store mutex")
                .push(candidate);
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    pub(super) struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
        failing: Mutex<HashSet<String>>,
    }

    impl RecordingMailer {
        pub(super) fn sent_to(&self, address: &str) -> usize {
            self.sent
                .lock()
                .expect("mailer mutex")
                .iter()
                .filter(|(to, _)| to == address)
                .count()
        }

        pub(super) fn subjects_to(&self, address: &str) -> Vec<String> {
            self.sent
                .lock()
                .expect("mailer mutex")
                .iter()
                .filter(|(to, _)| to == address)
                .map(|(_, subject)| subject.clone())
                .collect()
        }

        pub(super) fn fail_for(&self, address: &str) {
            self.failing
                .lock()
                .expect("mailer mutex")
                .insert(address.to_string());
        }

        pub(super) fn recover(&self) {
            self.failing.lock().expect("mailer mutex").clear();
        }
    }

    impl Mailer for RecordingMailer {
        fn send_message(&self, to: &str, subject: &str, _body: &str) -> Result<(), NotifyError> {
            if self.failing.lock().expect("mailer mutex").contains(to) {
                return Err(NotifyError::Transport("connection refused".to_string()));
            }
            self.sent
                .lock()
                .expect("mailer mutex")
                .push((to.to_string(), subject.to_string()));
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    pub(super) struct ScriptedInbox {
        replied: Mutex<HashSet<String>>,
        broken: Mutex<bool>,
    }

    impl ScriptedInbox {
        pub(super) fn reply_from(&self, email: &str) {
            self.replied
                .lock()
                .expect("replies mutex")
                .insert(email.to_string());
        }

        pub(super) fn go_quiet(&self) {
            self.replied.lock().expect("replies mutex").clear();
        }

        pub(super) fn break_transport(&self) {
            *self.broken.lock().expect("replies mutex") = true;
        }
    }

    impl ReplyProbe for ScriptedInbox {
        fn check_reply(
            &self,
            from_address: &str,
            since_minutes: u32,
        ) -> Result<ReplyCheck, NotifyError> {
            if *self.broken.lock().expect("replies mutex") {
                return Err(NotifyError::Transport("imap timeout".to_string()));
            }
            if self
                .replied
                .lock()
                .expect("replies mutex")
                .contains(from_address)
            {
                Ok(ReplyCheck::found("reply in inbox"))
            } else {
                Ok(ReplyCheck::missing(format!("nothing in {since_minutes} minutes")))
            }
        }
    }

    pub(super) struct FixedAuthor {
        pub(super) fail: bool,
    }

    impl MessageAuthor for FixedAuthor {
        fn generate_message(
            &self,
            request: &AuthoringRequest,
        ) -> Result<EngagementMessage, NotifyError> {
            if self.fail {
                return Err(NotifyError::Authoring("model unavailable".to_string()));
            }
            Ok(EngagementMessage {
                subject: format!("Day {} at {}", request.day_number, request.company),
                body: format!("Hi {}, see you soon.", request.name),
            })
        }
    }

    pub(super) type Service = EngagementService<MemoryStore, RecordingMailer, ScriptedInbox>;

    pub(super) struct Harness {
        pub(super) store: Arc<MemoryStore>,
        pub(super) mailer: Arc<RecordingMailer>,
        pub(super) replies: Arc<ScriptedInbox>,
        pub(super) service: Arc<Service>,
    }

    pub(super) fn notice(email: &str, name: &str, state: EngagementState, risk: i64) -> Candidate {
        let mut candidate = Candidate::new(email, name, "Backend Engineer");
        candidate.status = CandidateStatus::OfferAccepted;
        candidate.engagement = state;
        candidate.ghost_risk = GhostRisk::new(risk);
        candidate
    }

    pub(super) fn harness(candidates: Vec<Candidate>) -> Harness {
        let store = Arc::new(MemoryStore::with(candidates));
        let mailer = Arc::new(RecordingMailer::default());
        let replies = Arc::new(ScriptedInbox::default());
        let service = Arc::new(EngagementService::new(
            store.clone(),
            mailer.clone(),
            replies.clone(),
            EngagementPolicy {
                response_window_minutes: 120,
                hr_email: HR.to_string(),
                company_name: "TechCorp".to_string(),
            },
        ));
        Harness {
            store,
            mailer,
            replies,
            service,
        }
    }

    pub(super) fn harness_with_author(candidates: Vec<Candidate>, fail: bool) -> Harness {
        let mut harness = harness(candidates);
        let service = EngagementService::new(
            harness.store.clone(),
            harness.mailer.clone(),
            harness.replies.clone(),
            harness.service.policy().clone(),
        )
        .with_author(Arc::new(FixedAuthor { fail }));
        harness.service = Arc::new(service);
        harness
    }
}

use std::sync::Arc;
use std::time::Duration;

use common::*;
use recruit_ai::workflows::engagement::{
    run_monitor, AlertOutcome, EngagementError, EngagementStage, EngagementState, MessageSource,
    MonitorSettings, MonitorSwitch, TickOptions,
};
use recruit_ai::workflows::pipeline::{CandidateStatus, Candidate};

const ARJUN: &str = "arjun@example.com";
const PRIYA: &str = "priya@example.com";

fn paused() -> TickOptions {
    TickOptions {
        alerts_paused: true,
        window_minutes: None,
    }
}

#[test]
fn reply_resets_risk_to_baseline() {
    let h = harness(vec![notice(ARJUN, "Arjun Sharma", EngagementState::AtRisk, 70)]);
    h.replies.reply_from(ARJUN);

    let report = h.service.tick(TickOptions::default()).expect("tick");

    let arjun = h.store.candidate(ARJUN);
    assert_eq!(arjun.engagement, EngagementState::RespondingOk);
    assert_eq!(arjun.ghost_risk.value(), 10);
    assert_eq!(report.responding, vec!["Arjun Sharma".to_string()]);
    assert_eq!(report.alert, AlertOutcome::NotNeeded);
}

#[test]
fn silent_candidates_climb_monotonically_and_cap_at_100() {
    let h = harness(vec![notice(ARJUN, "Arjun Sharma", EngagementState::Emailed, 10)]);

    let mut observed = Vec::new();
    for _ in 0..6 {
        h.service.tick(paused()).expect("tick");
        observed.push(h.store.candidate(ARJUN).ghost_risk.value());
    }

    assert_eq!(observed, vec![30, 50, 70, 90, 100, 100]);
    assert!(observed.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn uncontacted_candidates_wait_with_risk_untouched() {
    let h = harness(vec![notice(
        ARJUN,
        "Arjun Sharma",
        EngagementState::AwaitingFirstContact,
        30,
    )]);

    let report = h.service.tick(TickOptions::default()).expect("tick");

    assert_eq!(report.waiting, vec!["Arjun Sharma".to_string()]);
    assert!(report.candidates.is_empty());
    assert_eq!(report.alert, AlertOutcome::NotNeeded);
    assert_eq!(h.store.candidate(ARJUN).ghost_risk.value(), 30);
    assert_eq!(h.mailer.sent_to(HR), 0);
}

#[test]
fn uncontacted_candidates_above_threshold_alert_hr_once() {
    let h = harness(vec![notice(
        ARJUN,
        "Arjun Sharma",
        EngagementState::AwaitingFirstContact,
        60,
    )]);

    let first = h.service.tick(TickOptions::default()).expect("tick");
    assert_eq!(
        first.alert,
        AlertOutcome::Sent {
            recipients: vec![ARJUN.to_string()]
        }
    );
    assert_eq!(first.high_risk.len(), 1);
    assert_eq!(first.waiting, vec!["Arjun Sharma".to_string()]);

    let arjun = h.store.candidate(ARJUN);
    assert_eq!(arjun.engagement, EngagementState::AlertedBeforeContact);
    assert!(!arjun.engagement.is_contacted());
    assert_eq!(arjun.ghost_risk.value(), 60);

    let second = h.service.tick(TickOptions::default()).expect("tick");
    assert_eq!(second.alert, AlertOutcome::AlreadyAlerted);
    assert_eq!(h.mailer.sent_to(HR), 1);

    // still owed a welcome email
    let contact = h.service.contact_pending().expect("contact");
    assert_eq!(contact.contacted, vec![ARJUN.to_string()]);
    assert_eq!(h.store.candidate(ARJUN).engagement, EngagementState::Emailed);
}

#[test]
fn reset_tracking_lets_high_risk_candidates_escalate_again() {
    let h = harness(vec![notice(ARJUN, "Arjun Sharma", EngagementState::HrAlerted, 90)]);

    h.service.reset_tracking().expect("reset");
    let report = h.service.tick(TickOptions::default()).expect("tick");

    assert_eq!(
        report.alert,
        AlertOutcome::Sent {
            recipients: vec![ARJUN.to_string()]
        }
    );
    assert_eq!(h.store.candidate(ARJUN).ghost_risk.value(), 90);
}

#[test]
fn failed_reply_check_counts_as_no_reply() {
    let h = harness(vec![notice(ARJUN, "Arjun Sharma", EngagementState::RespondingOk, 10)]);
    h.replies.reply_from(ARJUN);
    h.replies.break_transport();

    let report = h.service.tick(TickOptions::default()).expect("tick");

    assert_eq!(h.store.candidate(ARJUN).engagement, EngagementState::AtRisk);
    assert_eq!(h.store.candidate(ARJUN).ghost_risk.value(), 30);
    assert!(report.candidates[0].reply_error.is_some());
}

#[test]
fn hr_alert_fires_once_per_episode() {
    let h = harness(vec![
        notice(ARJUN, "Arjun Sharma", EngagementState::Emailed, 10),
        notice(PRIYA, "Priya Nair", EngagementState::Emailed, 10),
    ]);
    h.replies.reply_from(PRIYA);

    let outcomes: Vec<_> = (0..4)
        .map(|_| h.service.tick(TickOptions::default()).expect("tick").alert)
        .collect();

    assert_eq!(outcomes[0], AlertOutcome::NotNeeded);
    assert_eq!(
        outcomes[1],
        AlertOutcome::Sent {
            recipients: vec![ARJUN.to_string()]
        }
    );
    assert_eq!(outcomes[2], AlertOutcome::AlreadyAlerted);
    assert_eq!(outcomes[3], AlertOutcome::AlreadyAlerted);
    assert_eq!(h.mailer.sent_to(HR), 1);
    assert_eq!(h.store.candidate(ARJUN).engagement, EngagementState::HrAlerted);
}

#[test]
fn reply_opens_a_new_episode() {
    let h = harness(vec![notice(ARJUN, "Arjun Sharma", EngagementState::HrAlerted, 90)]);

    h.replies.reply_from(ARJUN);
    h.service.tick(TickOptions::default()).expect("tick");
    h.replies.go_quiet();
    for _ in 0..2 {
        h.service.tick(TickOptions::default()).expect("tick");
    }

    assert_eq!(h.mailer.sent_to(HR), 1);
    assert_eq!(h.store.candidate(ARJUN).engagement, EngagementState::HrAlerted);
}

#[test]
fn paused_alerts_are_suppressed_but_still_marked() {
    let h = harness(vec![notice(ARJUN, "Arjun Sharma", EngagementState::AtRisk, 30)]);

    let report = h.service.tick(paused()).expect("tick");
    assert_eq!(
        report.alert,
        AlertOutcome::Suppressed {
            recipients: vec![ARJUN.to_string()]
        }
    );
    assert_eq!(h.store.candidate(ARJUN).engagement, EngagementState::HrAlerted);

    let report = h.service.tick(TickOptions::default()).expect("tick");
    assert_eq!(report.alert, AlertOutcome::AlreadyAlerted);
    assert_eq!(h.mailer.sent_to(HR), 0);
}

#[test]
fn failed_alert_is_retried_on_the_next_tick() {
    let h = harness(vec![notice(ARJUN, "Arjun Sharma", EngagementState::AtRisk, 30)]);
    h.mailer.fail_for(HR);

    let report = h.service.tick(TickOptions::default()).expect("tick");
    assert!(matches!(report.alert, AlertOutcome::Failed { .. }));
    assert_eq!(h.store.candidate(ARJUN).engagement, EngagementState::AtRisk);
    assert_eq!(h.store.candidate(ARJUN).ghost_risk.value(), 50);

    h.mailer.recover();
    let report = h.service.tick(TickOptions::default()).expect("tick");
    assert_eq!(
        report.alert,
        AlertOutcome::Sent {
            recipients: vec![ARJUN.to_string()]
        }
    );
    assert_eq!(h.mailer.sent_to(HR), 1);
}

#[test]
fn tick_ignores_candidates_outside_the_notice_period() {
    let mut offer = notice(PRIYA, "Priya Nair", EngagementState::Emailed, 10);
    offer.status = CandidateStatus::OfferSent;
    let h = harness(vec![offer]);

    let report = h.service.tick(TickOptions::default()).expect("tick");

    assert!(report.candidates.is_empty());
    assert_eq!(h.store.candidate(PRIYA).ghost_risk.value(), 10);
}

#[test]
fn contact_pending_welcomes_each_candidate_once() {
    let h = harness(vec![
        notice(ARJUN, "Arjun Sharma", EngagementState::AwaitingFirstContact, 10),
        notice(PRIYA, "Priya Nair", EngagementState::RespondingOk, 10),
    ]);

    let first = h.service.contact_pending().expect("contact");
    let second = h.service.contact_pending().expect("contact");

    assert_eq!(first.contacted, vec![ARJUN.to_string()]);
    assert!(second.contacted.is_empty());
    assert_eq!(h.mailer.sent_to(ARJUN), 1);
    assert_eq!(h.mailer.sent_to(PRIYA), 0);
    assert_eq!(h.store.candidate(ARJUN).engagement, EngagementState::Emailed);
}

#[test]
fn contact_failure_leaves_candidate_waiting() {
    let h = harness(vec![notice(
        ARJUN,
        "Arjun Sharma",
        EngagementState::AwaitingFirstContact,
        10,
    )]);
    h.mailer.fail_for(ARJUN);

    let report = h.service.contact_pending().expect("contact");

    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        h.store.candidate(ARJUN).engagement,
        EngagementState::AwaitingFirstContact
    );
}

#[test]
fn send_uses_the_author_when_asked() {
    let h = harness_with_author(
        vec![notice(ARJUN, "Arjun Sharma", EngagementState::AwaitingFirstContact, 10)],
        false,
    );

    let composed = h.service.send_engagement(ARJUN, 40, true).expect("send");

    assert_eq!(composed.source, MessageSource::Authored);
    assert_eq!(composed.stage, EngagementStage::TeamIntro);
    assert_eq!(h.mailer.subjects_to(ARJUN), vec!["Day 40 at TechCorp".to_string()]);
    assert_eq!(h.store.candidate(ARJUN).engagement, EngagementState::Emailed);
}

#[test]
fn send_falls_back_to_templates() {
    let h = harness_with_author(
        vec![notice(ARJUN, "Arjun Sharma", EngagementState::AtRisk, 50)],
        true,
    );

    let composed = h.service.send_engagement(ARJUN, 5, true).expect("send");

    assert_eq!(composed.source, MessageSource::Template);
    assert_eq!(composed.stage, EngagementStage::OnboardingDocs);
    // contacted candidates keep their state
    assert_eq!(h.store.candidate(ARJUN).engagement, EngagementState::AtRisk);
}

#[test]
fn send_rejects_candidates_outside_the_notice_period() {
    let mut joined = Candidate::new(ARJUN, "Arjun Sharma", "Backend Engineer");
    joined.status = CandidateStatus::Joined;
    let h = harness(vec![joined]);

    let error = h
        .service
        .send_engagement(ARJUN, 0, false)
        .expect_err("joined candidates are not engaged");
    assert!(matches!(error, EngagementError::NotInNoticePeriod(_)));
}

#[test]
fn displayed_risk_overlays_time_without_persisting() {
    let h = harness(vec![notice(ARJUN, "Arjun Sharma", EngagementState::Emailed, 10)]);

    let displayed: Vec<_> = [31, 61, 86]
        .into_iter()
        .map(|day| {
            h.service
                .overview(ARJUN, day)
                .expect("overview")
                .displayed_risk
                .value()
        })
        .collect();

    assert_eq!(displayed, vec![20, 40, 60]);
    assert_eq!(h.store.candidate(ARJUN).ghost_risk.value(), 10);
}

#[test]
fn reset_tracking_returns_everyone_to_first_contact() {
    let h = harness(vec![
        notice(ARJUN, "Arjun Sharma", EngagementState::HrAlerted, 90),
        notice(PRIYA, "Priya Nair", EngagementState::AwaitingFirstContact, 10),
    ]);

    let report = h.service.reset_tracking().expect("reset");

    assert_eq!(report.cleared, vec![ARJUN.to_string()]);
    assert!(report.failures.is_empty());
    assert_eq!(
        h.store.candidate(ARJUN).engagement,
        EngagementState::AwaitingFirstContact
    );
}

#[test]
fn reset_tracking_continues_past_a_failed_write() {
    let h = harness(vec![
        notice(ARJUN, "Arjun Sharma", EngagementState::AtRisk, 70),
        notice(PRIYA, "Priya Nair", EngagementState::HrAlerted, 90),
    ]);
    h.store.reject_writes_for(ARJUN);

    let report = h.service.reset_tracking().expect("reset");

    assert_eq!(report.cleared, vec![PRIYA.to_string()]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].email, ARJUN);
    assert_eq!(h.store.candidate(ARJUN).engagement, EngagementState::AtRisk);
    assert_eq!(
        h.store.candidate(PRIYA).engagement,
        EngagementState::AwaitingFirstContact
    );
}

fn monitor_settings(max_ticks: u32, options: TickOptions) -> MonitorSettings {
    MonitorSettings {
        interval: Duration::from_millis(5),
        max_ticks,
        options,
    }
}

#[tokio::test]
async fn monitor_runs_until_the_tick_bound() {
    let h = harness(vec![notice(
        ARJUN,
        "Arjun Sharma",
        EngagementState::AwaitingFirstContact,
        10,
    )]);
    let switch = MonitorSwitch::default();
    let lease = switch.enable().expect("switch idle");
    assert!(switch.enable().is_none());

    let summary = run_monitor(Arc::clone(&h.service), monitor_settings(3, paused()), lease).await;

    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.failed_ticks, 0);
    assert!(!summary.stopped_by_operator);
    assert!(!switch.is_enabled());

    // contacted after the first tick, then two silent ticks
    assert_eq!(h.mailer.sent_to(ARJUN), 1);
    assert_eq!(h.store.candidate(ARJUN).ghost_risk.value(), 50);
}

#[tokio::test]
async fn disabled_switch_stops_the_monitor() {
    let h = harness(Vec::new());
    let switch = MonitorSwitch::default();
    let lease = switch.enable().expect("switch idle");
    switch.disable();

    let summary = run_monitor(
        Arc::clone(&h.service),
        monitor_settings(10, TickOptions::default()),
        lease,
    )
    .await;

    assert_eq!(summary.ticks, 0);
    assert!(summary.stopped_by_operator);
}

#[tokio::test]
async fn re_enabling_retires_the_previous_loop() {
    let h = harness(vec![notice(ARJUN, "Arjun Sharma", EngagementState::Emailed, 10)]);
    let switch = MonitorSwitch::default();

    let stale = switch.enable().expect("switch idle");
    switch.disable();
    let fresh = switch.enable().expect("switch re-enabled");

    let stale_summary = run_monitor(
        Arc::clone(&h.service),
        monitor_settings(10, paused()),
        stale,
    )
    .await;
    assert_eq!(stale_summary.ticks, 0);
    assert!(stale_summary.stopped_by_operator);
    // the retired loop leaves the newer one running
    assert!(switch.is_enabled());

    let fresh_summary =
        run_monitor(Arc::clone(&h.service), monitor_settings(2, paused()), fresh).await;
    assert_eq!(fresh_summary.ticks, 2);
    assert!(!switch.is_enabled());
    assert_eq!(h.store.candidate(ARJUN).ghost_risk.value(), 50);
}

#[tokio::test]
async fn overlapping_loops_do_not_double_escalate() {
    let h = harness(vec![notice(ARJUN, "Arjun Sharma", EngagementState::Emailed, 10)]);
    let switch = MonitorSwitch::default();
    let settings = MonitorSettings {
        interval: Duration::from_millis(40),
        max_ticks: 100,
        options: paused(),
    };

    let first = tokio::spawn(run_monitor(
        Arc::clone(&h.service),
        settings,
        switch.enable().expect("switch idle"),
    ));
    tokio::time::sleep(Duration::from_millis(10)).await;
    switch.disable();
    let second = tokio::spawn(run_monitor(
        Arc::clone(&h.service),
        MonitorSettings {
            max_ticks: 2,
            ..settings
        },
        switch.enable().expect("switch re-enabled"),
    ));

    let first = first.await.expect("first loop");
    let second = second.await.expect("second loop");

    assert!(first.stopped_by_operator);
    assert_eq!(first.ticks, 1);
    assert_eq!(second.ticks, 2);
    // one tick from the retired loop plus two from its replacement
    assert_eq!(h.store.candidate(ARJUN).ghost_risk.value(), 70);
}
