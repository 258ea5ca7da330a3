use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::MissedTickBehavior;

use super::notify::{Mailer, ReplyProbe};
use super::service::{EngagementError, EngagementService, TickOptions};
use crate::workflows::pipeline::CandidateStore;

/// Operator toggle for periodic checking. Every enable issues a lease for one loop;
/// disabling retires it, so a loop outlived by a newer one stops at its next tick.
#[derive(Debug, Clone, Default)]
pub struct MonitorSwitch(Arc<SwitchState>);

#[derive(Debug, Default)]
struct SwitchState {
    /// Generation of the loop holding the switch, 0 when off.
    active: AtomicU64,
    issued: AtomicU64,
}

impl MonitorSwitch {
    /// `None` while another loop still holds the switch.
    pub fn enable(&self) -> Option<MonitorLease> {
        let generation = self.0.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.0
            .active
            .compare_exchange(0, generation, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        Some(MonitorLease {
            switch: self.clone(),
            generation,
        })
    }

    pub fn disable(&self) {
        self.0.active.store(0, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.0.active.load(Ordering::SeqCst) != 0
    }
}

/// One monitor loop's claim on the switch.
#[derive(Debug)]
pub struct MonitorLease {
    switch: MonitorSwitch,
    generation: u64,
}

impl MonitorLease {
    pub fn is_current(&self) -> bool {
        self.switch.0.active.load(Ordering::SeqCst) == self.generation
    }

    /// Turn the switch off unless a newer loop has taken it over.
    fn release(self) {
        let _ = self.switch.0.active.compare_exchange(
            self.generation,
            0,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub max_ticks: u32,
    pub options: TickOptions,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_ticks: 100,
            options: TickOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorSummary {
    pub ticks: u32,
    pub failed_ticks: u32,
    pub stopped_by_operator: bool,
}

/// Drive the engagement machine on a fixed interval until the tick bound is reached or
/// the lease is retired. Each tick is followed by initial contact of any newly
/// accepted candidates.
pub async fn run_monitor<S, M, P>(
    service: Arc<EngagementService<S, M, P>>,
    settings: MonitorSettings,
    lease: MonitorLease,
) -> MonitorSummary
where
    S: CandidateStore + 'static,
    M: Mailer + 'static,
    P: ReplyProbe + 'static,
{
    let mut interval = tokio::time::interval(settings.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut summary = MonitorSummary::default();

    while summary.ticks < settings.max_ticks {
        interval.tick().await;
        if !lease.is_current() {
            summary.stopped_by_operator = true;
            break;
        }

        let worker = Arc::clone(&service);
        let options = settings.options;
        let outcome = tokio::task::spawn_blocking(move || {
            let report = worker.tick(options)?;
            let contact = worker.contact_pending()?;
            Ok::<_, EngagementError>((report, contact))
        })
        .await;
        summary.ticks += 1;

        match outcome {
            Ok(Ok((report, contact))) => {
                tracing::info!(
                    tick = summary.ticks,
                    responding = report.responding.len(),
                    silent = report.silent.len(),
                    high_risk = report.high_risk.len(),
                    contacted = contact.contacted.len(),
                    "engagement tick complete"
                );
            }
            Ok(Err(error)) => {
                summary.failed_ticks += 1;
                tracing::warn!(tick = summary.ticks, %error, "engagement tick failed");
            }
            Err(error) => {
                summary.failed_ticks += 1;
                tracing::error!(tick = summary.ticks, %error, "engagement tick aborted");
            }
        }
    }

    lease.release();
    tracing::info!(ticks = summary.ticks, "engagement monitor stopped");
    summary
}
