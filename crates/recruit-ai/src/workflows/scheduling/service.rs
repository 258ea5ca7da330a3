use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use super::allocator::{booked_slots, eligible_for, plan, Assignment, SlotCursor, DATE_FORMAT};
use super::governor::WriteGovernor;
use super::slots::{InvalidSlot, TimeSlot};
use crate::workflows::pipeline::{
    CandidateFailure, CandidateStatus, CandidateStore, CandidateUpdate, Round, StoreError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleReport {
    pub round: Round,
    pub scheduled: Vec<Assignment>,
    pub failures: Vec<CandidateFailure>,
}

impl ScheduleReport {
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Booking {
    pub email: String,
    pub name: String,
    pub status: CandidateStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgendaSlot {
    pub slot: TimeSlot,
    pub booking: Option<Booking>,
}

/// Every grid slot of one day with whoever holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAgenda {
    pub round: Round,
    pub date: NaiveDate,
    pub slots: Vec<AgendaSlot>,
}

/// Auto-scheduler for interview rounds.
pub struct InterviewScheduler<S> {
    store: Arc<S>,
    governor: Arc<WriteGovernor>,
}

impl<S> InterviewScheduler<S>
where
    S: CandidateStore + 'static,
{
    pub fn new(store: Arc<S>, governor: Arc<WriteGovernor>) -> Self {
        Self { store, governor }
    }

    /// Book every eligible candidate without a slot for `round`. The slot list is read
    /// fresh from the store. A failed write is reported and leaves the slot free for the
    /// next candidate.
    pub fn schedule(
        &self,
        round: Round,
        start_date: NaiveDate,
        start_slot: Option<&str>,
    ) -> Result<ScheduleReport, SchedulingError> {
        let start_slot = parse_start_slot(start_slot)?;

        let candidates = self.store.get_all_candidates()?;
        let mut cursor = SlotCursor::new(start_date, start_slot, booked_slots(round, &candidates));
        let mut report = ScheduleReport {
            round,
            scheduled: Vec::new(),
            failures: Vec::new(),
        };

        for candidate in eligible_for(round, &candidates) {
            let (date, slot) = cursor
                .next_free()
                .ok_or(SchedulingError::CalendarExhausted)?;

            let update = CandidateUpdate::status(round.scheduled_status())
                .set(round.date_field(), date.format(DATE_FORMAT).to_string())
                .set(round.time_field(), slot.label());

            self.governor.throttle();
            match self.store.update_candidate(&candidate.email, &update) {
                Ok(()) => {
                    cursor.claim(date, slot);
                    tracing::info!(
                        email = %candidate.email,
                        %round,
                        date = %date,
                        slot = slot.label(),
                        "interview scheduled"
                    );
                    report.scheduled.push(Assignment {
                        email: candidate.email.clone(),
                        name: candidate.name.clone(),
                        date,
                        slot,
                    });
                }
                Err(error) => {
                    tracing::warn!(email = %candidate.email, %round, %error, "slot write failed");
                    report
                        .failures
                        .push(CandidateFailure::new(candidate.email.clone(), &error));
                }
            }
        }

        Ok(report)
    }

    /// Assignments `schedule` would make right now, without writing.
    pub fn preview(
        &self,
        round: Round,
        start_date: NaiveDate,
        start_slot: Option<&str>,
    ) -> Result<Vec<Assignment>, SchedulingError> {
        let start_slot = parse_start_slot(start_slot)?;
        let candidates = self.store.get_all_candidates()?;
        Ok(plan(round, &candidates, start_date, start_slot))
    }

    pub fn day_agenda(&self, round: Round, date: NaiveDate) -> Result<DayAgenda, SchedulingError> {
        let candidates = self.store.get_all_candidates()?;
        let day = date.format(DATE_FORMAT).to_string();

        let slots = TimeSlot::all()
            .map(|slot| {
                let booking = candidates
                    .iter()
                    .find(|candidate| {
                        let record = candidate.round(round);
                        record.date.as_deref().map(str::trim) == Some(day.as_str())
                            && record
                                .time
                                .as_deref()
                                .and_then(|time| time.parse::<TimeSlot>().ok())
                                == Some(slot)
                    })
                    .map(|candidate| Booking {
                        email: candidate.email.clone(),
                        name: candidate.name.clone(),
                        status: candidate.status,
                    });
                AgendaSlot { slot, booking }
            })
            .collect();

        Ok(DayAgenda { round, date, slots })
    }
}

/// A blank start slot means "from the first slot of the day".
fn parse_start_slot(raw: Option<&str>) -> Result<Option<TimeSlot>, InvalidSlot> {
    raw.map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(str::parse::<TimeSlot>)
        .transpose()
}

/// Error raised by the interview scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error(transparent)]
    InvalidSlot(#[from] InvalidSlot),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no free interview slot before the end of the calendar")]
    CalendarExhausted,
}
