use std::collections::HashSet;

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use super::slots::TimeSlot;
use crate::workflows::pipeline::{Candidate, Round};

/// Sheet date format for interview slots.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A proposed or committed interview booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub email: String,
    pub name: String,
    pub date: NaiveDate,
    pub slot: TimeSlot,
}

pub fn is_weekend(date: NaiveDate) -> bool {
    date.weekday().num_days_from_monday() >= 5
}

/// Next calendar day that is not a Saturday or Sunday.
pub fn next_business_day(date: NaiveDate) -> Option<NaiveDate> {
    let mut next = date.checked_add_days(Days::new(1))?;
    while is_weekend(next) {
        next = next.checked_add_days(Days::new(1))?;
    }
    Some(next)
}

/// Walks the slot grid forward from a start position, skipping taken slots.
///
/// The cursor never moves backwards: once a day is exhausted it advances to the next
/// business day and scans the full grid. The start date itself is used as given, even
/// when it falls on a weekend.
#[derive(Debug, Clone)]
pub struct SlotCursor {
    day: NaiveDate,
    first_slot: TimeSlot,
    taken: HashSet<(NaiveDate, TimeSlot)>,
}

impl SlotCursor {
    pub fn new(
        start_date: NaiveDate,
        start_slot: Option<TimeSlot>,
        taken: impl IntoIterator<Item = (NaiveDate, TimeSlot)>,
    ) -> Self {
        Self {
            day: start_date,
            first_slot: start_slot.unwrap_or(TimeSlot::FIRST),
            taken: taken.into_iter().collect(),
        }
    }

    /// First free slot at or after the cursor. Does not reserve it.
    pub fn next_free(&mut self) -> Option<(NaiveDate, TimeSlot)> {
        loop {
            if let Some(slot) = self
                .first_slot
                .remaining()
                .find(|slot| !self.taken.contains(&(self.day, *slot)))
            {
                return Some((self.day, slot));
            }

            self.day = next_business_day(self.day)?;
            self.first_slot = TimeSlot::FIRST;
        }
    }

    /// Mark a slot as taken for the rest of the run.
    pub fn claim(&mut self, date: NaiveDate, slot: TimeSlot) {
        self.taken.insert((date, slot));
    }

    pub fn is_taken(&self, date: NaiveDate, slot: TimeSlot) -> bool {
        self.taken.contains(&(date, slot))
    }
}

/// Candidates waiting for a slot in `round`, in sheet order.
pub fn eligible_for(round: Round, candidates: &[Candidate]) -> Vec<&Candidate> {
    candidates
        .iter()
        .filter(|candidate| {
            candidate.status == round.eligible_status() && !candidate.round(round).has_date()
        })
        .collect()
}

/// Slots held by any candidate with a `{round}` date and time, whatever their status.
/// A slot stays consumed after its interview; only the demo reset, which clears the
/// round fields, frees it. Cells that do not parse as a grid date and time cannot
/// collide with an allocation and are skipped.
pub fn booked_slots(round: Round, candidates: &[Candidate]) -> Vec<(NaiveDate, TimeSlot)> {
    candidates
        .iter()
        .filter_map(|candidate| {
            let record = candidate.round(round);
            let date = NaiveDate::parse_from_str(record.date.as_deref()?.trim(), DATE_FORMAT).ok()?;
            let slot = record.time.as_deref()?.parse::<TimeSlot>().ok()?;
            Some((date, slot))
        })
        .collect()
}

/// Dry run of the allocation, assuming every write succeeds.
pub fn plan(
    round: Round,
    candidates: &[Candidate],
    start_date: NaiveDate,
    start_slot: Option<TimeSlot>,
) -> Vec<Assignment> {
    let mut cursor = SlotCursor::new(start_date, start_slot, booked_slots(round, candidates));

    eligible_for(round, candidates)
        .into_iter()
        .map_while(|candidate| {
            let (date, slot) = cursor.next_free()?;
            cursor.claim(date, slot);
            Some(Assignment {
                email: candidate.email.clone(),
                name: candidate.name.clone(),
                date,
                slot,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::pipeline::CandidateStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn screening(n: usize) -> Vec<Candidate> {
        (0..n)
            .map(|i| Candidate::new(format!("c{i}@example.com"), format!("Candidate {i}"), "SRE"))
            .collect()
    }

    #[test]
    fn next_business_day_skips_weekends() {
        // 2025-10-10 is a Friday.
        assert_eq!(next_business_day(date(2025, 10, 10)), Some(date(2025, 10, 13)));
        assert_eq!(next_business_day(date(2025, 10, 11)), Some(date(2025, 10, 13)));
        assert_eq!(next_business_day(date(2025, 10, 13)), Some(date(2025, 10, 14)));
    }

    #[test]
    fn start_slot_only_restricts_the_first_day() {
        let monday = date(2025, 10, 6);
        let plan = plan(Round::L1, &screening(3), monday, Some(TimeSlot::LAST));

        let booked: Vec<_> = plan.iter().map(|a| (a.date, a.slot.label())).collect();
        assert_eq!(
            booked,
            [
                (monday, "5:00 PM"),
                (date(2025, 10, 7), "9:00 AM"),
                (date(2025, 10, 7), "10:00 AM"),
            ]
        );
    }

    #[test]
    fn existing_bookings_are_skipped() {
        let monday = date(2025, 10, 6);
        let mut candidates = screening(2);
        let mut held = Candidate::new("held@example.com", "Held", "SRE");
        held.status = CandidateStatus::L1Scheduled;
        held.l1.date = Some("2025-10-06".to_string());
        held.l1.time = Some("9:00 AM".to_string());
        candidates.push(held);

        let plan = plan(Round::L1, &candidates, monday, None);
        let slots: Vec<_> = plan.iter().map(|a| a.slot.label()).collect();
        assert_eq!(slots, ["10:00 AM", "11:00 AM"]);
    }

    #[test]
    fn slots_stay_booked_after_the_holder_moves_on() {
        let monday = date(2025, 10, 6);
        let mut candidates = screening(1);
        for (email, status, time) in [
            ("passed@example.com", CandidateStatus::L1Done, "9:00 AM"),
            ("failed@example.com", CandidateStatus::Rejected, "10:00 AM"),
            ("offered@example.com", CandidateStatus::OfferSent, "11:00 AM"),
        ] {
            let mut holder = Candidate::new(email, "Holder", "SRE");
            holder.status = status;
            holder.l1.date = Some("2025-10-06".to_string());
            holder.l1.time = Some(time.to_string());
            candidates.push(holder);
        }

        let plan = plan(Round::L1, &candidates, monday, None);
        assert_eq!(plan.len(), 1);
        assert_eq!((plan[0].date, plan[0].slot.label()), (monday, "12:00 PM"));
    }

    #[test]
    fn weekend_start_is_used_but_never_reached_by_advancing() {
        let saturday = date(2025, 10, 11);
        let plan = plan(Round::L1, &screening(20), saturday, None);

        assert!(plan.iter().take(8).all(|a| a.date == saturday));
        assert!(plan.iter().skip(8).all(|a| !is_weekend(a.date)));
        assert_eq!(plan[8].date, date(2025, 10, 13));
    }

    #[test]
    fn forty_candidates_never_share_a_slot() {
        let mut candidates = screening(40);
        for candidate in &mut candidates {
            candidate.status = CandidateStatus::L1Done;
        }
        let start_slot = "3:00 PM".parse().expect("slot");
        let plan = plan(Round::L2, &candidates, date(2025, 10, 8), Some(start_slot));

        assert_eq!(plan.len(), 40);
        let unique: HashSet<_> = plan.iter().map(|a| (a.date, a.slot)).collect();
        assert_eq!(unique.len(), 40);
    }
}
