use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::workflows::engagement::{EngagementState, GhostRisk};

/// Pipeline status stored in the `Status` column of the candidate sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateStatus {
    #[serde(rename = "Screening")]
    Screening,
    #[serde(rename = "L1_Scheduled")]
    L1Scheduled,
    #[serde(rename = "L1_Done")]
    L1Done,
    #[serde(rename = "L2_Scheduled")]
    L2Scheduled,
    #[serde(rename = "Offer_Sent")]
    OfferSent,
    #[serde(rename = "Offer_Accepted")]
    OfferAccepted,
    #[serde(rename = "Offer_Declined")]
    OfferDeclined,
    #[serde(rename = "Joined")]
    Joined,
    #[serde(rename = "Rejected")]
    Rejected,
    #[serde(rename = "Ghosted")]
    Ghosted,
}

impl CandidateStatus {
    pub const fn ordered() -> [Self; 10] {
        [
            Self::Screening,
            Self::L1Scheduled,
            Self::L1Done,
            Self::L2Scheduled,
            Self::OfferSent,
            Self::OfferAccepted,
            Self::OfferDeclined,
            Self::Joined,
            Self::Rejected,
            Self::Ghosted,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Screening => "Screening",
            Self::L1Scheduled => "L1_Scheduled",
            Self::L1Done => "L1_Done",
            Self::L2Scheduled => "L2_Scheduled",
            Self::OfferSent => "Offer_Sent",
            Self::OfferAccepted => "Offer_Accepted",
            Self::OfferDeclined => "Offer_Declined",
            Self::Joined => "Joined",
            Self::Rejected => "Rejected",
            Self::Ghosted => "Ghosted",
        }
    }

    /// Position along the happy path; terminal exits have no rank.
    const fn rank(self) -> Option<u8> {
        match self {
            Self::Screening => Some(0),
            Self::L1Scheduled => Some(1),
            Self::L1Done => Some(2),
            Self::L2Scheduled => Some(3),
            Self::OfferSent => Some(4),
            Self::OfferAccepted => Some(5),
            Self::Joined => Some(6),
            Self::OfferDeclined | Self::Rejected | Self::Ghosted => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Joined | Self::OfferDeclined | Self::Rejected | Self::Ghosted
        )
    }

    /// Statuses touched by the demo reset.
    pub const fn is_resettable(self) -> bool {
        matches!(
            self,
            Self::L1Scheduled
                | Self::L1Done
                | Self::L2Scheduled
                | Self::Rejected
                | Self::OfferSent
                | Self::OfferAccepted
                | Self::OfferDeclined
        )
    }

    /// Forward-only transition check used for manual edits. Re-writing the
    /// current status is always allowed.
    pub fn can_advance_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }

        match next {
            Self::Rejected | Self::Ghosted => true,
            Self::OfferDeclined => self == Self::OfferSent,
            _ => match (self.rank(), next.rank()) {
                (Some(current), Some(target)) => target > current,
                _ => false,
            },
        }
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown candidate status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for CandidateStatus {
    type Err = UnknownStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Self::ordered()
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownStatus(trimmed.to_string()))
    }
}

/// Interview round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Round {
    L1,
    L2,
}

impl Round {
    pub const fn label(self) -> &'static str {
        match self {
            Self::L1 => "L1",
            Self::L2 => "L2",
        }
    }

    /// Status a candidate must hold to be scheduled for this round.
    pub const fn eligible_status(self) -> CandidateStatus {
        match self {
            Self::L1 => CandidateStatus::Screening,
            Self::L2 => CandidateStatus::L1Done,
        }
    }

    pub const fn scheduled_status(self) -> CandidateStatus {
        match self {
            Self::L1 => CandidateStatus::L1Scheduled,
            Self::L2 => CandidateStatus::L2Scheduled,
        }
    }

    /// Status written when the candidate passes this round.
    pub const fn passed_status(self) -> CandidateStatus {
        match self {
            Self::L1 => CandidateStatus::L1Done,
            Self::L2 => CandidateStatus::OfferSent,
        }
    }

    pub const fn date_field(self) -> CandidateField {
        match self {
            Self::L1 => CandidateField::L1Date,
            Self::L2 => CandidateField::L2Date,
        }
    }

    pub const fn time_field(self) -> CandidateField {
        match self {
            Self::L1 => CandidateField::L1Time,
            Self::L2 => CandidateField::L2Time,
        }
    }

    pub const fn result_field(self) -> CandidateField {
        match self {
            Self::L1 => CandidateField::L1Result,
            Self::L2 => CandidateField::L2Result,
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Round {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "L1" => Ok(Self::L1),
            "L2" => Ok(Self::L2),
            other => Err(format!("unknown interview round '{other}' (expected L1 or L2)")),
        }
    }
}

/// Named, writable candidate fields. The column names match the recruitment sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CandidateField {
    Name,
    Role,
    AppliedDate,
    L1Date,
    L1Time,
    L1Result,
    L2Date,
    L2Time,
    L2Result,
    GhostRisk,
    Engagement,
}

impl CandidateField {
    pub const fn column(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Role => "Role",
            Self::AppliedDate => "Applied_Date",
            Self::L1Date => "L1_Date",
            Self::L1Time => "L1_Time",
            Self::L1Result => "L1_Result",
            Self::L2Date => "L2_Date",
            Self::L2Time => "L2_Time",
            Self::L2Result => "L2_Result",
            Self::GhostRisk => "Ghost_Risk",
            Self::Engagement => "Engagement",
        }
    }

    /// Round-specific fields cleared by the demo reset.
    pub const fn round_fields() -> [Self; 6] {
        [
            Self::L1Date,
            Self::L1Time,
            Self::L1Result,
            Self::L2Date,
            Self::L2Time,
            Self::L2Result,
        ]
    }
}

/// Outcome recorded in the `{round}_Result` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundResult {
    Pass,
    Fail,
}

impl RoundResult {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
        }
    }
}

/// Slot and outcome of one interview round as stored in the sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub date: Option<String>,
    pub time: Option<String>,
    pub result: Option<String>,
}

impl RoundRecord {
    pub fn has_date(&self) -> bool {
        self.date
            .as_deref()
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    }
}

/// One row of the recruitment sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub email: String,
    pub name: String,
    pub role: String,
    pub status: CandidateStatus,
    pub applied_date: Option<String>,
    pub l1: RoundRecord,
    pub l2: RoundRecord,
    pub ghost_risk: GhostRisk,
    pub engagement: EngagementState,
}

impl Candidate {
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            role: role.into(),
            status: CandidateStatus::Screening,
            applied_date: None,
            l1: RoundRecord::default(),
            l2: RoundRecord::default(),
            ghost_risk: GhostRisk::default(),
            engagement: EngagementState::default(),
        }
    }

    pub fn round(&self, round: Round) -> &RoundRecord {
        match round {
            Round::L1 => &self.l1,
            Round::L2 => &self.l2,
        }
    }

    pub fn round_mut(&mut self, round: Round) -> &mut RoundRecord {
        match round {
            Round::L1 => &mut self.l1,
            Round::L2 => &mut self.l2,
        }
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    /// Whether the candidate is in the notice period tracked by the engagement machine.
    pub fn in_notice_period(&self) -> bool {
        self.status == CandidateStatus::OfferAccepted
    }

    /// Apply a store update to this in-memory record.
    pub fn apply(&mut self, update: &CandidateUpdate) {
        self.status = update.status;
        for (field, value) in &update.fields {
            let value = value.trim();
            let optional = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
            match field {
                CandidateField::Name => self.name = value.to_string(),
                CandidateField::Role => self.role = value.to_string(),
                CandidateField::AppliedDate => self.applied_date = optional,
                CandidateField::L1Date => self.l1.date = optional,
                CandidateField::L1Time => self.l1.time = optional,
                CandidateField::L1Result => self.l1.result = optional,
                CandidateField::L2Date => self.l2.date = optional,
                CandidateField::L2Time => self.l2.time = optional,
                CandidateField::L2Result => self.l2.result = optional,
                CandidateField::GhostRisk => self.ghost_risk = GhostRisk::parse_or_default(value),
                CandidateField::Engagement => {
                    self.engagement = EngagementState::parse_or_default(value)
                }
            }
        }
    }
}

/// A single-record partial update: the new status plus named field values.
/// An empty value clears the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateUpdate {
    pub status: CandidateStatus,
    pub fields: BTreeMap<CandidateField, String>,
}

impl CandidateUpdate {
    pub fn status(status: CandidateStatus) -> Self {
        Self {
            status,
            fields: BTreeMap::new(),
        }
    }

    pub fn set(mut self, field: CandidateField, value: impl Into<String>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    pub fn clear(self, field: CandidateField) -> Self {
        self.set(field, String::new())
    }

    /// The demo reset: back to screening with round fields and engagement cleared.
    pub fn reset_to_screening() -> Self {
        let update = CandidateField::round_fields()
            .into_iter()
            .fold(Self::status(CandidateStatus::Screening), |update, field| {
                update.clear(field)
            });
        update
            .set(CandidateField::GhostRisk, GhostRisk::BASELINE.to_string())
            .clear(CandidateField::Engagement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip_through_from_str() {
        for status in CandidateStatus::ordered() {
            assert_eq!(status.label().parse::<CandidateStatus>(), Ok(status));
        }
        assert!("Interviewing".parse::<CandidateStatus>().is_err());
    }

    #[test]
    fn transitions_are_forward_only() {
        use CandidateStatus::*;

        assert!(Screening.can_advance_to(L1Scheduled));
        assert!(L1Done.can_advance_to(OfferSent));
        assert!(OfferSent.can_advance_to(OfferDeclined));
        assert!(L2Scheduled.can_advance_to(Rejected));
        assert!(OfferAccepted.can_advance_to(OfferAccepted));

        assert!(!L1Done.can_advance_to(Screening));
        assert!(!Screening.can_advance_to(OfferDeclined));
        assert!(!Rejected.can_advance_to(L1Scheduled));
        assert!(!Joined.can_advance_to(Ghosted));
    }

    #[test]
    fn reset_update_clears_round_fields_and_restores_baseline_risk() {
        let update = CandidateUpdate::reset_to_screening();
        assert_eq!(update.status, CandidateStatus::Screening);
        for field in CandidateField::round_fields() {
            assert_eq!(update.fields.get(&field).map(String::as_str), Some(""));
        }
        assert_eq!(
            update.fields.get(&CandidateField::GhostRisk).map(String::as_str),
            Some("10")
        );
        assert_eq!(
            update.fields.get(&CandidateField::Engagement).map(String::as_str),
            Some("")
        );
    }

    #[test]
    fn apply_parses_risk_and_clears_empty_fields() {
        let mut candidate = Candidate::new("arjun@example.com", "Arjun Sharma", "Backend Engineer");
        candidate.l1.date = Some("2025-10-06".to_string());

        let update = CandidateUpdate::status(CandidateStatus::L1Done)
            .clear(CandidateField::L1Date)
            .set(CandidateField::GhostRisk, "250");
        candidate.apply(&update);

        assert_eq!(candidate.status, CandidateStatus::L1Done);
        assert!(candidate.l1.date.is_none());
        assert_eq!(candidate.ghost_risk.value(), 100);
        assert_eq!(candidate.first_name(), "Arjun");
    }
}
