use std::fmt;

use serde::{Deserialize, Serialize};

use super::risk::GhostRisk;

/// Notice-period engagement state, persisted in the `Engagement` column so that
/// contact and alert tracking survive restarts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngagementState {
    #[default]
    AwaitingFirstContact,
    Emailed,
    #[serde(rename = "RespondingOK")]
    RespondingOk,
    AtRisk,
    #[serde(rename = "HRAlerted")]
    HrAlerted,
    /// HR was alerted about a candidate who has not been emailed yet.
    #[serde(rename = "HRAlertedBeforeContact")]
    AlertedBeforeContact,
}

impl EngagementState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::AwaitingFirstContact => "AwaitingFirstContact",
            Self::Emailed => "Emailed",
            Self::RespondingOk => "RespondingOK",
            Self::AtRisk => "AtRisk",
            Self::HrAlerted => "HRAlerted",
            Self::AlertedBeforeContact => "HRAlertedBeforeContact",
        }
    }

    /// Value written to the sheet. The initial state is stored as an empty cell.
    pub const fn column_value(self) -> &'static str {
        match self {
            Self::AwaitingFirstContact => "",
            other => other.label(),
        }
    }

    pub fn parse_or_default(raw: &str) -> Self {
        let trimmed = raw.trim();
        [
            Self::Emailed,
            Self::RespondingOk,
            Self::AtRisk,
            Self::HrAlerted,
            Self::AlertedBeforeContact,
        ]
        .into_iter()
        .find(|state| state.label().eq_ignore_ascii_case(trimmed))
        .unwrap_or_default()
    }

    pub const fn is_contacted(self) -> bool {
        !matches!(self, Self::AwaitingFirstContact | Self::AlertedBeforeContact)
    }

    pub const fn is_alerted(self) -> bool {
        matches!(self, Self::HrAlerted | Self::AlertedBeforeContact)
    }
}

impl fmt::Display for EngagementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the reply check reported for one candidate during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvidence {
    Replied,
    NoReply,
    /// The check failed; treated exactly like [`ReplyEvidence::NoReply`].
    CheckFailed(String),
}

impl ReplyEvidence {
    pub const fn replied(&self) -> bool {
        matches!(self, Self::Replied)
    }
}

/// Result of advancing one candidate by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: EngagementState,
    pub to: EngagementState,
    pub risk_before: GhostRisk,
    pub risk_after: GhostRisk,
    /// The candidate crossed the alert threshold without being alerted in this episode.
    pub needs_alert: bool,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to || self.risk_before != self.risk_after
    }

    /// State recorded once HR has been told about this candidate. Uncontacted
    /// candidates keep waiting for their first email.
    pub const fn alerted_state(&self) -> EngagementState {
        if self.to.is_contacted() {
            EngagementState::HrAlerted
        } else {
            EngagementState::AlertedBeforeContact
        }
    }
}

/// Advance one candidate by a tick. `evidence` is ignored for candidates that were
/// never contacted; their stored risk is kept but still counts towards an alert.
pub fn advance(state: EngagementState, risk: GhostRisk, evidence: &ReplyEvidence) -> Transition {
    let (to, risk_after) = match state {
        _ if !state.is_contacted() => (state, risk),
        _ if evidence.replied() => (EngagementState::RespondingOk, GhostRisk::baseline()),
        EngagementState::HrAlerted => (EngagementState::HrAlerted, risk.escalated()),
        _ => (EngagementState::AtRisk, risk.escalated()),
    };

    let needs_alert = matches!(
        to,
        EngagementState::AtRisk | EngagementState::AwaitingFirstContact
    ) && risk_after.exceeds_alert_threshold();

    Transition {
        from: state,
        to,
        risk_before: risk,
        risk_after,
        needs_alert,
    }
}
