use std::fmt;

use serde::{Deserialize, Serialize};

/// Ghost risk score, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", from = "i64")]
pub struct GhostRisk(u8);

impl GhostRisk {
    pub const MAX: u8 = 100;
    /// Risk of a freshly screened or freshly responding candidate.
    pub const BASELINE: u8 = 10;
    /// Added on every tick without a reply.
    pub const NO_REPLY_STEP: u8 = 20;
    /// Risk strictly above this value escalates to HR.
    pub const ALERT_THRESHOLD: u8 = 40;

    pub fn new(value: i64) -> Self {
        Self(value.clamp(0, i64::from(Self::MAX)) as u8)
    }

    pub const fn baseline() -> Self {
        Self(Self::BASELINE)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    /// Sheet values that are absent or not a plain non-negative integer fall
    /// back to the baseline.
    pub fn parse_or_default(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Self::baseline();
        }
        trimmed
            .parse::<i64>()
            .map(Self::new)
            .unwrap_or(Self(Self::MAX))
    }

    /// Tick adjustment for a candidate who has not replied.
    pub fn escalated(self) -> Self {
        Self(self.0.saturating_add(Self::NO_REPLY_STEP).min(Self::MAX))
    }

    pub const fn exceeds_alert_threshold(self) -> bool {
        self.0 > Self::ALERT_THRESHOLD
    }

    /// Read-time overlay combining the stored score with the notice-period bonus.
    /// Never persisted.
    pub fn displayed(self, days_into_notice: u32) -> Self {
        Self((self.0 + time_bonus(days_into_notice)).min(Self::MAX))
    }

    pub const fn band(self) -> RiskBand {
        if self.0 <= Self::ALERT_THRESHOLD {
            RiskBand::Low
        } else if self.0 <= 70 {
            RiskBand::Elevated
        } else {
            RiskBand::High
        }
    }
}

impl Default for GhostRisk {
    fn default() -> Self {
        Self::baseline()
    }
}

impl From<GhostRisk> for u8 {
    fn from(value: GhostRisk) -> Self {
        value.0
    }
}

impl From<i64> for GhostRisk {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for GhostRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Step bonus for time spent in the notice period: +10 past day 30, +20 more
/// past day 60, +20 more past day 85.
pub const fn time_bonus(days_into_notice: u32) -> u8 {
    let mut bonus = 0;
    if days_into_notice > 30 {
        bonus += 10;
    }
    if days_into_notice > 60 {
        bonus += 20;
    }
    if days_into_notice > 85 {
        bonus += 20;
    }
    bonus
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Elevated,
    High,
}

impl RiskBand {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Elevated => "elevated",
            Self::High => "high",
        }
    }
}
