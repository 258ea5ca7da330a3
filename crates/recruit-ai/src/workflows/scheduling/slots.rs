use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Fixed daily interview grid, in booking order. The lunch hour is skipped.
pub const DAILY_SLOTS: [&str; 8] = [
    "9:00 AM", "10:00 AM", "11:00 AM", "12:00 PM", "2:00 PM", "3:00 PM", "4:00 PM", "5:00 PM",
];

/// One entry of the daily grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSlot(usize);

impl TimeSlot {
    pub const FIRST: Self = Self(0);
    pub const LAST: Self = Self(DAILY_SLOTS.len() - 1);

    pub fn all() -> impl Iterator<Item = Self> {
        (0..DAILY_SLOTS.len()).map(Self)
    }

    /// Slots at or after `self` on the same day.
    pub fn remaining(self) -> impl Iterator<Item = Self> {
        (self.0..DAILY_SLOTS.len()).map(Self)
    }

    pub const fn index(self) -> usize {
        self.0
    }

    pub const fn label(self) -> &'static str {
        DAILY_SLOTS[self.0]
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeSlot {
    type Err = InvalidSlot;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        DAILY_SLOTS
            .iter()
            .position(|slot| slot.eq_ignore_ascii_case(&normalized))
            .map(Self)
            .ok_or_else(|| InvalidSlot(raw.trim().to_string()))
    }
}

impl Serialize for TimeSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not one of the interview slots ({slots})", slots = DAILY_SLOTS.join(", "))]
pub struct InvalidSlot(pub String);
