use serde::{Deserialize, Serialize};

use crate::workflows::pipeline::Candidate;

/// Day bucket of the notice period that decides which message goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementStage {
    Welcome,
    OnboardingDocs,
    CheckIn,
    TeamIntro,
    LaunchPrep,
}

impl EngagementStage {
    pub const fn for_day(days_into_notice: u32) -> Self {
        match days_into_notice {
            0..=2 => Self::Welcome,
            3..=10 => Self::OnboardingDocs,
            11..=35 => Self::CheckIn,
            36..=65 => Self::TeamIntro,
            _ => Self::LaunchPrep,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Welcome => "Welcome",
            Self::OnboardingDocs => "Onboarding Docs",
            Self::CheckIn => "Check-in",
            Self::TeamIntro => "Team Intro",
            Self::LaunchPrep => "Launch Prep",
        }
    }
}

/// Subject and body of an outbound candidate email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMessage {
    pub subject: String,
    pub body: String,
}

/// Where a composed message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    Template,
    Authored,
}

/// Deterministic template for a stage, personalised with first name and role.
pub fn template_for(stage: EngagementStage, candidate: &Candidate) -> EngagementMessage {
    let first_name = candidate.first_name();
    let (subject, body) = match stage {
        EngagementStage::Welcome => (
            "Welcome aboard! 🎉",
            format!(
                "Hi {first_name},\n\nWe are thrilled that you accepted our offer! The whole team is excited to have you join as a {}.\n\nLet us know if you have any questions!",
                candidate.role
            ),
        ),
        EngagementStage::OnboardingDocs => (
            "Getting started: Documents 📋",
            format!(
                "Hi {first_name},\n\nTo make your Day 1 smooth, could you please review the attached onboarding documents?\n\nThis will save us a lot of time on your joining date!"
            ),
        ),
        EngagementStage::CheckIn => (
            "Checking in 👋",
            format!(
                "Hi {first_name},\n\nHope your notice period is going smoothly. How are things at your current workplace? Let us know if you need any support from our side."
            ),
        ),
        EngagementStage::TeamIntro => (
            "Meet the team! 🏢",
            format!(
                "Hi {first_name},\n\nYour future team is having a virtual coffee chat next Friday. Would you like to join and meet everyone before your official start date?"
            ),
        ),
        EngagementStage::LaunchPrep => (
            "Ready for launch? 🚀",
            format!(
                "Hi {first_name},\n\nJust a few days left! We have your laptop ready and your desk set up. Can't wait to see you on Monday!"
            ),
        ),
    };

    EngagementMessage {
        subject: subject.to_string(),
        body,
    }
}

/// Consolidated HR alert for every candidate newly crossing the threshold in a tick.
pub fn hr_alert(entries: &[(String, u8)]) -> EngagementMessage {
    let lines = entries
        .iter()
        .map(|(name, risk)| format!("🔴 {name} ({risk}%)"))
        .collect::<Vec<_>>()
        .join("\n");

    EngagementMessage {
        subject: "🚨 Ghost Alert: Candidates Need Immediate Attention!".to_string(),
        body: format!(
            "HR Alert - Anti-Ghosting Bot\n\n⚠️ The following candidates have Ghost Risk ABOVE 40%:\n\n{lines}\n\nPlease follow up with them IMMEDIATELY to prevent ghosting.\n\n---\nThis is an automated alert from the Recruiters Assistant."
        ),
    }
}

/// Fixed notice-period touchpoints shown on the engagement timeline.
pub const TOUCHPOINTS: [(u32, &str); 6] = [
    (1, "Offer Accepted"),
    (7, "Onboarding Docs"),
    (30, "Monthly Check-in"),
    (60, "Team Intro"),
    (85, "Pre-joining Prep"),
    (90, "Day 1 Joined"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub day: u32,
    pub label: &'static str,
    pub reached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngagementTimeline {
    pub entries: Vec<TimelineEntry>,
    pub current: Option<&'static str>,
    pub next: Option<&'static str>,
}

pub fn timeline(days_into_notice: u32) -> EngagementTimeline {
    let entries: Vec<TimelineEntry> = TOUCHPOINTS
        .iter()
        .map(|&(day, label)| TimelineEntry {
            day,
            label,
            reached: days_into_notice >= day,
        })
        .collect();

    let current = entries
        .iter()
        .rev()
        .find(|entry| entry.reached)
        .map(|entry| entry.label);
    let next = entries
        .iter()
        .find(|entry| !entry.reached)
        .map(|entry| entry.label);

    EngagementTimeline {
        entries,
        current,
        next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> Candidate {
        Candidate::new("priya@example.com", "Priya Nair", "Data Engineer")
    }

    #[test]
    fn buckets_follow_day_boundaries() {
        let expectations = [
            (0, EngagementStage::Welcome),
            (2, EngagementStage::Welcome),
            (3, EngagementStage::OnboardingDocs),
            (10, EngagementStage::OnboardingDocs),
            (11, EngagementStage::CheckIn),
            (35, EngagementStage::CheckIn),
            (36, EngagementStage::TeamIntro),
            (65, EngagementStage::TeamIntro),
            (66, EngagementStage::LaunchPrep),
            (90, EngagementStage::LaunchPrep),
            (120, EngagementStage::LaunchPrep),
        ];
        for (day, stage) in expectations {
            assert_eq!(EngagementStage::for_day(day), stage, "day {day}");
        }
    }

    #[test]
    fn welcome_template_uses_first_name_and_role() {
        let message = template_for(EngagementStage::Welcome, &candidate());
        assert_eq!(message.subject, "Welcome aboard! 🎉");
        assert!(message.body.starts_with("Hi Priya,"));
        assert!(message.body.contains("join as a Data Engineer"));
    }

    #[test]
    fn templates_are_deterministic() {
        let first = template_for(EngagementStage::TeamIntro, &candidate());
        let second = template_for(EngagementStage::TeamIntro, &candidate());
        assert_eq!(first, second);
    }

    #[test]
    fn hr_alert_lists_every_candidate() {
        let alert = hr_alert(&[("Priya Nair".to_string(), 50), ("Arjun".to_string(), 70)]);
        assert!(alert.body.contains("🔴 Priya Nair (50%)"));
        assert!(alert.body.contains("🔴 Arjun (70%)"));
    }

    #[test]
    fn timeline_reports_current_and_next_touchpoints() {
        let early = timeline(0);
        assert_eq!(early.current, None);
        assert_eq!(early.next, Some("Offer Accepted"));

        let mid = timeline(45);
        assert_eq!(mid.current, Some("Monthly Check-in"));
        assert_eq!(mid.next, Some("Team Intro"));

        let done = timeline(90);
        assert_eq!(done.current, Some("Day 1 Joined"));
        assert_eq!(done.next, None);
        assert!(done.entries.iter().all(|entry| entry.reached));
    }
}
