use crate::infra::Services;
use chrono::{Local, NaiveDate};
use clap::Args;
use recruit_ai::error::AppError;
use recruit_ai::workflows::engagement::{
    AlertOutcome, EngagementOverview, EngagementPolicy, TickOptions, TickReport,
};
use recruit_ai::workflows::pipeline::{PipelineSummary, Round};
use recruit_ai::workflows::scheduling::{next_business_day, ScheduleReport, SchedulingError};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// First L1 interview day (YYYY-MM-DD). Defaults to the next business day.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start_date: Option<NaiveDate>,
    /// Day of the notice period used for the engagement overview.
    #[arg(long, default_value_t = 31)]
    pub(crate) notice_day: u32,
}

/// Everything the walkthrough produced, in the order it happened.
#[derive(Debug)]
pub(crate) struct DemoOutcome {
    pub(crate) before: PipelineSummary,
    pub(crate) l1: ScheduleReport,
    pub(crate) l2: ScheduleReport,
    pub(crate) contacted: Vec<String>,
    pub(crate) ticks: Vec<TickReport>,
    pub(crate) overviews: Vec<EngagementOverview>,
    pub(crate) after: PipelineSummary,
    pub(crate) mail_sent: usize,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = Local::now().date_naive();
    let start_date = match args.start_date {
        Some(date) => date,
        None => next_business_day(today).ok_or(SchedulingError::CalendarExhausted)?,
    };

    println!("Recruitment pipeline demo");
    let outcome = run_scenario(start_date, args.notice_day)?;
    render(&outcome);
    Ok(())
}

pub(crate) fn run_scenario(start_date: NaiveDate, notice_day: u32) -> Result<DemoOutcome, AppError> {
    let services = Services::in_memory(EngagementPolicy {
        response_window_minutes: 1,
        ..EngagementPolicy::default()
    });
    let pipeline = &services.pipeline;
    let before = pipeline.summary()?;

    let l1 = services.scheduler.schedule(Round::L1, start_date, None)?;
    pipeline.record_round_result(Round::L1, "arjun.sharma@example.com", true)?;
    pipeline.record_round_result(Round::L1, "priya.nair@example.com", true)?;
    pipeline.record_round_result(Round::L1, "rahul.verma@example.com", false)?;

    let l2_start = next_business_day(start_date).ok_or(SchedulingError::CalendarExhausted)?;
    let l2 = services.scheduler.schedule(Round::L2, l2_start, None)?;
    pipeline.record_round_result(Round::L2, "arjun.sharma@example.com", true)?;
    pipeline.record_round_result(Round::L2, "priya.nair@example.com", true)?;
    pipeline.record_round_result(Round::L2, "sneha.patel@example.com", false)?;

    pipeline.record_offer_response("arjun.sharma@example.com", true)?;
    pipeline.record_offer_response("priya.nair@example.com", false)?;
    pipeline.record_offer_response("vikram.singh@example.com", true)?;

    let engagement = &services.engagement;
    let contacted = engagement.contact_pending()?.contacted;
    services
        .inbox
        .record_reply("ananya.gupta@example.com", chrono::Utc::now());

    let mut ticks = Vec::new();
    for _ in 0..3 {
        ticks.push(engagement.tick(TickOptions::default())?);
    }

    let overviews = engagement
        .notice_period()?
        .iter()
        .map(|candidate| engagement.overview(&candidate.email, notice_day))
        .collect::<Result<Vec<_>, _>>()?;

    let mail_sent = services
        .outbox
        .as_ref()
        .map(|outbox| outbox.sent().len())
        .unwrap_or_default();

    Ok(DemoOutcome {
        before,
        l1,
        l2,
        contacted,
        ticks,
        overviews,
        after: pipeline.summary()?,
        mail_sent,
    })
}

fn render(outcome: &DemoOutcome) {
    println!(
        "\nStarting pipeline: {} candidates | {} screening | {} interviewing | {} offers",
        outcome.before.total,
        outcome.before.screening,
        outcome.before.interviewing,
        outcome.before.offers
    );

    for report in [&outcome.l1, &outcome.l2] {
        println!("\n{} interviews booked: {}", report.round, report.scheduled_count());
        for assignment in &report.scheduled {
            println!(
                "- {} on {} at {}",
                assignment.name, assignment.date, assignment.slot
            );
        }
        for failure in &report.failures {
            println!("- FAILED {}: {}", failure.email, failure.error);
        }
    }

    println!("\nWelcome emails sent: {}", outcome.contacted.join(", "));

    for (index, tick) in outcome.ticks.iter().enumerate() {
        println!(
            "\nTick {}: {} responding | {} silent | {} waiting",
            index + 1,
            tick.responding.len(),
            tick.silent.len(),
            tick.waiting.len()
        );
        for entry in &tick.candidates {
            println!(
                "- {} {} -> {} (risk {} -> {})",
                entry.name, entry.from, entry.to, entry.risk_before, entry.risk_after
            );
        }
        match &tick.alert {
            AlertOutcome::NotNeeded => println!("- no HR alert needed"),
            AlertOutcome::AlreadyAlerted => println!("- high-risk candidates already escalated"),
            AlertOutcome::Sent { recipients } => {
                println!("- HR alerted about {}", recipients.join(", "))
            }
            AlertOutcome::Suppressed { recipients } => {
                println!("- HR alert paused for {}", recipients.join(", "))
            }
            AlertOutcome::Failed { error, .. } => println!("- HR alert failed: {error}"),
        }
    }

    println!("\nNotice-period overview");
    for overview in &outcome.overviews {
        println!(
            "- {} ({}) day {}: {} | risk {} ({}) | next: {}",
            overview.name,
            overview.role,
            overview.days_into_notice,
            overview.state,
            overview.displayed_risk,
            overview.band.label(),
            overview.message.subject
        );
    }

    println!(
        "\nFinal pipeline: {} screening | {} interviewing | {} offers | {} messages in the outbox",
        outcome.after.screening, outcome.after.interviewing, outcome.after.offers, outcome.mail_sent
    );
}
