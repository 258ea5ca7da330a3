use crate::demo::{run_demo, DemoArgs};
use crate::infra::Services;
use crate::server;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use recruit_ai::config::AppConfig;
use recruit_ai::error::{run_blocking, AppError};
use recruit_ai::telemetry;
use recruit_ai::workflows::engagement::TickOptions;
use recruit_ai::workflows::pipeline::Round;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "Recruitment Orchestrator",
    about = "Schedule interviews and track notice-period engagement from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Book interview slots for every eligible candidate in a round
    Schedule(ScheduleArgs),
    /// Run one engagement tick over notice-period candidates
    Tick(TickArgs),
    /// Walk a sample roster from screening to notice-period monitoring
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct ScheduleArgs {
    /// Interview round to book (L1 or L2)
    #[arg(long)]
    pub(crate) round: Round,
    /// First interview day (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start_date: NaiveDate,
    /// First slot on the start day, e.g. "2:00 PM"
    #[arg(long)]
    pub(crate) start_slot: Option<String>,
    /// Print the planned assignments without writing them
    #[arg(long)]
    pub(crate) preview: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct TickArgs {
    /// Record state changes but do not email HR
    #[arg(long)]
    pub(crate) alerts_paused: bool,
    /// Reply window in minutes (defaults to the configured window)
    #[arg(long)]
    pub(crate) window_minutes: Option<u32>,
    /// Send welcome emails to uncontacted candidates after the tick
    #[arg(long)]
    pub(crate) contact: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Schedule(args) => run_schedule(args).await,
        Command::Tick(args) => run_tick(args).await,
        Command::Demo(args) => run_demo(args),
    }
}

async fn load_services() -> Result<Services, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    run_blocking(move || Services::from_config(&config)).await
}

async fn run_schedule(args: ScheduleArgs) -> Result<(), AppError> {
    let services = load_services().await?;
    let scheduler = services.scheduler;
    let ScheduleArgs {
        round,
        start_date,
        start_slot,
        preview,
    } = args;

    if preview {
        let plan = run_blocking(move || {
            scheduler.preview(round, start_date, start_slot.as_deref())
        })
        .await?;
        return print_json(&plan);
    }

    let report = run_blocking(move || {
        scheduler.schedule(round, start_date, start_slot.as_deref())
    })
    .await?;
    println!(
        "Scheduled {} candidate(s) for {round}, {} failure(s)",
        report.scheduled_count(),
        report.failures.len()
    );
    print_json(&report)
}

async fn run_tick(args: TickArgs) -> Result<(), AppError> {
    let services = load_services().await?;
    let engagement = services.engagement;
    let options = TickOptions {
        alerts_paused: args.alerts_paused,
        window_minutes: args.window_minutes,
    };

    let (report, contact) = run_blocking(move || {
        let report = engagement.tick(options)?;
        let contact = if args.contact {
            Some(engagement.contact_pending()?)
        } else {
            None
        };
        Ok::<_, AppError>((report, contact))
    })
    .await?;

    print_json(&report)?;
    if let Some(contact) = contact {
        print_json(&contact)?;
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}
