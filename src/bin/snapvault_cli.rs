use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use snapvault::backup::{run_accounts, RunSummary};
use snapvault::config::Config;
use snapvault::policy::{MonthlyRetention, RetentionPolicy};
use snapvault::provider::FileProvider;
use snapvault::schedule::generate_schedule;
use snapvault::snapshot::{load_inventory, parse_timestamp};
use snapvault::trim::plan_trim;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Parser)]
#[command(name = "snapvault")]
#[command(about = "Plan grandfather-father-son trimming of volume snapshots")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the deletion plan for a snapshot inventory
    Plan(PlanArgs),
    /// Print the bucket boundaries for a policy
    Schedule(ScheduleArgs),
    /// Back up and trim every configured account
    Run(RunArgs),
}

#[derive(Args)]
struct PlanArgs {
    /// JSON file holding the snapshot listing (array of snapshots)
    #[arg(long)]
    inventory: PathBuf,

    /// Config file supplying the retention counts (flags below override it)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Evaluation instant, RFC 3339 (default: current time)
    #[arg(long)]
    now: Option<String>,

    #[command(flatten)]
    retention: RetentionArgs,

    /// Emit the plan as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RunArgs {
    /// Config file with accounts and retention counts
    #[arg(long)]
    config: PathBuf,

    /// Directory of provider state documents, one <account-name>.json each
    #[arg(long)]
    state_dir: PathBuf,

    /// Evaluation instant, RFC 3339 (default: current time)
    #[arg(long)]
    now: Option<String>,

    #[command(flatten)]
    retention: RetentionArgs,
}

#[derive(Args)]
struct ScheduleArgs {
    /// Evaluation instant, RFC 3339 (default: current time)
    #[arg(long)]
    now: Option<String>,

    #[command(flatten)]
    retention: RetentionArgs,
}

#[derive(Args)]
struct RetentionArgs {
    /// Hourly snapshots to keep
    #[arg(long)]
    hourly: Option<u32>,

    /// Daily snapshots to keep
    #[arg(long)]
    daily: Option<u32>,

    /// Weekly snapshots to keep
    #[arg(long)]
    weekly: Option<u32>,

    /// Monthly snapshots to keep: a count, or "unlimited"
    #[arg(long, value_parser = parse_monthly)]
    monthly: Option<MonthlyRetention>,
}

impl RetentionArgs {
    fn apply(&self, mut policy: RetentionPolicy) -> RetentionPolicy {
        if let Some(hourly) = self.hourly {
            policy.hourly = hourly;
        }
        if let Some(daily) = self.daily {
            policy.daily = daily;
        }
        if let Some(weekly) = self.weekly {
            policy.weekly = weekly;
        }
        if let Some(monthly) = self.monthly {
            policy.monthly = monthly;
        }
        policy
    }
}

fn parse_monthly(value: &str) -> Result<MonthlyRetention, String> {
    value.parse()
}

fn parse_now(value: Option<&str>) -> Result<OffsetDateTime> {
    match value {
        Some(raw) => parse_timestamp(raw).with_context(|| format!("invalid --now value: {raw}")),
        None => Ok(OffsetDateTime::now_utc()),
    }
}

fn load_policy(config: Option<&PathBuf>, retention: &RetentionArgs) -> Result<RetentionPolicy> {
    let base = match config {
        Some(path) => {
            Config::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?
                .retention
        }
        None => RetentionPolicy::default(),
    };
    Ok(retention.apply(base))
}

fn run_plan(args: &PlanArgs) -> Result<()> {
    let now = parse_now(args.now.as_deref())?;
    let policy = load_policy(args.config.as_ref(), &args.retention)?;

    let snapshots = load_inventory(&args.inventory)
        .with_context(|| format!("failed to read {}", args.inventory.display()))?;

    let plan = plan_trim(now, &policy, &snapshots)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    if plan.deletions.is_empty() {
        println!("nothing to delete");
        return Ok(());
    }
    for (volume, ids) in &plan.deletions {
        println!("volume {volume}: delete {}", ids.len());
        for id in ids {
            println!("  {id}");
        }
    }
    println!("total: {} snapshots", plan.total());
    Ok(())
}

fn run_run(args: &RunArgs) -> Result<RunSummary> {
    let now = parse_now(args.now.as_deref())?;
    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    let policy = args.retention.apply(config.retention);

    let summary = run_accounts(&config.accounts, &policy, now, |account| {
        let state = args.state_dir.join(format!("{}.json", account.name));
        FileProvider::open(&state, now)
    });

    println!(
        "accounts: {} ({} failed)",
        summary.accounts, summary.failed_accounts
    );
    println!(
        "created: {}, deleted: {}, failures: {}",
        summary.report.created, summary.report.deleted, summary.report.failures
    );
    Ok(summary)
}

fn run_schedule(args: &ScheduleArgs) -> Result<()> {
    let now = parse_now(args.now.as_deref())?;
    let policy = load_policy(None, &args.retention)?;

    for boundary in generate_schedule(now, &policy) {
        println!("{}", boundary.format(&Rfc3339)?);
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Plan(args) => run_plan(args).map(|()| ExitCode::SUCCESS),
        Command::Schedule(args) => run_schedule(args).map(|()| ExitCode::SUCCESS),
        Command::Run(args) => run_run(args).map(|summary| {
            if summary.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
