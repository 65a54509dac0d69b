//! Constellation Tasking CLI
//!
//! Plans imaging, downlink and idle actions for every satellite in a scenario.
//!
//! Usage:
//!   plan-constellation --scenario configs/scenario.json \
//!                      --targets configs/targets.json \
//!                      --output outputs/plan.csv --json

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tasking_engine::{loader, report, run_scenario};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "plan-constellation",
    about = "Greedy per-tick tasking plan for an imaging constellation"
)]
struct Args {
    /// Path to scenario JSON file
    #[arg(short, long, default_value = "scenario.json")]
    scenario: PathBuf,

    /// Path to targets JSON file
    #[arg(short, long, default_value = "targets.json")]
    targets: PathBuf,

    /// Output CSV file
    #[arg(short, long, default_value = "outputs/plan.csv")]
    output: PathBuf,

    /// Also write the full record dump as JSON
    #[arg(long)]
    json: bool,

    /// Override the lookahead horizon in minutes
    #[arg(long)]
    lookahead_minutes: Option<f64>,

    /// Override the lookahead energy reserve in Wh
    #[arg(long)]
    reserve_wh: Option<f64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", "=".repeat(60));
    info!("Constellation Tasking Planner");
    info!("{}", "=".repeat(60));

    let mut scenario = loader::load_inputs(&args.scenario, &args.targets)?;

    if let Some(minutes) = args.lookahead_minutes {
        scenario.lookahead.horizon_minutes = minutes;
    }
    if let Some(reserve) = args.reserve_wh {
        scenario.lookahead.reserve_wh = reserve;
    }
    info!(
        "Lookahead: {:.1} min horizon, {:.1} Wh reserve{}",
        scenario.lookahead.horizon_minutes,
        scenario.lookahead.reserve_wh,
        if scenario.lookahead.credit_sunlight {
            ", sunlight credited"
        } else {
            ""
        }
    );

    let report = run_scenario(scenario)?;

    report::save_csv(&report.rows, &args.output)?;
    if args.json {
        report::save_json(&report, args.output.with_extension("json"))?;
    }

    // Summary
    info!("{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    report.log_summary();

    Ok(())
}
