//! Coastwatch scenario harness CLI
//!
//! Run deterministic verification scenarios against the engine.

use clap::Parser;
use coastwatch_sim::scenarios::ScenarioId;
use coastwatch_sim::{ScenarioResult, ScenarioRunner};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Coastwatch deterministic verification harness
#[derive(Parser, Debug)]
#[command(name = "coastwatch-sim")]
#[command(about = "Run deterministic verification scenarios for Coastwatch", long_about = None)]
struct Args {
    /// Master seed for determinism
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (see --list), or "all"
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Reports to push through the engine per scenario
    #[arg(short, long, default_value = "20")]
    reports: usize,

    /// List available scenarios and exit
    #[arg(long)]
    list: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if args.list {
        for scenario in ScenarioId::all() {
            println!("{:<18} {}", scenario.name(), scenario.description());
        }
        return;
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e: String| {
            eprintln!("Error: {}", e);
            eprintln!("Run with --list to see available scenarios");
            std::process::exit(1);
        })]
    };

    if !args.json {
        info!("Coastwatch verification harness");
        info!("seed={} reports={}", args.seed, args.reports);
    }

    let runner = ScenarioRunner::new(args.seed).with_reports(args.reports);
    let mut results: Vec<ScenarioResult> = Vec::with_capacity(scenarios.len());

    for scenario in scenarios {
        let result = runner.run(scenario).await;
        if !args.json {
            let status = if result.passed { "PASS" } else { "FAIL" };
            info!(
                "{:<18} {} | approved={} review={} rejected={} vetoed={}",
                result.scenario.name(),
                status,
                result.tally.auto_approved,
                result.tally.manual_review,
                result.tally.rejected,
                result.tally.auto_rejected,
            );
            if let Some(reason) = &result.failure_reason {
                info!("  reason: {}", reason);
            }
        }
        results.push(result);
    }

    let failed = results.iter().filter(|r| !r.passed).count();

    if args.json {
        match serde_json::to_string_pretty(&results) {
            Ok(json) => println!("{}", json),
            Err(error) => {
                eprintln!("Error serializing results: {}", error);
                std::process::exit(1);
            }
        }
    } else if failed == 0 {
        info!("All scenarios passed");
    } else {
        info!("{} scenario(s) failed", failed);
    }

    if failed > 0 {
        std::process::exit(1);
    }
}
