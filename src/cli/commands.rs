//! Command implementations for the simulator CLI.

use std::fs;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::engine::run_simulation;
use crate::error::Result;
use crate::merge_policy::MergePolicy;
use crate::settings::Settings;
use crate::sweep::{SweepConfig, run_sweep};

/// Execute a CLI command.
pub fn execute_command(args: SimArgs) -> Result<()> {
    let settings = load_settings(&args)?;
    match &args.command {
        Command::Sweep(sweep_args) => sweep(sweep_args, settings, &args),
        Command::Run(run_args) => run(run_args, settings, &args),
        Command::ShowSettings => output_settings(&settings, &args),
    }
}

/// Load the settings file if one was given, defaults otherwise.
fn load_settings(args: &SimArgs) -> Result<Settings> {
    match &args.settings {
        Some(path) => {
            log::info!("loading settings from {}", path.display());
            Settings::from_json_file(path)
        }
        None => Ok(Settings::default()),
    }
}

/// Compare policies over buffer sizes.
fn sweep(args: &SweepArgs, mut settings: Settings, cli_args: &SimArgs) -> Result<()> {
    if let Some(queries) = args.queries_per_quantum {
        settings = settings.with_queries_per_quantum(queries);
    }

    let mut config = SweepConfig::default();
    if !args.percents.is_empty() {
        config = config.with_buffer_percents(args.percents.clone());
    }
    if !args.policies.is_empty() {
        let policies: Vec<MergePolicy> = args
            .policies
            .iter()
            .map(|kind| kind.to_policy(args.ratio, args.token_rate))
            .collect();
        config = config.with_policies(policies);
    }
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }

    if cli_args.verbosity() > 1 {
        println!(
            "Sweeping {} buffer sizes x {} policies, {} queries per quantum",
            config.buffer_percents.len(),
            config.policies.len(),
            settings.queries_per_quantum
        );
    }

    let report = run_sweep(&settings, &config)?;

    if let Some(path) = &args.output {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        log::info!("sweep report written to {}", path.display());
    }

    output_sweep(&report, cli_args)
}

/// Run a single simulation.
fn run(args: &RunArgs, mut settings: Settings, cli_args: &SimArgs) -> Result<()> {
    if let Some(buffer) = args.buffer {
        settings = settings.with_buffer(buffer);
    }
    if let Some(queries) = args.queries_per_quantum {
        settings = settings.with_queries_per_quantum(queries);
    }
    if let Some(total) = args.total {
        settings = settings.with_total_postings(total);
    }

    let policy = args.policy.to_policy(args.ratio, args.token_rate);
    let report = run_simulation(&settings, policy)?;
    output_report(&report, cli_args)
}
