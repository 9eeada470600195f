//! Command line argument parsing for the simulator CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::merge_policy::{MergePolicy, SkiRentalConfig, TelescopingConfig};

/// compaction-sim - compare segment merge policies of a buffered index
#[derive(Parser, Debug, Clone)]
#[command(name = "compaction-sim")]
#[command(about = "Simulate the I/O cost of segment merge policies")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct SimArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Settings file (JSON); defaults are used for missing fields
    #[arg(short, long, value_name = "SETTINGS_FILE", global = true)]
    pub settings: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl SimArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compare policies over a range of buffer sizes
    Sweep(SweepArgs),

    /// Run a single simulation
    Run(RunArgs),

    /// Print the effective settings
    #[command(name = "settings")]
    ShowSettings,
}

/// Arguments for a sweep
#[derive(Parser, Debug, Clone)]
pub struct SweepArgs {
    /// Queries issued per update quantum
    #[arg(value_name = "QUERIES_PER_QUANTUM")]
    pub queries_per_quantum: Option<u64>,

    /// Buffer sizes as percentages of 2^31 postings (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub percents: Vec<u64>,

    /// Policies to compare (comma-separated, default: all available)
    #[arg(long, value_delimiter = ',')]
    pub policies: Vec<PolicyKind>,

    /// Telescoping ratio for the log policy
    #[arg(long, default_value = "1.0")]
    pub ratio: f64,

    /// Tokens earned per minute of rent for the ski policy
    #[arg(long, default_value = "1.0")]
    pub token_rate: f64,

    /// Number of threads
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Also write the full sweep report as JSON to this file
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for a single run
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Merge policy
    #[arg(short, long, default_value = "log")]
    pub policy: PolicyKind,

    /// Update buffer capacity in postings
    #[arg(short, long)]
    pub buffer: Option<u64>,

    /// Queries issued per update quantum
    #[arg(long)]
    pub queries_per_quantum: Option<u64>,

    /// Total postings to simulate
    #[arg(long)]
    pub total: Option<u64>,

    /// Telescoping ratio for the log policy
    #[arg(long, default_value = "1.0")]
    pub ratio: f64,

    /// Tokens earned per minute of rent for the ski policy
    #[arg(long, default_value = "1.0")]
    pub token_rate: f64,
}

/// Merge policies selectable from the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Never merge
    Never,
    /// Merge everything on every eviction
    Always,
    /// Telescoping merge
    Log,
    /// Ski-rental merge
    Ski,
    /// Forecasting merge (not available yet)
    Prognosticator,
}

impl PolicyKind {
    /// Build the policy with the given parameters.
    pub fn to_policy(self, ratio: f64, token_rate: f64) -> MergePolicy {
        match self {
            PolicyKind::Never => MergePolicy::NeverMerge,
            PolicyKind::Always => MergePolicy::AlwaysMerge,
            PolicyKind::Log => MergePolicy::LogMerge(TelescopingConfig::new(ratio)),
            PolicyKind::Ski => MergePolicy::SkiBased(SkiRentalConfig::new(token_rate)),
            PolicyKind::Prognosticator => MergePolicy::Prognosticator,
        }
    }
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
    /// CSV output
    Csv,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_args() {
        let args = SimArgs::try_parse_from([
            "compaction-sim",
            "sweep",
            "32",
            "--percents",
            "16,50",
            "--policies",
            "never,ski",
            "--threads",
            "4",
        ])
        .unwrap();

        if let Command::Sweep(sweep_args) = args.command {
            assert_eq!(sweep_args.queries_per_quantum, Some(32));
            assert_eq!(sweep_args.percents, vec![16, 50]);
            assert_eq!(sweep_args.policies, vec![PolicyKind::Never, PolicyKind::Ski]);
            assert_eq!(sweep_args.threads, Some(4));
            assert!(sweep_args.output.is_none());
        } else {
            panic!("Expected Sweep command");
        }
    }

    #[test]
    fn test_run_args() {
        let args = SimArgs::try_parse_from([
            "compaction-sim",
            "run",
            "--policy",
            "log",
            "--buffer",
            "1000000",
            "--ratio",
            "0.5",
        ])
        .unwrap();

        if let Command::Run(run_args) = args.command {
            assert_eq!(run_args.buffer, Some(1_000_000));
            assert_eq!(
                run_args.policy.to_policy(run_args.ratio, run_args.token_rate),
                MergePolicy::LogMerge(TelescopingConfig::new(0.5))
            );
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_verbosity_levels() {
        let args = SimArgs::try_parse_from(["compaction-sim", "settings"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = SimArgs::try_parse_from(["compaction-sim", "-vv", "settings"]).unwrap();
        assert_eq!(args.verbosity(), 2);

        let args = SimArgs::try_parse_from(["compaction-sim", "--quiet", "settings"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args =
            SimArgs::try_parse_from(["compaction-sim", "--format", "json", "settings"]).unwrap();
        assert!(matches!(args.output_format, OutputFormat::Json));
    }
}
