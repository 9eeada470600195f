//! Output formatting for CLI commands.

use std::fmt::Write as _;

use serde::Serialize;

use crate::cli::args::{OutputFormat, SimArgs};
use crate::error::Result;
use crate::report::Report;
use crate::settings::Settings;
use crate::sweep::{RunOutcome, SweepReport};

const CSV_HEADER: &str = "policy,disk,buffer_postings,evictions,seen_postings,queries,\
query_minutes,merge_minutes,total_minutes,error";

/// Print a single run report.
pub fn output_report(report: &Report, args: &SimArgs) -> Result<()> {
    print!("{}", render_report(report, args.output_format, args.pretty)?);
    Ok(())
}

/// Print a sweep report.
pub fn output_sweep(sweep: &SweepReport, args: &SimArgs) -> Result<()> {
    print!("{}", render_sweep(sweep, args.output_format, args.pretty)?);
    Ok(())
}

/// Print the effective settings.
pub fn output_settings(settings: &Settings, args: &SimArgs) -> Result<()> {
    let rendered = match args.output_format {
        OutputFormat::Human => render_settings_human(settings),
        OutputFormat::Json | OutputFormat::Csv => render_json(settings, args.pretty)?,
    };
    print!("{rendered}");
    Ok(())
}

/// Render a single run report.
pub fn render_report(report: &Report, format: OutputFormat, pretty: bool) -> Result<String> {
    match format {
        OutputFormat::Human => {
            let mut out = String::new();
            let _ = writeln!(out, "Simulation Result:");
            let _ = writeln!(out, "══════════════════");
            let _ = writeln!(out, "Policy: {}", report.policy);
            let _ = writeln!(out, "Disk: {}", report.disk);
            let _ = writeln!(out, "Buffer: {} postings", report.buffer_postings);
            let _ = writeln!(out, "Seen postings: {}", report.seen_postings);
            let _ = writeln!(out, "Evictions: {}", report.evictions);
            let _ = writeln!(out, "Queries: {}", report.queries);
            let _ = writeln!(out, "Query cost: {:.3} min", report.query_minutes);
            let _ = writeln!(out, "Merge cost: {:.3} min", report.merge_minutes);
            let _ = writeln!(out, "Total cost: {:.3} min", report.total_minutes);
            Ok(out)
        }
        OutputFormat::Json => render_json(report, pretty),
        OutputFormat::Csv => {
            let mut out = String::new();
            let _ = writeln!(out, "{CSV_HEADER}");
            let _ = writeln!(out, "{}", csv_row(report));
            Ok(out)
        }
    }
}

/// Render a sweep report.
pub fn render_sweep(sweep: &SweepReport, format: OutputFormat, pretty: bool) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(render_sweep_human(sweep)),
        OutputFormat::Json => render_json(sweep, pretty),
        OutputFormat::Csv => {
            let mut out = String::new();
            let _ = writeln!(out, "{CSV_HEADER}");
            for outcome in &sweep.outcomes {
                let _ = writeln!(out, "{}", csv_outcome_row(outcome));
            }
            Ok(out)
        }
    }
}

fn render_sweep_human(sweep: &SweepReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Sweep Results:");
    let _ = writeln!(out, "══════════════");

    for buffer in sweep.buffer_sizes() {
        let best = sweep.best_for_buffer(buffer).map(|o| o.run_id);

        let _ = writeln!(out);
        let _ = writeln!(out, "Buffer: {buffer} postings");
        let _ = writeln!(out, "─────────────");
        let _ = writeln!(
            out,
            "  {:<16} {:>10} {:>12} {:>14} {:>14} {:>14}",
            "policy", "evictions", "queries", "query min", "merge min", "total min"
        );

        for outcome in sweep.outcomes.iter().filter(|o| o.buffer_postings == buffer) {
            match &outcome.report {
                Some(report) => {
                    let marker = if Some(outcome.run_id) == best { "*" } else { " " };
                    let _ = writeln!(
                        out,
                        "{marker} {:<16} {:>10} {:>12} {:>14.3} {:>14.3} {:>14.3}",
                        report.policy,
                        report.evictions,
                        report.queries,
                        report.query_minutes,
                        report.merge_minutes,
                        report.total_minutes
                    );
                }
                None => {
                    let error = outcome.error.as_deref().unwrap_or("unknown error");
                    let _ = writeln!(out, "  {:<16} FAILED: {error}", outcome.policy);
                }
            }
        }
    }

    let elapsed = sweep.finished_at - sweep.started_at;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} runs ({} failed) in {}ms",
        sweep.outcomes.len(),
        sweep.failed().count(),
        elapsed.num_milliseconds()
    );
    out
}

fn render_settings_human(settings: &Settings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Settings:");
    let _ = writeln!(out, "═════════");
    let _ = writeln!(
        out,
        "Disk: {} ({} MB/s, {} ms seek, {} bytes/posting)",
        settings.disk, settings.io_mbs, settings.io_seek_ms, settings.posting_bytes
    );
    let _ = writeln!(out, "Total postings: {}", settings.total_experiment_postings);
    let _ = writeln!(out, "Buffer: {} postings", settings.update_buffer_postings);
    let _ = writeln!(
        out,
        "Quantum: {} postings, {} queries",
        settings.updates_quantum, settings.queries_per_quantum
    );
    let _ = writeln!(out, "Evict to: {:.0}%", settings.evict_to_fraction * 100.0);
    for i in 0..settings.class_count() {
        let _ = writeln!(
            out,
            "Class {i}: {} members, {} updates, {} queries",
            settings.class_members[i], settings.class_updates[i], settings.class_queries[i]
        );
    }
    out
}

fn render_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let mut json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    json.push('\n');
    Ok(json)
}

fn csv_outcome_row(outcome: &RunOutcome) -> String {
    match &outcome.report {
        Some(report) => csv_row(report),
        None => format!(
            "{},,{},,,,,,,{}",
            outcome.policy,
            outcome.buffer_postings,
            csv_escape(outcome.error.as_deref().unwrap_or(""))
        ),
    }
}

fn csv_row(report: &Report) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},",
        report.policy,
        report.disk,
        report.buffer_postings,
        report.evictions,
        report.seen_postings,
        report.queries,
        report.query_minutes,
        report.merge_minutes,
        report.total_minutes
    )
}

/// Quote a CSV field if needed.
fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        let escaped = s.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::error::SimError;

    fn report(policy: &str, total: f64) -> Report {
        Report {
            policy: policy.to_string(),
            disk: "HD".to_string(),
            buffer_postings: 1_000,
            evictions: 3,
            seen_postings: 3_000,
            queries: 30,
            query_minutes: total / 4.0,
            merge_minutes: total * 3.0 / 4.0,
            total_minutes: total,
        }
    }

    fn sweep() -> SweepReport {
        SweepReport {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            outcomes: vec![
                RunOutcome::success(
                    "NeverMerge".into(),
                    1_000,
                    report("NeverMerge", 8.0),
                    Duration::ZERO,
                ),
                RunOutcome::success(
                    "LogMerge".into(),
                    1_000,
                    report("LogMerge", 2.0),
                    Duration::ZERO,
                ),
                RunOutcome::failure(
                    "Prognosticator".into(),
                    1_000,
                    SimError::not_implemented("no forecast, yet"),
                    Duration::ZERO,
                ),
            ],
        }
    }

    #[test]
    fn test_render_sweep_human_marks_best() {
        let out = render_sweep(&sweep(), OutputFormat::Human, false).unwrap();
        assert!(out.contains("Buffer: 1000 postings"));
        assert!(out.contains("* LogMerge"));
        assert!(out.contains("  NeverMerge"));
        assert!(out.contains("Prognosticator   FAILED: Not implemented"));
        assert!(out.contains("3 runs (1 failed)"));
    }

    #[test]
    fn test_render_sweep_csv() {
        let out = render_sweep(&sweep(), OutputFormat::Csv, false).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("NeverMerge,HD,1000,3,3000,30,"));
        assert_eq!(lines[3], "Prognosticator,,1000,,,,,,,\"Not implemented: no forecast, yet\"");
    }

    #[test]
    fn test_render_report_json() {
        let out = render_report(&report("AlwaysMerge", 1.0), OutputFormat::Json, false).unwrap();
        let parsed: Report = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(parsed, report("AlwaysMerge", 1.0));
    }

    #[test]
    fn test_render_settings_human() {
        let out = render_settings_human(&Settings::default());
        assert!(out.contains("Disk: HD (150 MB/s, 7 ms seek, 4 bytes/posting)"));
        assert!(out.contains("Class 1: 10000 members, 100000 updates, 10000 queries"));
    }
}
