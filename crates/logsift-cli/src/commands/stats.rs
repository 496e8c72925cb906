use crate::OutputFormat;
use anyhow::{Context, Result};
use logsift_core::analysis::{AggregateOutcome, LogAggregator, SortKey, UrlSummary};
use logsift_core::RunConfig;
use logsift_core::log::LogReader;
use serde::Serialize;
use std::path::Path;

/// JSON shape of the `stats` command output
#[derive(Debug, Serialize)]
struct StatsReport<'a> {
    file: String,
    total_lines: usize,
    valid_lines: usize,
    quality: f64,
    sort_by: SortKey,
    urls: &'a [UrlSummary],
}

/// Aggregate a single log file, plain or gzip-compressed
///
/// `min_quality` is checked like the `MIN_QUALITY` config key.
pub fn analyze_log(file: &Path, min_quality: f64, sort_by: SortKey) -> Result<AggregateOutcome> {
    let config = RunConfig {
        min_quality,
        sort_by,
        ..RunConfig::default()
    }
    .validated()?;

    tracing::debug!("Reading log file: {}", file.display());

    let lines = LogReader::open(file)
        .with_context(|| format!("Failed to open log file {}", file.display()))?;
    let outcome = LogAggregator::from_config(&config).try_aggregate(lines)?;

    Ok(outcome)
}

pub fn execute(
    file: &Path,
    top: usize,
    sort_by: SortKey,
    min_quality: f64,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!(
        "Extracting statistics from log file: {} (format {})",
        file.display(),
        format.as_str()
    );

    let outcome = analyze_log(file, min_quality, sort_by)?;

    match format {
        OutputFormat::Json => output_json(file, &outcome, top, sort_by)?,
        OutputFormat::Table => output_table(&outcome, top),
        OutputFormat::Pretty => output_pretty(file, &outcome, top, sort_by),
    }

    Ok(())
}

fn output_pretty(file: &Path, outcome: &AggregateOutcome, top: usize, sort_by: SortKey) {
    use console::style;

    println!("\n{}", style("Access Log Statistics").bold().cyan());
    println!("{}", style("=====================").cyan());

    println!("\n{}", style("Summary:").bold());
    println!("  File:           {}", file.display());
    println!("  Total Lines:    {}", outcome.total_lines);
    println!("  Parsed Lines:   {}", outcome.valid_lines);
    println!("  Quality:        {:.3}", outcome.quality());
    println!("  Unique URLs:    {}", outcome.summaries.len());
    println!("  Total Time:     {:.3} s", outcome.total_time);

    let urls = outcome.top(top);
    if !urls.is_empty() {
        println!("\n{}", style(format!("Top URLs by {}:", sort_by)).bold());
        for (i, s) in urls.iter().enumerate() {
            println!(
                "  {}. [{} = {}] {} requests, avg {:.3} s, med {:.3} s, max {:.3} s - {}",
                i + 1,
                sort_by,
                s.metric(sort_by),
                s.count,
                s.time_avg,
                s.time_med,
                s.time_max,
                s.url
            );
        }
    }

    println!();
}

fn output_json(file: &Path, outcome: &AggregateOutcome, top: usize, sort_by: SortKey) -> Result<()> {
    let report = StatsReport {
        file: file.display().to_string(),
        total_lines: outcome.total_lines,
        valid_lines: outcome.valid_lines,
        quality: outcome.quality(),
        sort_by,
        urls: outcome.top(top),
    };
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

fn output_table(outcome: &AggregateOutcome, top: usize) {
    println!("url,count,count_perc,time_avg,time_max,time_med,time_perc,time_sum");
    for s in outcome.top(top) {
        println!(
            "{},{},{},{},{},{},{},{}",
            csv_field(&s.url),
            s.count,
            s.count_perc,
            s.time_avg,
            s.time_max,
            s.time_med,
            s.time_perc,
            s.time_sum
        );
    }
}

/// Quote a CSV field when it contains a separator or quote
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
