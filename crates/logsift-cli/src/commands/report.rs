use anyhow::{Context, Result};
use clap::Args;
use logsift_core::analysis::{LogAggregator, SortKey};
use logsift_core::config::{ConfigOverrides, RunConfig};
use logsift_core::log::{LogReader, LogSelector};
use logsift_core::report::ReportWriter;
use std::fs;
use std::path::PathBuf;

/// Options for the `report` command
#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// Path to a TOML config file with a [default] table
    /// (falls back to ./configs/conf.toml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of URLs to include in the report
    #[arg(long, value_name = "N")]
    pub report_size: Option<usize>,

    /// Minimum fraction of parsable lines (0.0 - 1.0)
    #[arg(long, value_name = "RATIO")]
    pub min_quality: Option<f64>,

    /// Metric to rank URLs by (count, count_perc, time_sum, time_avg,
    /// time_max, time_med, time_perc)
    #[arg(long, value_name = "KEY")]
    pub sort_by: Option<SortKey>,

    /// Directory containing the rotated access logs
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Directory reports are written to
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// HTML template with a $table_json placeholder
    #[arg(long, value_name = "FILE")]
    pub template: Option<PathBuf>,
}

impl ReportArgs {
    /// Defaults, then the config file, then command line flags
    pub fn resolve_config(&self) -> Result<RunConfig> {
        let from_file = RunConfig::discover(self.config.as_deref())
            .context("Failed to load configuration")?;

        let config = from_file
            .merge(ConfigOverrides {
                report_size: self.report_size,
                report_dir: self.report_dir.clone(),
                log_dir: self.log_dir.clone(),
                template: self.template.clone(),
                min_quality: self.min_quality,
                sort_by: self.sort_by,
                ..ConfigOverrides::default()
            })
            .validated()?;

        Ok(config)
    }
}

/// How a report run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NoLogFound,
    AlreadyReported(PathBuf),
    Written(PathBuf),
    WriteFailed(PathBuf),
}

/// Select the newest log, aggregate it and render its report
///
/// Quality failures and unreadable logs are returned as errors. A missing log,
/// an existing report and a failed write are logged and reported through
/// [`RunOutcome`].
pub fn run_report(config: &RunConfig) -> Result<RunOutcome> {
    fs::create_dir_all(&config.report_dir).with_context(|| {
        format!(
            "Failed to create report directory {}",
            config.report_dir.display()
        )
    })?;

    let selector = LogSelector::new(&config.log_prefix)?;
    let Some(latest) = selector.select_latest(&config.log_dir)? else {
        tracing::info!(
            "No matching log files found in {}",
            config.log_dir.display()
        );
        return Ok(RunOutcome::NoLogFound);
    };
    tracing::info!("Selected log file: {}", latest.path.display());

    let report_path = config.report_dir.join(latest.report_file_name());
    if report_path.exists() {
        tracing::info!(
            "Log has already been processed, report file: {}",
            report_path.display()
        );
        return Ok(RunOutcome::AlreadyReported(report_path));
    }

    let lines = LogReader::open(&latest.path)
        .with_context(|| format!("Failed to open log file {}", latest.path.display()))?;
    let outcome = LogAggregator::from_config(config).try_aggregate(lines)?;

    match ReportWriter::write(&outcome.summaries, &report_path, config) {
        Ok(()) => {
            tracing::info!(
                "Report file: {} (quality {:.3})",
                report_path.display(),
                outcome.quality()
            );
            Ok(RunOutcome::Written(report_path))
        }
        Err(e) => {
            tracing::error!("Write error for {}: {}", report_path.display(), e);
            Ok(RunOutcome::WriteFailed(report_path))
        }
    }
}

pub fn execute(config: &RunConfig) -> Result<()> {
    tracing::info!("Current config: {:?}", config);

    if let Err(e) = run_report(config) {
        tracing::error!("Report generation failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}
