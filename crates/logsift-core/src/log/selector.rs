use crate::{Error, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The newest log found in a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestLog {
    pub path: PathBuf,
    pub date: NaiveDate,
}

impl LatestLog {
    /// Name of the report rendered for this log, e.g. `report-2017.06.30.html`
    pub fn report_file_name(&self) -> String {
        format!("report-{}.html", self.date.format("%Y.%m.%d"))
    }
}

/// Finds rotated logs named `<prefix>-YYYYMMDD.gz` or `<prefix>-YYYYMMDD.log`
#[derive(Debug, Clone)]
pub struct LogSelector {
    pattern: Regex,
}

impl LogSelector {
    pub fn new(prefix: &str) -> Result<Self> {
        let pattern = format!(
            r"^{}-(\d{{4}})(\d{{2}})(\d{{2}})\.(gz|log)$",
            regex::escape(prefix)
        );
        let pattern = Regex::new(&pattern)
            .map_err(|e| Error::Config(format!("Invalid log prefix '{}': {}", prefix, e)))?;
        Ok(Self { pattern })
    }

    /// Date embedded in a matching file name
    ///
    /// Returns `None` for names that do not follow the convention or carry
    /// digits that are not a calendar date.
    pub fn date_from_name(&self, file_name: &str) -> Option<NaiveDate> {
        let caps = self.pattern.captures(file_name)?;
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    /// Pick the log with the latest embedded date in `dir`
    ///
    /// A missing directory yields `Ok(None)`. When two files share a date the
    /// lexically smaller name wins, so the result does not depend on the order
    /// in which the file system lists entries.
    pub fn select_latest(&self, dir: &Path) -> Result<Option<LatestLog>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("Log directory {} does not exist", dir.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut latest: Option<(NaiveDate, String)> = None;

        for entry in entries {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            let Some(date) = self.date_from_name(&name) else {
                continue;
            };

            if !entry.path().is_file() {
                tracing::debug!("Skipping {}: not a regular file", name);
                continue;
            }

            let newer = match &latest {
                None => true,
                Some((best_date, best_name)) => {
                    date > *best_date || (date == *best_date && name < *best_name)
                }
            };

            if newer {
                tracing::debug!("Candidate log file: {} ({})", name, date);
                latest = Some((date, name));
            }
        }

        Ok(latest.map(|(date, name)| LatestLog {
            path: dir.join(name),
            date,
        }))
    }
}
