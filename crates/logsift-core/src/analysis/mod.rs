mod aggregator;
mod stats;

pub use aggregator::LogAggregator;
pub use stats::{median, round3};

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timing statistics for a single URL
///
/// Field order is the serialized order expected by the report template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlSummary {
    pub url: String,
    pub count: usize,
    pub count_perc: f64,
    pub time_avg: f64,
    pub time_max: f64,
    pub time_med: f64,
    pub time_perc: f64,
    pub time_sum: f64,
}

impl UrlSummary {
    /// Build a summary from the raw request times observed for `url`
    ///
    /// `valid_count` and `total_time` are the run-wide totals over all valid
    /// lines. Returns `None` when `times` is empty.
    pub fn from_samples(
        url: &str,
        times: &[f64],
        valid_count: usize,
        total_time: f64,
    ) -> Option<Self> {
        let count = times.len();
        let time_med = median(times)?;
        let time_sum: f64 = times.iter().sum();
        let time_max = times.iter().copied().fold(f64::MIN, f64::max);

        let time_perc = if total_time > 0.0 {
            round3(time_sum / total_time)
        } else {
            0.0
        };

        Some(Self {
            url: url.to_string(),
            count,
            count_perc: round3(count as f64 / valid_count as f64),
            time_avg: round3(time_sum / count as f64),
            time_max,
            time_med,
            time_perc,
            time_sum,
        })
    }

    /// Value of the metric used for ranking
    pub fn metric(&self, key: SortKey) -> f64 {
        match key {
            SortKey::Count => self.count as f64,
            SortKey::CountPerc => self.count_perc,
            SortKey::TimeSum => self.time_sum,
            SortKey::TimeAvg => self.time_avg,
            SortKey::TimeMax => self.time_max,
            SortKey::TimeMed => self.time_med,
            SortKey::TimePerc => self.time_perc,
        }
    }
}

/// Numeric summary field a report is ranked by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Count,
    CountPerc,
    TimeSum,
    TimeAvg,
    TimeMax,
    TimeMed,
    TimePerc,
}

impl SortKey {
    pub const ALL: [SortKey; 7] = [
        SortKey::Count,
        SortKey::CountPerc,
        SortKey::TimeSum,
        SortKey::TimeAvg,
        SortKey::TimeMax,
        SortKey::TimeMed,
        SortKey::TimePerc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Count => "count",
            SortKey::CountPerc => "count_perc",
            SortKey::TimeSum => "time_sum",
            SortKey::TimeAvg => "time_avg",
            SortKey::TimeMax => "time_max",
            SortKey::TimeMed => "time_med",
            SortKey::TimePerc => "time_perc",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == needle)
            .ok_or_else(|| {
                let names: Vec<&str> = SortKey::ALL.iter().map(SortKey::as_str).collect();
                Error::Config(format!(
                    "unknown sort key '{}', expected one of: {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// Result of aggregating one log
#[derive(Debug, Clone, Serialize)]
pub struct AggregateOutcome {
    /// Ranked summaries, highest metric first
    pub summaries: Vec<UrlSummary>,
    pub total_lines: usize,
    pub valid_lines: usize,
    pub total_time: f64,
}

impl AggregateOutcome {
    /// Fraction of lines that parsed into a URL and request time
    pub fn quality(&self) -> f64 {
        if self.total_lines == 0 {
            return 0.0;
        }
        self.valid_lines as f64 / self.total_lines as f64
    }

    /// The first `n` ranked summaries
    pub fn top(&self, n: usize) -> &[UrlSummary] {
        &self.summaries[..n.min(self.summaries.len())]
    }
}
