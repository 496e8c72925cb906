use clap::ValueEnum;

pub mod commands;

/// How `logsift stats` prints its aggregation
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Styled summary with quality and totals, then the ranked URLs
    Pretty,
    /// Totals and a `urls` array of per-URL summaries
    Json,
    /// CSV rows in report field order, URL first
    Table,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pretty => "pretty",
            OutputFormat::Json => "json",
            OutputFormat::Table => "table",
        }
    }
}
