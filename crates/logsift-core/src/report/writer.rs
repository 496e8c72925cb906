use super::template::Template;
use crate::Result;
use crate::analysis::UrlSummary;
use crate::config::RunConfig;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the template placeholder that receives the JSON table
pub const TABLE_PLACEHOLDER: &str = "table_json";

pub struct ReportWriter;

impl ReportWriter {
    /// Render the report HTML for already-truncated summaries
    pub fn render(summaries: &[UrlSummary], template: &Template) -> Result<String> {
        let table_json = serde_json::to_string(summaries)?;

        let mut values = HashMap::new();
        values.insert(TABLE_PLACEHOLDER, table_json.as_str());

        Ok(template.safe_substitute(&values))
    }

    /// Render the first `config.report_size` summaries into the configured
    /// template and write the result to `output`
    ///
    /// The report is written to a sibling temp file first and renamed into
    /// place, so `output` either holds a complete report or does not exist.
    pub fn write(summaries: &[UrlSummary], output: &Path, config: &RunConfig) -> Result<()> {
        let template = Template::from_file(&config.template)?;
        let top = &summaries[..config.report_size.min(summaries.len())];
        let html = Self::render(top, &template)?;

        let tmp = temp_path(output);
        tracing::debug!("Writing report to temporary file: {}", tmp.display());

        if let Err(e) = fs::write(&tmp, html.as_bytes()) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, output) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::info!(
            "Wrote report with {} urls to {}",
            top.len(),
            output.display()
        );
        Ok(())
    }
}

fn temp_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "report.html".into());
    name.push(".tmp");
    output.with_file_name(name)
}
