use crate::analysis::SortKey;
use crate::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "./configs/conf.toml";

/// Immutable settings for a single analyzer run
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub report_size: usize,
    pub report_dir: PathBuf,
    pub log_dir: PathBuf,
    pub template: PathBuf,
    pub min_quality: f64,
    pub sort_by: SortKey,
    pub log_prefix: String,
    pub logging_file: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            report_size: 1000,
            report_dir: PathBuf::from("./reports"),
            log_dir: PathBuf::from("./log"),
            template: PathBuf::from("./report.html"),
            min_quality: 0.89,
            sort_by: SortKey::TimeSum,
            log_prefix: "nginx-access-ui.log".to_string(),
            logging_file: None,
        }
    }
}

/// Partial settings layered on top of the defaults
///
/// Every field is optional; a `None` keeps whatever value the lower layer had.
/// Keys are accepted in the upper case form (`REPORT_SIZE`) as well as in
/// lower case.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    #[serde(rename = "REPORT_SIZE", alias = "report_size")]
    pub report_size: Option<usize>,
    #[serde(rename = "REPORT_DIR", alias = "report_dir")]
    pub report_dir: Option<PathBuf>,
    #[serde(rename = "LOG_DIR", alias = "log_dir")]
    pub log_dir: Option<PathBuf>,
    #[serde(rename = "TEMPLATE", alias = "template")]
    pub template: Option<PathBuf>,
    #[serde(rename = "MIN_QUALITY", alias = "min_quality")]
    pub min_quality: Option<f64>,
    #[serde(rename = "SORT_BY", alias = "sort_by")]
    pub sort_by: Option<SortKey>,
    #[serde(rename = "LOG_PREFIX", alias = "log_prefix")]
    pub log_prefix: Option<String>,
    #[serde(rename = "LOGGING_FILE", alias = "logging_file")]
    pub logging_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    default: ConfigOverrides,
}

impl ConfigOverrides {
    /// Parse the `[default]` table of a TOML config document
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.default)
    }

    /// Read and parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Reading config file: {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

impl RunConfig {
    /// Resolve the configuration for a run
    ///
    /// An explicitly requested file must exist. Without one, the default
    /// location is used when present and the built-in defaults otherwise.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let overrides = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                ConfigOverrides::from_file(path)?
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.is_file() {
                    ConfigOverrides::from_file(default_path)?
                } else {
                    tracing::debug!("No config file at {}, using defaults", DEFAULT_CONFIG_PATH);
                    ConfigOverrides::default()
                }
            }
        };

        Self::default().merge(overrides).validated()
    }

    /// Apply overrides key by key, keeping current values for unset keys
    pub fn merge(self, overrides: ConfigOverrides) -> Self {
        Self {
            report_size: overrides.report_size.unwrap_or(self.report_size),
            report_dir: overrides.report_dir.unwrap_or(self.report_dir),
            log_dir: overrides.log_dir.unwrap_or(self.log_dir),
            template: overrides.template.unwrap_or(self.template),
            min_quality: overrides.min_quality.unwrap_or(self.min_quality),
            sort_by: overrides.sort_by.unwrap_or(self.sort_by),
            log_prefix: overrides.log_prefix.unwrap_or(self.log_prefix),
            logging_file: overrides.logging_file.or(self.logging_file),
        }
    }

    /// Check value ranges, returning the config unchanged when valid
    pub fn validated(self) -> Result<Self> {
        if !(0.0..=1.0).contains(&self.min_quality) {
            return Err(Error::Config(format!(
                "MIN_QUALITY must be between 0 and 1, got {}",
                self.min_quality
            )));
        }
        if self.report_size == 0 {
            return Err(Error::Config(
                "REPORT_SIZE must be greater than zero".to_string(),
            ));
        }
        if self.log_prefix.is_empty() {
            return Err(Error::Config("LOG_PREFIX must not be empty".to_string()));
        }
        Ok(self)
    }
}
