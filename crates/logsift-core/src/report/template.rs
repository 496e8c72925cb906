use crate::{Error, Result};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\$(?:(\$)|([_A-Za-z][_A-Za-z0-9]*)|\{([_A-Za-z][_A-Za-z0-9]*)\})").unwrap();
}

/// HTML report template with `$name` / `${name}` placeholders
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Load a UTF-8 template file
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Reading report template: {}", path.display());

        let bytes = fs::read(path)?;
        let source = String::from_utf8(bytes).map_err(|e| {
            Error::Template(format!("{} is not valid UTF-8: {}", path.display(), e))
        })?;
        Ok(Self { source })
    }

    /// Replace known placeholders, leaving everything else untouched
    ///
    /// `$$` collapses to a single `$`. Placeholders without a value, and `$`
    /// signs that do not start a placeholder, are copied through as-is.
    pub fn safe_substitute(&self, values: &HashMap<&str, &str>) -> String {
        PLACEHOLDER
            .replace_all(&self.source, |caps: &Captures| {
                if caps.get(1).is_some() {
                    return "$".to_string();
                }
                let name = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
                match name.and_then(|n| values.get(n)) {
                    Some(value) => value.to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}
