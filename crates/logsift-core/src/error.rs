use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to access log or report file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Too many incorrect log lines: quality {ratio:.3} is below the minimum {threshold:.3}")]
    Quality { ratio: f64, threshold: f64 },

    #[error("Log file contains no lines")]
    EmptyLog,

    #[error("Template error: {0}")]
    Template(String),
}

pub type Result<T> = std::result::Result<T, Error>;
