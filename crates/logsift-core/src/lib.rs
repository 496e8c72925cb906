pub mod analysis;
pub mod config;
pub mod error;
pub mod log;
pub mod report;

pub use config::RunConfig;
pub use error::{Error, Result};
