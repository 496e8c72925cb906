mod parser;
mod reader;
mod selector;

pub use parser::{InvalidReason, ParsedLine, parse_line};
pub use reader::{LogLines, LogReader};
pub use selector::{LatestLog, LogSelector};
