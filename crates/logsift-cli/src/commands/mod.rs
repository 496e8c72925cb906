pub mod completion;
pub mod report;
pub mod stats;
