//! Report module - exporting and summarizing clustering results

pub mod export;
pub mod run_report;
pub mod summary;

pub use export::*;
pub use run_report::*;
pub use summary::*;
