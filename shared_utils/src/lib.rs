//! Shared Utilities for the batch image tools
//!
//! - Logging setup (tracing + rolling file appender)
//! - Progress bar factory and quiet mode
//! - Batch counters and extension helpers
//! - Summary reporting
//! - Safety checks (protected directory detection)

pub mod batch;
pub mod logging;
pub mod progress;
pub mod report;
pub mod safety;

pub use batch::{extension_lowercase, normalize_extension, BatchCounts};
pub use progress::{create_progress_bar, format_duration, is_quiet_mode, set_quiet_mode};
pub use report::{print_summary_report, summary_line};
pub use safety::{check_dangerous_directory, SafetyError};
