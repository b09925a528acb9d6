//! Batch image conversion.
//!
//! Discovers images in a folder, converts each one into every requested
//! format (optionally scaled) and reports per-file outcomes. Output names never
//! collide: later units get `<stem>.conflicting_name.NNNN.<ext>`.

pub mod backend;
pub mod discovery;
pub mod error;
pub mod formats;
pub mod job;
pub mod naming;
pub mod orchestrator;
pub mod reporter;

pub use backend::{ImageBackend, ImageCrateBackend};
pub use discovery::Discovery;
pub use error::{JobError, Result, UnitError};
pub use formats::TargetFormat;
pub use job::{ConversionJob, JobSettings, Scale};
pub use naming::OutputNamePlan;
pub use orchestrator::{CancelToken, Orchestrator};
pub use reporter::{
    finalize, write_json_report, write_log, BatchSummary, FileOutcome, OutcomeStatus,
    ProgressEvent, ProgressObserver, Reporter,
};
