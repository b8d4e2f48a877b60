//! Report lifecycle: intake, registry, and the per-report state machine.

pub mod intake;
pub mod manager;
pub mod registry;
pub mod types;

use thiserror::Error;
use uuid::Uuid;

pub use manager::LifecycleManager;
pub use registry::ReportRegistry;
pub use types::{Report, ReportState};

use crate::extraction::ExtractionError;
use crate::pipeline::PipelineError;

#[derive(Error, Debug)]
pub enum ReportError {
    /// Malformed or missing request input. No state change.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Referenced report id has no known state.
    #[error("report {0} not found")]
    NotFound(Uuid),

    /// A check or generate is already in flight for this report.
    #[error("report {0} has an operation in flight")]
    Busy(Uuid),

    /// Generate requested while consistency status is not Good.
    /// No external task is ever invoked.
    #[error("generation blocked: report state is {state:?}, requires Good")]
    ConsistencyBlocked { state: ReportState },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry lock poisoned")]
    LockPoisoned,
}
