//! Conversion pipeline: source report → templated, signed, rendered PDF.
//!
//! Three external stages run strictly sequentially; any failure aborts
//! the remaining stages and deletes every artifact the run created
//! before the failure is surfaced.

pub mod orchestrator;
pub mod stage;
pub mod task;

use thiserror::Error;

pub use orchestrator::{ConversionPipeline, FINAL_ARTIFACT};
pub use stage::ConversionStage;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// All external task slots are in use. Retryable.
    #[error("conversion capacity exhausted, retry later")]
    Saturated,

    /// A stage exited abnormally, timed out, or produced no usable
    /// output artifact. Cleanup has already run when this surfaces.
    #[error("{stage} failed: {reason}")]
    Stage {
        stage: ConversionStage,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// The failing stage, when the error is a stage failure.
    pub fn stage(&self) -> Option<ConversionStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
