//! EF extraction engine and consistency evaluator.
//!
//! Input is the plain-text body of a report (already converted from its
//! native format by the Text Extraction Service). The engine emits exactly
//! three typed values — Conclusion, Body, CalculationsTable — and the
//! evaluator reduces them to a `ConsistencyResult`.

pub mod consistency;
pub mod ef;
pub mod regions;
pub mod text_source;
pub mod types;

use thiserror::Error;

pub use consistency::evaluate;
pub use ef::extract_values;
pub use text_source::{CommandTextSource, TextSource};
pub use types::{ConsistencyResult, ConsistencyStatus, EfLocation, ExtractedValue};

/// Extraction never raises for "not found" — that is encoded as Missing.
/// These variants cover the structurally-impossible cases only; both
/// propagate upstream as `ConsistencyStatus::Error`.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("document text is empty")]
    EmptyDocument,

    #[error("text extraction failed: {0}")]
    Tool(String),
}
