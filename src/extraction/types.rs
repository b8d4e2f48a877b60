//! Core types for EF extraction and consistency evaluation.

use serde::{Deserialize, Serialize};

/// The three canonical report regions where EF is expected to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EfLocation {
    Conclusion,
    Body,
    CalculationsTable,
}

impl EfLocation {
    /// Wire key used in check responses (matches the historical JSON contract).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conclusion => "conclusion",
            Self::Body => "text",
            Self::CalculationsTable => "calcs",
        }
    }
}

/// One located EF candidate. `percent` is `None` when the location had
/// no parseable EF mention (Missing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedValue {
    pub location: EfLocation,
    /// The matched literal exactly as it appears in the document,
    /// e.g. `"55%"` or `"55"` when the source omits the percent sign.
    pub raw: Option<String>,
    /// Normalized whole-percent value.
    pub percent: Option<u32>,
    /// Set when several candidates matched and the first was taken.
    pub ambiguous: bool,
}

impl ExtractedValue {
    pub fn found(location: EfLocation, raw: impl Into<String>, percent: u32) -> Self {
        Self {
            location,
            raw: Some(raw.into()),
            percent: Some(percent),
            ambiguous: false,
        }
    }

    pub fn missing(location: EfLocation) -> Self {
        Self {
            location,
            raw: None,
            percent: None,
            ambiguous: false,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.percent.is_none()
    }
}

/// Classification of whether a report's three EF mentions agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyStatus {
    Good,
    Discordant,
    Incomplete,
    Error,
}

impl ConsistencyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Discordant => "discordant",
            Self::Incomplete => "incomplete",
            Self::Error => "error",
        }
    }
}

/// Outcome of evaluating exactly three extracted values
/// (Conclusion, Body, CalculationsTable — always in that order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyResult {
    pub status: ConsistencyStatus,
    pub values: [ExtractedValue; 3],
    pub message: String,
}

impl ConsistencyResult {
    /// Result for a document whose text could not be segmented at all.
    /// All three echoes are Missing; equality is never evaluated.
    pub fn structural_error(message: impl Into<String>) -> Self {
        Self {
            status: ConsistencyStatus::Error,
            values: [
                ExtractedValue::missing(EfLocation::Conclusion),
                ExtractedValue::missing(EfLocation::Body),
                ExtractedValue::missing(EfLocation::CalculationsTable),
            ],
            message: message.into(),
        }
    }

    pub fn value(&self, location: EfLocation) -> &ExtractedValue {
        self.values
            .iter()
            .find(|v| v.location == location)
            .expect("three fixed locations")
    }
}
