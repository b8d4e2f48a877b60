//! Report record and its finite-state machine.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extraction::{ConsistencyResult, ConsistencyStatus};

/// Per-report lifecycle states.
///
/// `Uploaded → Checking → {Good|Discordant|Incomplete|CheckError}
///  → [from Good only] Generating → {Ready|GenerateError} → CleanedUp`
///
/// Checking is re-enterable from any check outcome; CleanedUp is
/// terminal and reachable from any settled state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportState {
    Uploaded,
    Checking,
    Good,
    Discordant,
    Incomplete,
    CheckError,
    Generating,
    Ready,
    GenerateError,
    CleanedUp,
}

impl ReportState {
    /// Whether a consistency check may start from this state.
    pub fn can_check(&self) -> bool {
        matches!(
            self,
            Self::Uploaded | Self::Good | Self::Discordant | Self::Incomplete | Self::CheckError
        )
    }

    /// Generation is gated on a Good check outcome, nothing else.
    pub fn can_generate(&self) -> bool {
        matches!(self, Self::Good)
    }

    /// In-flight states: exactly one operation owns the report.
    pub fn in_flight(&self) -> bool {
        matches!(self, Self::Checking | Self::Generating)
    }

    /// Settled state for a check outcome.
    pub fn from_check(status: ConsistencyStatus) -> Self {
        match status {
            ConsistencyStatus::Good => Self::Good,
            ConsistencyStatus::Discordant => Self::Discordant,
            ConsistencyStatus::Incomplete => Self::Incomplete,
            ConsistencyStatus::Error => Self::CheckError,
        }
    }
}

/// One uploaded document under processing. Owned exclusively by the
/// registry; other components receive the id and relevant paths only.
#[derive(Debug, Clone)]
pub struct Report {
    pub id: Uuid,
    pub original_filename: String,
    pub source_path: PathBuf,
    pub state: ReportState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last completed check, discarded when a re-check starts.
    pub last_check: Option<ConsistencyResult>,
    /// Final artifact, present only in Ready state.
    pub final_artifact: Option<PathBuf>,
}

impl Report {
    pub fn new(id: Uuid, original_filename: String, source_path: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id,
            original_filename,
            source_path,
            state: ReportState::Uploaded,
            created_at: now,
            updated_at: now,
            last_check: None,
            final_artifact: None,
        }
    }

    pub fn set_state(&mut self, state: ReportState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_allowed_from_uploaded_and_all_check_outcomes() {
        for state in [
            ReportState::Uploaded,
            ReportState::Good,
            ReportState::Discordant,
            ReportState::Incomplete,
            ReportState::CheckError,
        ] {
            assert!(state.can_check(), "{state:?} should allow check");
        }
        for state in [
            ReportState::Checking,
            ReportState::Generating,
            ReportState::Ready,
            ReportState::GenerateError,
            ReportState::CleanedUp,
        ] {
            assert!(!state.can_check(), "{state:?} should reject check");
        }
    }

    #[test]
    fn generate_allowed_only_from_good() {
        assert!(ReportState::Good.can_generate());
        for state in [
            ReportState::Uploaded,
            ReportState::Checking,
            ReportState::Discordant,
            ReportState::Incomplete,
            ReportState::CheckError,
            ReportState::Generating,
            ReportState::Ready,
            ReportState::GenerateError,
            ReportState::CleanedUp,
        ] {
            assert!(!state.can_generate(), "{state:?} should block generate");
        }
    }

    #[test]
    fn check_outcome_maps_to_state() {
        assert_eq!(ReportState::from_check(ConsistencyStatus::Good), ReportState::Good);
        assert_eq!(
            ReportState::from_check(ConsistencyStatus::Error),
            ReportState::CheckError
        );
    }

    #[test]
    fn new_report_starts_uploaded() {
        let report = Report::new(Uuid::new_v4(), "echo.rtf".into(), "/tmp/x".into());
        assert_eq!(report.state, ReportState::Uploaded);
        assert!(report.last_check.is_none());
    }
}
