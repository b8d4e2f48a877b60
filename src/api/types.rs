//! Shared context and wire types for the API layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extraction::{ConsistencyResult, EfLocation, ExtractedValue};
use crate::report::{LifecycleManager, Report, ReportState};

/// Shared state for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub manager: Arc<LifecycleManager>,
}

impl ApiContext {
    pub fn new(manager: Arc<LifecycleManager>) -> Self {
        Self { manager }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub report_id: Uuid,
    pub filename: String,
    pub state: ReportState,
}

impl From<Report> for UploadResponse {
    fn from(report: Report) -> Self {
        Self {
            report_id: report.id,
            filename: report.original_filename,
            state: report.state,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report_id: Uuid,
    pub filename: String,
    pub state: ReportState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check: Option<CheckResponse>,
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        Self {
            report_id: report.id,
            filename: report.original_filename,
            state: report.state,
            created_at: report.created_at,
            updated_at: report.updated_at,
            last_check: report.last_check.map(CheckResponse::from),
        }
    }
}

/// One extracted EF echo on the wire.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValueBody {
    pub value: Option<u32>,
    pub raw: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ambiguous: bool,
}

impl From<&ExtractedValue> for ValueBody {
    fn from(value: &ExtractedValue) -> Self {
        Self {
            value: value.percent,
            raw: value.raw.clone(),
            ambiguous: value.ambiguous,
        }
    }
}

/// The three echoes keyed by their historical JSON names.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValuesBody {
    pub conclusion: ValueBody,
    pub text: ValueBody,
    pub calcs: ValueBody,
}

/// Check outcome on the wire: lowercase status plus the three echoes.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub status: String,
    pub values: ValuesBody,
    pub message: String,
}

impl From<ConsistencyResult> for CheckResponse {
    fn from(result: ConsistencyResult) -> Self {
        Self {
            status: result.status.as_str().to_string(),
            values: ValuesBody {
                conclusion: result.value(EfLocation::Conclusion).into(),
                text: result.value(EfLocation::Body).into(),
                calcs: result.value(EfLocation::CalculationsTable).into(),
            },
            message: result.message.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub success: bool,
}
