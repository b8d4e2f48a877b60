//! Lifecycle operations over the registry: upload, check, generate,
//! cleanup.
//!
//! Check and generate run on spawned tasks so a caller that disconnects
//! mid-operation cannot strand a report in an in-flight state; the task
//! always settles the registry before it finishes.

use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::AppConfig;
use crate::extraction::{self, CommandTextSource, ConsistencyResult, TextSource};
use crate::pipeline::{ConversionPipeline, PipelineError};

use super::types::{Report, ReportState};
use super::{intake, ReportError, ReportRegistry};

pub struct LifecycleManager {
    cfg: Arc<AppConfig>,
    registry: Arc<ReportRegistry>,
    text_source: Arc<dyn TextSource>,
    pipeline: Arc<ConversionPipeline>,
}

impl LifecycleManager {
    pub fn new(cfg: Arc<AppConfig>) -> Self {
        let text_source = Arc::new(CommandTextSource::new(
            cfg.text_extract.clone(),
            cfg.stage_timeout(),
        ));
        Self::with_text_source(cfg, text_source)
    }

    /// Construction seam for substituting the Text Extraction Service.
    pub fn with_text_source(cfg: Arc<AppConfig>, text_source: Arc<dyn TextSource>) -> Self {
        let registry = Arc::new(ReportRegistry::new(cfg.reports_dir.clone()));
        let pipeline = Arc::new(ConversionPipeline::new(cfg.clone()));
        Self {
            cfg,
            registry,
            text_source,
            pipeline,
        }
    }

    pub fn registry(&self) -> &ReportRegistry {
        &self.registry
    }

    /// Validate and stage an upload, returning the new report record.
    pub fn upload(&self, filename: &str, bytes: &[u8]) -> Result<Report, ReportError> {
        std::fs::create_dir_all(self.registry.root())?;
        let report = intake::stage_report(self.registry.root(), filename, bytes)?;
        self.registry.insert(report.clone())?;
        Ok(report)
    }

    /// Run a consistency check. Extraction failures settle the report as
    /// CheckError and come back as a result with status `error`, never as
    /// a transport failure.
    pub async fn check(&self, id: Uuid) -> Result<ConsistencyResult, ReportError> {
        let report = self.registry.begin_check(&id)?;

        let registry = self.registry.clone();
        let text_source = self.text_source.clone();
        let handle = tokio::spawn(async move {
            let result = match text_source.plain_text(&report.source_path).await {
                Ok(text) => match extraction::extract_values(&text) {
                    Ok(values) => extraction::evaluate(values),
                    Err(e) => ConsistencyResult::structural_error(e.to_string()),
                },
                Err(e) => ConsistencyResult::structural_error(e.to_string()),
            };
            tracing::info!(report_id = %id, status = %result.status.as_str(), "check settled");
            registry.settle_check(&id, result)
        });

        handle
            .await
            .map_err(|e| ReportError::Io(std::io::Error::other(e)))?
    }

    /// Run the conversion pipeline and return the final artifact path.
    ///
    /// Gated on a Good consistency status; everything else is rejected
    /// before any external task starts. Saturation is retryable and
    /// leaves the report in Good.
    pub async fn generate(&self, id: Uuid) -> Result<PathBuf, ReportError> {
        let report = self.registry.begin_generate(&id)?;
        let namespace = self.registry.namespace(&id);

        let cfg = self.cfg.clone();
        let registry = self.registry.clone();
        let pipeline = self.pipeline.clone();
        let handle = tokio::spawn(async move {
            match pipeline.run(id, &report.source_path, &namespace).await {
                Ok(final_path) => {
                    registry.settle_generate(&id, ReportState::Ready, Some(final_path.clone()))?;
                    Ok(final_path)
                }
                Err(PipelineError::Saturated) => {
                    registry.settle_generate(&id, ReportState::Good, None)?;
                    Err(PipelineError::Saturated.into())
                }
                Err(e) => {
                    registry.settle_generate(&id, ReportState::GenerateError, None)?;
                    if cfg.auto_clean_on_failure {
                        registry.cleanup(&id)?;
                    }
                    Err(e.into())
                }
            }
        });

        handle
            .await
            .map_err(|e| ReportError::Io(std::io::Error::other(e)))?
    }

    /// Remove all artifacts for a report. Idempotent.
    pub fn cleanup(&self, id: Uuid) -> Result<bool, ReportError> {
        self.registry.cleanup(&id)
    }

    pub fn get(&self, id: Uuid) -> Result<Report, ReportError> {
        self.registry.get(&id)
    }
}
