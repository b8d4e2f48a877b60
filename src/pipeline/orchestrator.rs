//! Sequential stage execution with a single cross-cutting
//! abort-and-cleanup path.
//!
//! Every artifact a run creates lives under the report namespace's
//! `work/` directory until the final artifact is moved out on success.
//! A drop guard removes `work/` on failure and on cancellation alike,
//! so no orphaned artifacts survive either path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::AppConfig;

use super::stage::ConversionStage;
use super::task::{run_tool, TaskError};
use super::PipelineError;

/// Name of the final artifact within a report's namespace.
pub const FINAL_ARTIFACT: &str = "report.pdf";

/// Orchestrates the three conversion stages for one report at a time,
/// bounded across reports by a counted slot pool.
pub struct ConversionPipeline {
    cfg: Arc<AppConfig>,
    slots: Arc<Semaphore>,
}

impl ConversionPipeline {
    pub fn new(cfg: Arc<AppConfig>) -> Self {
        let slots = Arc::new(Semaphore::new(cfg.max_concurrent_tasks));
        Self { cfg, slots }
    }

    /// Run the full pipeline for one report.
    ///
    /// Returns the final artifact path. Requests beyond the task bound
    /// are rejected with `Saturated` (retryable), never queued silently.
    pub async fn run(
        &self,
        report_id: Uuid,
        source: &Path,
        namespace: &Path,
    ) -> Result<PathBuf, PipelineError> {
        let _permit = self
            .slots
            .try_acquire()
            .map_err(|_| PipelineError::Saturated)?;

        let workdir = namespace.join("work");
        if workdir.exists() {
            std::fs::remove_dir_all(&workdir)?;
        }
        std::fs::create_dir_all(&workdir)?;
        let guard = WorkDirGuard::new(workdir.clone());

        let mut input = source.to_path_buf();
        for stage in ConversionStage::ALL {
            let output = stage.output_path(&workdir, &input);
            self.run_stage(report_id, stage, &input, &output, &workdir)
                .await?;
            input = output;
        }

        let final_path = namespace.join(FINAL_ARTIFACT);
        std::fs::rename(&input, &final_path)?;
        drop(guard); // removes work/, leaving only the final artifact

        tracing::info!(report_id = %report_id, "conversion pipeline complete");
        Ok(final_path)
    }

    async fn run_stage(
        &self,
        report_id: Uuid,
        stage: ConversionStage,
        input: &Path,
        output: &Path,
        workdir: &Path,
    ) -> Result<(), PipelineError> {
        tracing::info!(report_id = %report_id, stage = %stage, "stage starting");

        let tool = stage.tool(&self.cfg);
        let args = stage.args(&self.cfg, input, output, workdir);

        let reason = match run_tool(&tool.program, &args, self.cfg.stage_timeout()).await {
            Ok(_) => {
                // Expected-success contract: the output artifact must exist
                // and be non-empty, or the tool's result is unusable.
                match std::fs::metadata(output) {
                    Ok(meta) if meta.len() > 0 => {
                        tracing::info!(report_id = %report_id, stage = %stage, "stage complete");
                        return Ok(());
                    }
                    Ok(_) => "tool reported success but produced a malformed (empty) output artifact".to_string(),
                    Err(_) => "tool reported success but produced no output artifact".to_string(),
                }
            }
            Err(TaskError::NonZeroExit { status, diagnostic }) => {
                format!("exit status {status}: {diagnostic}")
            }
            Err(e @ (TaskError::Spawn { .. } | TaskError::TimedOut { .. })) => e.to_string(),
        };

        tracing::warn!(report_id = %report_id, stage = %stage, reason, "stage failed, aborting pipeline");
        Err(PipelineError::Stage {
            stage,
            reason,
        })
    }
}

/// Removes the run's working directory on drop. Success defuses nothing:
/// the final artifact has already been moved out, so removing `work/`
/// is exactly the "no intermediates left behind" guarantee. On failure
/// or cancellation the same drop deletes everything the run created.
struct WorkDirGuard {
    path: PathBuf,
}

impl WorkDirGuard {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Drop for WorkDirGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove pipeline workdir");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolCommand;

    /// Stub stage that copies input to output: `sh -c 'cp "$0" "$1"' in out`
    fn copy_stage() -> ToolCommand {
        ToolCommand::new("/bin/sh", &["-c", "cp \"$0\" \"$1\"", "{input}", "{output}"])
    }

    fn failing_stage(message: &str, code: u8) -> ToolCommand {
        ToolCommand::new(
            "/bin/sh",
            &["-c", &format!("echo '{message}' >&2; exit {code}")],
        )
    }

    fn test_setup(cfg: AppConfig) -> (tempfile::TempDir, ConversionPipeline, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let namespace = dir.path().join("reports").join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&namespace).unwrap();
        let source = namespace.join("source.rtf");
        std::fs::write(&source, "{\\rtf1 CONCLUSION: EF 55%}").unwrap();
        let pipeline = ConversionPipeline::new(Arc::new(cfg));
        (dir, pipeline, namespace, source)
    }

    fn all_copy_config() -> AppConfig {
        AppConfig {
            source_to_intermediate: copy_stage(),
            template_and_sign: copy_stage(),
            render_final: copy_stage(),
            stage_timeout_secs: 10,
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn full_success_leaves_only_final_artifact() {
        let (_dir, pipeline, namespace, source) = test_setup(all_copy_config());
        let final_path = pipeline
            .run(Uuid::new_v4(), &source, &namespace)
            .await
            .unwrap();

        assert_eq!(final_path, namespace.join(FINAL_ARTIFACT));
        assert!(final_path.exists());
        assert!(!namespace.join("work").exists(), "no intermediates may remain");
        assert!(source.exists(), "source artifact is not a run product");
    }

    #[tokio::test]
    async fn stage_two_failure_cleans_up_stage_one_output() {
        let cfg = AppConfig {
            template_and_sign: failing_stage("template engine rejected document", 7),
            ..all_copy_config()
        };
        let (_dir, pipeline, namespace, source) = test_setup(cfg);

        let err = pipeline
            .run(Uuid::new_v4(), &source, &namespace)
            .await
            .unwrap_err();

        match &err {
            PipelineError::Stage { stage, reason } => {
                assert_eq!(*stage, ConversionStage::TemplateAndSign);
                assert!(reason.contains("template engine rejected document"));
                assert!(reason.contains("exit status 7"));
            }
            other => panic!("expected stage failure, got {other:?}"),
        }
        // Cleanup invariant: zero artifacts from stages 1 and 2 remain.
        assert!(!namespace.join("work").exists());
        assert!(!namespace.join(FINAL_ARTIFACT).exists());
    }

    #[tokio::test]
    async fn first_stage_nonzero_exit_reports_source_to_intermediate() {
        let cfg = AppConfig {
            source_to_intermediate: failing_stage("rtf converter crashed", 1),
            ..all_copy_config()
        };
        let (_dir, pipeline, namespace, source) = test_setup(cfg);

        let err = pipeline
            .run(Uuid::new_v4(), &source, &namespace)
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(ConversionStage::SourceToIntermediate));
        assert!(!namespace.join("work").exists());
    }

    #[tokio::test]
    async fn success_exit_without_output_artifact_is_a_failure() {
        let cfg = AppConfig {
            // exits 0 but writes nothing
            source_to_intermediate: ToolCommand::new("/bin/sh", &["-c", "true"]),
            ..all_copy_config()
        };
        let (_dir, pipeline, namespace, source) = test_setup(cfg);

        let err = pipeline
            .run(Uuid::new_v4(), &source, &namespace)
            .await
            .unwrap_err();
        match err {
            PipelineError::Stage { reason, .. } => assert!(reason.contains("no output artifact")),
            other => panic!("expected stage failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_output_artifact_is_malformed() {
        let cfg = AppConfig {
            source_to_intermediate: ToolCommand::new(
                "/bin/sh",
                &["-c", ": > \"$0\"", "{output}"],
            ),
            ..all_copy_config()
        };
        let (_dir, pipeline, namespace, source) = test_setup(cfg);

        let err = pipeline
            .run(Uuid::new_v4(), &source, &namespace)
            .await
            .unwrap_err();
        match err {
            PipelineError::Stage { reason, .. } => assert!(reason.contains("malformed")),
            other => panic!("expected stage failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stage_timeout_is_a_stage_failure_with_cleanup() {
        let cfg = AppConfig {
            source_to_intermediate: ToolCommand::new("/bin/sh", &["-c", "sleep 30"]),
            stage_timeout_secs: 0,
            ..all_copy_config()
        };
        let (_dir, pipeline, namespace, source) = test_setup(cfg);

        let err = pipeline
            .run(Uuid::new_v4(), &source, &namespace)
            .await
            .unwrap_err();
        match err {
            PipelineError::Stage { stage, reason } => {
                assert_eq!(stage, ConversionStage::SourceToIntermediate);
                assert!(reason.contains("timed out"));
            }
            other => panic!("expected stage failure, got {other:?}"),
        }
        assert!(!namespace.join("work").exists());
    }

    #[tokio::test]
    async fn aborted_run_cleans_up_workdir() {
        // Cancellation mid-stage must leave no run artifacts behind,
        // exactly like a stage failure.
        let cfg = AppConfig {
            source_to_intermediate: ToolCommand::new("/bin/sh", &["-c", "sleep 30"]),
            ..all_copy_config()
        };
        let (_dir, pipeline, namespace, source) = test_setup(cfg);
        let pipeline = Arc::new(pipeline);
        let workdir = namespace.join("work");

        let task = tokio::spawn({
            let pipeline = pipeline.clone();
            let source = source.clone();
            let namespace = namespace.clone();
            async move { pipeline.run(Uuid::new_v4(), &source, &namespace).await }
        });

        // Wait until the run is inside the stage, then cancel it.
        for _ in 0..100 {
            if workdir.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(workdir.exists(), "run should be mid-stage before the abort");

        task.abort();
        let joined = task.await;
        assert!(joined.is_err(), "aborted task must not settle normally");
        assert!(!workdir.exists(), "no artifacts may survive cancellation");
        assert!(!namespace.join(FINAL_ARTIFACT).exists());
        assert!(source.exists(), "source artifact is not a run product");
    }

    #[tokio::test]
    async fn requests_beyond_task_bound_are_rejected_retryable() {
        let cfg = AppConfig {
            max_concurrent_tasks: 0,
            ..all_copy_config()
        };
        let (_dir, pipeline, namespace, source) = test_setup(cfg);

        let err = pipeline
            .run(Uuid::new_v4(), &source, &namespace)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Saturated));
        assert!(!namespace.join("work").exists());
    }
}
