//! The ordered stage list and per-stage command construction.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// One conversion stage. Wire names keep the variant spelling
/// (`"SourceToIntermediate"` etc.) as callers know them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionStage {
    SourceToIntermediate,
    TemplateAndSign,
    RenderFinal,
}

impl ConversionStage {
    /// Execution order. Stage N+1 runs only after stage N succeeds.
    pub const ALL: [ConversionStage; 3] = [
        Self::SourceToIntermediate,
        Self::TemplateAndSign,
        Self::RenderFinal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceToIntermediate => "SourceToIntermediate",
            Self::TemplateAndSign => "TemplateAndSign",
            Self::RenderFinal => "RenderFinal",
        }
    }

    /// The configured tool for this stage.
    pub fn tool<'a>(&self, cfg: &'a AppConfig) -> &'a crate::config::ToolCommand {
        match self {
            Self::SourceToIntermediate => &cfg.source_to_intermediate,
            Self::TemplateAndSign => &cfg.template_and_sign,
            Self::RenderFinal => &cfg.render_final,
        }
    }

    /// Expected output artifact inside the run's working directory.
    ///
    /// Converters that take an `--outdir` (headless office tools) name
    /// the output after the input stem, so stages 1 and 3 derive the
    /// name from their input; stage 2 writes an explicit output path.
    pub fn output_path(&self, workdir: &Path, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("report");
        match self {
            Self::SourceToIntermediate => workdir.join(format!("{stem}.docx")),
            Self::TemplateAndSign => workdir.join("templated.docx"),
            Self::RenderFinal => workdir.join(format!("{stem}.pdf")),
        }
    }

    /// Render the stage's argument template.
    pub fn args(&self, cfg: &AppConfig, input: &Path, output: &Path, workdir: &Path) -> Vec<String> {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.tool(cfg).render(&[
            ("input", &input.to_string_lossy()),
            ("output", &output.to_string_lossy()),
            ("outdir", &workdir.to_string_lossy()),
            ("template", &cfg.letterhead_template.to_string_lossy()),
            ("signature", &cfg.signature_image.to_string_lossy()),
            ("timestamp", &timestamp),
        ])
    }
}

impl std::fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
