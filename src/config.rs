//! Application constants and runtime configuration.
//!
//! External conversion tools are configured as command templates with
//! `{placeholder}` substitution so the collaborators stay replaceable
//! (and tests can point the stages at stub commands).

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "efqa";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address for the HTTP surface (loopback only).
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

/// Upper bound on raw tool diagnostics surfaced to callers.
pub const MAX_DIAGNOSTIC_BYTES: usize = 2048;

/// Maximum accepted upload size (source reports are small RTF files).
pub const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Truncate raw tool output to the surfaced diagnostic bound,
/// respecting UTF-8 char boundaries.
pub fn bound_diagnostic(raw: &str) -> String {
    if raw.len() <= MAX_DIAGNOSTIC_BYTES {
        return raw.trim().to_string();
    }
    let mut end = MAX_DIAGNOSTIC_BYTES;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}… [truncated]", raw[..end].trim_end())
}

/// Get the application data directory (`~/efqa/`).
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("efqa")
}

/// Get the per-report artifact root (`~/efqa/reports/`).
pub fn reports_dir() -> PathBuf {
    app_data_dir().join("reports")
}

/// Get the static asset directory (letterhead template, signature image).
pub fn assets_dir() -> PathBuf {
    app_data_dir().join("assets")
}

/// Default log filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    format!("{APP_NAME}=info,tower_http=warn")
}

/// One external tool invocation, as a command template.
///
/// Placeholders substituted at invocation time:
/// `{input}`, `{output}`, `{outdir}`, `{template}`, `{signature}`, `{timestamp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Substitute placeholders in the argument template.
    pub fn render(&self, vars: &[(&str, &str)]) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                let mut rendered = arg.clone();
                for (key, value) in vars {
                    rendered = rendered.replace(&format!("{{{key}}}"), value);
                }
                rendered
            })
            .collect()
    }
}

/// Runtime configuration for the QA service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root of the id-scoped per-report artifact namespace.
    pub reports_dir: PathBuf,
    /// Letterhead template applied by the TemplateAndSign stage.
    pub letterhead_template: PathBuf,
    /// Signature image inserted by the TemplateAndSign stage.
    pub signature_image: PathBuf,
    /// Text Extraction Service command (plain text on stdout).
    pub text_extract: ToolCommand,
    /// Stage 1: source artifact -> editable intermediate document.
    pub source_to_intermediate: ToolCommand,
    /// Stage 2: letterhead + signature applied to the intermediate.
    pub template_and_sign: ToolCommand,
    /// Stage 3: templated document -> final fixed-layout output.
    pub render_final: ToolCommand,
    /// Per-stage timeout in seconds. Expiry counts as stage failure.
    pub stage_timeout_secs: u64,
    /// Bound on simultaneously running external tasks across all reports.
    pub max_concurrent_tasks: usize,
    /// Remove the whole report namespace on terminal pipeline failure.
    pub auto_clean_on_failure: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reports_dir: reports_dir(),
            letterhead_template: assets_dir().join("letterhead.docx"),
            signature_image: assets_dir().join("signature.png"),
            text_extract: ToolCommand::new("unrtf", &["--text", "{input}"]),
            source_to_intermediate: ToolCommand::new(
                "soffice",
                &[
                    "--headless",
                    "--convert-to",
                    "docx",
                    "--outdir",
                    "{outdir}",
                    "{input}",
                ],
            ),
            template_and_sign: ToolCommand::new(
                "report-templater",
                &[
                    "--template",
                    "{template}",
                    "--signature",
                    "{signature}",
                    "--stamp",
                    "{timestamp}",
                    "--output",
                    "{output}",
                    "{input}",
                ],
            ),
            render_final: ToolCommand::new(
                "soffice",
                &[
                    "--headless",
                    "--convert-to",
                    "pdf",
                    "--outdir",
                    "{outdir}",
                    "{input}",
                ],
            ),
            stage_timeout_secs: 120,
            max_concurrent_tasks: 4,
            auto_clean_on_failure: false,
        }
    }
}

impl AppConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }
}
