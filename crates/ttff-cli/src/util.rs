use std::fs;
use std::path::Path;

use chrono::Utc;
use clap::Args;
use fastapi_output::RichOutput;
use serde::Serialize;
use sqlmodel_console::OutputMode as SqlModelOutputMode;
use ttff_core::{RunMatrix, load_table_files};

use crate::error::Result;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "TTFF_LOG";

#[must_use]
pub fn now_utc_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Install a stderr subscriber filtered by `TTFF_LOG` (default `warn`).
/// A second call is a no-op.
pub fn init_logging() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init();
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputIntegration {
    pub fastapi_mode: String,
    pub fastapi_agent: bool,
    pub fastapi_ci: bool,
    pub fastapi_tty: bool,
    pub sqlmodel_mode: String,
    pub sqlmodel_agent: bool,
}

impl OutputIntegration {
    #[must_use]
    pub fn detect() -> Self {
        let fastapi_detection = fastapi_output::detect_environment();
        let fastapi_mode = fastapi_output::OutputMode::auto();
        let sqlmodel_mode = SqlModelOutputMode::detect();
        Self {
            fastapi_mode: fastapi_mode.as_str().to_string(),
            fastapi_agent: fastapi_detection.is_agent,
            fastapi_ci: fastapi_detection.is_ci,
            fastapi_tty: fastapi_detection.is_tty,
            sqlmodel_mode: sqlmodel_mode.as_str().to_string(),
            sqlmodel_agent: SqlModelOutputMode::is_agent_environment(),
        }
    }

    #[must_use]
    pub fn should_emit_json(&self) -> bool {
        self.sqlmodel_mode == "json"
    }
}

#[derive(Debug, Clone)]
pub struct CliOutput {
    inner: RichOutput,
    enabled: bool,
}

impl CliOutput {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            inner: RichOutput::auto(),
            enabled,
        }
    }

    pub fn rule(&self, title: Option<&str>) {
        if self.enabled {
            self.inner.rule(title);
        }
    }

    pub fn info(&self, message: &str) {
        if self.enabled {
            self.inner.info(message);
        }
    }

    pub fn success(&self, message: &str) {
        if self.enabled {
            self.inner.success(message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.enabled {
            self.inner.warning(message);
        }
    }
}

/// Status and duration tables shared by every command that reads history.
#[derive(Debug, Clone, Args)]
pub struct TableArgs {
    /// CSV of pass/fail cells (header: run id, then test case names).
    #[arg(long, value_name = "CSV")]
    pub statuses: std::path::PathBuf,

    /// CSV of durations with the same header and run ids.
    #[arg(long, value_name = "CSV")]
    pub durations: std::path::PathBuf,
}

impl TableArgs {
    pub fn load(&self) -> Result<RunMatrix> {
        Ok(load_table_files(&self.statuses, &self.durations)?)
    }
}

/// Resolve whether to print JSON instead of human output.
#[must_use]
pub fn json_mode(flag: bool, integration: &OutputIntegration) -> bool {
    flag || integration.should_emit_json()
}

/// Wrap a command result in the `{status, command, generated_at, result}`
/// envelope shared by stdout and `--output` files.
pub fn envelope<T: Serialize>(command: &str, result: &T) -> Result<serde_json::Value> {
    Ok(serde_json::json!({
        "status": "ok",
        "command": command,
        "generated_at": now_utc_iso(),
        "result": serde_json::to_value(result)?,
    }))
}

pub fn write_string(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// Format seconds with a fixed precision for human output.
#[must_use]
pub fn fmt_secs(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.3}")
    } else {
        "inf".to_string()
    }
}
