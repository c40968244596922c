pub mod ask;
pub mod config;
pub mod doctor;
pub mod nutrition;
pub mod search;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use larder_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use larder_core::dataset::{self, DatasetSource, DatasetStore};
use serde::Serialize;
use tokio::runtime::Runtime;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_DATASET: u8 = 3;
pub const EXIT_AGENT: u8 = 4;
const EXIT_RUNTIME: u8 = 1;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    /// Plain text output, printed as-is.
    pub fn text(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    pub config_path: Option<PathBuf>,
    pub dataset: Option<String>,
}

impl CommandContext {
    pub fn load_options(&self, offline: bool) -> LoadOptions {
        LoadOptions {
            config_path: self.config_path.clone(),
            require_file: self.config_path.is_some(),
            offline,
            overrides: ConfigOverrides {
                dataset_source: self.dataset.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub(crate) fn load_config(
    command: &str,
    context: &CommandContext,
    offline: bool,
) -> Result<AppConfig, CommandResult> {
    AppConfig::load(context.load_options(offline)).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

pub(crate) fn async_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}

pub(crate) async fn load_store(config: &AppConfig) -> Result<Arc<DatasetStore>, String> {
    let source = DatasetSource::parse(&config.dataset.source).map_err(|error| error.to_string())?;
    let timeout = Duration::from_secs(config.dataset.fetch_timeout_secs);
    dataset::load(&source, timeout).await.map(Arc::new).map_err(|error| error.to_string())
}

pub(crate) fn dataset_failure(command: &str, message: String) -> CommandResult {
    CommandResult::failure(command, "dataset_load", message, EXIT_DATASET)
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
