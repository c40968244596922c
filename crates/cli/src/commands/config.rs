use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use larder_core::config::AppConfig;
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{load_config, CommandContext, CommandResult};

struct ConfigLine {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run(context: &CommandContext) -> CommandResult {
    let config = match load_config("config", context, true) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path(context.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: cli > env > file > default):".to_string()];
    for line in effective_lines(&config) {
        let source = if line.key == "dataset.source" && context.dataset.is_some() {
            "cli (--dataset)".to_string()
        } else {
            field_source(
                line.key,
                line.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            )
        };
        lines.push(format!("- {} = {} (source: {source})", line.key, line.value));
    }

    CommandResult::text(lines.join("\n"))
}

fn effective_lines(config: &AppConfig) -> Vec<ConfigLine> {
    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    let static_dir = config
        .server
        .static_dir
        .as_ref()
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|| "<unset>".to_string());

    vec![
        ConfigLine {
            key: "dataset.source",
            env_keys: &["LARDER_DATASET_SOURCE"],
            value: config.dataset.source.clone(),
        },
        ConfigLine {
            key: "dataset.fetch_timeout_secs",
            env_keys: &["LARDER_DATASET_FETCH_TIMEOUT_SECS"],
            value: config.dataset.fetch_timeout_secs.to_string(),
        },
        ConfigLine {
            key: "llm.provider",
            env_keys: &["LARDER_LLM_PROVIDER"],
            value: config.llm.provider.as_str().to_string(),
        },
        ConfigLine {
            key: "llm.model",
            env_keys: &["LARDER_LLM_MODEL"],
            value: config.llm.effective_model().to_string(),
        },
        ConfigLine {
            key: "llm.base_url",
            env_keys: &["LARDER_LLM_BASE_URL"],
            value: config.llm.effective_base_url().to_string(),
        },
        ConfigLine { key: "llm.api_key", env_keys: &["LARDER_LLM_API_KEY"], value: api_key },
        ConfigLine {
            key: "llm.timeout_secs",
            env_keys: &["LARDER_LLM_TIMEOUT_SECS"],
            value: config.llm.timeout_secs.to_string(),
        },
        ConfigLine {
            key: "llm.temperature",
            env_keys: &["LARDER_LLM_TEMPERATURE"],
            value: config.llm.temperature.to_string(),
        },
        ConfigLine {
            key: "server.bind_address",
            env_keys: &["LARDER_SERVER_BIND_ADDRESS"],
            value: config.server.bind_address.clone(),
        },
        ConfigLine {
            key: "server.port",
            env_keys: &["LARDER_SERVER_PORT"],
            value: config.server.port.to_string(),
        },
        ConfigLine {
            key: "server.static_dir",
            env_keys: &["LARDER_SERVER_STATIC_DIR"],
            value: static_dir,
        },
        ConfigLine {
            key: "server.graceful_shutdown_secs",
            env_keys: &["LARDER_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            value: config.server.graceful_shutdown_secs.to_string(),
        },
        ConfigLine {
            key: "search.max_results",
            env_keys: &["LARDER_SEARCH_MAX_RESULTS"],
            value: config.search.max_results.to_string(),
        },
        ConfigLine {
            key: "logging.level",
            env_keys: &["LARDER_LOGGING_LEVEL", "LARDER_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        ConfigLine {
            key: "logging.format",
            env_keys: &["LARDER_LOGGING_FORMAT", "LARDER_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format).to_lowercase(),
        },
    ]
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("larder.toml"), PathBuf::from("config/larder.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps a vendor prefix such as `sk-` and hides the rest.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
