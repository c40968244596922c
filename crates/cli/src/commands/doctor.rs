use larder_agent::client_from_config;
use larder_core::config::AppConfig;
use larder_core::dataset::DatasetStore;
use serde::Serialize;

use crate::commands::{
    async_runtime, load_store, CommandContext, CommandResult, EXIT_AGENT, EXIT_CONFIG, EXIT_DATASET,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
    #[serde(skip)]
    exit_code: u8,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into(), exit_code: 0 }
    }

    fn fail(name: &'static str, details: impl Into<String>, exit_code: u8) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into(), exit_code }
    }

    fn skipped(name: &'static str, reason: &str) -> Self {
        Self::new(name, CheckStatus::Skipped, format!("skipped because {reason}"))
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    fn exit_code(&self) -> u8 {
        self.checks.iter().map(|check| check.exit_code).find(|code| *code != 0).unwrap_or(0)
    }
}

pub fn run(context: &CommandContext, json_output: bool) -> CommandResult {
    let report = build_report(context);
    let exit_code = report.exit_code();

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(context: &CommandContext) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(context.load_options(true)) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.extend(check_dataset(&config));
            checks.push(check_agent(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string(), EXIT_CONFIG));
            let reason = "configuration did not load";
            checks.push(DoctorCheck::skipped("dataset_load", reason));
            checks.push(DoctorCheck::skipped("dataset_columns", reason));
            checks.push(DoctorCheck::skipped("agent_configuration", reason));
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let warned = checks.iter().any(|check| check.status == CheckStatus::Warn);
    let (overall_status, summary) = match (failed, warned) {
        (true, _) => (CheckStatus::Fail, "doctor: one or more readiness checks failed"),
        (false, true) => (CheckStatus::Warn, "doctor: ready with warnings"),
        (false, false) => (CheckStatus::Pass, "doctor: all readiness checks passed"),
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn check_dataset(config: &AppConfig) -> Vec<DoctorCheck> {
    let loaded = async_runtime("doctor")
        .map_err(|failure| failure.output)
        .and_then(|runtime| runtime.block_on(load_store(config)));

    match loaded {
        Ok(store) => vec![
            DoctorCheck::new(
                "dataset_load",
                CheckStatus::Pass,
                format!("loaded {} recipes from `{}`", store.len(), config.dataset.source),
            ),
            check_columns(&store),
        ],
        Err(error) => vec![
            DoctorCheck::fail("dataset_load", error, EXIT_DATASET),
            DoctorCheck::skipped("dataset_columns", "the dataset did not load"),
        ],
    }
}

/// Missing columns only disable the filters that need them, so they warn.
fn check_columns(store: &DatasetStore) -> DoctorCheck {
    let missing = store.missing_columns();
    if missing.is_empty() {
        return DoctorCheck::new("dataset_columns", CheckStatus::Pass, "all known columns present");
    }

    let names = missing.iter().map(|column| column.source_name()).collect::<Vec<_>>();
    DoctorCheck::new(
        "dataset_columns",
        CheckStatus::Warn,
        format!("missing columns: {}", names.join(", ")),
    )
}

fn check_agent(config: &AppConfig) -> DoctorCheck {
    if let Err(error) = config.validate() {
        return DoctorCheck::fail("agent_configuration", error.to_string(), EXIT_AGENT);
    }

    match client_from_config(&config.llm) {
        Ok(client) => DoctorCheck::new(
            "agent_configuration",
            CheckStatus::Pass,
            format!(
                "provider {}, model {}, endpoint {}",
                client.provider_name(),
                client.model_name(),
                config.llm.effective_base_url()
            ),
        ),
        Err(error) => DoctorCheck::fail("agent_configuration", error.to_string(), EXIT_AGENT),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
