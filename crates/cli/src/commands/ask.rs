use std::sync::Arc;
use std::time::Duration;

use larder_agent::{client_from_config, AgentRuntime, ToolRegistry};
use larder_core::errors::ApplicationError;
use uuid::Uuid;

use crate::commands::{
    async_runtime, dataset_failure, load_config, load_store, CommandContext, CommandResult,
    EXIT_AGENT,
};

/// Runs one question through the agent and prints its answer.
pub fn run(context: &CommandContext, question: &str) -> CommandResult {
    let config = match load_config("ask", context, false) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match async_runtime("ask") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let store = match runtime.block_on(load_store(&config)) {
        Ok(store) => store,
        Err(message) => return dataset_failure("ask", message),
    };

    let client = match client_from_config(&config.llm) {
        Ok(client) => client,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "agent_unavailable",
                error.to_string(),
                EXIT_AGENT,
            )
        }
    };

    let registry = Arc::new(ToolRegistry::recipe_tools(store, config.search.max_results));
    let agent = AgentRuntime::new(client, registry, Duration::from_secs(config.llm.timeout_secs));
    let correlation_id = Uuid::new_v4().to_string();

    match runtime.block_on(agent.ask(question, &correlation_id)) {
        Ok(answer) => CommandResult::text(answer.text),
        Err(error) => {
            CommandResult::failure("ask", error_class(&error), error.to_string(), EXIT_AGENT)
        }
    }
}

fn error_class(error: &ApplicationError) -> &'static str {
    match error {
        ApplicationError::InvalidRequest(_) => "invalid_request",
        ApplicationError::DatasetUnavailable(_) => "dataset_load",
        ApplicationError::AgentUnavailable(_) => "agent_unavailable",
        ApplicationError::AgentTimeout(_) => "agent_timeout",
        ApplicationError::MalformedReply(_) => "malformed_reply",
        ApplicationError::Integration(_) => "agent_integration",
        ApplicationError::Configuration(_) => "config_validation",
    }
}
