use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use larder_core::config::{LlmConfig, LlmProvider};
use larder_core::errors::ApplicationError;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::gemini::GeminiClient;
use crate::openai::OpenAiClient;
use crate::tools::ToolDeclaration;

/// A structured tool invocation emitted by the agent.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCall {
    /// Vendor-assigned call id, when the vendor issues one.
    pub id: Option<String>,
    pub name: String,
    pub args: Map<String, Value>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self { id: None, name: name.into(), args }
    }

    pub fn args_value(&self) -> Value {
        Value::Object(self.args.clone())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AgentMessage {
    User(String),
    ToolCall(FunctionCall),
    ToolResult { call_id: Option<String>, name: String, content: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReplyPart {
    Text(String),
    FunctionCall(FunctionCall),
    Other,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplyCandidate {
    pub parts: Vec<ReplyPart>,
    pub finish_reason: Option<String>,
}

/// Vendor-neutral agent reply.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AgentReply {
    pub candidates: Vec<ReplyCandidate>,
    pub prompt_feedback: Option<String>,
}

impl AgentReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::single(ReplyPart::Text(text.into()))
    }

    pub fn function_call(name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(args) => args,
            _ => Map::new(),
        };
        Self::single(ReplyPart::FunctionCall(FunctionCall::new(name, args)))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    fn single(part: ReplyPart) -> Self {
        Self {
            candidates: vec![ReplyCandidate { parts: vec![part], finish_reason: None }],
            prompt_feedback: None,
        }
    }

    pub fn first_candidate(&self) -> Option<&ReplyCandidate> {
        self.candidates.first()
    }

    /// The first content unit of the first candidate.
    pub fn first_part(&self) -> Option<&ReplyPart> {
        self.first_candidate().and_then(|candidate| candidate.parts.first())
    }

    pub fn first_text(&self) -> Option<&str> {
        self.first_candidate()?.parts.iter().find_map(|part| match part {
            ReplyPart::Text(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.first_candidate().and_then(|candidate| candidate.finish_reason.as_deref())
    }
}

pub struct AgentRequest<'a> {
    pub system_prompt: &'a str,
    pub messages: &'a [AgentMessage],
    pub tools: &'a [ToolDeclaration],
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("agent is not configured: {0}")]
    NotConfigured(String),
    #[error("agent transport failed: {0}")]
    Transport(String),
    #[error("agent API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("malformed agent reply: {0}")]
    MalformedReply(String),
    #[error("agent did not respond within {0}s")]
    Timeout(u64),
    #[error("invalid arguments for tool `{tool}`: {message}")]
    InvalidToolArguments { tool: String, message: String },
    #[error("tool `{tool}` failed: {message}")]
    ToolFailed { tool: String, message: String },
}

impl From<AgentError> for ApplicationError {
    fn from(value: AgentError) -> Self {
        match value {
            AgentError::NotConfigured(message) => Self::AgentUnavailable(message),
            AgentError::Timeout(secs) => Self::AgentTimeout(secs),
            AgentError::MalformedReply(message) => Self::MalformedReply(message),
            error @ AgentError::InvalidToolArguments { .. } => {
                Self::MalformedReply(error.to_string())
            }
            error @ (AgentError::Transport(_)
            | AgentError::Api { .. }
            | AgentError::ToolFailed { .. }) => Self::Integration(error.to_string()),
        }
    }
}

#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn generate(&self, request: AgentRequest<'_>) -> Result<AgentReply, AgentError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}

/// Builds the configured vendor client.
pub fn client_from_config(config: &LlmConfig) -> Result<Arc<dyn AgentClient>, AgentError> {
    if !config.has_api_key() {
        return Err(AgentError::NotConfigured(format!(
            "llm.api_key is missing for the {} provider",
            config.provider.as_str()
        )));
    }

    let timeout = Duration::from_secs(config.timeout_secs);
    let client: Arc<dyn AgentClient> = match config.provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::new(config, timeout)?),
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(config, timeout)?),
    };
    Ok(client)
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, AgentError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|error| AgentError::NotConfigured(format!("failed to build HTTP client: {error}")))
}

pub(crate) fn transport_error(error: reqwest::Error, timeout: Duration) -> AgentError {
    if error.is_timeout() {
        AgentError::Timeout(timeout.as_secs())
    } else {
        AgentError::Transport(error.to_string())
    }
}
