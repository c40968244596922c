//! OpenAI chat completions client with function tools.

use std::time::Duration;

use async_trait::async_trait;
use larder_core::config::LlmConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::llm::{
    http_client, transport_error, AgentClient, AgentError, AgentMessage, AgentReply, AgentRequest,
    FunctionCall, ReplyCandidate, ReplyPart,
};
use crate::tools::ToolDeclaration;

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig, timeout: Duration) -> Result<Self, AgentError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AgentError::NotConfigured("llm.api_key is missing".to_string()))?;

        Ok(Self {
            client: http_client(timeout)?,
            base_url: config.effective_base_url().trim_end_matches('/').to_string(),
            api_key,
            model: config.effective_model().to_string(),
            temperature: config.temperature,
            timeout,
        })
    }

    fn build_request(&self, request: &AgentRequest<'_>) -> ChatRequest {
        let mut messages = vec![ChatMessage::plain("system", request.system_prompt)];
        messages.extend(request.messages.iter().map(message_for));

        ChatRequest {
            model: self.model.clone(),
            messages,
            tools: request.tools.iter().map(ChatTool::from).collect(),
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl AgentClient for OpenAiClient {
    async fn generate(&self, request: AgentRequest<'_>) -> Result<AgentReply, AgentError> {
        let body = self.build_request(&request);
        debug!(
            model = %self.model,
            messages = body.messages.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| transport_error(error, self.timeout))?;

        let status = response.status();
        let text = response.text().await.map_err(|error| transport_error(error, self.timeout))?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| text.chars().take(200).collect());
            return Err(AgentError::Api { status: status.as_u16(), message });
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|error| {
            AgentError::MalformedReply(format!("unexpected chat completion body: {error}"))
        })?;
        parsed.into_reply()
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn message_for(message: &AgentMessage) -> ChatMessage {
    match message {
        AgentMessage::User(text) => ChatMessage::plain("user", text),
        AgentMessage::ToolCall(call) => ChatMessage {
            role: "assistant".to_string(),
            content: None,
            tool_calls: vec![ChatToolCall {
                id: call_id(call.id.as_deref(), &call.name),
                kind: "function".to_string(),
                function: ChatFunctionCall {
                    name: call.name.clone(),
                    arguments: call.args_value().to_string(),
                },
            }],
            tool_call_id: None,
        },
        AgentMessage::ToolResult { call_id: id, name, content } => ChatMessage {
            role: "tool".to_string(),
            content: Some(content.clone()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id(id.as_deref(), name)),
        },
    }
}

fn call_id(id: Option<&str>, name: &str) -> String {
    id.map(str::to_string).unwrap_or_else(|| format!("call_{name}"))
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ChatToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn plain(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ToolDeclaration,
}

impl From<&ToolDeclaration> for ChatTool {
    fn from(declaration: &ToolDeclaration) -> Self {
        Self { kind: "function", function: declaration.clone() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: ChatFunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChatToolCall>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl ChatResponse {
    fn into_reply(self) -> Result<AgentReply, AgentError> {
        let mut prompt_feedback = None;
        let mut candidates = Vec::with_capacity(self.choices.len());

        for choice in self.choices {
            let mut parts = Vec::new();
            for call in choice.message.tool_calls {
                let args = match serde_json::from_str::<Value>(&call.function.arguments) {
                    Ok(Value::Object(args)) => args,
                    Ok(_) | Err(_) => {
                        return Err(AgentError::MalformedReply(format!(
                            "tool call `{}` arguments are not a JSON object",
                            call.function.name
                        )))
                    }
                };
                parts.push(ReplyPart::FunctionCall(FunctionCall {
                    id: Some(call.id),
                    name: call.function.name,
                    args,
                }));
            }
            if let Some(text) = choice.message.content.filter(|text| !text.is_empty()) {
                parts.push(ReplyPart::Text(text));
            }
            if let Some(refusal) = choice.message.refusal {
                prompt_feedback.get_or_insert(format!("refused: {refusal}"));
            }
            candidates.push(ReplyCandidate { parts, finish_reason: choice.finish_reason });
        }

        Ok(AgentReply { candidates, prompt_feedback })
    }
}
