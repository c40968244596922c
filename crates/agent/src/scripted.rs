use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{AgentClient, AgentError, AgentMessage, AgentReply, AgentRequest};

/// What the scripted agent saw on one call.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    pub system_prompt: String,
    pub messages: Vec<AgentMessage>,
    pub tool_names: Vec<String>,
}

/// Replays queued replies in order and records every request. Used by tests
/// and by offline runs that must not reach a vendor API.
pub struct ScriptedAgent {
    replies: Mutex<VecDeque<Result<AgentReply, AgentError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delay: Option<Duration>,
}

impl ScriptedAgent {
    pub fn new(replies: Vec<Result<AgentReply, AgentError>>) -> Self {
        Self { replies: Mutex::new(replies.into()), requests: Mutex::new(Vec::new()), delay: None }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|requests| requests.len()).unwrap_or_default()
    }
}

#[async_trait]
impl AgentClient for ScriptedAgent {
    async fn generate(&self, request: AgentRequest<'_>) -> Result<AgentReply, AgentError> {
        let recorded = RecordedRequest {
            system_prompt: request.system_prompt.to_string(),
            messages: request.messages.to_vec(),
            tool_names: request.tools.iter().map(|tool| tool.name.clone()).collect(),
        };
        self.requests
            .lock()
            .map_err(|_| AgentError::Transport("scripted agent state is poisoned".to_string()))?
            .push(recorded);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.replies
            .lock()
            .map_err(|_| AgentError::Transport("scripted agent state is poisoned".to_string()))?
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::Transport("no scripted reply left".to_string())))
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
