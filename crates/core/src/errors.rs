use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("could not read dataset file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not fetch dataset from `{url}`: {message}")]
    Fetch { url: String, message: String },
    #[error("could not parse dataset: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported dataset layout: {0}")]
    Layout(String),
    #[error("invalid dataset source `{0}`")]
    InvalidSource(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("recipe dataset is unavailable: {0}")]
    DatasetUnavailable(String),
    #[error("agent is unavailable: {0}")]
    AgentUnavailable(String),
    #[error("agent did not respond within {0}s")]
    AgentTimeout(u64),
    #[error("error processing response: {0}")]
    MalformedReply(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let message = value.to_string();
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::InvalidRequest(_) => Self::BadRequest { message, correlation_id },
            ApplicationError::DatasetUnavailable(_)
            | ApplicationError::AgentUnavailable(_)
            | ApplicationError::AgentTimeout(_) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::MalformedReply(_)
            | ApplicationError::Integration(_)
            | ApplicationError::Configuration(_) => Self::Internal { message, correlation_id },
        }
    }
}
