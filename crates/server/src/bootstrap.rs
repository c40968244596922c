use std::sync::Arc;
use std::time::Duration;

use larder_agent::{client_from_config, AgentClient, AgentRuntime, ToolRegistry};
use larder_core::config::{AppConfig, ConfigError, LoadOptions};
use larder_core::dataset::{self, DatasetSource, DatasetStore};
use larder_core::errors::ApplicationError;
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub state: Arc<ServiceState>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentDescriptor {
    pub provider: String,
    pub model: String,
}

/// What the service managed to initialise at startup. Questions are only
/// answered when both the dataset and the agent are ready; otherwise every
/// request reports why the service is unavailable.
pub struct ServiceState {
    dataset: Result<Arc<DatasetStore>, String>,
    agent: Result<AgentDescriptor, String>,
    runtime: Option<Arc<AgentRuntime>>,
}

impl ServiceState {
    pub fn assemble(
        dataset: Result<Arc<DatasetStore>, String>,
        client: Result<Arc<dyn AgentClient>, String>,
        config: &AppConfig,
    ) -> Self {
        let agent = client
            .as_ref()
            .map(|client| AgentDescriptor {
                provider: client.provider_name().to_string(),
                model: client.model_name().to_string(),
            })
            .map_err(|reason| reason.clone());

        let runtime = match (&dataset, client) {
            (Ok(store), Ok(client)) => {
                let registry =
                    ToolRegistry::recipe_tools(Arc::clone(store), config.search.max_results);
                Some(Arc::new(AgentRuntime::new(
                    client,
                    Arc::new(registry),
                    Duration::from_secs(config.llm.timeout_secs),
                )))
            }
            _ => None,
        };

        Self { dataset, agent, runtime }
    }

    pub fn dataset(&self) -> Result<&DatasetStore, &str> {
        self.dataset.as_deref().map_err(String::as_str)
    }

    pub fn agent(&self) -> Result<&AgentDescriptor, &str> {
        self.agent.as_ref().map_err(String::as_str)
    }

    pub fn is_ready(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn runtime(&self) -> Result<&AgentRuntime, ApplicationError> {
        if let Err(reason) = &self.dataset {
            return Err(ApplicationError::DatasetUnavailable(reason.clone()));
        }
        if let Err(reason) = &self.agent {
            return Err(ApplicationError::AgentUnavailable(reason.clone()));
        }
        self.runtime.as_deref().ok_or_else(|| {
            ApplicationError::AgentUnavailable("agent runtime was not initialised".to_string())
        })
    }
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    Ok(bootstrap_with_config(config).await)
}

/// Dataset and agent failures do not stop the process: the service starts
/// degraded and reports them per request and on `/health`.
pub async fn bootstrap_with_config(config: AppConfig) -> Application {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        dataset_source = %config.dataset.source,
        provider = config.llm.provider.as_str(),
        "starting application bootstrap"
    );

    let dataset = load_dataset(&config).await;

    let client = client_from_config(&config.llm).map_err(|error| error.to_string());
    if let Err(reason) = &client {
        warn!(
            event_name = "system.bootstrap.agent_unavailable",
            correlation_id = "bootstrap",
            reason = %reason,
            "agent client could not be constructed"
        );
    }

    let state = ServiceState::assemble(dataset, client, &config);
    info!(
        event_name = "system.bootstrap.completed",
        correlation_id = "bootstrap",
        ready = state.is_ready(),
        "application bootstrap finished"
    );

    Application { config, state: Arc::new(state) }
}

async fn load_dataset(config: &AppConfig) -> Result<Arc<DatasetStore>, String> {
    let source = DatasetSource::parse(&config.dataset.source).map_err(|error| error.to_string())?;
    let timeout = Duration::from_secs(config.dataset.fetch_timeout_secs);

    dataset::load(&source, timeout).await.map(Arc::new).map_err(|error| error.to_string())
}
