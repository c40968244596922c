use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use larder_core::domain::Column;
use serde::Serialize;

use crate::api::SharedState;
use crate::bootstrap::ServiceState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub dataset: HealthCheck,
    pub agent: HealthCheck,
    pub checked_at: String,
}

pub async fn health(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    let dataset = dataset_check(&state);
    let agent = agent_check(&state);
    let ready = state.is_ready();

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "larder-server runtime initialized".to_string(),
        },
        dataset,
        agent,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn dataset_check(state: &ServiceState) -> HealthCheck {
    match state.dataset() {
        Ok(store) => {
            let columns = store.columns().map(Column::source_name).collect::<Vec<_>>();
            let columns = if columns.is_empty() { "none".to_string() } else { columns.join(", ") };
            HealthCheck {
                status: "ready",
                detail: format!("{} recipes loaded; columns: {columns}", store.len()),
            }
        }
        Err(reason) => {
            HealthCheck { status: "degraded", detail: format!("dataset failed to load: {reason}") }
        }
    }
}

fn agent_check(state: &ServiceState) -> HealthCheck {
    match state.agent() {
        Ok(agent) => HealthCheck {
            status: "ready",
            detail: format!("provider {}, model {}", agent.provider, agent.model),
        },
        Err(reason) => {
            HealthCheck { status: "degraded", detail: format!("agent not configured: {reason}") }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use larder_agent::{AgentClient, ScriptedAgent};
    use larder_core::config::AppConfig;
    use larder_core::dataset::DatasetStore;

    use crate::bootstrap::ServiceState;
    use crate::health::health;

    fn store() -> Arc<DatasetStore> {
        let store = DatasetStore::from_json_str(
            r#"[{"Name": "Pumpkin Soup", "Calories": 180},
                {"Name": "Beef Stew", "Calories": 520}]"#,
        )
        .expect("fixture parses");
        Arc::new(store)
    }

    fn agent() -> Arc<dyn AgentClient> {
        Arc::new(ScriptedAgent::new(Vec::new()))
    }

    #[tokio::test]
    async fn health_returns_ready_when_dataset_and_agent_initialised() {
        let state = ServiceState::assemble(Ok(store()), Ok(agent()), &AppConfig::default());

        let (status, Json(payload)) = health(State(Arc::new(state))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.service.status, "ready");
        assert_eq!(payload.dataset.status, "ready");
        assert_eq!(payload.dataset.detail, "2 recipes loaded; columns: Name, Calories");
        assert_eq!(payload.agent.detail, "provider scripted, model scripted");
        assert!(!payload.checked_at.is_empty());
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_dataset_failed() {
        let state = ServiceState::assemble(
            Err("could not read dataset file `data/recipes.json`".to_string()),
            Ok(agent()),
            &AppConfig::default(),
        );

        let (status, Json(payload)) = health(State(Arc::new(state))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.dataset.status, "degraded");
        assert!(payload.dataset.detail.contains("data/recipes.json"));
        assert_eq!(payload.agent.status, "ready");
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn health_reports_unconfigured_agent() {
        let state = ServiceState::assemble(
            Ok(store()),
            Err("agent is not configured: missing API key".to_string()),
            &AppConfig::default(),
        );

        let (status, Json(payload)) = health(State(Arc::new(state))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.dataset.status, "ready");
        assert_eq!(payload.agent.status, "degraded");
        assert!(payload.agent.detail.contains("missing API key"));
    }
}
