//! Axum Handlers for the REST API
//!
//! The service is driven over the WebSocket; HTTP only carries a health probe.
//! Handlers use `utoipa` doc comments to generate OpenAPI documentation.

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::state::AppState;

/// Liveness and speech readiness of the service.
#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: String,
    /// Whether recognize and synthesize requests can reach the provider.
    pub speech_configured: bool,
    /// The configured region. The key is never reported.
    pub region: Option<String>,
}

/// Report service health.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        speech_configured: state.speech.is_configured(),
        region: state.region(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use vox_core::{
        Credentials, credentials::MockCredentialStore, speech::MockSpeechCapability,
    };

    fn state(credentials: Credentials) -> Arc<AppState> {
        let config = Config {
            credentials,
            ..Config::default()
        };
        Arc::new(AppState::new(
            config,
            Arc::new(MockSpeechCapability::new()),
            Arc::new(MockCredentialStore::new()),
        ))
    }

    #[tokio::test]
    async fn test_health_unconfigured() {
        let Json(body) = health(State(state(Credentials::default()))).await;
        assert_eq!(
            body,
            HealthResponse {
                status: "ok".into(),
                speech_configured: false,
                region: None,
            }
        );
    }

    #[tokio::test]
    async fn test_health_configured_hides_key() {
        let Json(body) = health(State(state(Credentials::new("secret", "eastus")))).await;
        assert!(body.speech_configured);
        assert_eq!(body.region.as_deref(), Some("eastus"));
        assert!(!serde_json::to_string(&body).unwrap().contains("secret"));
    }
}
