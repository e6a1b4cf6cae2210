use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};

use quill_agent::{Agent, AgentConfig};
use quill_auth::{PasswordKdf, TokenSigner};
use quill_llm::LlmClient;
use quill_store::Database;
use quill_tasks::TaskService;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{auth_routes, chat_routes, task_routes};

/// Assemble the shared state for the task service process.
pub fn build_state(
    config: &AppConfig,
    db: Database,
    llm: Arc<dyn LlmClient>,
) -> Result<AppState, quill_core::CoreError> {
    let service = Arc::new(if config.event_bus_enabled {
        TaskService::new(db.clone())
    } else {
        TaskService::with_events_disabled(db.clone())
    });

    let signer = Arc::new(TokenSigner::new(
        &config.signing_secret,
        chrono::Duration::hours(config.token_ttl_hours),
    ));
    let kdf = Arc::new(
        PasswordKdf::new(config.kdf_memory_kib, config.kdf_time_cost)
            .map_err(quill_core::CoreError::from)?,
    );
    let agent = Arc::new(Agent::new(
        Arc::clone(&service),
        llm,
        AgentConfig {
            max_iterations: config.agent_max_tool_iterations,
            turn_timeout: config.agent_turn_timeout,
        },
    ));

    Ok(AppState {
        db,
        service,
        signer,
        kdf,
        agent,
    })
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(auth_routes::router())
        .merge(task_routes::router())
        .merge(chat_routes::router())
        .route("/health", get(health))
        .with_state(state)
        .layer(cors_layer(cors_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let parsed: Vec<_> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.ping() {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "healthy"})),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "unhealthy", "detail": e.to_string()})),
        ),
    }
}

/// Bind and serve. Returns a handle that owns graceful shutdown.
pub async fn start(router: Router, port: u16) -> Result<ServerHandle, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    let local_addr = listener.local_addr()?;

    let shutdown = CancellationToken::new();
    let shutdown_for_axum = shutdown.clone();
    let task = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_for_axum.cancelled().await;
            })
            .await
            .ok();
    });

    tracing::info!(port = local_addr.port(), "server started");

    Ok(ServerHandle {
        port: local_addr.port(),
        shutdown,
        task,
    })
}

/// Keeps the serve task alive; call `shutdown()` then `drain()`.
pub struct ServerHandle {
    pub port: u16,
    shutdown: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        tracing::info!("server shutdown initiated");
        self.shutdown.cancel();
    }

    pub async fn drain(self) {
        let _ = self.task.await;
        tracing::debug!("server task drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_llm::MockLlm;

    fn test_config() -> AppConfig {
        AppConfig {
            signing_secret: "test-secret".into(),
            kdf_memory_kib: 8 * 1024,
            kdf_time_cost: 1,
            ..Default::default()
        }
    }

    pub(crate) fn test_state() -> AppState {
        let db = Database::in_memory().unwrap();
        build_state(&test_config(), db, Arc::new(MockLlm::replying("ok"))).unwrap()
    }

    #[tokio::test]
    async fn server_starts_serves_health_and_shuts_down() {
        let state = test_state();
        let router = build_router(state, &[]);
        let handle = start(router, 0).await.unwrap();
        assert!(handle.port > 0);

        let url = format!("http://127.0.0.1:{}/health", handle.port);
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "healthy");

        handle.shutdown();
        handle.drain().await;

        assert!(reqwest::get(&url).await.is_err(), "closed after drain");
    }

    #[test]
    fn cors_layer_accepts_origin_lists() {
        let _permissive = cors_layer(&[]);
        let _restricted = cors_layer(&["http://localhost:3000".to_string()]);
    }
}
