//! HTTP trigger routes.

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::model::SyncOutcome;
use crate::orchestrator::SyncOrchestrator;

pub struct AppState {
    orchestrator: SyncOrchestrator,
    /// Held for the whole run so two triggers never hit Dataverse at once.
    run_lock: Mutex<()>,
}

impl AppState {
    pub fn new(orchestrator: SyncOrchestrator) -> Self {
        Self {
            orchestrator,
            run_lock: Mutex::new(()),
        }
    }
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/sync/trigger", post(trigger_sync))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[instrument(skip_all)]
async fn trigger_sync(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SyncOutcome>) {
    let _guard = state.run_lock.lock().await;
    info!("sync triggered over HTTP");
    let outcome = state.orchestrator.run_full_sync().await;
    let status = if outcome.is_successful() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(outcome))
}
