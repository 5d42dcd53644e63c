use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    app_state::{AppState, Status},
    pipeline::{self, GraphView, PipelineError},
    render::Figure,
    snapshot::{self, NodeDetails},
};

const CLICK_PROMPT: &str = "Click on a video node to see details.";
const SELECT_USER_PROMPT: &str = "Select a user to display their recommendation chain.";
const ENTER_IDS_PROMPT: &str = "Enter Video IDs, comma-separated.";

// --- Payloads y Respuestas de la API ---

#[derive(Deserialize)]
pub struct SessionGraphsPayload {
    #[serde(default)]
    user1: Option<String>,
    #[serde(default)]
    user2: Option<String>,
}

#[derive(Deserialize)]
pub struct SeedGraphPayload {
    #[serde(default)]
    video_ids: String,
}

#[derive(Deserialize)]
pub struct NodeInfoPayload {
    #[serde(default)]
    render_id: Option<Uuid>,
    key: String,
}

/// Una figura lista para Plotly junto con el texto que acompaña al panel.
#[derive(Serialize)]
pub struct GraphResponse {
    render_id: Option<Uuid>,
    created_at: Option<DateTime<Utc>>,
    node_count: usize,
    edge_count: usize,
    figure: Figure,
    message: String,
}

impl GraphResponse {
    fn from_view(view: Option<GraphView>, empty_message: &str) -> Self {
        match view {
            Some(view) => Self {
                render_id: Some(view.render_id),
                created_at: Some(view.created_at),
                node_count: view.node_count,
                edge_count: view.edge_count,
                figure: view.figure,
                message: CLICK_PROMPT.to_string(),
            },
            None => Self {
                render_id: None,
                created_at: None,
                node_count: 0,
                edge_count: 0,
                figure: Figure::empty(),
                message: empty_message.to_string(),
            },
        }
    }
}

#[derive(Serialize)]
pub struct SessionGraphsResponse {
    graphs: Vec<GraphResponse>,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/users", get(users_handler))
        .route("/api/session-graphs", post(session_graphs_handler))
        .route("/api/seed-graph", post(seed_graph_handler))
        .route("/api/node-info", post(node_info_handler))
        .route("/api/status", get(status_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn users_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.history.users())
}

#[axum::debug_handler]
async fn session_graphs_handler(
    State(state): State<AppState>,
    Json(payload): Json<SessionGraphsPayload>,
) -> Result<Json<SessionGraphsResponse>, (StatusCode, Json<serde_json::Value>)> {
    let users = [payload.user1, payload.user2];
    let views = pipeline::render_user_sessions(&state, &users)
        .await
        .map_err(pipeline_error)?;

    let graphs = views
        .into_iter()
        .map(|view| GraphResponse::from_view(view, SELECT_USER_PROMPT))
        .collect();
    Ok(Json(SessionGraphsResponse { graphs }))
}

#[axum::debug_handler]
async fn seed_graph_handler(
    State(state): State<AppState>,
    Json(payload): Json<SeedGraphPayload>,
) -> Result<Json<GraphResponse>, (StatusCode, Json<serde_json::Value>)> {
    let view = pipeline::render_seed_videos(&state, &payload.video_ids)
        .await
        .map_err(pipeline_error)?;
    Ok(Json(GraphResponse::from_view(view, ENTER_IDS_PROMPT)))
}

#[axum::debug_handler]
async fn node_info_handler(
    State(state): State<AppState>,
    Json(payload): Json<NodeInfoPayload>,
) -> Json<NodeDetails> {
    let details = match payload.render_id {
        Some(render_id) => state
            .snapshots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .lookup(&render_id, &payload.key),
        None => snapshot::lookup(None, &payload.key),
    };
    Json(details)
}

#[axum::debug_handler]
async fn status_handler(State(state): State<AppState>) -> Json<Status> {
    Json(state.status())
}

// --- Handler de Apagado y Utilidades ---

#[axum::debug_handler]
async fn shutdown_handler(State(state): State<AppState>) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    let sender = state
        .shutdown_sender
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    if let Some(sender) = sender {
        let _ = sender.send(());
    }
    StatusCode::OK
}

fn pipeline_error(err: PipelineError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        PipelineError::Busy => {
            warn!("Petición rechazada: ya hay un grafo generándose");
            StatusCode::CONFLICT
        }
        PipelineError::Render(e) => {
            error!("Error al dibujar el grafo: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({ "error": err.to_string() })))
}
