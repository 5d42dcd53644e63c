//! Flujo completo de un dibujo:
//!   1. Descarga en bloque de los metadatos necesarios (concurrencia acotada).
//!   2. Construcción del grafo a partir del catálogo descargado.
//!   3. Cálculo de posiciones.
//!   4. Conversión a figura.
//!   5. Registro de la instantánea de atributos para las consultas por clic.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::{
    app_state::AppState,
    builder::{self, BuiltGraph},
    layout::{self, Positions, DEFAULT_MAIN_SPACING, DEFAULT_SIDE_SPACING},
    render::{self, Figure, RenderError},
    snapshot::NodeSnapshot,
    youtube::VideoCatalog,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Ya hay un grafo generándose; espere a que termine.")]
    Busy,
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Resultado de un dibujo, listo para enviarse al navegador.
#[derive(Debug, Clone)]
pub struct GraphView {
    pub render_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub node_count: usize,
    pub edge_count: usize,
    pub figure: Figure,
}

/// Dibuja la sesión grabada de cada usuario indicado. Las posiciones sin usuario
/// devuelven `None` (figura vacía en el navegador).
pub async fn render_user_sessions(
    state: &AppState,
    users: &[Option<String>],
) -> Result<Vec<Option<GraphView>>, PipelineError> {
    let _gate = state.render_gate.try_lock().map_err(|_| PipelineError::Busy)?;

    let mut views = Vec::with_capacity(users.len());
    let mut result = Ok(());
    for user in users {
        let Some(user) = user.as_deref().filter(|u| !u.trim().is_empty()) else {
            views.push(None);
            continue;
        };
        match session_view(state, user).await {
            Ok(view) => views.push(Some(view)),
            Err(err) => {
                result = Err(err);
                break;
            }
        }
    }

    finish_status(state, &result);
    result.map(|_| views)
}

/// Dibuja el grafo de semillas introducidas por el usuario (ids separados por comas).
/// Un texto sin ids devuelve `None`.
pub async fn render_seed_videos(
    state: &AppState,
    video_ids: &str,
) -> Result<Option<GraphView>, PipelineError> {
    let seeds = builder::parse_video_ids(video_ids);
    if seeds.is_empty() {
        return Ok(None);
    }
    let _gate = state.render_gate.try_lock().map_err(|_| PipelineError::Busy)?;

    let catalog = fetch_catalog(state, &seeds, "semillas").await;
    let built = builder::build_seed_graph(&seeds, &catalog, state.config.related_limit);
    let positions = layout::layout_seed_graph(&built);
    let result = publish(state, &built, &positions);

    finish_status(state, &result);
    result.map(Some)
}

async fn session_view(state: &AppState, user: &str) -> Result<GraphView, PipelineError> {
    let history = state.history.session(user);
    if history.is_empty() {
        info!("El usuario '{user}' no tiene histórico; se dibuja sólo la raíz");
    }

    let ids = builder::session_video_ids(&history);
    let catalog = fetch_catalog(state, &ids, user).await;
    let built = builder::build_session_graph(&history, &catalog);
    let positions = layout::main_path_layout(
        &built.graph,
        &built.main_path,
        DEFAULT_SIDE_SPACING,
        DEFAULT_MAIN_SPACING,
    );
    publish(state, &built, &positions)
}

async fn fetch_catalog(state: &AppState, ids: &[String], label: &str) -> VideoCatalog {
    state.set_status(true, format!("Descargando metadatos ({label})..."), 0.0);
    state
        .fetcher
        .fetch_many(ids, |done, total| {
            state.set_status(
                true,
                format!("[{done}/{total}] Descargando metadatos ({label})..."),
                done as f32 / total as f32,
            );
        })
        .await
}

fn publish(state: &AppState, built: &BuiltGraph, positions: &Positions) -> Result<GraphView, PipelineError> {
    let figure = render::render(&built.graph, positions)?;
    let snapshot = NodeSnapshot::from_graph(&built.graph);
    let created_at = snapshot.created_at;
    let (render_id, stored) = {
        let mut snapshots = state
            .snapshots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (snapshots.insert(snapshot), snapshots.len())
    };

    info!(
        "Grafo {render_id} generado: {} nodos, {} aristas ({stored} instantáneas en memoria)",
        built.graph.node_count(),
        built.graph.edge_count()
    );
    Ok(GraphView {
        render_id,
        created_at,
        node_count: built.graph.node_count(),
        edge_count: built.graph.edge_count(),
        figure,
    })
}

fn finish_status<T>(state: &AppState, result: &Result<T, PipelineError>) {
    match result {
        Ok(_) => state.set_status(false, "Grafo generado.", 0.0),
        Err(err) => state.set_status(false, format!("Error generando el grafo: {err}"), 0.0),
    }
}
