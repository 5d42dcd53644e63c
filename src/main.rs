// Módulos de la aplicación
mod api;
mod app_state;
mod builder;
mod category;
mod config;
mod graph;
mod history;
mod layout;
mod models;
mod pipeline;
mod render;
mod snapshot;
mod youtube;

use crate::app_state::AppState;
use crate::history::UserHistoryStore;
use anyhow::{Context, Result};
use axum::Router;
use tokio::sync::oneshot;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 2. Cargar configuración
    let cfg = config::AppConfig::from_env().context("Error al cargar la configuración")?;
    info!("Configuración cargada: {:?}", cfg);

    // 3. Cargar el histórico de usuarios (sólo lectura)
    let history = UserHistoryStore::load(&cfg.user_history_path)?;

    // Crear canal para la señal de apagado.
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    // 4. Crear el contexto compartido de la aplicación
    let app_state = AppState::new(cfg, history, Some(shutdown_tx))
        .context("Error inicializando el cliente HTTP")?;

    // 5. Configurar el router de la API y el servicio de ficheros estáticos
    let app = Router::new()
        .merge(api::create_router(app_state.clone()))
        .fallback_service(ServeDir::new("frontend"))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // 6. Iniciar el servidor
    let server_addr = &app_state.config.server_addr;
    let listener = tokio::net::TcpListener::bind(server_addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {server_addr}"))?;
    let server_url = Url::parse(&format!("http://{}", listener.local_addr()?))?;
    info!("🚀 Servidor escuchando en {}", server_url);

    // Abrir el frontend en el navegador por defecto
    if webbrowser::open(server_url.as_str()).is_err() {
        info!("No se pudo abrir el navegador. Por favor, accede a {} manualmente.", server_url);
    }

    // Configurar el apagado ordenado.
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}
