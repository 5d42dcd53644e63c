//! Obtención de metadatos de vídeos desde las APIs externas.
//!
//! Cada vídeo requiere dos peticiones:
//!   1. API de búsqueda (SerpApi, motor `youtube_video`): título, vídeos relacionados
//!      y el resto de campos de la ficha.
//!   2. API de datos de YouTube: código numérico de categoría.
//!
//! Cualquier fallo se registra y se convierte en un registro degradado; nunca se
//! propaga al llamador. La fase de descarga en bloque (`fetch_many`) limita la
//! concurrencia y está separada de la construcción del grafo.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use futures::{stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    category,
    config::AppConfig,
    models::{RelatedVideo, VideoRecord, UNKNOWN_CATEGORY},
};

const SEARCH_API: &str = "API de búsqueda";
const CATEGORY_API: &str = "API de YouTube";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("URL no válida para {api}: {source}")]
    Url {
        api: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("error de red en {api}: {source}")]
    Http {
        api: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{api} respondió con estado {status}")]
    Status { api: &'static str, status: StatusCode },
    #[error("respuesta JSON no válida de {api}: {source}")]
    Decode {
        api: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("la respuesta de búsqueda no contiene el campo 'title'")]
    MissingTitle,
}

#[derive(Debug, Deserialize)]
struct CategoryResponse {
    items: Vec<CategoryItem>,
}

#[derive(Debug, Deserialize)]
struct CategoryItem {
    snippet: CategorySnippet,
}

#[derive(Debug, Deserialize)]
struct CategorySnippet {
    #[serde(rename = "categoryId")]
    category_id: String,
}

/// Conjunto de metadatos ya descargados, indexado por id de vídeo.
#[derive(Debug, Clone, Default)]
pub struct VideoCatalog {
    records: HashMap<String, VideoRecord>,
}

impl VideoCatalog {
    pub fn insert(&mut self, record: VideoRecord) {
        self.records.insert(record.video_id.clone(), record);
    }

    /// Devuelve el registro del vídeo o, si no se descargó, su versión degradada.
    pub fn record(&self, video_id: &str) -> VideoRecord {
        self.records
            .get(video_id)
            .cloned()
            .unwrap_or_else(|| VideoRecord::degraded(video_id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl FromIterator<VideoRecord> for VideoCatalog {
    fn from_iter<I: IntoIterator<Item = VideoRecord>>(iter: I) -> Self {
        let mut catalog = Self::default();
        for record in iter {
            catalog.insert(record);
        }
        catalog
    }
}

/// Cliente de metadatos de vídeos.
#[derive(Clone)]
pub struct VideoFetcher {
    client: Client,
    youtube_api_url: String,
    youtube_api_key: String,
    serpapi_url: String,
    serpapi_api_key: String,
    serpapi_engine: String,
    concurrency: usize,
}

impl VideoFetcher {
    /// Construye el cliente HTTP (con timeout por petición) a partir de la configuración.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let client = Client::builder().timeout(cfg.http_timeout).build()?;
        Ok(Self {
            client,
            youtube_api_url: cfg.youtube_api_url.clone(),
            youtube_api_key: cfg.youtube_api_key.clone(),
            serpapi_url: cfg.serpapi_url.clone(),
            serpapi_api_key: cfg.serpapi_api_key.clone(),
            serpapi_engine: cfg.serpapi_engine.clone(),
            concurrency: cfg.fetch_concurrency.max(1),
        })
    }

    /// Obtiene los metadatos de un vídeo. Nunca falla: los errores producen un
    /// registro degradado.
    pub async fn fetch(&self, video_id: &str) -> VideoRecord {
        match self.try_fetch(video_id).await {
            Ok(record) => {
                debug!("Metadatos obtenidos para {video_id}: '{}'", record.title);
                record
            }
            Err(err) => {
                warn!("Error obteniendo detalles del vídeo {video_id}: {err}");
                VideoRecord::degraded(video_id)
            }
        }
    }

    /// Descarga los metadatos de varios vídeos con concurrencia acotada.
    /// Los ids repetidos se piden una sola vez. `progress(hechos, total)` se invoca
    /// tras cada descarga.
    pub async fn fetch_many<F>(&self, video_ids: &[String], progress: F) -> VideoCatalog
    where
        F: Fn(usize, usize),
    {
        let mut seen = HashSet::new();
        let unique: Vec<String> = video_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        let total = unique.len();
        info!("Descargando metadatos de {total} vídeos (concurrencia {})", self.concurrency);

        // Ids propios en cada futuro: el stream tiene que ser `Send` dentro de los handlers.
        let mut fetches = stream::iter(unique)
            .map(|id| async move { self.fetch(&id).await })
            .buffer_unordered(self.concurrency);

        let mut catalog = VideoCatalog::default();
        while let Some(record) = fetches.next().await {
            catalog.insert(record);
            progress(catalog.len(), total);
        }
        catalog
    }

    async fn try_fetch(&self, video_id: &str) -> Result<VideoRecord, FetchError> {
        let search = self.fetch_search(video_id).await?;
        let category_code = self.fetch_category_code(video_id).await?;
        build_record(video_id, search, category::resolve(&category_code))
    }

    async fn fetch_search(&self, video_id: &str) -> Result<Value, FetchError> {
        let url = Url::parse_with_params(
            &self.serpapi_url,
            [
                ("engine", self.serpapi_engine.as_str()),
                ("v", video_id),
                ("api_key", self.serpapi_api_key.as_str()),
            ],
        )
        .map_err(|source| FetchError::Url { api: SEARCH_API, source })?;
        self.get_json(SEARCH_API, url).await
    }

    /// Devuelve el código de categoría, o "Unknown" si la respuesta no trae elementos.
    async fn fetch_category_code(&self, video_id: &str) -> Result<String, FetchError> {
        let url = Url::parse_with_params(
            &self.youtube_api_url,
            [
                ("part", "snippet"),
                ("id", video_id),
                ("key", self.youtube_api_key.as_str()),
            ],
        )
        .map_err(|source| FetchError::Url { api: CATEGORY_API, source })?;

        let body: Value = self.get_json(CATEGORY_API, url).await?;
        let parsed: CategoryResponse = serde_json::from_value(body)
            .map_err(|source| FetchError::Decode { api: CATEGORY_API, source })?;

        Ok(parsed
            .items
            .into_iter()
            .next()
            .map(|item| item.snippet.category_id)
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()))
    }

    async fn get_json(&self, api: &'static str, url: Url) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Http { api, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { api, status });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Http { api, source })?;
        serde_json::from_slice(&bytes).map_err(|source| FetchError::Decode { api, source })
    }
}

/// Combina la ficha de búsqueda con la categoría resuelta.
fn build_record(video_id: &str, search: Value, category: &str) -> Result<VideoRecord, FetchError> {
    let mut fields = match search {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let title = match fields.remove("title") {
        Some(Value::String(title)) => title,
        _ => return Err(FetchError::MissingTitle),
    };

    let related_videos: Vec<RelatedVideo> = match fields.remove("related_videos") {
        Some(value) => serde_json::from_value(value)
            .map_err(|source| FetchError::Decode { api: SEARCH_API, source })?,
        None => Vec::new(),
    };

    Ok(VideoRecord {
        video_id: video_id.to_string(),
        title,
        category: category.to_string(),
        related_videos,
        extra: fields,
    })
}

/// Servidor HTTP en proceso que imita ambas APIs externas para los tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{
        extract::{Query, State},
        http::StatusCode,
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use serde_json::json;

    use crate::config::{test_config, AppConfig};

    #[derive(Clone, Default)]
    pub struct MockApis {
        pub search_hits: Arc<AtomicUsize>,
    }

    impl MockApis {
        pub fn search_hits(&self) -> usize {
            self.search_hits.load(Ordering::SeqCst)
        }
    }

    /// Ids reconocidos por el servidor simulado:
    /// - `v<n>` / `s<n>`: ficha completa, título "Title <id>", categoría Music.
    /// - `many`: cinco vídeos relacionados.
    /// - `nocat`: la API de YouTube devuelve `items` vacío.
    /// - `down`: la API de búsqueda responde 500.
    /// - `garbage`: la API de búsqueda responde texto que no es JSON.
    /// - `notitle`: la ficha no tiene título.
    /// - `slow`: la API de búsqueda tarda 3 s en responder.
    pub async fn spawn_mock_apis() -> (AppConfig, MockApis) {
        let mock = MockApis::default();
        let router = Router::new()
            .route("/videos", get(category_handler))
            .route("/search.json", get(search_handler))
            .with_state(mock.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let mut cfg = test_config();
        cfg.youtube_api_url = format!("http://{addr}/videos");
        cfg.serpapi_url = format!("http://{addr}/search.json");
        (cfg, mock)
    }

    async fn category_handler(Query(q): Query<HashMap<String, String>>) -> impl IntoResponse {
        if q.get("key").map(String::as_str) != Some("yt-key") || q.get("part").map(String::as_str) != Some("snippet") {
            return (StatusCode::FORBIDDEN, Json(json!({"error": "bad key"})));
        }
        let id = q.get("id").cloned().unwrap_or_default();
        if id == "nocat" {
            return (StatusCode::OK, Json(json!({ "items": [] })));
        }
        (
            StatusCode::OK,
            Json(json!({ "items": [ { "snippet": { "categoryId": "10", "title": "ignored" } } ] })),
        )
    }

    async fn search_handler(
        State(mock): State<MockApis>,
        Query(q): Query<HashMap<String, String>>,
    ) -> axum::response::Response {
        mock.search_hits.fetch_add(1, Ordering::SeqCst);
        if q.get("api_key").map(String::as_str) != Some("serp-key")
            || q.get("engine").map(String::as_str) != Some("youtube_video")
        {
            return (StatusCode::FORBIDDEN, Json(json!({"error": "bad key"}))).into_response();
        }
        let id = q.get("v").cloned().unwrap_or_default();
        match id.as_str() {
            "down" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
            "garbage" => (StatusCode::OK, "<html>not json</html>").into_response(),
            "notitle" => Json(json!({ "error": "Video not found" })).into_response(),
            "slow" => {
                tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                Json(json!({ "title": "Title slow" })).into_response()
            }
            "many" => {
                let related: Vec<_> = (1..=5)
                    .map(|i| json!({ "title": format!("Related {i}"), "video_id": format!("r{i}") }))
                    .collect();
                Json(json!({
                    "title": "Title many",
                    "related_videos": related,
                    "channel": { "name": "Some channel" },
                }))
                .into_response()
            }
            other => Json(json!({
                "title": format!("Title {other}"),
                "views": 1234,
            }))
            .into_response(),
        }
    }
}
