//! Carga y gestión de configuración de la aplicación (APIs externas + servidor).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

pub const DEFAULT_YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3/videos";
pub const DEFAULT_SERPAPI_URL: &str = "https://serpapi.com/search.json";

/// Configuración completa de la aplicación.
#[derive(Clone)]
pub struct AppConfig {
    pub youtube_api_key: String,
    pub serpapi_api_key: String,
    pub youtube_api_url: String,
    pub serpapi_url: String,
    pub serpapi_engine: String,

    pub user_history_path: PathBuf,
    pub server_addr: String,

    pub http_timeout: Duration,
    pub fetch_concurrency: usize,
    pub related_limit: usize,
}

// Las claves de API no deben acabar en los logs.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("youtube_api_url", &self.youtube_api_url)
            .field("serpapi_url", &self.serpapi_url)
            .field("serpapi_engine", &self.serpapi_engine)
            .field("user_history_path", &self.user_history_path)
            .field("server_addr", &self.server_addr)
            .field("http_timeout", &self.http_timeout)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("related_limit", &self.related_limit)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda de variables.
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("Falta {key} en el entorno"))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let youtube_api_key = required("YOUTUBE_API_KEY")?;
        let serpapi_api_key = required("SERPAPI_API_KEY")?;

        let http_timeout_secs: u64 = parse_number(&lookup, "HTTP_TIMEOUT_SECS", 10)?;
        let fetch_concurrency: usize = parse_number(&lookup, "FETCH_CONCURRENCY", 4)?;
        if fetch_concurrency == 0 {
            return Err(anyhow!("FETCH_CONCURRENCY debe ser mayor que 0"));
        }

        Ok(Self {
            youtube_api_key,
            serpapi_api_key,
            youtube_api_url: or_default("YOUTUBE_API_URL", DEFAULT_YOUTUBE_API_URL),
            serpapi_url: or_default("SERPAPI_URL", DEFAULT_SERPAPI_URL),
            serpapi_engine: or_default("SERPAPI_ENGINE", "youtube_video"),
            user_history_path: PathBuf::from(or_default("USER_HISTORY_PATH", "data/user_videos.json")),
            server_addr: or_default("SERVER_ADDR", "127.0.0.1:8050"),
            http_timeout: Duration::from_secs(http_timeout_secs),
            fetch_concurrency,
            related_limit: parse_number(&lookup, "RELATED_LIMIT", 3)?,
        })
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Valor no válido para {key}: '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        youtube_api_key: "yt-key".to_string(),
        serpapi_api_key: "serp-key".to_string(),
        youtube_api_url: "http://127.0.0.1:9/videos".to_string(),
        serpapi_url: "http://127.0.0.1:9/search.json".to_string(),
        serpapi_engine: "youtube_video".to_string(),
        user_history_path: PathBuf::from("data/user_videos.json"),
        server_addr: "127.0.0.1:0".to_string(),
        http_timeout: Duration::from_secs(2),
        fetch_concurrency: 4,
        related_limit: 3,
    }
}
