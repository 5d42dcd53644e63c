//! Modelos de dominio (metadatos de vídeos y atributos de los nodos del grafo).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Vídeo relacionado tal y como lo devuelve la API de búsqueda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedVideo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
}

/// Metadatos de un vídeo, combinando la API de búsqueda y la categoría de YouTube.
/// Se crea una sola vez por vídeo y no se modifica después.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub category: String,
    pub related_videos: Vec<RelatedVideo>,
    /// Campos adicionales de la respuesta de búsqueda que no forman parte del modelo.
    pub extra: Map<String, Value>,
}

impl VideoRecord {
    /// Registro degradado: título = id del vídeo, categoría desconocida, sin relacionados.
    pub fn degraded(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            title: video_id.to_string(),
            category: UNKNOWN_CATEGORY.to_string(),
            related_videos: Vec::new(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeColor {
    Red,
    Blue,
    Orange,
}

impl NodeColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Orange => "orange",
        }
    }
}

/// Atributos almacenados en cada nodo del grafo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    pub title: String,
    pub category: Option<String>,
    pub video_id: Option<String>,
    pub color: NodeColor,
    pub size: u32,
}

impl NodeAttributes {
    /// Nodo raíz sintético (no corresponde a ningún vídeo).
    pub fn root(label: &str) -> Self {
        Self {
            title: label.to_string(),
            category: None,
            video_id: None,
            color: NodeColor::Red,
            size: 20,
        }
    }

    pub fn for_video(record: &VideoRecord, color: NodeColor, size: u32) -> Self {
        Self {
            title: record.title.clone(),
            category: Some(record.category.clone()),
            video_id: Some(record.video_id.clone()),
            color,
            size,
        }
    }

    /// Texto mostrado al pasar el ratón por encima del nodo.
    pub fn hover_text(&self) -> String {
        format!(
            "{} (Category: {})",
            self.title,
            self.category.as_deref().unwrap_or(UNKNOWN_CATEGORY)
        )
    }
}
