//! Construcción de los grafos de recomendaciones a partir de metadatos ya descargados.
//!
//! Dos formas de entrada:
//!   - Sesión de usuario: semillas encadenadas en orden y, de cada una, sus
//!     sugerencias grabadas.
//!   - Lista de semillas: raíz → semilla → primeros vídeos relacionados.

use tracing::debug;

use crate::{
    graph::VideoGraph,
    history::SessionHistory,
    models::{NodeAttributes, NodeColor},
    youtube::VideoCatalog,
};

pub const SESSION_ROOT: &str = "Start Point";
pub const SEEDS_ROOT: &str = "User Starting Point";

/// Grafo construido junto con su camino principal (raíz + semillas añadidas).
#[derive(Debug, Clone)]
pub struct BuiltGraph {
    pub graph: VideoGraph,
    pub main_path: Vec<String>,
}

/// Ids de vídeo que hay que descargar para construir el grafo de una sesión.
/// Las semillas sin sugerencias no aparecen en el grafo, así que no se piden.
pub fn session_video_ids(history: &SessionHistory) -> Vec<String> {
    history
        .entries
        .iter()
        .filter(|entry| !entry.suggestions.is_empty())
        .flat_map(|entry| std::iter::once(&entry.seed).chain(entry.suggestions.iter()))
        .cloned()
        .collect()
}

/// Grafo de una sesión grabada: las semillas forman una cadena lineal desde la raíz
/// y cada semilla apunta a sus sugerencias. Una semilla sin sugerencias se omite.
pub fn build_session_graph(history: &SessionHistory, catalog: &VideoCatalog) -> BuiltGraph {
    let mut graph = VideoGraph::new();
    graph.add_node(SESSION_ROOT, NodeAttributes::root(SESSION_ROOT));

    let mut main_path = vec![SESSION_ROOT.to_string()];
    let mut current = SESSION_ROOT.to_string();

    for entry in &history.entries {
        if entry.suggestions.is_empty() {
            debug!("Semilla {} sin sugerencias, se omite", entry.seed);
            continue;
        }

        let seed = catalog.record(&entry.seed);
        graph.add_node(&entry.seed, NodeAttributes::for_video(&seed, NodeColor::Blue, 15));
        graph.add_edge(&current, &entry.seed);
        current = entry.seed.clone();
        main_path.push(entry.seed.clone());

        for suggested_id in &entry.suggestions {
            let suggested = catalog.record(suggested_id);
            graph.add_node(
                suggested_id,
                NodeAttributes::for_video(&suggested, NodeColor::Orange, 15),
            );
            graph.add_edge(&entry.seed, suggested_id);
        }
    }

    BuiltGraph { graph, main_path }
}

/// Grafo de semillas libres: raíz → semilla → hasta `related_limit` vídeos
/// relacionados (sin recursión). Un vídeo relacionado hereda la categoría de su semilla.
pub fn build_seed_graph(seeds: &[String], catalog: &VideoCatalog, related_limit: usize) -> BuiltGraph {
    let mut graph = VideoGraph::new();
    graph.add_node(SEEDS_ROOT, NodeAttributes::root(SEEDS_ROOT));
    let mut main_path = vec![SEEDS_ROOT.to_string()];

    for seed_id in seeds {
        let seed = catalog.record(seed_id);
        graph.add_node(seed_id, NodeAttributes::for_video(&seed, NodeColor::Blue, 15));
        graph.add_edge(SEEDS_ROOT, seed_id);
        main_path.push(seed_id.clone());

        for (i, related) in seed.related_videos.iter().take(related_limit).enumerate() {
            let key = related
                .video_id
                .clone()
                .or_else(|| related.title.clone())
                .unwrap_or_else(|| format!("{seed_id}/related/{i}"));
            if graph.contains(&key) {
                // Otra semilla o un relacionado compartido: se conserva el nodo existente.
                debug!("Vídeo relacionado {key} ya presente en el grafo; sólo se enlaza");
                graph.add_edge(seed_id, &key);
                continue;
            }
            let title = related
                .title
                .clone()
                .unwrap_or_else(|| format!("Missing Title for related video of {seed_id}"));

            graph.add_node(
                &key,
                NodeAttributes {
                    title,
                    category: Some(seed.category.clone()),
                    video_id: related.video_id.clone(),
                    color: NodeColor::Orange,
                    size: 10,
                },
            );
            graph.add_edge(seed_id, &key);
        }
    }

    BuiltGraph { graph, main_path }
}

/// Separa el texto libre del usuario en ids de vídeo (por comas, sin blancos).
pub fn parse_video_ids(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
