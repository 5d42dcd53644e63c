//! Grafo dirigido de vídeos sobre `petgraph`.
//!
//! Los nodos se identifican por clave (id de vídeo, o la etiqueta del nodo raíz) y se
//! recorren en orden de inserción. Las aristas no se deduplican.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::models::NodeAttributes;

#[derive(Debug, Clone)]
pub struct VideoNode {
    pub key: String,
    pub attributes: NodeAttributes,
}

#[derive(Debug, Clone, Default)]
pub struct VideoGraph {
    inner: DiGraph<VideoNode, ()>,
    index: HashMap<String, NodeIndex>,
}

impl VideoGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserta el nodo o, si la clave ya existe, sustituye sus atributos.
    pub fn add_node(&mut self, key: &str, attributes: NodeAttributes) {
        match self.index.get(key) {
            Some(&idx) => self.inner[idx].attributes = attributes,
            None => {
                let idx = self.inner.add_node(VideoNode {
                    key: key.to_string(),
                    attributes,
                });
                self.index.insert(key.to_string(), idx);
            }
        }
    }

    /// Añade una arista dirigida. Devuelve `false` si falta alguno de los extremos.
    pub fn add_edge(&mut self, source: &str, target: &str) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&s), Some(&t)) => {
                self.inner.add_edge(s, t, ());
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    #[cfg(test)]
    pub fn node(&self, key: &str) -> Option<&NodeAttributes> {
        self.index.get(key).map(|&idx| &self.inner[idx].attributes)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Nodos en orden de inserción.
    pub fn nodes(&self) -> impl Iterator<Item = &VideoNode> {
        self.inner.node_indices().map(|idx| &self.inner[idx])
    }

    /// Aristas (origen, destino) en orden de inserción.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.edge_references().map(|edge| {
            (
                self.inner[edge.source()].key.as_str(),
                self.inner[edge.target()].key.as_str(),
            )
        })
    }

    /// Sucesores del nodo en orden de inserción de las aristas, sin repetidos.
    pub fn successors(&self, key: &str) -> Vec<&str> {
        let Some(&idx) = self.index.get(key) else {
            return Vec::new();
        };
        // petgraph recorre las aristas salientes de la más reciente a la más antigua.
        let mut targets: Vec<NodeIndex> = self
            .inner
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| edge.target())
            .collect();
        targets.reverse();

        let mut out: Vec<&str> = Vec::with_capacity(targets.len());
        for target in targets {
            let key = self.inner[target].key.as_str();
            if !out.contains(&key) {
                out.push(key);
            }
        }
        out
    }

    /// Vecinos sin tener en cuenta la dirección (sin repetidos, incluye bucles).
    pub(crate) fn undirected_neighbors(&self, key: &str) -> Vec<&str> {
        let Some(&idx) = self.index.get(key) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = Vec::new();
        for neighbor in self.inner.neighbors_undirected(idx) {
            let key = self.inner[neighbor].key.as_str();
            if !out.contains(&key) {
                out.push(key);
            }
        }
        out
    }

    pub(crate) fn in_degree(&self, key: &str) -> usize {
        self.index
            .get(key)
            .map(|&idx| self.inner.edges_directed(idx, Direction::Incoming).count())
            .unwrap_or(0)
    }

    /// Pares de nodos distintos unidos por al menos una arista, ignorando la dirección
    /// y los bucles. Orden de primera aparición.
    pub(crate) fn simple_undirected_edges(&self) -> Vec<(&str, &str)> {
        let mut seen = HashSet::new();
        let mut pairs = Vec::new();
        for edge in self.inner.edge_references() {
            let (a, b) = (edge.source(), edge.target());
            if a != b && seen.insert(if a < b { (a, b) } else { (b, a) }) {
                pairs.push((self.inner[a].key.as_str(), self.inner[b].key.as_str()));
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeColor;

    fn attrs(title: &str) -> NodeAttributes {
        NodeAttributes {
            title: title.to_string(),
            category: None,
            video_id: None,
            color: NodeColor::Blue,
            size: 15,
        }
    }

    #[test]
    fn add_node_upserts_attributes() {
        let mut g = VideoGraph::new();
        g.add_node("a", attrs("first"));
        g.add_node("a", attrs("second"));
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.node("a").unwrap().title, "second");
    }

    #[test]
    fn edges_keep_insertion_order_and_duplicates() {
        let mut g = VideoGraph::new();
        for k in ["a", "b", "c"] {
            g.add_node(k, attrs(k));
        }
        assert!(g.add_edge("a", "b"));
        assert!(g.add_edge("a", "c"));
        assert!(g.add_edge("a", "b"));
        assert!(!g.add_edge("a", "missing"));

        let edges: Vec<_> = g.edges().collect();
        assert_eq!(edges, vec![("a", "b"), ("a", "c"), ("a", "b")]);
        assert_eq!(g.successors("a"), vec!["b", "c"]);
        assert!(g.successors("missing").is_empty());
        assert_eq!(g.in_degree("b"), 2);
    }

    #[test]
    fn nodes_iterate_in_insertion_order() {
        let mut g = VideoGraph::new();
        for k in ["z", "a", "m"] {
            g.add_node(k, attrs(k));
        }
        let keys: Vec<_> = g.nodes().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn simple_edges_ignore_direction_duplicates_and_loops() {
        let mut g = VideoGraph::new();
        for k in ["a", "b"] {
            g.add_node(k, attrs(k));
        }
        g.add_edge("a", "b");
        g.add_edge("b", "a");
        assert_eq!(g.simple_undirected_edges(), vec![("a", "b")]);
        g.add_edge("a", "a");
        assert_eq!(g.simple_undirected_edges().len(), 1);

        let mut neighbors = g.undirected_neighbors("a");
        neighbors.sort();
        assert_eq!(neighbors, vec!["a", "b"]);
    }
}
