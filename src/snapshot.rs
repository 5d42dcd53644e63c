//! Instantáneas de los atributos de nodo de cada grafo dibujado.
//!
//! Un clic sobre un nodo sólo envía su clave; los detalles se consultan aquí sin
//! volver a llamar a las APIs externas.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{graph::VideoGraph, models::NodeAttributes};

pub const MAX_SNAPSHOTS: usize = 32;
pub const NO_INFORMATION: &str = "No information available for this node.";

/// Atributos de todos los nodos de un dibujo.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub created_at: DateTime<Utc>,
    nodes: HashMap<String, NodeAttributes>,
}

impl NodeSnapshot {
    pub fn from_graph(graph: &VideoGraph) -> Self {
        Self {
            created_at: Utc::now(),
            nodes: graph
                .nodes()
                .map(|node| (node.key.clone(), node.attributes.clone()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&NodeAttributes> {
        self.nodes.get(key)
    }
}

/// Panel de detalles de un nodo.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeDetails {
    Found {
        title: String,
        category: String,
        video_id: String,
    },
    NotFound {
        message: String,
    },
}

impl NodeDetails {
    fn not_found() -> Self {
        Self::NotFound {
            message: NO_INFORMATION.to_string(),
        }
    }

    fn from_attributes(attributes: &NodeAttributes) -> Self {
        Self::Found {
            title: attributes.title.clone(),
            category: attributes
                .category
                .clone()
                .unwrap_or_else(|| "No category available".to_string()),
            video_id: attributes
                .video_id
                .clone()
                .unwrap_or_else(|| "No video ID available".to_string()),
        }
    }
}

/// Detalles de un nodo dentro de una instantánea concreta.
pub fn lookup(snapshot: Option<&NodeSnapshot>, key: &str) -> NodeDetails {
    snapshot
        .and_then(|snapshot| snapshot.get(key))
        .map(NodeDetails::from_attributes)
        .unwrap_or_else(NodeDetails::not_found)
}

/// Almacén acotado: conserva las `capacity` instantáneas más recientes.
#[derive(Debug)]
pub struct SnapshotStore {
    capacity: usize,
    order: VecDeque<Uuid>,
    snapshots: HashMap<Uuid, NodeSnapshot>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::with_capacity(MAX_SNAPSHOTS)
    }
}

impl SnapshotStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            snapshots: HashMap::new(),
        }
    }

    pub fn insert(&mut self, snapshot: NodeSnapshot) -> Uuid {
        let id = Uuid::new_v4();
        self.snapshots.insert(id, snapshot);
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.snapshots.remove(&oldest);
            }
        }
        id
    }

    pub fn lookup(&self, render_id: &Uuid, key: &str) -> NodeDetails {
        lookup(self.snapshots.get(render_id), key)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }
}
