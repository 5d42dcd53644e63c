//! Conversión del grafo posicionado en una figura compatible con Plotly.
//!
//! La figura tiene dos trazas: una polilínea con todas las aristas (separadas por
//! puntos `null`) y una nube de marcadores con todos los nodos. `customdata` lleva la
//! clave de cada nodo para poder consultar sus atributos al hacer clic.

use serde::Serialize;
use thiserror::Error;

use crate::{graph::VideoGraph, layout::Positions};

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("el nodo '{0}' no tiene posición asignada")]
    MissingPosition(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: FigureLayout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Trace {
    Edges(EdgeTrace),
    Nodes(NodeTrace),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeTrace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mode: &'static str,
    pub hoverinfo: &'static str,
    /// `None` separa segmentos consecutivos (se serializa como `null`).
    pub x: Vec<Option<f64>>,
    pub y: Vec<Option<f64>>,
    pub line: Line,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeTrace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mode: &'static str,
    pub hoverinfo: &'static str,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub text: Vec<String>,
    pub customdata: Vec<String>,
    pub marker: Marker,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub width: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub showscale: bool,
    pub colorscale: &'static str,
    pub size: Vec<u32>,
    pub color: Vec<&'static str>,
    pub line: MarkerLine,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerLine {
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureLayout {
    pub showlegend: bool,
    pub hovermode: &'static str,
    pub margin: Margin,
    pub xaxis: Axis,
    pub yaxis: Axis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Margin {
    pub b: u32,
    pub l: u32,
    pub r: u32,
    pub t: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub showgrid: bool,
    pub zeroline: bool,
    pub showticklabels: bool,
}

impl Default for FigureLayout {
    fn default() -> Self {
        let hidden = Axis {
            showgrid: false,
            zeroline: false,
            showticklabels: false,
        };
        Self {
            showlegend: false,
            hovermode: "closest",
            margin: Margin { b: 40, l: 40, r: 40, t: 40 },
            xaxis: hidden.clone(),
            yaxis: hidden,
        }
    }
}

impl Figure {
    /// Figura vacía (sin trazas).
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            layout: FigureLayout::default(),
        }
    }
}

/// Construye la figura. Todos los nodos deben tener posición.
pub fn render(graph: &VideoGraph, positions: &Positions) -> Result<Figure, RenderError> {
    let position = |key: &str| {
        positions
            .get(key)
            .copied()
            .ok_or_else(|| RenderError::MissingPosition(key.to_string()))
    };

    let mut edge_x = Vec::with_capacity(graph.edge_count() * 3);
    let mut edge_y = Vec::with_capacity(graph.edge_count() * 3);
    for (source, target) in graph.edges() {
        let (x0, y0) = position(source)?;
        let (x1, y1) = position(target)?;
        edge_x.extend([Some(x0), Some(x1), None]);
        edge_y.extend([Some(y0), Some(y1), None]);
    }

    let count = graph.node_count();
    let mut node_trace = NodeTrace {
        kind: "scatter",
        mode: "markers",
        hoverinfo: "text",
        x: Vec::with_capacity(count),
        y: Vec::with_capacity(count),
        text: Vec::with_capacity(count),
        customdata: Vec::with_capacity(count),
        marker: Marker {
            showscale: false,
            colorscale: "YlGnBu",
            size: Vec::with_capacity(count),
            color: Vec::with_capacity(count),
            line: MarkerLine { width: 2.0 },
        },
    };
    for node in graph.nodes() {
        let (x, y) = position(&node.key)?;
        node_trace.x.push(x);
        node_trace.y.push(y);
        node_trace.text.push(node.attributes.hover_text());
        node_trace.customdata.push(node.key.clone());
        node_trace.marker.size.push(node.attributes.size);
        node_trace.marker.color.push(node.attributes.color.as_str());
    }

    let edge_trace = EdgeTrace {
        kind: "scatter",
        mode: "lines",
        hoverinfo: "none",
        x: edge_x,
        y: edge_y,
        line: Line { width: 0.5, color: "#888" },
    };

    Ok(Figure {
        data: vec![Trace::Edges(edge_trace), Trace::Nodes(node_trace)],
        layout: FigureLayout::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::main_path_layout;
    use crate::models::{NodeAttributes, NodeColor};
    use serde_json::json;

    fn sample() -> (VideoGraph, Positions) {
        let mut g = VideoGraph::new();
        g.add_node("Start Point", NodeAttributes::root("Start Point"));
        g.add_node(
            "v1",
            NodeAttributes {
                title: "First".into(),
                category: Some("Music".into()),
                video_id: Some("v1".into()),
                color: NodeColor::Blue,
                size: 15,
            },
        );
        g.add_node(
            "s1",
            NodeAttributes {
                title: "Second".into(),
                category: Some("Gaming".into()),
                video_id: Some("s1".into()),
                color: NodeColor::Orange,
                size: 15,
            },
        );
        g.add_edge("Start Point", "v1");
        g.add_edge("v1", "s1");
        let positions = main_path_layout(&g, &["Start Point".into(), "v1".into()], 1.0, 2.0);
        (g, positions)
    }

    fn traces(fig: &Figure) -> (&EdgeTrace, &NodeTrace) {
        match (&fig.data[0], &fig.data[1]) {
            (Trace::Edges(e), Trace::Nodes(n)) => (e, n),
            _ => panic!("orden de trazas inesperado"),
        }
    }

    #[test]
    fn edges_use_three_points_each() {
        let (g, pos) = sample();
        let fig = render(&g, &pos).unwrap();
        let (edges, _) = traces(&fig);
        assert_eq!(edges.x, vec![Some(0.0), Some(2.0), None, Some(2.0), Some(2.0), None]);
        assert_eq!(edges.y, vec![Some(0.0), Some(0.0), None, Some(0.0), Some(1.0), None]);
    }

    #[test]
    fn nodes_carry_attributes_and_keys() {
        let (g, pos) = sample();
        let fig = render(&g, &pos).unwrap();
        let (_, nodes) = traces(&fig);
        assert_eq!(nodes.customdata, vec!["Start Point", "v1", "s1"]);
        assert_eq!(nodes.marker.size, vec![20, 15, 15]);
        assert_eq!(nodes.marker.color, vec!["red", "blue", "orange"]);
        assert_eq!(
            nodes.text,
            vec![
                "Start Point (Category: Unknown)",
                "First (Category: Music)",
                "Second (Category: Gaming)",
            ]
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let (g, pos) = sample();
        let first = serde_json::to_value(render(&g, &pos).unwrap()).unwrap();
        let second = serde_json::to_value(render(&g, &pos).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn serializes_as_plotly_figure() {
        let (g, pos) = sample();
        let value = serde_json::to_value(render(&g, &pos).unwrap()).unwrap();
        assert_eq!(value["data"][0]["mode"], "lines");
        assert_eq!(value["data"][0]["x"][2], serde_json::Value::Null);
        assert_eq!(value["data"][0]["line"], json!({"width": 0.5, "color": "#888"}));
        assert_eq!(value["data"][1]["hoverinfo"], "text");
        assert_eq!(value["data"][1]["marker"]["line"]["width"], 2.0);
        assert_eq!(value["layout"]["showlegend"], false);
        assert_eq!(value["layout"]["xaxis"]["showticklabels"], false);
    }

    #[test]
    fn missing_position_is_an_error() {
        let (g, mut pos) = sample();
        pos.remove("s1");
        assert_eq!(
            render(&g, &pos),
            Err(RenderError::MissingPosition("s1".into()))
        );
    }

    #[test]
    fn empty_figure_has_no_traces() {
        let value = serde_json::to_value(Figure::empty()).unwrap();
        assert_eq!(value["data"], json!([]));
    }
}
