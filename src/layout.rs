//! Cálculo de posiciones (x, y) para los nodos del grafo.
//!
//! Estrategias:
//!   - Camino principal + ramas laterales (grafos de sesión).
//!   - Dibujo plano (grafos de semillas): árbol en capas para bosques, capas
//!     ordenadas por baricentro o relajación por fuerzas para el resto.
//!
//! Si el grafo supera la cota de Euler se recurre al camino principal.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;
use tracing::{debug, warn};

use crate::{builder::BuiltGraph, graph::VideoGraph};

pub const DEFAULT_SIDE_SPACING: f64 = 1.0;
pub const DEFAULT_MAIN_SPACING: f64 = 2.0;

/// Posición de cada nodo, por clave.
pub type Positions = HashMap<String, (f64, f64)>;

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("el grafo no es plano: {edges} aristas superan la cota de Euler ({bound})")]
    NonPlanar { edges: usize, bound: usize },
}

/// Coloca el camino principal sobre el eje x, separado `main_spacing`, y apila encima
/// de cada nodo sus sucesores que no pertenecen al camino, separados `side_spacing`.
///
/// - Un nodo lateral de varios nodos del camino queda en la última posición asignada.
/// - Los nodos del camino nunca se recolocan como ramas laterales.
/// - Las claves del camino ausentes del grafo se ignoran sin ocupar hueco.
/// - Los nodos que quedan sin posición se alinean bajo el eje (`y = -side_spacing`).
pub fn main_path_layout(
    graph: &VideoGraph,
    main_path: &[String],
    side_spacing: f64,
    main_spacing: f64,
) -> Positions {
    let on_path: HashSet<&str> = main_path.iter().map(String::as_str).collect();
    let mut positions = Positions::new();
    let mut x = 0.0;

    for key in main_path {
        if !graph.contains(key) {
            debug!("Nodo {key} del camino principal ausente del grafo, se ignora");
            continue;
        }
        positions.insert(key.clone(), (x, 0.0));

        let mut y = side_spacing;
        for side in graph.successors(key) {
            if on_path.contains(side) {
                continue;
            }
            positions.insert(side.to_string(), (x, y));
            y += side_spacing;
        }
        x += main_spacing;
    }

    let mut orphan_x = 0.0;
    for node in graph.nodes() {
        if !positions.contains_key(&node.key) {
            warn!("Nodo {} sin posición en el camino principal; se coloca bajo el eje", node.key);
            positions.insert(node.key.clone(), (orphan_x, -side_spacing));
            orphan_x += main_spacing;
        }
    }

    positions
}

/// Dibujo plano normalizado a [-1, 1] en ambos ejes.
///
/// Rechaza los grafos que superan la cota de Euler `|E| <= 3|V| - 6`. Los bosques se
/// dibujan como árboles en capas. El resto se ordena por capas (BFS desde las raíces)
/// y, si aún quedan cruces o nodos sobre aristas ajenas, se relaja con fuerzas.
pub fn planar_layout(graph: &VideoGraph) -> Result<Positions, LayoutError> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(Positions::new());
    }

    let edges = graph.simple_undirected_edges();
    if n >= 3 && edges.len() > 3 * n - 6 {
        return Err(LayoutError::NonPlanar { edges: edges.len(), bound: 3 * n - 6 });
    }

    let positions = if edges.len() + count_components(graph) == n {
        tree_layout(graph)
    } else {
        let layered = layered_layout(graph, &edges);
        if count_overlaps(&edges, &layered) == 0 {
            layered
        } else {
            debug!("El dibujo en capas tiene cruces; se relaja con fuerzas");
            let relaxed = force_layout(graph, &edges, &layered);
            let overlaps = count_overlaps(&edges, &relaxed);
            if overlaps > 0 {
                warn!("Quedan {overlaps} cruces o solapes en el dibujo plano");
            }
            relaxed
        }
    };

    Ok(normalize(positions))
}

/// Disposición del grafo de semillas: plana si es posible, si no camino principal.
pub fn layout_seed_graph(built: &BuiltGraph) -> Positions {
    match planar_layout(&built.graph) {
        Ok(positions) => positions,
        Err(err) => {
            warn!("Disposición plana no disponible ({err}); se usa el camino principal");
            main_path_layout(
                &built.graph,
                &built.main_path,
                DEFAULT_SIDE_SPACING,
                DEFAULT_MAIN_SPACING,
            )
        }
    }
}

fn tree_layout(graph: &VideoGraph) -> Positions {
    let mut tree = TreeLayout::new(graph);
    // Primero las raíces naturales (sin aristas entrantes), luego cualquier resto.
    for node in graph.nodes() {
        if graph.in_degree(&node.key) == 0 {
            tree.place_component(&node.key);
        }
    }
    for node in graph.nodes() {
        tree.place_component(&node.key);
    }
    tree.positions
}

fn count_components(graph: &VideoGraph) -> usize {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut components = 0;
    for node in graph.nodes() {
        if !seen.insert(node.key.as_str()) {
            continue;
        }
        components += 1;
        let mut stack = vec![node.key.as_str()];
        while let Some(key) = stack.pop() {
            for neighbor in graph.undirected_neighbors(key) {
                if seen.insert(neighbor) {
                    stack.push(neighbor);
                }
            }
        }
    }
    components
}

/// Árbol en capas: cada hoja ocupa una columna y cada padre se centra sobre sus hijos,
/// de modo que cada subárbol ocupa un intervalo contiguo y no hay cruces.
struct TreeLayout<'g> {
    graph: &'g VideoGraph,
    visited: HashSet<&'g str>,
    positions: Positions,
    next_column: f64,
}

impl<'g> TreeLayout<'g> {
    fn new(graph: &'g VideoGraph) -> Self {
        Self {
            graph,
            visited: HashSet::new(),
            positions: Positions::new(),
            next_column: 0.0,
        }
    }

    fn place_component(&mut self, root: &'g str) {
        if self.visited.insert(root) {
            self.place(root, 0);
        }
    }

    /// Devuelve la x asignada al nodo. El nodo ya debe estar marcado como visitado.
    fn place(&mut self, key: &'g str, depth: usize) -> f64 {
        let graph = self.graph;
        let mut children: Vec<&'g str> = Vec::new();
        for child in graph.successors(key).into_iter().chain(graph.undirected_neighbors(key)) {
            if self.visited.insert(child) {
                children.push(child);
            }
        }

        let x = if children.is_empty() {
            let column = self.next_column;
            self.next_column += 1.0;
            column
        } else {
            let xs: Vec<f64> = children
                .into_iter()
                .map(|child| self.place(child, depth + 1))
                .collect();
            (xs[0] + xs[xs.len() - 1]) / 2.0
        };

        self.positions.insert(key.to_string(), (x, -(depth as f64)));
        x
    }
}

// --- Capas ordenadas por baricentro ---

const ORDERING_SWEEPS: usize = 8;

/// Capas por distancia BFS (sin dirección) desde las raíces; cada capa se centra en x = 0.
/// Se conserva la ordenación con menos solapes entre varias pasadas de baricentro.
fn layered_layout(graph: &VideoGraph, edges: &[(&str, &str)]) -> Positions {
    let mut layers = bfs_layers(graph);
    let mut best = layer_positions(&layers);
    let mut best_overlaps = count_overlaps(edges, &best);

    for _ in 0..ORDERING_SWEEPS {
        if best_overlaps == 0 {
            break;
        }
        for depth in 1..layers.len() {
            let (fixed, rest) = layers.split_at_mut(depth);
            sort_by_barycenter(graph, &mut rest[0], &fixed[depth - 1]);
        }
        for depth in (0..layers.len().saturating_sub(1)).rev() {
            let (head, fixed) = layers.split_at_mut(depth + 1);
            sort_by_barycenter(graph, &mut head[depth], &fixed[0]);
        }

        let candidate = layer_positions(&layers);
        let overlaps = count_overlaps(edges, &candidate);
        if overlaps < best_overlaps {
            best = candidate;
            best_overlaps = overlaps;
        }
    }
    best
}

fn bfs_layers(graph: &VideoGraph) -> Vec<Vec<&str>> {
    let mut depth_of: HashMap<&str, usize> = HashMap::new();
    let mut layers: Vec<Vec<&str>> = Vec::new();

    let roots = graph
        .nodes()
        .filter(|node| graph.in_degree(&node.key) == 0)
        .chain(graph.nodes())
        .map(|node| node.key.as_str());
    for root in roots {
        if depth_of.contains_key(root) {
            continue;
        }
        depth_of.insert(root, 0);
        let mut queue = VecDeque::from([root]);
        while let Some(key) = queue.pop_front() {
            let depth = depth_of[key];
            if layers.len() <= depth {
                layers.resize_with(depth + 1, Vec::new);
            }
            layers[depth].push(key);

            for neighbor in graph.successors(key).into_iter().chain(graph.undirected_neighbors(key)) {
                if !depth_of.contains_key(neighbor) {
                    depth_of.insert(neighbor, depth + 1);
                    queue.push_back(neighbor);
                }
            }
        }
    }
    layers
}

/// Reordena `layer` según la columna media de sus vecinos en `fixed`. Los nodos sin
/// vecinos en `fixed` conservan su índice actual.
fn sort_by_barycenter<'g>(graph: &'g VideoGraph, layer: &mut [&'g str], fixed: &[&'g str]) {
    let column: HashMap<&str, f64> = fixed
        .iter()
        .enumerate()
        .map(|(i, key)| (*key, i as f64))
        .collect();

    let barycenters: HashMap<&str, f64> = layer
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let columns: Vec<f64> = graph
                .undirected_neighbors(key)
                .into_iter()
                .filter_map(|neighbor| column.get(neighbor).copied())
                .collect();
            let value = if columns.is_empty() {
                i as f64
            } else {
                columns.iter().sum::<f64>() / columns.len() as f64
            };
            (*key, value)
        })
        .collect();

    layer.sort_by(|a, b| barycenters[a].total_cmp(&barycenters[b]));
}

fn layer_positions(layers: &[Vec<&str>]) -> Positions {
    let mut positions = Positions::new();
    for (depth, layer) in layers.iter().enumerate() {
        let offset = (layer.len() as f64 - 1.0) / 2.0;
        for (i, key) in layer.iter().enumerate() {
            positions.insert(key.to_string(), (i as f64 - offset, -(depth as f64)));
        }
    }
    positions
}

// --- Relajación por fuerzas ---

const FORCE_ITERATIONS: usize = 200;
const FORCE_COOLING: f64 = 0.97;
const MIN_DISTANCE: f64 = 0.01;

/// Fruchterman-Reingold con longitud ideal 1, partiendo de `start`. Determinista.
fn force_layout(graph: &VideoGraph, edges: &[(&str, &str)], start: &Positions) -> Positions {
    let keys: Vec<&str> = graph.nodes().map(|node| node.key.as_str()).collect();
    let index: HashMap<&str, usize> = keys.iter().enumerate().map(|(i, key)| (*key, i)).collect();
    let links: Vec<(usize, usize)> = edges
        .iter()
        .filter_map(|(a, b)| Some((*index.get(a)?, *index.get(b)?)))
        .collect();
    let mut points: Vec<Point> = keys
        .iter()
        .map(|key| start.get(*key).copied().unwrap_or((0.0, 0.0)))
        .collect();

    let mut temperature = 1.0;
    for _ in 0..FORCE_ITERATIONS {
        let mut shift = vec![(0.0, 0.0); points.len()];

        // Repulsión entre todos los pares
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                let (dx, dy) = (points[i].0 - points[j].0, points[i].1 - points[j].1);
                let dist = (dx * dx + dy * dy).sqrt().max(MIN_DISTANCE);
                let force = 1.0 / dist;
                let (fx, fy) = (dx / dist * force, dy / dist * force);
                shift[i].0 += fx;
                shift[i].1 += fy;
                shift[j].0 -= fx;
                shift[j].1 -= fy;
            }
        }

        // Atracción a lo largo de las aristas
        for &(a, b) in &links {
            let (dx, dy) = (points[a].0 - points[b].0, points[a].1 - points[b].1);
            let dist = (dx * dx + dy * dy).sqrt().max(MIN_DISTANCE);
            let force = dist * dist;
            let (fx, fy) = (dx / dist * force, dy / dist * force);
            shift[a].0 -= fx;
            shift[a].1 -= fy;
            shift[b].0 += fx;
            shift[b].1 += fy;
        }

        for (point, (sx, sy)) in points.iter_mut().zip(&shift) {
            let len = (sx * sx + sy * sy).sqrt();
            if len > 0.0 {
                let step = len.min(temperature);
                point.0 += sx / len * step;
                point.1 += sy / len * step;
            }
        }
        temperature *= FORCE_COOLING;
    }

    keys.into_iter()
        .zip(points)
        .map(|(key, point)| (key.to_string(), point))
        .collect()
}

// --- Comprobación geométrica ---

type Point = (f64, f64);

const EPSILON: f64 = 1e-9;

/// Pares de aristas que se cruzan más nodos situados sobre una arista que no es suya.
fn count_overlaps(edges: &[(&str, &str)], positions: &Positions) -> usize {
    let mut overlaps = 0;
    for (i, &(a, b)) in edges.iter().enumerate() {
        let (Some(&p), Some(&q)) = (positions.get(a), positions.get(b)) else {
            continue;
        };

        overlaps += positions
            .iter()
            .filter(|(key, r)| key.as_str() != a && key.as_str() != b && on_segment(p, q, **r))
            .count();

        for &(c, d) in &edges[i + 1..] {
            if a == c || a == d || b == c || b == d {
                continue;
            }
            if let (Some(&r), Some(&s)) = (positions.get(c), positions.get(d)) {
                if segments_cross(p, q, r, s) {
                    overlaps += 1;
                }
            }
        }
    }
    overlaps
}

fn orientation(p: Point, q: Point, r: Point) -> f64 {
    (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0)
}

fn on_segment(p: Point, q: Point, r: Point) -> bool {
    orientation(p, q, r).abs() < EPSILON
        && r.0 >= p.0.min(q.0) - EPSILON
        && r.0 <= p.0.max(q.0) + EPSILON
        && r.1 >= p.1.min(q.1) - EPSILON
        && r.1 <= p.1.max(q.1) + EPSILON
}

/// Cruce propio: cada segmento deja los extremos del otro a lados opuestos.
fn segments_cross(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let opposite = |a: f64, b: f64| (a > EPSILON && b < -EPSILON) || (a < -EPSILON && b > EPSILON);
    opposite(orientation(q1, q2, p1), orientation(q1, q2, p2))
        && opposite(orientation(p1, p2, q1), orientation(p1, p2, q2))
}

fn normalize(mut positions: Positions) -> Positions {
    let bounds = |pick: fn(&(f64, f64)) -> f64, positions: &Positions| {
        positions.values().map(pick).fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
    };
    let (min_x, max_x) = bounds(|p| p.0, &positions);
    let (min_y, max_y) = bounds(|p| p.1, &positions);

    let scale = |v: f64, lo: f64, hi: f64| {
        if hi > lo {
            2.0 * (v - lo) / (hi - lo) - 1.0
        } else {
            0.0
        }
    };
    for (x, y) in positions.values_mut() {
        *x = scale(*x, min_x, max_x);
        *y = scale(*y, min_y, max_y);
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeAttributes;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> VideoGraph {
        let mut g = VideoGraph::new();
        for key in nodes {
            g.add_node(key, NodeAttributes::root(key));
        }
        for (s, t) in edges {
            assert!(g.add_edge(s, t));
        }
        g
    }

    fn path(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn main_path_with_one_side_branch() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let pos = main_path_layout(&g, &path(&["A", "B"]), 1.0, 2.0);
        assert_eq!(pos["A"], (0.0, 0.0));
        assert_eq!(pos["B"], (2.0, 0.0));
        assert_eq!(pos["C"], (2.0, 1.0));
        assert_eq!(pos.len(), 3);
    }

    #[test]
    fn side_branches_stack_upwards() {
        let g = graph(
            &["A", "s1", "s2", "s3"],
            &[("A", "s1"), ("A", "s2"), ("A", "s3")],
        );
        let pos = main_path_layout(&g, &path(&["A"]), 0.5, 2.0);
        assert_eq!(pos["s1"], (0.0, 0.5));
        assert_eq!(pos["s2"], (0.0, 1.0));
        assert_eq!(pos["s3"], (0.0, 1.5));
    }

    #[test]
    fn shared_side_branch_takes_last_assignment() {
        let g = graph(&["A", "B", "S"], &[("A", "B"), ("A", "S"), ("B", "S")]);
        let pos = main_path_layout(&g, &path(&["A", "B"]), 1.0, 2.0);
        assert_eq!(pos["S"], (2.0, 1.0));
    }

    #[test]
    fn main_path_members_are_never_moved() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        let pos = main_path_layout(&g, &path(&["A", "B", "C"]), 1.0, 2.0);
        assert_eq!(pos["A"], (0.0, 0.0));
        assert_eq!(pos["C"], (4.0, 0.0));
    }

    #[test]
    fn absent_main_path_keys_do_not_take_a_slot() {
        let g = graph(&["A", "C"], &[("A", "C")]);
        let pos = main_path_layout(&g, &path(&["A", "ghost", "C"]), 1.0, 2.0);
        assert_eq!(pos["C"], (2.0, 0.0));
        assert!(!pos.contains_key("ghost"));
    }

    #[test]
    fn unreachable_nodes_go_below_the_axis() {
        let g = graph(&["A", "x", "y"], &[("x", "y")]);
        let pos = main_path_layout(&g, &path(&["A"]), 1.0, 2.0);
        assert_eq!(pos["x"], (0.0, -1.0));
        assert_eq!(pos["y"], (2.0, -1.0));
    }

    #[test]
    fn planar_tree_layout_is_layered_and_normalized() {
        let g = graph(
            &["root", "s1", "s2", "r1", "r2"],
            &[("root", "s1"), ("root", "s2"), ("s1", "r1"), ("s1", "r2")],
        );
        let pos = planar_layout(&g).unwrap();
        assert_eq!(pos["r1"], (-1.0, -1.0));
        assert_eq!(pos["r2"], (0.0, -1.0));
        assert_eq!(pos["s1"], (-0.5, 0.0));
        assert_eq!(pos["s2"], (1.0, 0.0));
        assert_eq!(pos["root"], (0.25, 1.0));
    }

    #[test]
    fn planar_layout_handles_single_node_and_forests() {
        let single = graph(&["root"], &[]);
        assert_eq!(planar_layout(&single).unwrap()["root"], (0.0, 0.0));

        let forest = graph(&["a", "b", "c"], &[("a", "b")]);
        let pos = planar_layout(&forest).unwrap();
        assert_eq!(pos.len(), 3);
        assert!(pos["a"].1 > pos["b"].1);
        assert!(pos["c"].0 > pos["b"].0);
    }

    fn complete_graph(keys: &[&str]) -> VideoGraph {
        let mut edges = Vec::new();
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                edges.push((*a, *b));
            }
        }
        graph(keys, &edges)
    }

    #[test]
    fn planar_layout_rejects_graphs_over_euler_bound() {
        let k5 = complete_graph(&["1", "2", "3", "4", "5"]);
        assert_eq!(
            planar_layout(&k5),
            Err(LayoutError::NonPlanar { edges: 10, bound: 9 })
        );
    }

    #[test]
    fn seeds_sharing_a_related_video_are_drawn_without_overlaps() {
        let g = graph(
            &["root", "v1", "v2", "shared"],
            &[("root", "v1"), ("root", "v2"), ("v1", "shared"), ("v2", "shared")],
        );
        let built = BuiltGraph {
            graph: g,
            main_path: path(&["root", "v1", "v2"]),
        };
        let pos = layout_seed_graph(&built);

        assert_eq!(pos["root"], (0.0, 1.0));
        assert_eq!(pos["v1"], (-1.0, 0.0));
        assert_eq!(pos["v2"], (1.0, 0.0));
        assert_eq!(pos["shared"], (0.0, -1.0));
        assert_eq!(count_overlaps(&built.graph.simple_undirected_edges(), &pos), 0);
    }

    #[test]
    fn cycles_are_laid_out_in_layers() {
        let cycle = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let pos = planar_layout(&cycle).unwrap();
        assert_eq!(pos["a"], (0.0, 1.0));
        assert_eq!(pos["b"], (-1.0, -1.0));
        assert_eq!(pos["c"], (1.0, -1.0));
    }

    #[test]
    fn crowded_layers_are_relaxed_by_forces() {
        // En capas, la arista 2-4 pasaría por encima de 3.
        let k4 = complete_graph(&["1", "2", "3", "4"]);
        let edges = k4.simple_undirected_edges();
        assert!(count_overlaps(&edges, &layered_layout(&k4, &edges)) > 0);

        let pos = planar_layout(&k4).unwrap();
        assert_eq!(pos.len(), 4);
        let points: Vec<_> = pos.values().copied().collect();
        for (i, p) in points.iter().enumerate() {
            assert!((-1.0..=1.0).contains(&p.0) && (-1.0..=1.0).contains(&p.1));
            for q in &points[i + 1..] {
                assert!((p.0 - q.0).hypot(p.1 - q.1) > 0.1);
            }
        }
        // Determinista
        assert_eq!(planar_layout(&k4).unwrap(), pos);
    }

    #[test]
    fn overlap_check_detects_nodes_on_foreign_edges_and_crossings() {
        let collinear: Positions = [("root", (0.0, 0.0)), ("v1", (2.0, 0.0)), ("v2", (4.0, 0.0))]
            .into_iter()
            .map(|(k, p)| (k.to_string(), p))
            .collect();
        assert_eq!(count_overlaps(&[("root", "v1"), ("root", "v2")], &collinear), 1);

        let cross: Positions = [("a", (0.0, 0.0)), ("b", (1.0, 1.0)), ("c", (0.0, 1.0)), ("d", (1.0, 0.0))]
            .into_iter()
            .map(|(k, p)| (k.to_string(), p))
            .collect();
        assert_eq!(count_overlaps(&[("a", "b"), ("c", "d")], &cross), 1);
        assert_eq!(count_overlaps(&[("a", "c"), ("b", "d")], &cross), 0);
    }

    #[test]
    fn parallel_edges_do_not_count_as_cycles() {
        let g = graph(&["a", "b"], &[("a", "b"), ("a", "b"), ("b", "a")]);
        assert!(planar_layout(&g).is_ok());
    }

    #[test]
    fn seed_layout_falls_back_to_main_path() {
        let built = BuiltGraph {
            graph: complete_graph(&["1", "2", "3", "4", "5"]),
            main_path: path(&["1", "2", "3"]),
        };
        let pos = layout_seed_graph(&built);
        assert_eq!(pos["3"], (4.0, 0.0));
        assert_eq!(pos["5"], (4.0, 2.0));
    }
}
