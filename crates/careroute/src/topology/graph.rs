//! Weighted adjacency graph over patient and hospital points

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::geo::round_km;
use crate::model::{Point, PointKind};

/// An outgoing edge in the adjacency list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub to: String,
    pub weight_km: f64,
}

impl Edge {
    pub fn new(to: impl Into<String>, weight_km: f64) -> Self {
        Self {
            to: to.into(),
            weight_km,
        }
    }
}

/// Node id -> ordered neighbor list, in node insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedGraph {
    adjacency: IndexMap<String, Vec<Edge>>,
}

impl WeightedGraph {
    pub fn new() -> Self {
        Self {
            adjacency: IndexMap::new(),
        }
    }

    /// Add a node without edges; existing nodes keep their edges
    pub fn add_node(&mut self, id: impl Into<String>) {
        self.adjacency.entry(id.into()).or_default();
    }

    /// Add a directed edge
    ///
    /// Self loops and duplicate ordered pairs are rejected; returns whether the edge
    /// was inserted. Missing endpoints are created.
    pub fn add_edge(&mut self, from: &str, to: &str, weight_km: f64) -> bool {
        if from == to || self.has_edge(from, to) {
            return false;
        }
        self.add_node(from);
        self.add_node(to);
        if let Some(edges) = self.adjacency.get_mut(from) {
            edges.push(Edge::new(to, weight_km));
        }
        true
    }

    /// Add both directions of an edge, skipping whichever already exists
    pub fn add_undirected_edge(&mut self, a: &str, b: &str, weight_km: f64) {
        self.add_edge(a, b, weight_km);
        self.add_edge(b, a, weight_km);
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.adjacency.contains_key(id)
    }

    /// Outgoing edges of a node (empty for unknown nodes)
    pub fn neighbors(&self, id: &str) -> &[Edge] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.neighbors(from).iter().any(|e| e.to == to)
    }

    pub fn edge_weight(&self, from: &str, to: &str) -> Option<f64> {
        self.neighbors(from)
            .iter()
            .find(|e| e.to == to)
            .map(|e| e.weight_km)
    }

    /// Node ids in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.adjacency.keys().map(String::as_str)
    }

    /// (from, edge) pairs in adjacency order
    pub fn edges(&self) -> impl Iterator<Item = (&str, &Edge)> {
        self.adjacency
            .iter()
            .flat_map(|(from, edges)| edges.iter().map(move |e| (from.as_str(), e)))
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.adjacency.get_index_of(id)
    }

    pub fn node_at(&self, index: usize) -> Option<&str> {
        self.adjacency.get_index(index).map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of directed adjacency entries
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    /// Index-based undirected edge list, one entry per unordered pair
    ///
    /// When both directions exist with different weights the lighter one is kept.
    /// Order follows the first appearance of each pair in adjacency order.
    pub fn undirected_edges(&self) -> Vec<(usize, usize, f64)> {
        let mut seen: HashMap<(usize, usize), usize> = HashMap::new();
        let mut out: Vec<(usize, usize, f64)> = Vec::new();

        for (u, (_, edges)) in self.adjacency.iter().enumerate() {
            for edge in edges {
                let Some(v) = self.node_index(&edge.to) else {
                    continue;
                };
                let key = (u.min(v), u.max(v));
                match seen.get(&key) {
                    Some(&pos) => {
                        if edge.weight_km < out[pos].2 {
                            out[pos].2 = edge.weight_km;
                        }
                    }
                    None => {
                        seen.insert(key, out.len());
                        out.push((key.0, key.1, edge.weight_km));
                    }
                }
            }
        }

        out
    }

    /// Symmetric index adjacency built from `undirected_edges`
    pub fn undirected_adjacency(&self) -> Vec<Vec<(usize, f64)>> {
        let mut adj = vec![Vec::new(); self.node_count()];
        for (u, v, w) in self.undirected_edges() {
            adj[u].push((v, w));
            adj[v].push((u, w));
        }
        adj
    }
}

/// A node as presented to graph inspection callers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "type")]
    pub kind: PointKind,
}

/// An edge as presented to graph inspection callers, weight rounded to 2 decimals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeView {
    pub from: String,
    pub to: String,
    pub weight: f64,
}

/// Presentation shape of a built graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphView {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
    pub total_nodes: usize,
    pub total_edges: usize,
}

impl GraphView {
    /// Render a graph together with the points it was built from
    pub fn from_graph(graph: &WeightedGraph, points: &[Point]) -> Self {
        let by_id: HashMap<&str, &Point> = points.iter().map(|p| (p.id.as_str(), p)).collect();

        let nodes: Vec<NodeView> = graph
            .node_ids()
            .filter_map(|id| by_id.get(id))
            .map(|p| NodeView {
                id: p.id.clone(),
                lat: p.lat,
                lon: p.lon,
                kind: p.kind,
            })
            .collect();

        let edges: Vec<EdgeView> = graph
            .edges()
            .map(|(from, e)| EdgeView {
                from: from.to_string(),
                to: e.to.clone(),
                weight: round_km(e.weight_km),
            })
            .collect();

        Self {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            nodes,
            edges,
        }
    }
}
