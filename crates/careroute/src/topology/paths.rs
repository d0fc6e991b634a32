//! Shortest paths over the weighted graph

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::graph::WeightedGraph;

/// Outcome of a shortest-path query
///
/// A missing endpoint or an unreachable target yields `distance_km: None` and an
/// empty path; this is a normal result, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortestPath {
    pub algorithm: String,
    pub category: String,
    pub big_o: String,
    pub time_ms: f64,
    pub distance_km: Option<f64>,
    pub path_nodes: Vec<String>,
}

impl ShortestPath {
    pub fn found(&self) -> bool {
        self.distance_km.is_some()
    }
}

/// State for Dijkstra's algorithm
#[derive(Clone, Copy, PartialEq)]
struct DijkstraState {
    cost: f64,
    node: usize,
}

impl Eq for DijkstraState {}

impl Ord for DijkstraState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for DijkstraState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest-path algorithms used to score an assignment
pub struct PathFinder;

impl PathFinder {
    /// Dijkstra with a binary heap, O(E log V)
    pub fn dijkstra(graph: &WeightedGraph, source: &str, target: &str) -> ShortestPath {
        let started = Instant::now();
        let (distance_km, path_nodes) = Self::dijkstra_inner(graph, source, target);
        let elapsed = started.elapsed();

        tracing::debug!("Dijkstra {} -> {} took {:?}", source, target, elapsed);

        ShortestPath {
            algorithm: "Dijkstra".to_string(),
            category: "Shortest path".to_string(),
            big_o: "O(E log V)".to_string(),
            time_ms: elapsed.as_secs_f64() * 1000.0,
            distance_km,
            path_nodes,
        }
    }

    /// Bellman-Ford with V-1 relaxation rounds, O(V·E)
    pub fn bellman_ford(graph: &WeightedGraph, source: &str, target: &str) -> ShortestPath {
        let started = Instant::now();
        let (distance_km, path_nodes) = Self::bellman_ford_inner(graph, source, target);
        let elapsed = started.elapsed();

        tracing::debug!("Bellman-Ford {} -> {} took {:?}", source, target, elapsed);

        ShortestPath {
            algorithm: "Bellman-Ford".to_string(),
            category: "Shortest path".to_string(),
            big_o: "O(V·E)".to_string(),
            time_ms: elapsed.as_secs_f64() * 1000.0,
            distance_km,
            path_nodes,
        }
    }

    fn dijkstra_inner(
        graph: &WeightedGraph,
        source: &str,
        target: &str,
    ) -> (Option<f64>, Vec<String>) {
        let (Some(from), Some(to)) = (graph.node_index(source), graph.node_index(target)) else {
            return (None, Vec::new());
        };

        let n = graph.node_count();
        let mut dist = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<usize>> = vec![None; n];
        let mut heap = BinaryHeap::new();

        dist[from] = 0.0;
        heap.push(DijkstraState { cost: 0.0, node: from });

        while let Some(DijkstraState { cost, node }) = heap.pop() {
            if node == to {
                break;
            }
            if cost > dist[node] {
                continue;
            }

            let Some(node_id) = graph.node_at(node) else {
                continue;
            };
            for edge in graph.neighbors(node_id) {
                let Some(next) = graph.node_index(&edge.to) else {
                    continue;
                };
                let next_cost = cost + edge.weight_km;
                if next_cost < dist[next] {
                    dist[next] = next_cost;
                    prev[next] = Some(node);
                    heap.push(DijkstraState {
                        cost: next_cost,
                        node: next,
                    });
                }
            }
        }

        Self::finish(graph, &dist, &prev, from, to)
    }

    fn bellman_ford_inner(
        graph: &WeightedGraph,
        source: &str,
        target: &str,
    ) -> (Option<f64>, Vec<String>) {
        let (Some(from), Some(to)) = (graph.node_index(source), graph.node_index(target)) else {
            return (None, Vec::new());
        };

        let edges: Vec<(usize, usize, f64)> = graph
            .edges()
            .filter_map(|(u, e)| Some((graph.node_index(u)?, graph.node_index(&e.to)?, e.weight_km)))
            .collect();

        let n = graph.node_count();
        let mut dist = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<usize>> = vec![None; n];
        dist[from] = 0.0;

        for _ in 1..n {
            let mut changed = false;
            for &(u, v, w) in &edges {
                if dist[u].is_finite() && dist[u] + w < dist[v] {
                    dist[v] = dist[u] + w;
                    prev[v] = Some(u);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        Self::finish(graph, &dist, &prev, from, to)
    }

    /// Walk predecessors back from `to`
    fn finish(
        graph: &WeightedGraph,
        dist: &[f64],
        prev: &[Option<usize>],
        from: usize,
        to: usize,
    ) -> (Option<f64>, Vec<String>) {
        if !dist[to].is_finite() {
            return (None, Vec::new());
        }

        let mut indices = vec![to];
        let mut current = to;
        while current != from {
            match prev[current] {
                Some(p) if indices.len() <= dist.len() => {
                    indices.push(p);
                    current = p;
                }
                _ => return (None, Vec::new()),
            }
        }
        indices.reverse();

        let path = indices
            .into_iter()
            .filter_map(|i| graph.node_at(i).map(str::to_string))
            .collect();

        (Some(dist[to]), path)
    }
}
