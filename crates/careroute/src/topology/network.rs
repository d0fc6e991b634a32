//! Network-structure algorithms used to benchmark a built graph
//!
//! Every algorithm here treats the graph as undirected.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::graph::WeightedGraph;

/// What one network algorithm measured
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkMetric {
    SpanningForest { mst_cost: f64, edge_count: usize },
    MaxFlow { source: String, sink: String, max_flow: u64 },
}

/// One timed network algorithm run
#[derive(Debug, Clone)]
pub struct NetworkRun {
    pub name: &'static str,
    pub category: &'static str,
    pub big_o: &'static str,
    pub elapsed: Duration,
    pub metric: NetworkMetric,
}

/// Minimum spanning forest: chosen edges and their total weight
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanningForest {
    pub total_weight: f64,
    pub edges: Vec<(String, String, f64)>,
}

/// Disjoint-set forest with path halving and union by size
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge two sets; false when already joined
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }
}

/// Frontier entry for Prim
#[derive(Clone, Copy, PartialEq)]
struct FrontierEdge {
    weight: f64,
    from: usize,
    to: usize,
}

impl Eq for FrontierEdge {}

impl Ord for FrontierEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .weight
            .total_cmp(&self.weight)
            .then_with(|| other.to.cmp(&self.to))
    }
}

impl PartialOrd for FrontierEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Kruskal, Prim and Edmonds-Karp over the configured graph
pub struct NetworkAnalyzer;

impl NetworkAnalyzer {
    /// Kruskal: sorted edges plus union-find, O(E log V)
    pub fn kruskal(graph: &WeightedGraph) -> SpanningForest {
        let mut edges = graph.undirected_edges();
        // Stable sort keeps adjacency order among equal weights
        edges.sort_by(|a, b| a.2.total_cmp(&b.2));

        let mut uf = UnionFind::new(graph.node_count());
        let mut forest = SpanningForest::default();

        for (u, v, w) in edges {
            if uf.union(u, v) {
                forest.total_weight += w;
                forest.edges.push((name(graph, u), name(graph, v), w));
            }
        }

        forest
    }

    /// Prim from `start`, then from each still-unvisited node, O(E log V)
    ///
    /// Restarting on unvisited nodes makes the result a spanning forest, so its total
    /// matches Kruskal on disconnected graphs too. An unknown start falls back to the
    /// first node.
    pub fn prim(graph: &WeightedGraph, start: Option<&str>) -> SpanningForest {
        let n = graph.node_count();
        let mut forest = SpanningForest::default();
        if n == 0 {
            return forest;
        }

        let adj = graph.undirected_adjacency();
        let first = start.and_then(|s| graph.node_index(s)).unwrap_or(0);
        let order = std::iter::once(first).chain((0..n).filter(|&i| i != first));

        let mut visited = vec![false; n];
        let mut heap = BinaryHeap::new();

        for root in order {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            for &(to, weight) in &adj[root] {
                heap.push(FrontierEdge { weight, from: root, to });
            }

            while let Some(FrontierEdge { weight, from, to }) = heap.pop() {
                if visited[to] {
                    continue;
                }
                visited[to] = true;
                forest.total_weight += weight;
                forest.edges.push((name(graph, from), name(graph, to), weight));

                for &(next, w) in &adj[to] {
                    if !visited[next] {
                        heap.push(FrontierEdge {
                            weight: w,
                            from: to,
                            to: next,
                        });
                    }
                }
            }
        }

        forest
    }

    /// Edmonds-Karp max flow with unit capacity in both directions of every edge
    ///
    /// Returns `None` when either endpoint is missing or they coincide.
    pub fn edmonds_karp(graph: &WeightedGraph, source: &str, sink: &str) -> Option<u64> {
        let s = graph.node_index(source)?;
        let t = graph.node_index(sink)?;
        if s == t {
            return None;
        }

        let n = graph.node_count();
        let mut residual: HashMap<(usize, usize), i64> = HashMap::new();
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (u, v, _) in graph.undirected_edges() {
            residual.insert((u, v), 1);
            residual.insert((v, u), 1);
            adj[u].push(v);
            adj[v].push(u);
        }

        let mut flow = 0u64;
        loop {
            // BFS for the shortest augmenting path
            let mut parent: Vec<Option<usize>> = vec![None; n];
            let mut queue = VecDeque::new();
            parent[s] = Some(s);
            queue.push_back(s);

            while let Some(u) = queue.pop_front() {
                if u == t {
                    break;
                }
                for &v in &adj[u] {
                    if parent[v].is_none() && residual.get(&(u, v)).copied().unwrap_or(0) > 0 {
                        parent[v] = Some(u);
                        queue.push_back(v);
                    }
                }
            }

            if parent[t].is_none() {
                break;
            }

            let mut bottleneck = i64::MAX;
            let mut v = t;
            while v != s {
                let u = parent[v]?;
                bottleneck = bottleneck.min(residual.get(&(u, v)).copied().unwrap_or(0));
                v = u;
            }

            let mut v = t;
            while v != s {
                let u = parent[v]?;
                *residual.entry((u, v)).or_insert(0) -= bottleneck;
                *residual.entry((v, u)).or_insert(0) += bottleneck;
                v = u;
            }

            flow += bottleneck as u64;
        }

        Some(flow)
    }

    /// Run all three algorithms once, timing each
    pub fn analyze(graph: &WeightedGraph) -> Vec<NetworkRun> {
        let mut runs = Vec::new();

        let started = Instant::now();
        let kruskal = Self::kruskal(graph);
        runs.push(NetworkRun {
            name: "Kruskal",
            category: "Network / MST",
            big_o: "O(E log V)",
            elapsed: started.elapsed(),
            metric: NetworkMetric::SpanningForest {
                mst_cost: kruskal.total_weight,
                edge_count: kruskal.edges.len(),
            },
        });

        if let Some(start) = graph.node_at(0) {
            let started = Instant::now();
            let prim = Self::prim(graph, Some(start));
            runs.push(NetworkRun {
                name: "Prim",
                category: "Network / MST",
                big_o: "O(E log V)",
                elapsed: started.elapsed(),
                metric: NetworkMetric::SpanningForest {
                    mst_cost: prim.total_weight,
                    edge_count: prim.edges.len(),
                },
            });
        }

        if let (Some(source), Some(sink)) = (graph.node_at(0), graph.node_at(1)) {
            let started = Instant::now();
            let max_flow = Self::edmonds_karp(graph, source, sink).unwrap_or(0);
            runs.push(NetworkRun {
                name: "Edmonds-Karp",
                category: "Network / Max flow",
                big_o: "O(V·E^2)",
                elapsed: started.elapsed(),
                metric: NetworkMetric::MaxFlow {
                    source: source.to_string(),
                    sink: sink.to_string(),
                    max_flow,
                },
            });
        }

        tracing::debug!("Network analysis produced {} runs", runs.len());
        runs
    }
}

fn name(graph: &WeightedGraph, index: usize) -> String {
    graph.node_at(index).unwrap_or_default().to_string()
}
