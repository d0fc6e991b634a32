//! Graph construction from spatial points

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::graph::WeightedGraph;
use crate::model::{Point, PointKind};
use crate::{EngineError, Result};

/// Graph construction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Undirected union of every node's k nearest neighbors
    #[default]
    Knn,
    /// Undirected edge between every pair within a radius
    Radius,
    /// Directed patient -> k nearest hospitals
    #[serde(alias = "bipartite")]
    BipartiteKnn,
}

impl Topology {
    pub const ALL: [Topology; 3] = [Topology::Knn, Topology::Radius, Topology::BipartiteKnn];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topology::Knn => "knn",
            Topology::Radius => "radius",
            Topology::BipartiteKnn => "bipartite_knn",
        }
    }

    /// Human-readable algorithm name
    pub fn label(&self) -> &'static str {
        match self {
            Topology::Knn => "KNN Graph",
            Topology::Radius => "Radius Graph",
            Topology::BipartiteKnn => "Bipartite KNN",
        }
    }

    pub fn complexity(&self) -> &'static str {
        match self {
            Topology::Knn => "O(n^2 log k)",
            Topology::Radius => "O(n^2)",
            Topology::BipartiteKnn => "O(P·H)",
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topology {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "knn" => Ok(Topology::Knn),
            "radius" => Ok(Topology::Radius),
            "bipartite_knn" | "bipartite" => Ok(Topology::BipartiteKnn),
            other => Err(EngineError::InvalidTopology(other.to_string())),
        }
    }
}

/// Topology plus its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSpec {
    pub topology: Topology,
    pub k: usize,
    pub radius_km: f64,
}

impl GraphSpec {
    pub fn knn(k: usize) -> Self {
        Self {
            topology: Topology::Knn,
            k,
            radius_km: 0.0,
        }
    }

    pub fn radius(radius_km: f64) -> Self {
        Self {
            topology: Topology::Radius,
            k: 0,
            radius_km,
        }
    }

    pub fn bipartite_knn(k: usize) -> Self {
        Self {
            topology: Topology::BipartiteKnn,
            k,
            radius_km: 0.0,
        }
    }

    /// Reject parameters the selected topology cannot use
    pub fn validate(&self) -> Result<()> {
        match self.topology {
            Topology::Knn | Topology::BipartiteKnn if self.k == 0 => Err(
                EngineError::InvalidGraphParameter("k must be at least 1".to_string()),
            ),
            Topology::Radius if !(self.radius_km.is_finite() && self.radius_km >= 0.0) => {
                Err(EngineError::InvalidGraphParameter(format!(
                    "radius_km must be a non-negative number, got {}",
                    self.radius_km
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Timing and size of one topology build
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyBenchmark {
    pub algorithm: String,
    pub topology: Topology,
    pub big_o: String,
    pub time_ms: f64,
    pub nodes: usize,
    pub edges: usize,
}

/// Heap entry ordered by (distance, input position)
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Builds weighted graphs from an ordered set of points
///
/// Input order is preserved: it decides node iteration order and breaks distance ties.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    points: Vec<Point>,
}

impl GraphBuilder {
    /// Create a builder; repeated ids keep their first occurrence
    pub fn new(points: impl IntoIterator<Item = Point>) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for point in points {
            if seen.insert(point.id.clone()) {
                unique.push(point);
            } else {
                tracing::warn!("Skipping duplicate point id '{}'", point.id);
            }
        }
        Self { points: unique }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Build the graph described by `spec`
    pub fn build(&self, spec: &GraphSpec) -> Result<WeightedGraph> {
        spec.validate()?;

        let started = Instant::now();
        let graph = match spec.topology {
            Topology::Knn => self.build_knn(spec.k),
            Topology::Radius => self.build_radius(spec.radius_km),
            Topology::BipartiteKnn => self.build_bipartite_knn(spec.k),
        };

        tracing::debug!(
            "Built {} graph: {} nodes, {} edge entries in {:?}",
            spec.topology,
            graph.node_count(),
            graph.edge_count(),
            started.elapsed()
        );

        Ok(graph)
    }

    /// Undirected KNN graph; a node may end up with more than `k` edges
    pub fn build_knn(&self, k: usize) -> WeightedGraph {
        let mut graph = self.empty_graph();
        if self.points.len() < 2 || k == 0 {
            return graph;
        }

        for (i, origin) in self.points.iter().enumerate() {
            let others = self
                .points
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i);

            for (j, distance) in k_nearest(origin, others, k) {
                graph.add_undirected_edge(&origin.id, &self.points[j].id, distance);
            }
        }

        graph
    }

    /// Undirected graph joining every pair at most `radius_km` apart
    pub fn build_radius(&self, radius_km: f64) -> WeightedGraph {
        let mut graph = self.empty_graph();

        for (i, a) in self.points.iter().enumerate() {
            for b in &self.points[i + 1..] {
                let distance = a.distance_km(b);
                if distance <= radius_km {
                    graph.add_undirected_edge(&a.id, &b.id, distance);
                }
            }
        }

        graph
    }

    /// Patient -> hospital edges only, each patient to its `k` nearest hospitals
    pub fn build_bipartite_knn(&self, k: usize) -> WeightedGraph {
        let mut graph = self.empty_graph();
        if k == 0 {
            return graph;
        }

        for patient in self.points.iter().filter(|p| p.kind == PointKind::Patient) {
            let hospitals = self
                .points
                .iter()
                .enumerate()
                .filter(|(_, p)| p.kind == PointKind::Hospital);

            for (j, distance) in k_nearest(patient, hospitals, k) {
                graph.add_edge(&patient.id, &self.points[j].id, distance);
            }
        }

        graph
    }

    /// Build all three topologies over the same points and time each build
    pub fn compare_topologies(&self, k: usize, radius_km: f64) -> Vec<TopologyBenchmark> {
        Topology::ALL
            .iter()
            .map(|&topology| {
                let started = Instant::now();
                let graph = match topology {
                    Topology::Knn => self.build_knn(k),
                    Topology::Radius => self.build_radius(radius_km),
                    Topology::BipartiteKnn => self.build_bipartite_knn(k),
                };
                let elapsed = started.elapsed();

                TopologyBenchmark {
                    algorithm: topology.label().to_string(),
                    topology,
                    big_o: topology.complexity().to_string(),
                    time_ms: elapsed.as_secs_f64() * 1000.0,
                    nodes: graph.node_count(),
                    edges: graph.edge_count(),
                }
            })
            .collect()
    }

    /// Every point as an isolated node, in input order
    fn empty_graph(&self) -> WeightedGraph {
        let mut graph = WeightedGraph::new();
        for point in &self.points {
            graph.add_node(point.id.clone());
        }
        graph
    }
}

/// The `k` candidates closest to `origin`, ascending; ties keep input order
fn k_nearest<'a>(
    origin: &Point,
    candidates: impl Iterator<Item = (usize, &'a Point)>,
    k: usize,
) -> Vec<(usize, f64)> {
    let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);

    for (index, point) in candidates {
        heap.push(Candidate {
            distance: origin.distance_km(point),
            index,
        });
        if heap.len() > k {
            // Drops the farthest, and among equals the latest seen
            heap.pop();
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|c| (c.index, c.distance))
        .collect()
}
