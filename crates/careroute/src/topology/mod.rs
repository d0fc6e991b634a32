//! Topology module - graph construction and graph algorithms over spatial points

pub mod builder;
pub mod graph;
pub mod network;
pub mod paths;

pub use builder::{GraphBuilder, GraphSpec, Topology, TopologyBenchmark};
pub use graph::{Edge, EdgeView, GraphView, NodeView, WeightedGraph};
pub use network::{NetworkAnalyzer, NetworkMetric, NetworkRun, SpanningForest, UnionFind};
pub use paths::{PathFinder, ShortestPath};
