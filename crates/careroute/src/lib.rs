//! # CareRoute - Patient Assignment & Graph Engine
//!
//! Assigns patients to hospitals under capacity and specialty constraints and lets an
//! operator compare classical algorithms side by side on the same spatial dataset.
//!
//! ## Core Capabilities
//!
//! - **Graph Construction**: k-nearest-neighbor, radius and bipartite topologies
//! - **Assignment**: Greedy, Hungarian and Min-Cost Max-Flow strategies
//! - **Shortest Paths**: Dijkstra with a Bellman-Ford cross-check
//! - **Network Structure**: Kruskal, Prim and Edmonds-Karp benchmarks
//! - **Road Routing**: OpenRouteService distances with a straight-line fallback

pub mod assignment;
pub mod config;
pub mod geo;
pub mod model;
pub mod orchestrator;
pub mod records;
pub mod routing;
pub mod topology;

pub use assignment::{
    run_strategy, AssignmentStrategy, CapacityLedger, GreedyStrategy, HungarianStrategy,
    MinCostFlowStrategy, SolverFailure, StrategyKind, StrategyRun,
};
pub use config::EngineConfig;
pub use geo::{haversine_km, Coordinate};
pub use model::{Assignment, Hospital, Patient, Point, PointKind, Severity, UNLIMITED_CAPACITY};
pub use orchestrator::{
    build_graph, nearest_hospitals,
    report::{
        AlgorithmRun, AssignmentOutcome, BestAssignment, ComparisonReport, HospitalSummary,
        PathComparison, PatientSummary, RunPayload,
    },
    specialty::{infer_specialty, DEFAULT_SPECIALTY},
    AssignmentOrchestrator,
};
pub use records::{Dataset, InMemoryRecordStore, RecordFilter, RecordStore};
pub use routing::{
    cache::{cache_key, FileRouteCache, InMemoryRouteCache, RouteCache},
    ors::OrsClient,
    resolver::{DistanceSource, RoadDistance, RoadDistanceResolver},
    RoadRoute, RouteProvider, RoutingError,
};
pub use topology::{
    builder::{GraphBuilder, GraphSpec, Topology, TopologyBenchmark},
    graph::{GraphView, WeightedGraph},
    network::{NetworkAnalyzer, NetworkMetric, NetworkRun, SpanningForest},
    paths::{PathFinder, ShortestPath},
};

/// Errors surfaced to callers of the engine
///
/// Infeasible assignments, missing paths and collaborator outages are not errors:
/// they degrade to "none" values inside the report.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Unknown graph topology: {0}")]
    InvalidTopology(String),

    #[error("Invalid graph parameter: {0}")]
    InvalidGraphParameter(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether this error is the distinguishable "not found" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::PatientNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
