//! Report types produced by the orchestrator

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assignment::{SolverFailure, StrategyKind};
use crate::model::{Hospital, Patient, Severity};
use crate::topology::builder::GraphSpec;
use crate::topology::network::{NetworkMetric, NetworkRun};
use crate::topology::paths::ShortestPath;

/// Patient fields echoed back in reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub code: String,
    pub lat: f64,
    pub lon: f64,
    pub severity: Severity,
    pub diagnosis: Option<String>,
    pub region: Option<String>,
}

impl From<&Patient> for PatientSummary {
    fn from(patient: &Patient) -> Self {
        Self {
            code: patient.code.clone(),
            lat: patient.lat,
            lon: patient.lon,
            severity: patient.severity,
            diagnosis: patient.diagnosis.clone(),
            region: patient.region.clone(),
        }
    }
}

/// Hospital fields echoed back in reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalSummary {
    pub code: String,
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub region: Option<String>,
    pub specialties: Vec<String>,
}

impl From<&Hospital> for HospitalSummary {
    fn from(hospital: &Hospital) -> Self {
        Self {
            code: hospital.code.clone(),
            name: hospital.name.clone(),
            lat: hospital.lat,
            lon: hospital.lon,
            region: hospital.region.clone(),
            specialties: hospital
                .specialty_list()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Dijkstra and its Bellman-Ford cross-check between one patient and one hospital
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathComparison {
    pub dijkstra: ShortestPath,
    pub bellman_ford: ShortestPath,
    /// Both algorithms agree on reachability and distance
    pub consistent: bool,
}

impl PathComparison {
    pub fn new(dijkstra: ShortestPath, bellman_ford: ShortestPath) -> Self {
        let consistent = match (dijkstra.distance_km, bellman_ford.distance_km) {
            (Some(a), Some(b)) => (a - b).abs() < 1e-6,
            (None, None) => true,
            _ => false,
        };
        if !consistent {
            tracing::warn!(
                "Shortest path mismatch: Dijkstra {:?} vs Bellman-Ford {:?}",
                dijkstra.distance_km,
                bellman_ford.distance_km
            );
        }
        Self {
            dijkstra,
            bellman_ford,
            consistent,
        }
    }
}

/// What one assignment strategy chose for the patient
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOutcome {
    pub hospital: Option<HospitalSummary>,
    /// Straight-line distance patient -> hospital
    pub distance_km: Option<f64>,
    pub paths: Option<PathComparison>,
    /// Set when the strategy failed and degraded to no assignment
    pub failure: Option<SolverFailure>,
}

impl AssignmentOutcome {
    pub fn is_assigned(&self) -> bool {
        self.hospital.is_some()
    }
}

/// Algorithm-specific result carried by an [`AlgorithmRun`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunPayload {
    Assignment(AssignmentOutcome),
    SpanningForest {
        #[serde(rename = "mstCost")]
        mst_cost: f64,
        #[serde(rename = "edgeCount")]
        edge_count: usize,
    },
    MaxFlow {
        source: String,
        sink: String,
        #[serde(rename = "maxFlow")]
        max_flow: u64,
    },
}

/// One row of the comparison report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmRun {
    pub name: String,
    pub category: String,
    pub big_o: String,
    /// Wall time, informational only
    pub time_ms: f64,
    pub payload: RunPayload,
}

impl AlgorithmRun {
    pub fn new(
        name: &str,
        category: &str,
        big_o: &str,
        elapsed: Duration,
        payload: RunPayload,
    ) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            big_o: big_o.to_string(),
            time_ms: elapsed.as_secs_f64() * 1000.0,
            payload,
        }
    }

    /// The assignment outcome, for assignment rows
    pub fn assignment(&self) -> Option<&AssignmentOutcome> {
        match &self.payload {
            RunPayload::Assignment(outcome) => Some(outcome),
            _ => None,
        }
    }
}

impl From<NetworkRun> for AlgorithmRun {
    fn from(run: NetworkRun) -> Self {
        let payload = match run.metric {
            NetworkMetric::SpanningForest {
                mst_cost,
                edge_count,
            } => RunPayload::SpanningForest {
                mst_cost,
                edge_count,
            },
            NetworkMetric::MaxFlow {
                source,
                sink,
                max_flow,
            } => RunPayload::MaxFlow {
                source,
                sink,
                max_flow,
            },
        };
        AlgorithmRun::new(run.name, run.category, run.big_o, run.elapsed, payload)
    }
}

/// Side-by-side comparison of every algorithm for one patient
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub patient: PatientSummary,
    pub specialty_required: String,
    /// Graph the path and network algorithms ran on
    pub graph: GraphSpec,
    pub candidate_count: usize,
    pub assignment_algorithms: Vec<AlgorithmRun>,
    pub network_algorithms: Vec<AlgorithmRun>,
}

impl ComparisonReport {
    /// The assignment row for one strategy
    pub fn assignment_run(&self, kind: StrategyKind) -> Option<&AlgorithmRun> {
        self.assignment_algorithms
            .iter()
            .find(|run| run.name == kind.name())
    }
}

/// Final hospital picked by strategy priority
///
/// Every optional field is `None` when no strategy produced an assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestAssignment {
    pub patient: PatientSummary,
    pub specialty_required: String,
    pub algorithm_used: Option<StrategyKind>,
    pub hospital: Option<HospitalSummary>,
    pub distance_km: Option<f64>,
    pub paths: Option<PathComparison>,
}

impl BestAssignment {
    pub fn is_assigned(&self) -> bool {
        self.hospital.is_some()
    }
}
