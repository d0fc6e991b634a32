//! Assignment Orchestrator
//!
//! Business rules on top of the algorithms: infer the specialty a patient needs,
//! narrow the candidate hospitals, run every strategy and every graph algorithm, and
//! assemble the comparison report. Holds the currently configured graph.

pub mod report;
pub mod specialty;

use std::slice;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use crate::assignment::{
    run_strategy, AssignmentStrategy, GreedyStrategy, HungarianStrategy, MinCostFlowStrategy,
    StrategyKind,
};
use crate::config::EngineConfig;
use crate::model::{Hospital, Patient, Point};
use crate::records::{RecordFilter, RecordStore};
use crate::topology::builder::{GraphBuilder, GraphSpec, Topology};
use crate::topology::graph::{GraphView, WeightedGraph};
use crate::topology::network::NetworkAnalyzer;
use crate::topology::paths::PathFinder;
use crate::{EngineError, Result};

use report::{
    AlgorithmRun, AssignmentOutcome, BestAssignment, ComparisonReport, HospitalSummary,
    PathComparison, PatientSummary, RunPayload,
};
use specialty::infer_specialty;

const ASSIGNMENT_CATEGORY: &str = "Assignment";

/// Stateful facade over the record store and the configured graph
pub struct AssignmentOrchestrator<S: RecordStore> {
    store: S,
    config: EngineConfig,
    spec: GraphSpec,
    graph: WeightedGraph,
}

impl<S: RecordStore> AssignmentOrchestrator<S> {
    /// Create an orchestrator and build the default graph over every record
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        let spec = config.graph.default_spec();
        let points = all_points(&store)?;
        let graph = build_graph(&spec, points)?;

        tracing::info!(
            "Orchestrator ready with {} graph ({} nodes)",
            spec.topology,
            graph.node_count()
        );

        Ok(Self {
            store,
            config,
            spec,
            graph,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &WeightedGraph {
        &self.graph
    }

    pub fn graph_spec(&self) -> GraphSpec {
        self.spec
    }

    /// Replace the current graph
    ///
    /// `None` topology keeps the current graph untouched. Missing `k` or
    /// `radius_km` fall back to the configured defaults.
    pub fn configure_graph(
        &mut self,
        topology: Option<&str>,
        k: Option<usize>,
        radius_km: Option<f64>,
    ) -> Result<()> {
        let Some(name) = topology.filter(|t| !t.trim().is_empty()) else {
            return Ok(());
        };

        let spec = GraphSpec {
            topology: name.parse::<Topology>()?,
            k: k.unwrap_or(self.config.graph.k_neighbors),
            radius_km: radius_km.unwrap_or(self.config.graph.radius_km),
        };

        let graph = build_graph(&spec, all_points(&self.store)?)?;
        tracing::info!(
            "Graph reconfigured to {} (k={}, radius={} km): {} nodes, {} edge entries",
            spec.topology,
            spec.k,
            spec.radius_km,
            graph.node_count(),
            graph.edge_count()
        );

        self.spec = spec;
        self.graph = graph;
        Ok(())
    }

    /// Presentation view of the current graph
    pub fn graph_view(&self) -> Result<GraphView> {
        Ok(GraphView::from_graph(&self.graph, &all_points(&self.store)?))
    }

    /// Hospitals considered for a patient
    ///
    /// Same region offering the specialty, else same region, else every hospital.
    /// A patient without a region starts from every hospital.
    pub fn candidate_hospitals(&self, patient: &Patient, specialty: &str) -> Result<Vec<Hospital>> {
        let regional = match &patient.region {
            Some(region) => self.store.list_hospitals(&RecordFilter::in_region(region.clone()))?,
            None => self.store.list_hospitals(&RecordFilter::all())?,
        };

        let specialized: Vec<Hospital> = regional
            .iter()
            .filter(|h| h.offers_specialty(specialty))
            .cloned()
            .collect();

        if !specialized.is_empty() {
            return Ok(specialized);
        }
        if !regional.is_empty() {
            tracing::debug!("No {} hospital near {}, using the whole region", specialty, patient.code);
            return Ok(regional);
        }

        tracing::debug!("No hospital in the region of {}, using all hospitals", patient.code);
        self.store.list_hospitals(&RecordFilter::all())
    }

    /// Run all eight algorithms for one patient
    pub fn compare_all_algorithms(&self, code: &str) -> Result<ComparisonReport> {
        let patient = self
            .store
            .find_patient_by_code(code)?
            .ok_or_else(|| EngineError::PatientNotFound(code.to_string()))?;

        let specialty = infer_specialty(patient.diagnosis.as_deref());
        let candidates = self.candidate_hospitals(&patient, specialty)?;

        tracing::debug!(
            "Comparing algorithms for {} ({}), {} candidate hospitals",
            patient.code,
            specialty,
            candidates.len()
        );

        let min_cost_flow =
            MinCostFlowStrategy::default().with_cost_scale(self.config.assignment.cost_scale);
        let strategies: [&dyn AssignmentStrategy; 3] =
            [&GreedyStrategy, &HungarianStrategy, &min_cost_flow];

        let assignment_algorithms = strategies
            .iter()
            .map(|strategy| self.assignment_run(*strategy, &patient, &candidates))
            .collect();

        let started = Instant::now();
        let network_algorithms: Vec<AlgorithmRun> = NetworkAnalyzer::analyze(&self.graph)
            .into_iter()
            .map(AlgorithmRun::from)
            .collect();
        tracing::debug!("Network algorithms took {:?}", started.elapsed());

        Ok(ComparisonReport {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            patient: PatientSummary::from(&patient),
            specialty_required: specialty.to_string(),
            graph: self.spec,
            candidate_count: candidates.len(),
            assignment_algorithms,
            network_algorithms,
        })
    }

    /// Pick one hospital: first assignment in strategy priority order
    ///
    /// Not being assigned is a normal outcome with every optional field empty.
    pub fn assign_best_hospital(&self, code: &str) -> Result<BestAssignment> {
        let report = self.compare_all_algorithms(code)?;

        let chosen = StrategyKind::PRIORITY.iter().find_map(|&kind| {
            report
                .assignment_run(kind)
                .and_then(AlgorithmRun::assignment)
                .filter(|outcome| outcome.is_assigned())
                .map(|outcome| (kind, outcome.clone()))
        });

        let (algorithm_used, outcome) = match chosen {
            Some((kind, outcome)) => (Some(kind), outcome),
            None => {
                tracing::warn!("No strategy could assign patient {}", code);
                (None, AssignmentOutcome::default())
            }
        };

        Ok(BestAssignment {
            patient: report.patient,
            specialty_required: report.specialty_required,
            algorithm_used,
            hospital: outcome.hospital,
            distance_km: outcome.distance_km,
            paths: outcome.paths,
        })
    }

    fn assignment_run(
        &self,
        strategy: &dyn AssignmentStrategy,
        patient: &Patient,
        candidates: &[Hospital],
    ) -> AlgorithmRun {
        let kind = strategy.kind();
        let run = run_strategy(strategy, slice::from_ref(patient), candidates);

        let hospital = run
            .assignment_for(&patient.code)
            .and_then(|a| a.hospital_id.as_deref())
            .and_then(|id| candidates.iter().find(|h| h.code == id));

        let outcome = match hospital {
            Some(hospital) => AssignmentOutcome {
                hospital: Some(HospitalSummary::from(hospital)),
                distance_km: Some(patient.coordinate().distance_km(&hospital.coordinate())),
                paths: self.compare_paths(&patient.code, &hospital.code),
                failure: run.failure.clone(),
            },
            None => AssignmentOutcome {
                failure: run.failure.clone(),
                ..AssignmentOutcome::default()
            },
        };

        AlgorithmRun::new(
            kind.name(),
            ASSIGNMENT_CATEGORY,
            kind.big_o(),
            run.elapsed,
            RunPayload::Assignment(outcome),
        )
    }

    /// Dijkstra and Bellman-Ford on the current graph; `None` when an endpoint is absent
    fn compare_paths(&self, patient_id: &str, hospital_id: &str) -> Option<PathComparison> {
        if !(self.graph.contains_node(patient_id) && self.graph.contains_node(hospital_id)) {
            return None;
        }
        Some(PathComparison::new(
            PathFinder::dijkstra(&self.graph, patient_id, hospital_id),
            PathFinder::bellman_ford(&self.graph, patient_id, hospital_id),
        ))
    }
}

/// Build a graph over arbitrary points, independent of any orchestrator
pub fn build_graph(spec: &GraphSpec, points: Vec<Point>) -> Result<WeightedGraph> {
    GraphBuilder::new(points).build(spec)
}

/// Hospitals ranked by straight-line distance, closest first
pub fn nearest_hospitals(patient: &Patient, hospitals: &[Hospital], top_k: usize) -> Vec<(Hospital, f64)> {
    let origin = patient.coordinate();
    let mut ranked: Vec<(Hospital, f64)> = hospitals
        .iter()
        .map(|h| (h.clone(), origin.distance_km(&h.coordinate())))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.truncate(top_k);
    ranked
}

/// Every patient then every hospital, in store order
fn all_points<S: RecordStore>(store: &S) -> Result<Vec<Point>> {
    let patients = store.list_patients(&RecordFilter::all())?;
    let hospitals = store.list_hospitals(&RecordFilter::all())?;
    Ok(patients
        .iter()
        .map(Patient::point)
        .chain(hospitals.iter().map(Hospital::point))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;
    use crate::records::InMemoryRecordStore;

    fn sample_store() -> InMemoryRecordStore {
        let patients = vec![
            Patient::new("P1", -12.05, -77.04)
                .with_severity(Severity::Grave)
                .with_diagnosis("Fractura expuesta de tibia")
                .with_region("Lima"),
            Patient::new("P2", -12.10, -77.00)
                .with_severity(Severity::Mild)
                .with_diagnosis("Neumonía")
                .with_region("Lima"),
            Patient::new("P3", -13.52, -71.97)
                .with_diagnosis("headache")
                .with_region("Cusco"),
            Patient::new("P4", -16.40, -71.53).with_region("Arequipa"),
        ];
        let hospitals = vec![
            Hospital::new("H1", -12.06, -77.03)
                .with_name("Central Lima")
                .with_capacity(5)
                .with_specialties("Cardiology, Pulmonology")
                .with_region("Lima"),
            Hospital::new("H2", -12.12, -77.02)
                .with_capacity(3)
                .with_specialties("Traumatology")
                .with_region("Lima"),
            Hospital::new("H3", -13.53, -71.96)
                .with_specialties("General Medicine")
                .with_region("Cusco"),
        ];
        InMemoryRecordStore::new(patients, hospitals)
    }

    fn orchestrator() -> AssignmentOrchestrator<InMemoryRecordStore> {
        AssignmentOrchestrator::new(sample_store(), EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_default_graph_covers_every_record() {
        let orch = orchestrator();
        assert_eq!(orch.graph().node_count(), 7);
        assert_eq!(orch.graph_spec().topology, Topology::Knn);
        assert_eq!(orch.graph().node_at(0), Some("P1"));
        assert_eq!(orch.graph().node_at(4), Some("H1"));
    }

    #[test]
    fn test_configure_graph() {
        let mut orch = orchestrator();

        orch.configure_graph(Some("bipartite"), Some(1), None).unwrap();
        assert_eq!(orch.graph_spec().topology, Topology::BipartiteKnn);
        assert_eq!(orch.graph().edge_count(), 4);

        // No topology keeps the current graph
        orch.configure_graph(None, Some(3), None).unwrap();
        assert_eq!(orch.graph_spec().k, 1);

        orch.configure_graph(Some("radius"), None, None).unwrap();
        assert_eq!(orch.graph_spec().radius_km, 50.0);
        assert_eq!(orch.graph_spec().k, 10);
    }

    #[test]
    fn test_configure_graph_rejects_unknown_topology() {
        let mut orch = orchestrator();
        let err = orch.configure_graph(Some("mesh"), None, None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTopology(_)));
        // The previous graph survives
        assert_eq!(orch.graph_spec().topology, Topology::Knn);

        let err = orch.configure_graph(Some("knn"), Some(0), None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidGraphParameter(_)));
    }

    #[test]
    fn test_candidate_fallbacks() {
        let orch = orchestrator();
        let store = orch.store();

        let p1 = store.find_patient_by_code("P1").unwrap().unwrap();
        let codes = |hs: Vec<Hospital>| hs.into_iter().map(|h| h.code).collect::<Vec<_>>();

        // Region and specialty
        assert_eq!(codes(orch.candidate_hospitals(&p1, "Traumatology").unwrap()), vec!["H2"]);
        // Region only
        assert_eq!(codes(orch.candidate_hospitals(&p1, "Nephrology").unwrap()), vec!["H1", "H2"]);
        // Anywhere
        let p4 = store.find_patient_by_code("P4").unwrap().unwrap();
        assert_eq!(orch.candidate_hospitals(&p4, "Cardiology").unwrap().len(), 3);
    }

    #[test]
    fn test_compare_all_algorithms() {
        let orch = orchestrator();
        let report = orch.compare_all_algorithms("P1").unwrap();

        assert_eq!(report.specialty_required, "Traumatology");
        assert_eq!(report.candidate_count, 1);
        assert_eq!(report.assignment_algorithms.len(), 3);
        assert_eq!(report.network_algorithms.len(), 3);

        for run in &report.assignment_algorithms {
            let outcome = run.assignment().unwrap();
            let hospital = outcome.hospital.as_ref().unwrap();
            assert_eq!(hospital.code, "H2");
            let paths = outcome.paths.as_ref().unwrap();
            assert!(paths.consistent);
            assert_eq!(paths.dijkstra.path_nodes.first().map(String::as_str), Some("P1"));
        }
    }

    #[test]
    fn test_unknown_patient_is_not_found() {
        let orch = orchestrator();
        let err = orch.compare_all_algorithms("P404").unwrap_err();
        assert!(err.is_not_found());
        assert!(orch.assign_best_hospital("P404").unwrap_err().is_not_found());
    }

    #[test]
    fn test_assign_best_hospital_prefers_min_cost_flow() {
        let orch = orchestrator();
        let best = orch.assign_best_hospital("P2").unwrap();
        assert_eq!(best.specialty_required, "Pulmonology");
        assert_eq!(best.algorithm_used, Some(StrategyKind::MinCostFlow));
        assert_eq!(best.hospital.as_ref().map(|h| h.code.as_str()), Some("H1"));
        assert!(best.distance_km.unwrap() > 0.0);
    }

    #[test]
    fn test_assign_best_hospital_without_hospitals() {
        let store = InMemoryRecordStore::new(vec![Patient::new("P1", 0.0, 0.0)], Vec::new());
        let orch = AssignmentOrchestrator::new(store, EngineConfig::default()).unwrap();

        let best = orch.assign_best_hospital("P1").unwrap();
        assert!(!best.is_assigned());
        assert_eq!(best.algorithm_used, None);
        assert_eq!(best.distance_km, None);
        assert!(best.paths.is_none());
    }

    #[test]
    fn test_paths_absent_when_graph_misses_hospital() {
        let mut orch = orchestrator();
        // Graph holding only the patient
        orch.graph = build_graph(&GraphSpec::knn(1), vec![Point::patient("P1", -12.05, -77.04)]).unwrap();

        let report = orch.compare_all_algorithms("P1").unwrap();
        let outcome = report.assignment_algorithms[0].assignment().unwrap();
        assert!(outcome.is_assigned());
        assert!(outcome.paths.is_none());
    }

    #[test]
    fn test_nearest_hospitals() {
        let store = sample_store();
        let patient = store.find_patient_by_code("P3").unwrap().unwrap();
        let ranked = nearest_hospitals(&patient, store.hospitals(), 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0.code, "H3");
        assert!(ranked[0].1 < ranked[1].1);
    }
}
