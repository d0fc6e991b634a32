//! Assignment strategies - map a patient set onto a hospital set under capacity
//!
//! All strategies share one contract: one [`Assignment`] per input patient, and no
//! hospital receives more patients than its starting capacity. Capacity is tracked in
//! a [`CapacityLedger`] private to each run.

pub mod greedy;
pub mod hungarian;
pub mod min_cost_flow;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::model::{Assignment, Hospital, Patient};

pub use greedy::GreedyStrategy;
pub use hungarian::HungarianStrategy;
pub use min_cost_flow::MinCostFlowStrategy;

/// Why a strategy could not produce a solution
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SolverFailure {
    #[error("Network cannot route {required} patients, only {routed} reached the sink")]
    Infeasible { required: u64, routed: u64 },

    #[error("Non-finite distance between {patient_id} and {hospital_id}")]
    InvalidCost {
        patient_id: String,
        hospital_id: String,
    },

    #[error("Scaled cost {cost} for {patient_id} -> {hospital_id} overflows the solver")]
    CostOverflow {
        patient_id: String,
        hospital_id: String,
        cost: f64,
    },
}

/// The three interchangeable strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Greedy,
    Hungarian,
    MinCostFlow,
}

impl StrategyKind {
    /// Preference order when picking one final hospital:
    /// capacity-correct optimal, then unconstrained optimal, then the heuristic
    pub const PRIORITY: [StrategyKind; 3] = [
        StrategyKind::MinCostFlow,
        StrategyKind::Hungarian,
        StrategyKind::Greedy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Greedy => "Greedy",
            StrategyKind::Hungarian => "Hungarian",
            StrategyKind::MinCostFlow => "Min-Cost Max-Flow",
        }
    }

    pub fn big_o(&self) -> &'static str {
        match self {
            StrategyKind::Greedy => "O(P·H)",
            StrategyKind::Hungarian => "O(n^3)",
            StrategyKind::MinCostFlow => "O(V^2·E)",
        }
    }
}

/// A strategy turning patients and hospitals into assignments
pub trait AssignmentStrategy {
    fn kind(&self) -> StrategyKind;

    /// Solve one run. Errors are reported, never panicked on; see [`run_strategy`].
    fn solve(
        &self,
        patients: &[Patient],
        hospitals: &[Hospital],
    ) -> Result<Vec<Assignment>, SolverFailure>;
}

/// Remaining capacity per hospital for one run
#[derive(Debug, Clone)]
pub struct CapacityLedger {
    remaining: Vec<u64>,
}

impl CapacityLedger {
    pub fn new(hospitals: &[Hospital]) -> Self {
        Self {
            remaining: hospitals.iter().map(Hospital::effective_capacity).collect(),
        }
    }

    pub fn remaining(&self, index: usize) -> u64 {
        self.remaining.get(index).copied().unwrap_or(0)
    }

    pub fn has_capacity(&self, index: usize) -> bool {
        self.remaining(index) > 0
    }

    /// Consume one slot; false when the hospital is full
    pub fn take(&mut self, index: usize) -> bool {
        match self.remaining.get_mut(index) {
            Some(slots) if *slots > 0 => {
                *slots -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining.iter().all(|&r| r == 0)
    }
}

/// Result of running one strategy, failures already folded in
#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub kind: StrategyKind,
    pub assignments: Vec<Assignment>,
    pub elapsed: Duration,
    pub failure: Option<SolverFailure>,
}

impl StrategyRun {
    pub fn assignment_for(&self, patient_id: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.patient_id == patient_id)
    }

    pub fn assigned_count(&self) -> usize {
        self.assignments.iter().filter(|a| a.is_assigned()).count()
    }
}

/// Run a strategy, degrading a solver failure to "every patient unassigned"
pub fn run_strategy(
    strategy: &dyn AssignmentStrategy,
    patients: &[Patient],
    hospitals: &[Hospital],
) -> StrategyRun {
    let kind = strategy.kind();
    let started = Instant::now();
    let outcome = strategy.solve(patients, hospitals);
    let elapsed = started.elapsed();

    match outcome {
        Ok(assignments) => {
            tracing::debug!(
                "{} assigned {}/{} patients in {:?}",
                kind.name(),
                assignments.iter().filter(|a| a.is_assigned()).count(),
                patients.len(),
                elapsed
            );
            StrategyRun {
                kind,
                assignments,
                elapsed,
                failure: None,
            }
        }
        Err(failure) => {
            tracing::warn!("{} found no solution: {}", kind.name(), failure);
            StrategyRun {
                kind,
                assignments: patients
                    .iter()
                    .map(|p| Assignment::unassigned(p.code.clone()))
                    .collect(),
                elapsed,
                failure: Some(failure),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::assert_capacity_respected;
    use super::*;
    use crate::model::Severity;

    struct AlwaysFails;

    impl AssignmentStrategy for AlwaysFails {
        fn kind(&self) -> StrategyKind {
            StrategyKind::MinCostFlow
        }

        fn solve(&self, _: &[Patient], _: &[Hospital]) -> Result<Vec<Assignment>, SolverFailure> {
            Err(SolverFailure::Infeasible {
                required: 2,
                routed: 0,
            })
        }
    }

    fn scattered_patients(n: usize) -> Vec<Patient> {
        let severities = [Severity::Mild, Severity::Grave, Severity::Unknown, Severity::Moderate];
        (0..n)
            .map(|i| {
                Patient::new(
                    format!("P{i}"),
                    -12.0 + (i as f64 * 0.37).sin() * 0.3,
                    -77.0 + (i as f64 * 0.91).cos() * 0.3,
                )
                .with_severity(severities[i % severities.len()])
            })
            .collect()
    }

    fn limited_hospitals() -> Vec<Hospital> {
        vec![
            Hospital::new("H1", -12.0, -77.0).with_capacity(2),
            Hospital::new("H2", -12.2, -76.9).with_capacity(1),
            Hospital::new("H3", -11.9, -77.2).with_capacity(3),
        ]
    }

    #[test]
    fn test_failure_degrades_to_unassigned() {
        let patients = vec![Patient::new("P1", 0.0, 0.0), Patient::new("P2", 0.0, 1.0)];
        let run = run_strategy(&AlwaysFails, &patients, &[]);
        assert_eq!(run.assignments.len(), 2);
        assert_eq!(run.assigned_count(), 0);
        assert!(matches!(run.failure, Some(SolverFailure::Infeasible { .. })));
        assert!(run.assignment_for("P2").is_some());
    }

    #[test]
    fn test_capacity_ledger() {
        let hospitals = vec![
            Hospital::new("H1", 0.0, 0.0).with_capacity(1),
            Hospital::new("H2", 0.0, 0.0),
        ];
        let mut ledger = CapacityLedger::new(&hospitals);
        assert!(ledger.take(0));
        assert!(!ledger.take(0));
        assert!(!ledger.has_capacity(0));
        assert!(ledger.has_capacity(1));
        assert!(!ledger.take(7));
        assert!(!ledger.is_exhausted());
    }

    #[test]
    fn test_every_strategy_respects_capacity() {
        let hospitals = limited_hospitals();
        let strategies: Vec<Box<dyn AssignmentStrategy>> = vec![
            Box::new(GreedyStrategy),
            Box::new(HungarianStrategy),
            Box::new(MinCostFlowStrategy::default()),
        ];

        for n in [0, 1, 3, 6, 9] {
            let patients = scattered_patients(n);
            for strategy in &strategies {
                let run = run_strategy(strategy.as_ref(), &patients, &hospitals);
                assert_eq!(run.assignments.len(), n, "{}", strategy.kind().name());
                assert_capacity_respected(&run.assignments, &hospitals);
            }
        }
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(StrategyKind::PRIORITY[0], StrategyKind::MinCostFlow);
        assert_eq!(StrategyKind::PRIORITY[2], StrategyKind::Greedy);
        assert_eq!(StrategyKind::MinCostFlow.name(), "Min-Cost Max-Flow");
    }
}
