//! Greedy assignment: most severe first, nearest hospital with room

use super::{AssignmentStrategy, CapacityLedger, SolverFailure, StrategyKind};
use crate::model::{Assignment, Hospital, Patient};

/// Myopic O(P·H) heuristic
///
/// Patients are visited by severity rank (stable, so equal ranks keep input order);
/// each takes the nearest hospital that still has capacity. Output follows the
/// processing order.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyStrategy;

impl AssignmentStrategy for GreedyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Greedy
    }

    fn solve(
        &self,
        patients: &[Patient],
        hospitals: &[Hospital],
    ) -> Result<Vec<Assignment>, SolverFailure> {
        let mut ledger = CapacityLedger::new(hospitals);

        let mut order: Vec<&Patient> = patients.iter().collect();
        order.sort_by_key(|p| p.severity.rank());

        let mut results = Vec::with_capacity(patients.len());

        for patient in order {
            let origin = patient.coordinate();
            let mut best: Option<(usize, f64)> = None;

            for (index, hospital) in hospitals.iter().enumerate() {
                if !ledger.has_capacity(index) {
                    continue;
                }
                let distance = origin.distance_km(&hospital.coordinate());
                if !distance.is_finite() {
                    continue;
                }
                // Strict comparison: the first of equally near hospitals wins
                if best.map_or(true, |(_, d)| distance < d) {
                    best = Some((index, distance));
                }
            }

            match best {
                Some((index, distance)) => {
                    ledger.take(index);
                    results.push(Assignment::assigned(
                        patient.code.clone(),
                        hospitals[index].code.clone(),
                        distance,
                    ));
                }
                None => results.push(Assignment::unassigned(patient.code.clone())),
            }
        }

        Ok(results)
    }
}
