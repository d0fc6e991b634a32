//! Capacity-aware optimal assignment as a min-cost max-flow problem
//!
//! Network: source -> patient (cap 1) -> hospital (cap 1, scaled distance cost)
//! -> sink (cap = capacity clamped to the patient count). Demand is every patient.

use std::collections::VecDeque;

use super::{AssignmentStrategy, SolverFailure, StrategyKind};
use crate::model::{Assignment, Hospital, Patient};

/// Largest scaled arc cost accepted; keeps path sums far from `i64::MAX`
const MAX_ARC_COST: f64 = 1e12;

#[derive(Debug, Clone)]
struct FlowArc {
    to: usize,
    capacity: i64,
    cost: i64,
}

/// Residual network with paired forward/backward arcs (`id ^ 1` is the twin)
#[derive(Debug, Default)]
struct FlowNetwork {
    arcs: Vec<FlowArc>,
    outgoing: Vec<Vec<usize>>,
}

impl FlowNetwork {
    fn with_nodes(n: usize) -> Self {
        Self {
            arcs: Vec::new(),
            outgoing: vec![Vec::new(); n],
        }
    }

    fn add_arc(&mut self, from: usize, to: usize, capacity: i64, cost: i64) -> usize {
        let id = self.arcs.len();
        self.arcs.push(FlowArc { to, capacity, cost });
        self.outgoing[from].push(id);
        self.arcs.push(FlowArc {
            to: from,
            capacity: 0,
            cost: -cost,
        });
        self.outgoing[to].push(id + 1);
        id
    }

    /// Cheapest residual path by SPFA, as the arc ids used to reach each node
    fn shortest_path(&self, source: usize) -> Vec<Option<usize>> {
        let n = self.outgoing.len();
        let mut dist = vec![i64::MAX; n];
        let mut via: Vec<Option<usize>> = vec![None; n];
        let mut queued = vec![false; n];
        let mut queue = VecDeque::new();

        dist[source] = 0;
        queue.push_back(source);
        queued[source] = true;

        while let Some(u) = queue.pop_front() {
            queued[u] = false;
            for &id in &self.outgoing[u] {
                let arc = &self.arcs[id];
                if arc.capacity <= 0 {
                    continue;
                }
                let candidate = dist[u] + arc.cost;
                if candidate < dist[arc.to] {
                    dist[arc.to] = candidate;
                    via[arc.to] = Some(id);
                    if !queued[arc.to] {
                        queued[arc.to] = true;
                        queue.push_back(arc.to);
                    }
                }
            }
        }

        via
    }

    /// Successive shortest paths until `demand` units flow or the sink is cut off
    fn run(&mut self, source: usize, sink: usize, demand: i64) -> (i64, i64) {
        let mut flow = 0i64;
        let mut cost = 0i64;

        while flow < demand {
            let via = self.shortest_path(source);
            if via[sink].is_none() {
                break;
            }

            let mut push = demand - flow;
            let mut node = sink;
            while node != source {
                let Some(id) = via[node] else { break };
                push = push.min(self.arcs[id].capacity);
                node = self.arcs[id ^ 1].to;
            }

            let mut node = sink;
            while node != source {
                let Some(id) = via[node] else { break };
                self.arcs[id].capacity -= push;
                self.arcs[id ^ 1].capacity += push;
                cost += push * self.arcs[id].cost;
                node = self.arcs[id ^ 1].to;
            }

            flow += push;
        }

        (flow, cost)
    }
}

/// Successive-shortest-path solver honoring every hospital's capacity
#[derive(Debug, Clone, Copy)]
pub struct MinCostFlowStrategy {
    /// Multiplier turning kilometers into integer arc costs
    pub cost_scale: f64,
}

impl Default for MinCostFlowStrategy {
    fn default() -> Self {
        Self { cost_scale: 100.0 }
    }
}

impl MinCostFlowStrategy {
    pub fn with_cost_scale(mut self, cost_scale: f64) -> Self {
        self.cost_scale = cost_scale;
        self
    }

    fn arc_cost(
        &self,
        patient: &Patient,
        hospital: &Hospital,
        distance_km: f64,
    ) -> Result<i64, SolverFailure> {
        if !distance_km.is_finite() {
            return Err(SolverFailure::InvalidCost {
                patient_id: patient.code.clone(),
                hospital_id: hospital.code.clone(),
            });
        }
        let scaled = (distance_km * self.cost_scale).round();
        if !scaled.is_finite() || scaled > MAX_ARC_COST {
            return Err(SolverFailure::CostOverflow {
                patient_id: patient.code.clone(),
                hospital_id: hospital.code.clone(),
                cost: scaled,
            });
        }
        Ok((scaled as i64).max(1))
    }
}

impl AssignmentStrategy for MinCostFlowStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MinCostFlow
    }

    fn solve(
        &self,
        patients: &[Patient],
        hospitals: &[Hospital],
    ) -> Result<Vec<Assignment>, SolverFailure> {
        if patients.is_empty() {
            return Ok(Vec::new());
        }

        let p = patients.len();
        let h = hospitals.len();
        let source = 0;
        let sink = p + h + 1;
        let patient_node = |i: usize| 1 + i;
        let hospital_node = |j: usize| 1 + p + j;

        let mut network = FlowNetwork::with_nodes(p + h + 2);
        let mut distances = vec![vec![0.0; h]; p];
        // (patient, hospital, forward arc id)
        let mut matching_arcs = Vec::with_capacity(p * h);

        for (i, patient) in patients.iter().enumerate() {
            network.add_arc(source, patient_node(i), 1, 0);
            let origin = patient.coordinate();
            for (j, hospital) in hospitals.iter().enumerate() {
                let d = origin.distance_km(&hospital.coordinate());
                let cost = self.arc_cost(patient, hospital, d)?;
                distances[i][j] = d;
                let id = network.add_arc(patient_node(i), hospital_node(j), 1, cost);
                matching_arcs.push((i, j, id));
            }
        }

        for (j, hospital) in hospitals.iter().enumerate() {
            let slots = hospital.effective_capacity().min(p as u64) as i64;
            network.add_arc(hospital_node(j), sink, slots, 0);
        }

        let (flow, cost) = network.run(source, sink, p as i64);
        tracing::debug!("Min-cost flow routed {}/{} units at cost {}", flow, p, cost);

        if flow < p as i64 {
            return Err(SolverFailure::Infeasible {
                required: p as u64,
                routed: flow as u64,
            });
        }

        let mut chosen: Vec<Option<usize>> = vec![None; p];
        for (i, j, id) in matching_arcs {
            // A saturated forward arc carries the patient
            if network.arcs[id].capacity == 0 {
                chosen[i] = Some(j);
            }
        }

        Ok(patients
            .iter()
            .enumerate()
            .map(|(i, patient)| match chosen[i] {
                Some(j) => Assignment::assigned(
                    patient.code.clone(),
                    hospitals[j].code.clone(),
                    distances[i][j],
                ),
                None => Assignment::unassigned(patient.code.clone()),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::test_support::assert_capacity_respected;
    use crate::assignment::GreedyStrategy;
    use crate::geo::haversine_km;

    fn total_distance(assignments: &[Assignment]) -> f64 {
        assignments.iter().filter_map(|a| a.distance_km).sum()
    }

    #[test]
    fn test_shared_hospital_with_capacity_two() {
        let patients = vec![
            Patient::new("P1", -12.00, -77.00),
            Patient::new("P2", -12.10, -77.05),
        ];
        let hospitals = vec![Hospital::new("H1", -12.05, -77.02).with_capacity(2)];

        let result = MinCostFlowStrategy::default().solve(&patients, &hospitals).unwrap();

        assert_eq!(result.len(), 2);
        for (assignment, patient) in result.iter().zip(&patients) {
            assert_eq!(assignment.hospital_id.as_deref(), Some("H1"));
            let expected = haversine_km(patient.lat, patient.lon, -12.05, -77.02);
            assert_eq!(assignment.distance_km, Some(expected));
        }
    }

    #[test]
    fn test_insufficient_capacity_is_infeasible() {
        let patients = vec![
            Patient::new("P1", 0.0, 0.0),
            Patient::new("P2", 0.0, 0.1),
            Patient::new("P3", 0.0, 0.2),
        ];
        let hospitals = vec![
            Hospital::new("H1", 0.0, 0.05).with_capacity(1),
            Hospital::new("H2", 0.0, 0.15).with_capacity(1),
        ];

        let outcome = MinCostFlowStrategy::default().solve(&patients, &hospitals);
        assert_eq!(
            outcome,
            Err(SolverFailure::Infeasible {
                required: 3,
                routed: 2
            })
        );
    }

    #[test]
    fn test_no_hospitals_is_infeasible() {
        let patients = vec![Patient::new("P1", 0.0, 0.0)];
        assert!(matches!(
            MinCostFlowStrategy::default().solve(&patients, &[]),
            Err(SolverFailure::Infeasible { required: 1, routed: 0 })
        ));
    }

    #[test]
    fn test_never_worse_than_greedy() {
        // Greedy sends P1 to the shared nearest hospital and strands P2 far away
        let patients = vec![Patient::new("P1", 0.0, 0.0), Patient::new("P2", 0.0, 0.09)];
        let hospitals = vec![
            Hospital::new("H_near", 0.0, 0.04).with_capacity(1),
            Hospital::new("H_far", 0.0, -0.2).with_capacity(1),
        ];

        let optimal = MinCostFlowStrategy::default().solve(&patients, &hospitals).unwrap();
        let greedy = GreedyStrategy.solve(&patients, &hospitals).unwrap();

        assert_eq!(optimal[0].hospital_id.as_deref(), Some("H_far"));
        assert_eq!(optimal[1].hospital_id.as_deref(), Some("H_near"));
        assert_eq!(greedy[0].hospital_id.as_deref(), Some("H_near"));
        assert!(total_distance(&optimal) < total_distance(&greedy));
        assert_capacity_respected(&optimal, &hospitals);
    }

    #[test]
    fn test_unlimited_capacity_is_clamped() {
        let patients: Vec<Patient> = (0..4)
            .map(|i| Patient::new(format!("P{i}"), 0.0, i as f64 * 0.01))
            .collect();
        let hospitals = vec![Hospital::new("H1", 0.0, 0.0)];

        let result = MinCostFlowStrategy::default().solve(&patients, &hospitals).unwrap();
        assert!(result.iter().all(|a| a.hospital_id.as_deref() == Some("H1")));
    }

    #[test]
    fn test_cost_overflow() {
        let patients = vec![Patient::new("P1", 0.0, 0.0)];
        let hospitals = vec![Hospital::new("H1", 0.0, 1.0)];
        let strategy = MinCostFlowStrategy::default().with_cost_scale(1e15);
        assert!(matches!(
            strategy.solve(&patients, &hospitals),
            Err(SolverFailure::CostOverflow { .. })
        ));
    }

    #[test]
    fn test_invalid_cost() {
        let patients = vec![Patient::new("P1", f64::NAN, 0.0)];
        let hospitals = vec![Hospital::new("H1", 0.0, 1.0)];
        assert!(matches!(
            MinCostFlowStrategy::default().solve(&patients, &hospitals),
            Err(SolverFailure::InvalidCost { .. })
        ));
    }

    #[test]
    fn test_zero_distance_costs_at_least_one() {
        let patients = vec![Patient::new("P1", 0.0, 0.0)];
        let hospitals = vec![Hospital::new("H1", 0.0, 0.0)];
        let strategy = MinCostFlowStrategy::default();
        let cost = strategy.arc_cost(&patients[0], &hospitals[0], 0.0).unwrap();
        assert_eq!(cost, 1);
    }
}
