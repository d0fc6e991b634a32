//! Hungarian (Kuhn-Munkres) optimal assignment
//!
//! Each hospital counts as a single slot here regardless of its declared capacity.
//! Callers that need multi-slot optimality should use the min-cost flow strategy.

use super::{AssignmentStrategy, SolverFailure, StrategyKind};
use crate::model::{Assignment, Hospital, Patient};

/// Minimum total distance matching of min(P, H) pairs, O(n^3)
#[derive(Debug, Clone, Copy, Default)]
pub struct HungarianStrategy;

impl AssignmentStrategy for HungarianStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Hungarian
    }

    fn solve(
        &self,
        patients: &[Patient],
        hospitals: &[Hospital],
    ) -> Result<Vec<Assignment>, SolverFailure> {
        if patients.is_empty() {
            return Ok(Vec::new());
        }
        if hospitals.is_empty() {
            return Ok(patients
                .iter()
                .map(|p| Assignment::unassigned(p.code.clone()))
                .collect());
        }

        let mut costs = Vec::with_capacity(patients.len());
        for patient in patients {
            let origin = patient.coordinate();
            let mut row = Vec::with_capacity(hospitals.len());
            for hospital in hospitals {
                let d = origin.distance_km(&hospital.coordinate());
                if !d.is_finite() {
                    return Err(SolverFailure::InvalidCost {
                        patient_id: patient.code.clone(),
                        hospital_id: hospital.code.clone(),
                    });
                }
                row.push(d);
            }
            costs.push(row);
        }

        let columns = solve_rect(&costs);

        Ok(patients
            .iter()
            .enumerate()
            .map(|(row, patient)| match columns[row] {
                Some(col) => {
                    Assignment::assigned(patient.code.clone(), hospitals[col].code.clone(), costs[row][col])
                }
                None => Assignment::unassigned(patient.code.clone()),
            })
            .collect())
    }
}

/// Solve a rectangular minimization problem by padding it to a square
///
/// Returns, per row, the matched column or `None` when the row was matched to padding.
pub fn solve_rect(costs: &[Vec<f64>]) -> Vec<Option<usize>> {
    let rows = costs.len();
    let cols = costs.iter().map(Vec::len).max().unwrap_or(0);
    let size = rows.max(cols);

    if size == 0 {
        return Vec::new();
    }

    let mut square = vec![vec![0.0; size]; size];
    for (i, row) in costs.iter().enumerate() {
        square[i][..row.len()].copy_from_slice(row);
    }

    let row_to_col = solve_square(&square);

    (0..rows)
        .map(|r| {
            let c = row_to_col[r];
            (c < cols && c < costs[r].len()).then_some(c)
        })
        .collect()
}

/// Shortest augmenting path with row/column potentials on an n x n matrix
fn solve_square(a: &[Vec<f64>]) -> Vec<usize> {
    let n = a.len();
    // 1-indexed; column 0 is the virtual start
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; n + 1];
    let mut p = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;

            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let cur = a[i0 - 1][j - 1] - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut row_to_col = vec![0usize; n];
    for j in 1..=n {
        if p[j] > 0 {
            row_to_col[p[j] - 1] = j - 1;
        }
    }
    row_to_col
}
