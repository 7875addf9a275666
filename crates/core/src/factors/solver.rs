//! Bounded, regularised least squares for conversion factors
//!
//! Minimises `‖Ax − b‖² + λ‖x − prior‖²` subject to `lo ≤ x ≤ hi`, where
//! column `j` of the 2×n matrix `A` holds the production and development
//! counts of configuration `j` and `b` the two reconciled tonnages.
//!
//! Projected gradient descent with a fixed step `1 / (2‖A‖²_F + 2λ)`. The
//! step is below the inverse Lipschitz constant of the gradient, so every
//! iteration is a descent step and the loop needs no line search.

use minetally_domain::constants::{DEFAULT_MAX_ITERATIONS, DEFAULT_SOLVER_TOLERANCE};
use minetally_domain::FactorPair;
use tracing::debug;

/// One factor problem. All vectors have one entry per configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorProblem {
    /// Aggregated (production, development) counts per configuration.
    pub columns: Vec<FactorPair>,
    pub targets: FactorPair,
    pub prior: Vec<f64>,
    pub lower: Vec<f64>,
    /// `f64::INFINITY` when unbounded.
    pub upper: Vec<f64>,
    pub regularization: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    pub max_iterations: usize,
    /// Stop once a step moves the factors less than this (L1).
    pub tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self { max_iterations: DEFAULT_MAX_ITERATIONS, tolerance: DEFAULT_SOLVER_TOLERANCE }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    pub factors: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl FactorProblem {
    /// `A·x`
    pub fn predict(&self, factors: &[f64]) -> FactorPair {
        self.columns.iter().zip(factors).fold(FactorPair::default(), |acc, (column, x)| {
            FactorPair::new(acc.production + column.production * x, acc.development + column.development * x)
        })
    }

    fn project(&self, j: usize, value: f64) -> f64 {
        value.max(self.lower[j]).min(self.upper[j])
    }

    fn frobenius_sq(&self) -> f64 {
        self.columns.iter().map(|c| c.production.powi(2) + c.development.powi(2)).sum()
    }
}

/// Solve `problem`. Always returns within `max_iterations` steps; the result
/// is feasible even when the loop did not converge.
pub fn solve_factors(problem: &FactorProblem, settings: &SolverSettings) -> SolverOutcome {
    let n = problem.columns.len();
    let mut x: Vec<f64> = (0..n).map(|j| problem.project(j, problem.prior[j])).collect();

    let lipschitz = 2.0 * problem.frobenius_sq() + 2.0 * problem.regularization;
    if n == 0 || lipschitz <= 0.0 {
        return SolverOutcome { factors: x, iterations: 0, converged: true };
    }
    let step = 1.0 / lipschitz;

    let mut iterations = 0;
    let mut converged = false;
    while iterations < settings.max_iterations {
        iterations += 1;

        let residual = problem.predict(&x).minus(&problem.targets);
        let mut movement = 0.0;
        for j in 0..n {
            let column = &problem.columns[j];
            let gradient = 2.0
                * (column.production * residual.production + column.development * residual.development)
                + 2.0 * problem.regularization * (x[j] - problem.prior[j]);
            let next = problem.project(j, x[j] - step * gradient);
            movement += (next - x[j]).abs();
            x[j] = next;
        }

        if movement < settings.tolerance {
            converged = true;
            break;
        }
    }

    debug!(configs = n, iterations, converged, "factor solve finished");
    SolverOutcome { factors: x, iterations, converged }
}
