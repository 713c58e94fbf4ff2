//! Primal-dual interior-point method for `min f(x)` s.t. `A x = b`, `x >= 0`.
//!
//! Infeasible-start variant: each iteration takes a damped Newton step on
//! the perturbed KKT conditions
//!
//! ```text
//! grad f(x) - A'y - s = 0
//! A x - b            = 0
//! x_i s_i            = sigma mu
//! ```
//!
//! keeping `x` and `s` strictly positive with a fraction-to-boundary rule and
//! backtracking on the merit `|r_dual| + |r_primal| + x's`.

use std::fmt;

use nalgebra::{DMatrix, DVector};
use tracing::debug;
use wardrop_core::Real;

use crate::error::{SolverError, SolverResult};
use crate::oracle::ConvexOracle;

/// Interior-point configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct InteriorPointConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Relative tolerance on primal and dual residuals
    pub feasibility_tol: f64,
    /// Relative tolerance on the complementarity gap `x's`
    pub gap_tol: f64,
    /// Centering parameter sigma in (0, 1)
    pub centering: f64,
    /// Fraction of the distance to the boundary a step may cover
    pub step_to_boundary: f64,
    /// Line search backtracking factor
    pub line_search_beta: f64,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
    /// Iterates larger than this are treated as divergence
    pub divergence_limit: f64,
}

impl Default for InteriorPointConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            feasibility_tol: 1e-8,
            gap_tol: 1e-9,
            centering: 0.1,
            step_to_boundary: 0.99,
            line_search_beta: 0.5,
            max_line_search_iters: 30,
            divergence_limit: 1e12,
        }
    }
}

/// How an interior-point run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteriorPointStatus {
    Converged,
    MaxIterations,
    /// Line search could not reduce the merit function.
    Stagnated,
    /// Primal or dual iterates grew without bound (infeasible or unbounded).
    Diverged,
    /// The KKT matrix could not be factorized.
    SingularSystem,
    /// The oracle rejected an iterate.
    OutsideDomain,
}

impl fmt::Display for InteriorPointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InteriorPointStatus::Converged => "converged",
            InteriorPointStatus::MaxIterations => "maximum iterations reached",
            InteriorPointStatus::Stagnated => "line search stagnated",
            InteriorPointStatus::Diverged => "iterates diverged (infeasible or unbounded)",
            InteriorPointStatus::SingularSystem => "singular KKT system",
            InteriorPointStatus::OutsideDomain => "iterate outside objective domain",
        };
        f.write_str(text)
    }
}

/// Interior-point result.
#[derive(Clone, Debug)]
pub struct InteriorPointResult {
    /// Primal solution
    pub x: DVector<Real>,
    /// Multipliers of `A x = b`
    pub y: DVector<Real>,
    /// Multipliers of `x >= 0`
    pub s: DVector<Real>,
    /// Objective value at `x`
    pub objective: Real,
    /// Infinity norm of `A x - b`
    pub primal_residual: Real,
    /// Infinity norm of `grad f - A'y - s`
    pub dual_residual: Real,
    /// Complementarity `x's`
    pub gap: Real,
    /// Number of iterations
    pub iterations: usize,
    pub status: InteriorPointStatus,
}

impl InteriorPointResult {
    pub fn converged(&self) -> bool {
        self.status == InteriorPointStatus::Converged
    }
}

/// Iterate with its objective value and gradient.
struct Iterate {
    x: DVector<Real>,
    y: DVector<Real>,
    s: DVector<Real>,
    value: Real,
    gradient: DVector<Real>,
}

impl Iterate {
    fn residuals(&self, a: &DMatrix<Real>, b: &DVector<Real>) -> (DVector<Real>, DVector<Real>) {
        let dual = &self.gradient - a.tr_mul(&self.y) - &self.s;
        let primal = a * &self.x - b;
        (dual, primal)
    }

    fn merit(&self, a: &DMatrix<Real>, b: &DVector<Real>) -> Real {
        let (dual, primal) = self.residuals(a, b);
        dual.norm() + primal.norm() + self.x.dot(&self.s)
    }
}

/// Minimize the oracle's objective over `{x >= 0, A x = b}`.
///
/// Algorithmic failures are reported through [`InteriorPointResult::status`];
/// only malformed inputs produce an error.
pub fn solve<O: ConvexOracle + ?Sized>(
    oracle: &O,
    a: &DMatrix<Real>,
    b: &DVector<Real>,
    x0: Option<&DVector<Real>>,
    config: &InteriorPointConfig,
) -> SolverResult<InteriorPointResult> {
    let n = oracle.dimension();
    let m = a.nrows();
    if a.ncols() != n || b.len() != m {
        return Err(SolverError::ProblemSetup {
            what: format!(
                "constraint matrix is {}x{} and right-hand side has {} entries for {} variables",
                m,
                a.ncols(),
                b.len(),
                n
            ),
        });
    }

    let x = starting_point(oracle, x0)?;
    let s = DVector::from_element(n, 1.0);
    let y = DVector::zeros(m);
    let b_scale = 1.0 + inf_norm(b);

    let Some((value, gradient)) = oracle.value_gradient(&x) else {
        return Ok(finish(
            Iterate { x, y, s, value: Real::NAN, gradient: DVector::zeros(n) },
            a,
            b,
            0,
            InteriorPointStatus::OutsideDomain,
        ));
    };
    let mut it = Iterate { x, y, s, value, gradient };

    for iter in 0..config.max_iterations {
        let (r_dual, r_primal) = it.residuals(a, b);
        let gap = it.x.dot(&it.s);

        // Check convergence
        if inf_norm(&r_primal) <= config.feasibility_tol * b_scale
            && inf_norm(&r_dual) <= config.feasibility_tol * (1.0 + inf_norm(&it.gradient))
            && gap <= config.gap_tol * (1.0 + it.value.abs())
        {
            return Ok(finish(it, a, b, iter, InteriorPointStatus::Converged));
        }

        if inf_norm(&it.x) > config.divergence_limit || inf_norm(&it.y) > config.divergence_limit {
            return Ok(finish(it, a, b, iter, InteriorPointStatus::Diverged));
        }

        let Some((_, _, hessian)) = oracle.value_gradient_hessian(&it.x, 1.0) else {
            return Ok(finish(it, a, b, iter, InteriorPointStatus::OutsideDomain));
        };

        let target = if n > 0 { config.centering * gap / n as Real } else { 0.0 };
        let Some((dx, dy, ds)) = newton_direction(&it, &hessian, a, &r_dual, &r_primal, target)
        else {
            return Ok(finish(it, a, b, iter, InteriorPointStatus::SingularSystem));
        };

        let mut alpha = max_step(&it.x, &dx, config.step_to_boundary)
            .min(max_step(&it.s, &ds, config.step_to_boundary));
        let merit = r_dual.norm() + r_primal.norm() + gap;

        // Backtracking line search on the merit function
        let mut accepted = None;
        for _ in 0..config.max_line_search_iters {
            let x_new = &it.x + alpha * &dx;
            if let Some((value, gradient)) = oracle.value_gradient(&x_new) {
                let trial = Iterate {
                    x: x_new,
                    y: &it.y + alpha * &dy,
                    s: &it.s + alpha * &ds,
                    value,
                    gradient,
                };
                let trial_merit = trial.merit(a, b);
                if trial_merit.is_finite() && trial_merit <= (1.0 - 1e-4 * alpha) * merit {
                    accepted = Some(trial);
                    break;
                }
            }
            alpha *= config.line_search_beta;
        }

        // Check for stagnation
        let Some(next) = accepted.filter(|_| alpha >= 1e-10) else {
            return Ok(finish(it, a, b, iter, InteriorPointStatus::Stagnated));
        };
        it = next;

        debug!(iteration = iter, alpha, gap, merit, "Interior-point step");
    }

    Ok(finish(
        it,
        a,
        b,
        config.max_iterations,
        InteriorPointStatus::MaxIterations,
    ))
}

/// User-supplied starts are lifted off the boundary; the oracle's own start is used otherwise.
fn starting_point<O: ConvexOracle + ?Sized>(
    oracle: &O,
    x0: Option<&DVector<Real>>,
) -> SolverResult<DVector<Real>> {
    let n = oracle.dimension();
    let x = match x0 {
        Some(x0) => x0.clone(),
        None => oracle.initial_point(),
    };
    if x.len() != n {
        return Err(SolverError::ProblemSetup {
            what: format!("starting point has {} entries for {} variables", x.len(), n),
        });
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::ProblemSetup {
            what: "starting point is not finite".to_string(),
        });
    }
    let floor = 1e-2 * (1.0 + inf_norm(&x));
    Ok(x.map(|v| v.max(floor)))
}

/// Solve the Newton system
///
/// ```text
/// [ H + X^-1 S   -A' ] [dx]   [ -r_d + sigma mu X^-1 e - s ]
/// [ A             0  ] [dy] = [ -r_p                       ]
/// ```
///
/// and recover `ds = sigma mu X^-1 e - s - X^-1 S dx`.
fn newton_direction(
    it: &Iterate,
    hessian: &DMatrix<Real>,
    a: &DMatrix<Real>,
    r_dual: &DVector<Real>,
    r_primal: &DVector<Real>,
    target: Real,
) -> Option<(DVector<Real>, DVector<Real>, DVector<Real>)> {
    let n = it.x.len();
    let m = a.nrows();

    let mut kkt = DMatrix::zeros(n + m, n + m);
    kkt.view_mut((0, 0), (n, n)).copy_from(hessian);
    for i in 0..n {
        kkt[(i, i)] += it.s[i] / it.x[i];
    }
    kkt.view_mut((0, n), (n, m)).copy_from(&(-a.transpose()));
    kkt.view_mut((n, 0), (m, n)).copy_from(a);

    let mut rhs = DVector::zeros(n + m);
    for i in 0..n {
        rhs[i] = -r_dual[i] + target / it.x[i] - it.s[i];
    }
    for r in 0..m {
        rhs[n + r] = -r_primal[r];
    }

    let sol = kkt.lu().solve(&rhs)?;
    if sol.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let dx = sol.rows(0, n).into_owned();
    let dy = sol.rows(n, m).into_owned();
    let ds = DVector::from_iterator(
        n,
        (0..n).map(|i| target / it.x[i] - it.s[i] - it.s[i] / it.x[i] * dx[i]),
    );
    Some((dx, dy, ds))
}

/// Largest step in (0, 1] keeping `v + alpha dv` strictly positive.
fn max_step(v: &DVector<Real>, dv: &DVector<Real>, tau: Real) -> Real {
    v.iter()
        .zip(dv.iter())
        .filter(|(_, d)| **d < 0.0)
        .map(|(vi, di)| -tau * vi / di)
        .fold(1.0, Real::min)
}

fn inf_norm(v: &DVector<Real>) -> Real {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}

fn finish(
    it: Iterate,
    a: &DMatrix<Real>,
    b: &DVector<Real>,
    iterations: usize,
    status: InteriorPointStatus,
) -> InteriorPointResult {
    let (r_dual, r_primal) = it.residuals(a, b);
    InteriorPointResult {
        primal_residual: inf_norm(&r_primal),
        dual_residual: inf_norm(&r_dual),
        gap: it.x.dot(&it.s),
        objective: it.value,
        x: it.x,
        y: it.y,
        s: it.s,
        iterations,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{BeckmannObjective, Objective};

    /// f(x) = sum 1/2 x_i^2 - x_i
    fn unit_quadratic(n: usize) -> BeckmannObjective {
        BeckmannObjective::new(
            DVector::from_element(n, -1.0),
            &DMatrix::from_element(n, 1, 1.0),
            Objective::UserEquilibrium,
            None,
        )
    }

    #[test]
    fn unconstrained_minimum_inside_orthant() {
        let oracle = unit_quadratic(2);
        let a = DMatrix::zeros(0, 2);
        let b = DVector::zeros(0);
        let result = solve(&oracle, &a, &b, None, &InteriorPointConfig::default()).unwrap();

        assert!(result.converged());
        assert!((result.x[0] - 1.0).abs() < 1e-6);
        assert!((result.x[1] - 1.0).abs() < 1e-6);
        assert!((result.objective + 1.0).abs() < 1e-6);
    }

    #[test]
    fn equality_constraint_splits_evenly() {
        let oracle = unit_quadratic(2);
        let a = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let b = DVector::from_vec(vec![6.0]);
        let result = solve(&oracle, &a, &b, None, &InteriorPointConfig::default()).unwrap();

        assert!(result.converged());
        assert!((result.x[0] - 3.0).abs() < 1e-6);
        assert!((result.x[1] - 3.0).abs() < 1e-6);
        // Stationarity: x - 1 = y
        assert!((result.y[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn bound_becomes_active() {
        // min 1/2 x^2 + 5x over x >= 0 has x = 0
        let oracle = BeckmannObjective::new(
            DVector::from_element(1, 5.0),
            &DMatrix::from_element(1, 1, 1.0),
            Objective::UserEquilibrium,
            None,
        );
        let result = solve(
            &oracle,
            &DMatrix::zeros(0, 1),
            &DVector::zeros(0),
            None,
            &InteriorPointConfig::default(),
        )
        .unwrap();

        assert!(result.converged());
        assert!(result.x[0].abs() < 1e-6);
        assert!((result.s[0] - 5.0).abs() < 1e-5);
    }

    #[test]
    fn infeasible_program_does_not_converge() {
        let oracle = unit_quadratic(1);
        let a = DMatrix::from_element(1, 1, 1.0);
        let b = DVector::from_element(1, -1.0);
        let result = solve(&oracle, &a, &b, None, &InteriorPointConfig::default()).unwrap();

        assert!(!result.converged());
        assert!(result.primal_residual > 0.5);
    }

    #[test]
    fn starting_point_is_lifted_off_boundary() {
        let oracle = unit_quadratic(2);
        let x0 = DVector::from_vec(vec![0.0, 4.0]);
        let x = starting_point(&oracle, Some(&x0)).unwrap();
        assert!((x[0] - 0.05).abs() < 1e-12);
        assert_eq!(x[1], 4.0);
    }

    #[test]
    fn mismatched_dimensions_are_setup_errors() {
        let oracle = unit_quadratic(2);
        let a = DMatrix::zeros(1, 3);
        let b = DVector::zeros(1);
        assert!(matches!(
            solve(&oracle, &a, &b, None, &InteriorPointConfig::default()),
            Err(SolverError::ProblemSetup { .. })
        ));

        let short = DVector::zeros(1);
        assert!(matches!(
            solve(&oracle, &DMatrix::zeros(0, 2), &DVector::zeros(0), Some(&short), &InteriorPointConfig::default()),
            Err(SolverError::ProblemSetup { .. })
        ));
    }
}
