//! Diagonal quadratic programs for affine delay functions.

use nalgebra::{DMatrix, DVector};
use wardrop_core::Real;

use crate::error::{SolverError, SolverResult};
use crate::interior_point::{self, InteriorPointConfig, InteriorPointResult};
use crate::oracle::ConvexOracle;

/// `1/2 x' diag(p) x + c' x`.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadraticObjective {
    pub p: DVector<Real>,
    pub c: DVector<Real>,
}

impl QuadraticObjective {
    pub fn new(p: DVector<Real>, c: DVector<Real>) -> SolverResult<Self> {
        if p.len() != c.len() {
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "quadratic term has {} entries but linear term has {}",
                    p.len(),
                    c.len()
                ),
            });
        }
        if let Some(bad) = p.iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
            return Err(SolverError::ProblemSetup {
                what: format!("quadratic term {bad} would make the program non-convex"),
            });
        }
        Ok(Self { p, c })
    }

    /// Add `weight / 2 * (x[i] - target)^2` for each observed coordinate.
    pub fn add_penalty(&mut self, positions: &[usize], targets: &[Real], weight: Real) {
        for (&i, &t) in positions.iter().zip(targets) {
            self.p[i] += weight;
            self.c[i] -= weight * t;
        }
    }
}

impl ConvexOracle for QuadraticObjective {
    fn dimension(&self) -> usize {
        self.p.len()
    }

    fn value_gradient(&self, x: &DVector<Real>) -> Option<(Real, DVector<Real>)> {
        if x.len() != self.p.len() {
            return None;
        }
        let px = self.p.component_mul(x);
        let value = 0.5 * px.dot(x) + self.c.dot(x);
        Some((value, px + &self.c))
    }

    fn value_gradient_hessian(
        &self,
        x: &DVector<Real>,
        weight: Real,
    ) -> Option<(Real, DVector<Real>, DMatrix<Real>)> {
        let (value, gradient) = self.value_gradient(x)?;
        let hessian = DMatrix::from_diagonal(&(weight * &self.p));
        Some((value, gradient, hessian))
    }
}

/// Solve `min 1/2 x'Px + c'x` s.t. `A x = b`, `x >= 0`.
pub fn solve_qp(
    objective: &QuadraticObjective,
    a: &DMatrix<Real>,
    b: &DVector<Real>,
    x0: Option<&DVector<Real>>,
    config: &InteriorPointConfig,
) -> SolverResult<InteriorPointResult> {
    interior_point::solve(objective, a, b, x0, config)
}
