//! Convex objective oracles over link flows.
//!
//! The interior-point backend only talks to an objective through
//! [`ConvexOracle`], so any separable or dense convex objective that answers
//! the three queries can be plugged in.

use std::fmt;

use nalgebra::{DMatrix, DVector};
use wardrop_core::Real;

/// Which equilibrium the objective encodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Objective {
    /// Wardrop's first principle: no traveller can lower their own delay.
    #[default]
    UserEquilibrium,
    /// Wardrop's second principle: total travel cost is minimal.
    SystemOptimum,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::UserEquilibrium => write!(f, "user equilibrium"),
            Objective::SystemOptimum => write!(f, "system optimum"),
        }
    }
}

/// Twice-differentiable convex function queried by the interior-point backend.
pub trait ConvexOracle {
    /// Number of variables.
    fn dimension(&self) -> usize;

    /// Strictly positive starting point.
    fn initial_point(&self) -> DVector<Real> {
        DVector::from_element(self.dimension(), 1.0)
    }

    /// Value and gradient at `x`, or `None` outside the domain.
    fn value_gradient(&self, x: &DVector<Real>) -> Option<(Real, DVector<Real>)>;

    /// Value, gradient and `weight` times the Hessian at `x`.
    fn value_gradient_hessian(
        &self,
        x: &DVector<Real>,
        weight: Real,
    ) -> Option<(Real, DVector<Real>, DMatrix<Real>)>;
}

/// Quadratic penalty `weight / 2 * sum (x[i] - target)^2` on selected coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct SoftPenalty {
    pub positions: Vec<usize>,
    pub targets: Vec<Real>,
    pub weight: Real,
}

impl SoftPenalty {
    fn value(&self, x: &DVector<Real>) -> Real {
        self.positions
            .iter()
            .zip(&self.targets)
            .map(|(&i, &t)| 0.5 * self.weight * (x[i] - t).powi(2))
            .sum()
    }

    fn add_gradient(&self, x: &DVector<Real>, gradient: &mut DVector<Real>) {
        for (&i, &t) in self.positions.iter().zip(&self.targets) {
            gradient[i] += self.weight * (x[i] - t);
        }
    }

    fn add_hessian(&self, weight: Real, hessian: &mut DMatrix<Real>) {
        for &i in &self.positions {
            hessian[(i, i)] += weight * self.weight;
        }
    }
}

/// Separable polynomial potential for polynomial delay functions.
///
/// With link delay `t(x) = ffdelay + sum_k a[k] x^(k+1)`:
/// - user equilibrium minimizes the Beckmann integral `sum int_0^x t(u) du`
/// - system optimum minimizes total cost `sum x t(x)`
///
/// Both are `ffdelay x + sum_k v[k] x^(k+2)` per link, differing only in the
/// scale applied to `a[k]`.
#[derive(Clone, Debug, PartialEq)]
pub struct BeckmannObjective {
    ffdelays: DVector<Real>,
    /// Coefficient of `x^(k+2)` in the value, links x degree.
    value_coefs: DMatrix<Real>,
    /// Coefficient of `x^(k+1)` in the gradient.
    gradient_coefs: DMatrix<Real>,
    /// Coefficient of `x^k` in the Hessian diagonal.
    hessian_coefs: DMatrix<Real>,
    penalty: Option<SoftPenalty>,
}

impl BeckmannObjective {
    /// `flow_coefs` holds `a[k]` per link (slope already folded in).
    pub fn new(
        ffdelays: DVector<Real>,
        flow_coefs: &DMatrix<Real>,
        objective: Objective,
        penalty: Option<SoftPenalty>,
    ) -> Self {
        let (links, degree) = flow_coefs.shape();
        let mut value_coefs = DMatrix::zeros(links, degree);
        let mut gradient_coefs = DMatrix::zeros(links, degree);
        let mut hessian_coefs = DMatrix::zeros(links, degree);

        for k in 0..degree {
            let power = (k + 2) as Real;
            let scale = match objective {
                Objective::UserEquilibrium => 1.0,
                Objective::SystemOptimum => power,
            };
            for i in 0..links {
                let a = flow_coefs[(i, k)] * scale;
                value_coefs[(i, k)] = a / power;
                gradient_coefs[(i, k)] = a;
                hessian_coefs[(i, k)] = a * (k + 1) as Real;
            }
        }

        Self {
            ffdelays,
            value_coefs,
            gradient_coefs,
            hessian_coefs,
            penalty,
        }
    }

    fn in_domain(&self, x: &DVector<Real>) -> bool {
        x.len() == self.ffdelays.len() && x.iter().all(|v| v.is_finite() && *v >= 0.0)
    }

    fn value_and_gradient(&self, x: &DVector<Real>) -> (Real, DVector<Real>) {
        let mut value = self.ffdelays.dot(x);
        let mut gradient = self.ffdelays.clone();

        for (i, &xi) in x.iter().enumerate() {
            let mut power = xi;
            for k in 0..self.value_coefs.ncols() {
                // power == xi^(k+1)
                value += self.value_coefs[(i, k)] * power * xi;
                gradient[i] += self.gradient_coefs[(i, k)] * power;
                power *= xi;
            }
        }

        if let Some(penalty) = &self.penalty {
            value += penalty.value(x);
            penalty.add_gradient(x, &mut gradient);
        }
        (value, gradient)
    }
}

impl ConvexOracle for BeckmannObjective {
    fn dimension(&self) -> usize {
        self.ffdelays.len()
    }

    fn value_gradient(&self, x: &DVector<Real>) -> Option<(Real, DVector<Real>)> {
        self.in_domain(x).then(|| self.value_and_gradient(x))
    }

    fn value_gradient_hessian(
        &self,
        x: &DVector<Real>,
        weight: Real,
    ) -> Option<(Real, DVector<Real>, DMatrix<Real>)> {
        if !self.in_domain(x) {
            return None;
        }
        let (value, gradient) = self.value_and_gradient(x);
        let n = x.len();
        let mut hessian = DMatrix::zeros(n, n);
        for (i, &xi) in x.iter().enumerate() {
            let mut power = 1.0;
            let mut h = 0.0;
            for k in 0..self.hessian_coefs.ncols() {
                h += self.hessian_coefs[(i, k)] * power;
                power *= xi;
            }
            hessian[(i, i)] = weight * h;
        }
        if let Some(penalty) = &self.penalty {
            penalty.add_hessian(weight, &mut hessian);
        }
        Some((value, gradient, hessian))
    }
}
