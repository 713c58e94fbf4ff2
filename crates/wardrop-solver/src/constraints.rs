//! Flow-conservation equality system and observed-flow reconciliation.

use nalgebra::{DMatrix, DVector};
use tracing::debug;
use wardrop_core::{LinkId, Real};
use wardrop_network::{Network, NetworkError};

use crate::error::{SolverError, SolverResult};
use crate::rank::{independent_rows, least_squares, numeric_rank};

/// Relative tolerance on the right-hand side when checking a rank-deficient system.
const CONSISTENCY_TOL: Real = 1e-9;

/// How observed link flows enter the program.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reconciliation {
    /// One equality row `x_link = observed` per observation.
    Hard,
    /// Quadratic penalty `weight / 2 * (x_link - observed)^2` in the objective.
    Soft { weight: Real },
}

/// Measured link flows to reconcile with the equilibrium.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservedFlows {
    pub links: Vec<LinkId>,
    pub flows: Vec<Real>,
    pub reconciliation: Reconciliation,
}

impl ObservedFlows {
    pub fn hard(links: Vec<LinkId>, flows: Vec<Real>) -> Self {
        Self {
            links,
            flows,
            reconciliation: Reconciliation::Hard,
        }
    }

    pub fn soft(links: Vec<LinkId>, flows: Vec<Real>, weight: Real) -> Self {
        Self {
            links,
            flows,
            reconciliation: Reconciliation::Soft { weight },
        }
    }

    /// Check the observations against `network` and return the link positions
    /// they refer to.
    pub fn positions(&self, network: &Network) -> SolverResult<Vec<usize>> {
        if self.links.len() != self.flows.len() {
            return Err(NetworkError::LengthMismatch {
                what: "observed flows",
                expected: self.links.len(),
                actual: self.flows.len(),
            }
            .into());
        }
        if let Reconciliation::Soft { weight } = self.reconciliation {
            if !(weight.is_finite() && weight > 0.0) {
                return Err(SolverError::ProblemSetup {
                    what: format!("soft reconciliation weight must be positive, got {weight}"),
                });
            }
        }
        if let Some(bad) = self.flows.iter().find(|v| !v.is_finite()) {
            return Err(SolverError::ProblemSetup {
                what: format!("observed flow {bad} is not finite"),
            });
        }
        self.links
            .iter()
            .map(|&link| {
                network
                    .link_index()
                    .position(&link)
                    .ok_or(SolverError::Network(NetworkError::UnknownLink { link }))
            })
            .collect()
    }

    pub fn is_hard(&self) -> bool {
        self.reconciliation == Reconciliation::Hard
    }
}

/// Full-row-rank equality system `a_eq * x = b_eq` over link flows.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintSystem {
    pub a_eq: DMatrix<Real>,
    pub b_eq: DVector<Real>,
    /// Indices into the raw rows (nodes first, then hard observations).
    pub kept_rows: Vec<usize>,
    pub raw_rows: usize,
    pub rank: usize,
}

impl ConstraintSystem {
    pub fn num_rows(&self) -> usize {
        self.a_eq.nrows()
    }

    pub fn num_cols(&self) -> usize {
        self.a_eq.ncols()
    }

    pub fn was_reduced(&self) -> bool {
        self.kept_rows.len() < self.raw_rows
    }
}

/// Build the node-link conservation rows, append hard observation rows and
/// reduce the result to an independent row basis.
pub fn build_constraints(
    network: &Network,
    observed: Option<&ObservedFlows>,
) -> SolverResult<ConstraintSystem> {
    let num_links = network.num_links();
    let num_nodes = network.num_nodes();

    let hard: Vec<(usize, Real)> = match observed {
        Some(obs) => {
            let positions = obs.positions(network)?;
            if obs.is_hard() {
                positions.into_iter().zip(obs.flows.iter().copied()).collect()
            } else {
                Vec::new()
            }
        }
        None => Vec::new(),
    };

    let raw_rows = num_nodes + hard.len();
    let mut a = DMatrix::zeros(raw_rows, num_links);
    let mut b = DVector::zeros(raw_rows);

    for (row, col, value) in network.incidence_entries() {
        a[(row, col)] = value;
    }
    b.rows_mut(0, num_nodes).copy_from(&network.net_demands());

    for (k, (col, flow)) in hard.iter().enumerate() {
        a[(num_nodes + k, *col)] = 1.0;
        b[num_nodes + k] = *flow;
    }

    let rank = numeric_rank(&a);
    let kept_rows: Vec<usize> = if rank < raw_rows {
        ensure_consistent(&a, &b, rank)?;
        let kept = independent_rows(&a, rank);
        debug!(
            raw_rows,
            rank,
            removed = raw_rows - kept.len(),
            "Removing linearly dependent constraint rows"
        );
        kept
    } else {
        (0..raw_rows).collect()
    };

    let a_eq = a.select_rows(kept_rows.iter());
    let b_eq = b.select_rows(kept_rows.iter());

    Ok(ConstraintSystem {
        a_eq,
        b_eq,
        kept_rows,
        raw_rows,
        rank,
    })
}

/// Dependent rows may only be dropped when the kept rows already imply their
/// right-hand side, i.e. when `b` lies in the range of `a`.
fn ensure_consistent(a: &DMatrix<Real>, b: &DVector<Real>, rank: usize) -> SolverResult<()> {
    let x = least_squares(a, b).ok_or_else(|| SolverError::ProblemSetup {
        what: "least-squares solve of the constraint rows failed".to_string(),
    })?;
    let residual = a * x - b;
    let scale = 1.0 + b.iter().fold(0.0, |acc: Real, v| acc.max(v.abs()));
    let worst = residual
        .iter()
        .enumerate()
        .map(|(row, r)| (row, r.abs()))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
    if worst.1 > CONSISTENCY_TOL * scale {
        return Err(SolverError::InfeasibleConstraints {
            raw_rows: a.nrows(),
            rank,
            row: worst.0,
            residual: worst.1,
        });
    }
    Ok(())
}
