//! Wardrop equilibrium solve over link flows.

use nalgebra::{DMatrix, DVector};
use tracing::info;
use wardrop_core::Real;
use wardrop_network::{DelayFamily, Network};

use crate::constraints::{ConstraintSystem, ObservedFlows, Reconciliation, build_constraints};
use crate::error::{SolverError, SolverResult};
use crate::interior_point::{self, InteriorPointConfig, InteriorPointResult};
use crate::oracle::{BeckmannObjective, Objective, SoftPenalty};
use crate::postprocess::apply_link_flows;
use crate::qp::{QuadraticObjective, solve_qp};

/// Options for an equilibrium solve.
#[derive(Clone, Debug)]
pub struct SolveOptions {
    pub objective: Objective,
    /// Write the solution back into the network.
    pub update: bool,
    pub observed: Option<ObservedFlows>,
    /// Precomputed constraint system; rebuilt from the network when absent.
    pub constraints: Option<ConstraintSystem>,
    /// Starting link flows.
    pub initial_flows: Option<DVector<Real>>,
    pub config: InteriorPointConfig,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            objective: Objective::UserEquilibrium,
            update: true,
            observed: None,
            constraints: None,
            initial_flows: None,
            config: InteriorPointConfig::default(),
        }
    }
}

impl SolveOptions {
    pub fn user_equilibrium() -> Self {
        Self::default()
    }

    pub fn system_optimum() -> Self {
        Self {
            objective: Objective::SystemOptimum,
            ..Self::default()
        }
    }

    pub fn with_observed(mut self, observed: ObservedFlows) -> Self {
        self.observed = Some(observed);
        self
    }

    pub fn with_initial_flows(mut self, flows: DVector<Real>) -> Self {
        self.initial_flows = Some(flows);
        self
    }

    pub fn without_update(mut self) -> Self {
        self.update = false;
        self
    }
}

/// Solved link flows and solver diagnostics.
#[derive(Clone, Debug)]
pub struct EquilibriumSolution {
    pub link_flows: DVector<Real>,
    pub family: DelayFamily,
    pub objective: Objective,
    pub objective_value: Real,
    pub equality_rows: usize,
    pub iterations: usize,
    pub primal_residual: Real,
    pub dual_residual: Real,
}

/// Solve for equilibrium link flows and, if `options.update`, write them back.
pub fn solve(network: &mut Network, options: &SolveOptions) -> SolverResult<EquilibriumSolution> {
    let solution = solve_link_flows(network, options)?;
    if options.update {
        apply_link_flows(network, &solution.link_flows)?;
    }
    Ok(solution)
}

/// Solve for equilibrium link flows without touching the network.
pub fn solve_link_flows(
    network: &Network,
    options: &SolveOptions,
) -> SolverResult<EquilibriumSolution> {
    let family = network
        .delay_family()
        .map_err(|e| SolverError::UnsupportedDelayFamily {
            what: e.to_string(),
        })?;

    let constraints = match &options.constraints {
        Some(system) => system.clone(),
        None => build_constraints(network, options.observed.as_ref())?,
    };
    if constraints.num_cols() != network.num_links() {
        return Err(SolverError::ProblemSetup {
            what: format!(
                "constraint system has {} columns for {} links",
                constraints.num_cols(),
                network.num_links()
            ),
        });
    }
    let penalty = soft_penalty(network, options.observed.as_ref())?;

    info!(
        %family,
        objective = %options.objective,
        links = network.num_links(),
        equality_rows = constraints.num_rows(),
        "Solving equilibrium"
    );

    let x0 = options.initial_flows.as_ref();
    let result = match family {
        DelayFamily::Affine => {
            let scale = match options.objective {
                Objective::UserEquilibrium => 1.0,
                Objective::SystemOptimum => 2.0,
            };
            let mut qp = QuadraticObjective::new(scale * network.slopes()?, network.ffdelays())?;
            if let Some(SoftPenalty {
                positions,
                targets,
                weight,
            }) = &penalty
            {
                qp.add_penalty(positions, targets, *weight);
            }
            solve_qp(&qp, &constraints.a_eq, &constraints.b_eq, x0, &options.config)?
        }
        DelayFamily::Polynomial => {
            let oracle = BeckmannObjective::new(
                network.ffdelays(),
                &flow_coefs(network),
                options.objective,
                penalty,
            );
            interior_point::solve(&oracle, &constraints.a_eq, &constraints.b_eq, x0, &options.config)?
        }
        DelayFamily::None | DelayFamily::Other => {
            return Err(SolverError::UnsupportedDelayFamily {
                what: format!("links with {family} delay functions have no flow model"),
            });
        }
    };

    finish(result, family, options.objective, &constraints)
}

fn soft_penalty(
    network: &Network,
    observed: Option<&ObservedFlows>,
) -> SolverResult<Option<SoftPenalty>> {
    let Some(observed) = observed else {
        return Ok(None);
    };
    let Reconciliation::Soft { weight } = observed.reconciliation else {
        return Ok(None);
    };
    Ok(Some(SoftPenalty {
        positions: observed.positions(network)?,
        targets: observed.flows.clone(),
        weight,
    }))
}

/// Per-link `a[k]` with the slope folded in, zero-padded to the highest degree.
fn flow_coefs(network: &Network) -> DMatrix<Real> {
    let rows: Vec<Vec<Real>> = network
        .links()
        .iter()
        .map(|l| l.delay_function.flow_coefs().unwrap_or_default())
        .collect();
    let degree = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut coefs = DMatrix::zeros(rows.len(), degree);
    for (i, row) in rows.iter().enumerate() {
        for (k, value) in row.iter().enumerate() {
            coefs[(i, k)] = *value;
        }
    }
    coefs
}

fn finish(
    result: InteriorPointResult,
    family: DelayFamily,
    objective: Objective,
    constraints: &ConstraintSystem,
) -> SolverResult<EquilibriumSolution> {
    if !result.converged() {
        return Err(SolverError::ConvergenceFailed {
            family,
            equality_rows: constraints.num_rows(),
            iterations: result.iterations,
            status: format!(
                "{} (primal residual {:.3e}, dual residual {:.3e}, gap {:.3e})",
                result.status, result.primal_residual, result.dual_residual, result.gap
            ),
        });
    }

    info!(
        iterations = result.iterations,
        objective_value = result.objective,
        "Equilibrium solved"
    );

    Ok(EquilibriumSolution {
        link_flows: result.x,
        family,
        objective,
        objective_value: result.objective,
        equality_rows: constraints.num_rows(),
        iterations: result.iterations,
        primal_residual: result.primal_residual,
        dual_residual: result.dual_residual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardrop_core::LinkId;
    use wardrop_network::DelayFunction;

    fn two_links(f1: DelayFunction, f2: DelayFunction) -> (Network, LinkId, LinkId) {
        let mut net = Network::new();
        let a = net.add_node(None);
        let b = net.add_node(None);
        let l1 = net.add_link(a, b, 1, f1).unwrap();
        let l2 = net.add_link(a, b, 2, f2).unwrap();
        net.add_od(a, b, 10.0).unwrap();
        net.add_path(&[l1]).unwrap();
        net.add_path(&[l2]).unwrap();
        (net, l1, l2)
    }

    fn affine_pair() -> (Network, LinkId, LinkId) {
        two_links(DelayFunction::affine(1.0, 1.0), DelayFunction::affine(2.0, 0.5))
    }

    #[test]
    fn affine_user_equilibrium_equalizes_delays() {
        let (mut net, _, _) = affine_pair();
        let solution = solve(&mut net, &SolveOptions::default()).unwrap();

        assert_eq!(solution.family, DelayFamily::Affine);
        assert_eq!(solution.equality_rows, 1);
        assert!((net.links()[0].flow - 4.0).abs() < 1e-5);
        assert!((net.links()[1].flow - 6.0).abs() < 1e-5);
        assert!((net.paths()[0].delay - 5.0).abs() < 1e-5);
        assert!((net.paths()[1].delay - 5.0).abs() < 1e-5);
    }

    #[test]
    fn affine_system_optimum_equalizes_marginal_costs() {
        let (net, _, _) = affine_pair();
        let solution = solve_link_flows(&net, &SolveOptions::system_optimum()).unwrap();
        // 1 + 2 x1 = 2 + x2, x1 + x2 = 10
        assert!((solution.link_flows[0] - 11.0 / 3.0).abs() < 1e-5);
        assert!((solution.link_flows[1] - 19.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn no_update_leaves_network_untouched() {
        let (mut net, _, _) = affine_pair();
        let options = SolveOptions::default().without_update();
        let solution = solve(&mut net, &options).unwrap();
        assert!((solution.link_flows[0] - 4.0).abs() < 1e-5);
        assert_eq!(net.links()[0].flow, 0.0);
    }

    #[test]
    fn polynomial_user_equilibrium() {
        // delays 1 + x^2 and 2 + x
        let (net, _, _) = two_links(
            DelayFunction::polynomial(1.0, 1.0, vec![0.0, 1.0]),
            DelayFunction::polynomial(2.0, 1.0, vec![1.0]),
        );
        let solution = solve_link_flows(&net, &SolveOptions::default()).unwrap();
        let (x1, x2) = (solution.link_flows[0], solution.link_flows[1]);
        assert!((x1 + x2 - 10.0).abs() < 1e-6);
        assert!((1.0 + x1 * x1 - (2.0 + x2)).abs() < 1e-5);
    }

    #[test]
    fn mixed_families_are_unsupported() {
        let (net, _, _) = two_links(
            DelayFunction::affine(1.0, 1.0),
            DelayFunction::polynomial(2.0, 1.0, vec![1.0]),
        );
        assert!(matches!(
            solve_link_flows(&net, &SolveOptions::default()),
            Err(SolverError::UnsupportedDelayFamily { .. })
        ));
    }

    #[test]
    fn links_without_flow_model_are_unsupported() {
        let (net, _, _) = two_links(DelayFunction::None, DelayFunction::None);
        assert!(matches!(
            solve_link_flows(&net, &SolveOptions::default()),
            Err(SolverError::UnsupportedDelayFamily { .. })
        ));
    }

    #[test]
    fn mismatched_constraint_system_is_rejected() {
        let (net, _, _) = affine_pair();
        let options = SolveOptions {
            constraints: Some(ConstraintSystem {
                a_eq: DMatrix::zeros(1, 3),
                b_eq: DVector::zeros(1),
                kept_rows: vec![0],
                raw_rows: 1,
                rank: 1,
            }),
            ..SolveOptions::default()
        };
        assert!(matches!(
            solve_link_flows(&net, &options),
            Err(SolverError::ProblemSetup { .. })
        ));
    }

    #[test]
    fn padded_flow_coefficients() {
        let (net, _, _) = two_links(
            DelayFunction::polynomial(1.0, 2.0, vec![0.0, 1.0]),
            DelayFunction::polynomial(2.0, 1.0, vec![3.0]),
        );
        let coefs = flow_coefs(&net);
        assert_eq!(coefs.shape(), (2, 2));
        assert_eq!(coefs[(0, 1)], 4.0);
        assert_eq!(coefs[(1, 0)], 3.0);
        assert_eq!(coefs[(1, 1)], 0.0);
    }
}
