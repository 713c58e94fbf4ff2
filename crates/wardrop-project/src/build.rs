//! Turning a definition into a network and solver options.

use tracing::info;
use wardrop_core::{LinkId, NodeId};
use wardrop_network::{DelayParams, DelayType, LinkSpec, Network, NetworkError, OdSpec};
use wardrop_solver::{InteriorPointConfig, Objective, ObservedFlows, SolveOptions};

use crate::schema::{DelayTypeDef, NetworkDef, ObjectiveDef, ReconciliationDef};
use crate::validate::validate_definition;
use crate::ProjectResult;

impl From<DelayTypeDef> for DelayType {
    fn from(value: DelayTypeDef) -> Self {
        match value {
            DelayTypeDef::None => DelayType::None,
            DelayTypeDef::Affine => DelayType::Affine,
            DelayTypeDef::Polynomial => DelayType::Polynomial,
            DelayTypeDef::Other => DelayType::Other,
        }
    }
}

impl From<ObjectiveDef> for Objective {
    fn from(value: ObjectiveDef) -> Self {
        match value {
            ObjectiveDef::UserEquilibrium => Objective::UserEquilibrium,
            ObjectiveDef::SystemOptimum => Objective::SystemOptimum,
        }
    }
}

/// Validate `def` and build the network it describes, paths included.
pub fn build_network(def: &NetworkDef) -> ProjectResult<Network> {
    validate_definition(def)?;

    let positions: Vec<_> = def
        .nodes
        .iter()
        .map(|n| n.position.map(|[x, y]| (x, y)))
        .collect();
    let links: Vec<LinkSpec> = def
        .links
        .iter()
        .map(|l| {
            LinkSpec::new(
                l.start,
                l.end,
                l.route,
                l.ffdelay,
                DelayParams::new(l.slope, l.coefs.clone()),
            )
        })
        .collect();
    let ods: Vec<OdSpec> = def
        .ods
        .iter()
        .map(|o| OdSpec::new(o.origin, o.destination, o.demand))
        .collect();

    let mut network = Network::from_lists(
        def.description.as_deref(),
        &positions,
        &links,
        def.delay_type.into(),
        Some(ods.as_slice()),
    )?;

    for path in &def.paths {
        let nodes = path
            .nodes
            .iter()
            .map(|&raw| node_id(raw, network.num_nodes()))
            .collect::<Result<Vec<_>, _>>()?;
        network.add_path_from_nodes(&nodes)?;
    }

    info!(
        nodes = network.num_nodes(),
        links = network.num_links(),
        ods = network.num_ods(),
        paths = network.num_paths(),
        "Built network from definition"
    );
    Ok(network)
}

/// Solver options from the definition's solver section, defaults otherwise.
pub fn solve_options(def: &NetworkDef) -> ProjectResult<SolveOptions> {
    validate_definition(def)?;
    let Some(solver) = &def.solver else {
        return Ok(SolveOptions::default());
    };

    let mut config = InteriorPointConfig::default();
    if let Some(max_iterations) = solver.max_iterations {
        config.max_iterations = max_iterations;
    }
    if let Some(tol) = solver.feasibility_tol {
        config.feasibility_tol = tol;
    }
    if let Some(tol) = solver.gap_tol {
        config.gap_tol = tol;
    }

    let observed = match &solver.observed {
        Some(obs) => {
            let mut links = Vec::with_capacity(obs.flows.len());
            for o in &obs.flows {
                let start = node_id(o.start, def.nodes.len())?;
                let end = node_id(o.end, def.nodes.len())?;
                links.push(LinkId::new(start, end, o.route));
            }
            let flows = obs.flows.iter().map(|o| o.flow).collect();
            Some(match obs.reconciliation {
                ReconciliationDef::Hard => ObservedFlows::hard(links, flows),
                ReconciliationDef::Soft { weight } => ObservedFlows::soft(links, flows, weight),
            })
        }
        None => None,
    };

    Ok(SolveOptions {
        objective: solver.objective.into(),
        observed,
        config,
        ..SolveOptions::default()
    })
}

fn node_id(raw: u32, count: usize) -> Result<NodeId, NetworkError> {
    NodeId::new(raw).ok_or(NetworkError::UnknownNode { node: raw, count })
}
