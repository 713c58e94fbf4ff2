//! Definition validation logic.

use std::collections::HashSet;

use crate::schema::{DelayTypeDef, LATEST_VERSION, NetworkDef, ReconciliationDef, SolverDef};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_definition(def: &NetworkDef) -> Result<(), ValidationError> {
    if def.version == 0 || def.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: def.version,
        });
    }

    for (i, node) in def.nodes.iter().enumerate() {
        let expected = i as u32 + 1;
        if node.id != expected {
            return Err(ValidationError::InvalidValue {
                field: format!("nodes[{i}].id"),
                value: node.id.to_string(),
                reason: format!("node ids must be consecutive from 1, expected {expected}"),
            });
        }
    }
    let num_nodes = def.nodes.len() as u32;
    let node_exists = |id: u32| (1..=num_nodes).contains(&id);

    let mut link_keys = HashSet::new();
    for (i, link) in def.links.iter().enumerate() {
        let context = format!("links[{i}]");
        check_endpoints(link.start, link.end, &context, &node_exists)?;
        if !link_keys.insert((link.start, link.end, link.route)) {
            return Err(ValidationError::DuplicateId {
                id: format!("({},{},{})", link.start, link.end, link.route),
                context: "links".to_string(),
            });
        }
        non_negative(&format!("{context}.ffdelay"), link.ffdelay)?;
        if matches!(def.delay_type, DelayTypeDef::Affine | DelayTypeDef::Polynomial) {
            non_negative(&format!("{context}.slope"), link.slope)?;
        }
        if def.delay_type == DelayTypeDef::Polynomial {
            for (k, coef) in link.coefs.iter().enumerate() {
                non_negative(&format!("{context}.coefs[{k}]"), *coef)?;
            }
        }
    }

    let mut od_keys = HashSet::new();
    for (i, od) in def.ods.iter().enumerate() {
        let context = format!("ods[{i}]");
        check_endpoints(od.origin, od.destination, &context, &node_exists)?;
        if !od_keys.insert((od.origin, od.destination)) {
            return Err(ValidationError::DuplicateId {
                id: format!("({},{})", od.origin, od.destination),
                context: "ods".to_string(),
            });
        }
        non_negative(&format!("{context}.demand"), od.demand)?;
    }

    for (i, path) in def.paths.iter().enumerate() {
        let context = format!("paths[{i}]");
        if path.nodes.len() < 2 {
            return Err(ValidationError::InvalidValue {
                field: format!("{context}.nodes"),
                value: format!("{:?}", path.nodes),
                reason: "a path needs at least two nodes".to_string(),
            });
        }
        let (first, last) = (path.nodes[0], path.nodes[path.nodes.len() - 1]);
        for hop in path.nodes.windows(2) {
            if !link_keys.iter().any(|&(s, e, _)| s == hop[0] && e == hop[1]) {
                return Err(ValidationError::MissingReference {
                    id: format!("link {} -> {}", hop[0], hop[1]),
                    context,
                });
            }
        }
        if !od_keys.contains(&(first, last)) {
            return Err(ValidationError::MissingReference {
                id: format!("od ({first},{last})"),
                context,
            });
        }
    }

    if let Some(solver) = &def.solver {
        validate_solver(solver, &link_keys)?;
    }

    Ok(())
}

fn validate_solver(
    solver: &SolverDef,
    link_keys: &HashSet<(u32, u32, u32)>,
) -> Result<(), ValidationError> {
    if solver.max_iterations == Some(0) {
        return Err(ValidationError::InvalidValue {
            field: "solver.max_iterations".to_string(),
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    for (field, tol) in [
        ("solver.feasibility_tol", solver.feasibility_tol),
        ("solver.gap_tol", solver.gap_tol),
    ] {
        if let Some(tol) = tol {
            positive(field, tol)?;
        }
    }

    let Some(observed) = &solver.observed else {
        return Ok(());
    };
    if let ReconciliationDef::Soft { weight } = observed.reconciliation {
        positive("solver.observed.reconciliation.weight", weight)?;
    }
    for (i, obs) in observed.flows.iter().enumerate() {
        if !link_keys.contains(&(obs.start, obs.end, obs.route)) {
            return Err(ValidationError::MissingReference {
                id: format!("({},{},{})", obs.start, obs.end, obs.route),
                context: format!("solver.observed.flows[{i}]"),
            });
        }
        non_negative(&format!("solver.observed.flows[{i}].flow"), obs.flow)?;
    }
    Ok(())
}

fn check_endpoints(
    start: u32,
    end: u32,
    context: &str,
    node_exists: &impl Fn(u32) -> bool,
) -> Result<(), ValidationError> {
    for id in [start, end] {
        if !node_exists(id) {
            return Err(ValidationError::MissingReference {
                id: format!("node {id}"),
                context: context.to_string(),
            });
        }
    }
    if start == end {
        return Err(ValidationError::InvalidValue {
            field: context.to_string(),
            value: format!("{start} -> {end}"),
            reason: "endpoints must differ".to_string(),
        });
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "must be finite and non-negative".to_string(),
        });
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "must be finite and positive".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::*;

    fn base() -> NetworkDef {
        NetworkDef {
            version: LATEST_VERSION,
            description: None,
            delay_type: DelayTypeDef::Affine,
            nodes: vec![
                NodeDef { id: 1, position: None },
                NodeDef { id: 2, position: None },
            ],
            links: vec![LinkDef {
                start: 1,
                end: 2,
                route: 1,
                ffdelay: 1.0,
                slope: 1.0,
                coefs: vec![],
            }],
            ods: vec![OdDef {
                origin: 1,
                destination: 2,
                demand: 3.0,
            }],
            paths: vec![PathDef { nodes: vec![1, 2] }],
            solver: None,
        }
    }

    #[test]
    fn valid_definition_passes() {
        validate_definition(&base()).unwrap();
    }

    #[test]
    fn rejects_future_version() {
        let mut def = base();
        def.version = LATEST_VERSION + 1;
        assert!(matches!(
            validate_definition(&def),
            Err(ValidationError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn rejects_sparse_node_ids() {
        let mut def = base();
        def.nodes[1].id = 3;
        assert!(matches!(
            validate_definition(&def),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_self_loop_and_duplicates() {
        let mut def = base();
        def.links[0].end = 1;
        assert!(validate_definition(&def).is_err());

        let mut def = base();
        def.links.push(def.links[0].clone());
        assert!(matches!(
            validate_definition(&def),
            Err(ValidationError::DuplicateId { .. })
        ));
    }

    #[test]
    fn rejects_negative_demand() {
        let mut def = base();
        def.ods[0].demand = -1.0;
        assert!(matches!(
            validate_definition(&def),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_path_without_od_or_link() {
        let mut def = base();
        def.paths = vec![PathDef { nodes: vec![2, 1] }];
        assert!(matches!(
            validate_definition(&def),
            Err(ValidationError::MissingReference { .. })
        ));

        def.paths = vec![PathDef { nodes: vec![1] }];
        assert!(matches!(
            validate_definition(&def),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_bad_solver_settings() {
        let mut def = base();
        def.solver = Some(SolverDef {
            gap_tol: Some(0.0),
            ..SolverDef::default()
        });
        assert!(validate_definition(&def).is_err());

        def.solver = Some(SolverDef {
            observed: Some(ObservedDef {
                reconciliation: ReconciliationDef::Soft { weight: 1.0 },
                flows: vec![ObservedLinkDef {
                    start: 1,
                    end: 2,
                    route: 2,
                    flow: 1.0,
                }],
            }),
            ..SolverDef::default()
        });
        assert!(matches!(
            validate_definition(&def),
            Err(ValidationError::MissingReference { .. })
        ));
    }
}
