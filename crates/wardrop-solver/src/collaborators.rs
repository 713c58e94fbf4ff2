//! Seams to path enumeration and link-path formulation solvers.
//!
//! Neither is implemented here; the equilibrium solver works on link flows
//! only. These traits describe what the surrounding tooling provides.

use std::collections::BTreeMap;

use nalgebra::DVector;
use tracing::debug;
use wardrop_core::{NodeId, PathId, Real};
use wardrop_network::{Network, NetworkError};

use crate::error::SolverResult;

/// Enumerates candidate routes under the network's current link delays.
pub trait PathEnumerator {
    /// Up to `k` node sequences from each source to `sink`, cheapest first.
    fn k_shortest_paths(
        &self,
        network: &Network,
        sources: &[NodeId],
        sink: NodeId,
        k: usize,
    ) -> SolverResult<BTreeMap<NodeId, Vec<Vec<NodeId>>>>;
}

/// Solves for path flows on a fixed candidate path set.
pub trait LinkPathSolver {
    /// One flow per entry of `paths`, consistent with OD demand.
    fn solve_path_flows(&self, network: &Network, paths: &[PathId]) -> SolverResult<DVector<Real>>;
}

/// Register the enumerated candidates from `sources` to `sink` as paths.
///
/// Routes that are already registered for their OD are skipped. Returns the
/// ids of the newly added paths.
pub fn refine_paths(
    network: &mut Network,
    enumerator: &dyn PathEnumerator,
    sources: &[NodeId],
    sink: NodeId,
    k: usize,
) -> SolverResult<Vec<PathId>> {
    let candidates = enumerator.k_shortest_paths(network, sources, sink, k)?;
    let mut added = Vec::new();
    for (source, routes) in candidates {
        for nodes in routes {
            match network.add_path_from_nodes(&nodes) {
                Ok(id) => added.push(id),
                Err(NetworkError::DuplicateEntity { .. }) => {
                    debug!(%source, %sink, "Skipping known route");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(added)
}

/// Store flows from `solver` on every registered path.
pub fn apply_path_flows(network: &mut Network, solver: &dyn LinkPathSolver) -> SolverResult<()> {
    let paths = network.path_index().keys().to_vec();
    let flows = solver.solve_path_flows(network, &paths)?;
    network.update_pathflows(&flows)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardrop_network::DelayFunction;

    /// Returns a fixed route list for every source.
    struct FixedRoutes(Vec<Vec<u32>>);

    impl PathEnumerator for FixedRoutes {
        fn k_shortest_paths(
            &self,
            _network: &Network,
            sources: &[NodeId],
            _sink: NodeId,
            k: usize,
        ) -> SolverResult<BTreeMap<NodeId, Vec<Vec<NodeId>>>> {
            let routes: Vec<Vec<NodeId>> = self
                .0
                .iter()
                .take(k)
                .map(|r| r.iter().filter_map(|&n| NodeId::new(n)).collect())
                .collect();
            Ok(sources.iter().map(|&s| (s, routes.clone())).collect())
        }
    }

    /// Splits each OD's demand evenly over its paths.
    struct EvenSplit;

    impl LinkPathSolver for EvenSplit {
        fn solve_path_flows(
            &self,
            network: &Network,
            paths: &[PathId],
        ) -> SolverResult<DVector<Real>> {
            Ok(DVector::from_iterator(
                paths.len(),
                paths.iter().map(|p| {
                    let od = network.od(p.od()).map(|od| od.demand / od.paths.len() as Real);
                    od.unwrap_or(0.0)
                }),
            ))
        }
    }

    fn diamond() -> Network {
        let mut net = Network::new();
        let nodes: Vec<NodeId> = (0..4).map(|_| net.add_node(None)).collect();
        for (s, e) in [(0, 1), (0, 2), (1, 3), (2, 3)] {
            net.add_link(nodes[s], nodes[e], 1, DelayFunction::affine(1.0, 1.0))
                .unwrap();
        }
        net.add_od(nodes[0], nodes[3], 4.0).unwrap();
        net
    }

    #[test]
    fn refine_adds_new_routes_only() {
        let mut net = diamond();
        let source = NodeId::new(1).unwrap();
        let sink = NodeId::new(4).unwrap();
        let enumerator = FixedRoutes(vec![vec![1, 2, 4], vec![1, 3, 4]]);

        let added = refine_paths(&mut net, &enumerator, &[source], sink, 2).unwrap();
        assert_eq!(added.len(), 2);

        let again = refine_paths(&mut net, &enumerator, &[source], sink, 2).unwrap();
        assert!(again.is_empty());
        assert_eq!(net.num_paths(), 2);
    }

    #[test]
    fn refine_propagates_invalid_routes() {
        let mut net = diamond();
        let enumerator = FixedRoutes(vec![vec![1, 4]]);
        let result = refine_paths(
            &mut net,
            &enumerator,
            &[NodeId::new(1).unwrap()],
            NodeId::new(4).unwrap(),
            1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn path_flows_are_stored() {
        let mut net = diamond();
        let enumerator = FixedRoutes(vec![vec![1, 2, 4], vec![1, 3, 4]]);
        refine_paths(
            &mut net,
            &enumerator,
            &[NodeId::new(1).unwrap()],
            NodeId::new(4).unwrap(),
            2,
        )
        .unwrap();

        apply_path_flows(&mut net, &EvenSplit).unwrap();
        assert_eq!(net.path_flows(), DVector::from_vec(vec![2.0, 2.0]));
    }
}
