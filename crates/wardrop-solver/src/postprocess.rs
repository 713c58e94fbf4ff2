//! Write-back of solved flows and path usage analysis.

use nalgebra::DVector;
use tracing::debug;
use wardrop_core::{PathId, Real};
use wardrop_network::Network;

use crate::error::SolverResult;

/// Store `flows` as link flows, recompute link delays and refresh path delays.
pub fn apply_link_flows(network: &mut Network, flows: &DVector<Real>) -> SolverResult<()> {
    network.update_linkflows_linkdelays(flows)?;
    network.update_pathdelays();
    debug!(
        links = network.num_links(),
        total_cost = network.total_cost(),
        "Applied link flows"
    );
    Ok(())
}

/// Paths whose delay exceeds the cheapest path of their OD by more than a
/// relative `tolerance`.
///
/// At equilibrium these carry no flow. ODs without paths contribute nothing.
pub fn unused_paths(network: &Network, tolerance: Real) -> Vec<PathId> {
    let mut unused = Vec::new();
    for od in network.ods() {
        let delays: Vec<(PathId, Real)> = od
            .paths
            .iter()
            .filter_map(|&id| network.path(id).map(|p| (id, p.delay)))
            .collect();
        let Some(min) = delays.iter().map(|(_, d)| *d).reduce(Real::min) else {
            continue;
        };
        let threshold = min * (1.0 + tolerance);
        unused.extend(
            delays
                .iter()
                .filter(|(_, d)| *d > threshold)
                .map(|(id, _)| *id),
        );
    }
    unused
}
