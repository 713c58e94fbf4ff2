//! List-based bulk constructors.
//!
//! Every bulk operation is all-or-nothing: rows are applied to a staged copy
//! of the network, which replaces the original only if every row succeeds.

use wardrop_core::{LinkId, NodeId, OdId, Real};

use crate::delay::{DelayParams, DelayType};
use crate::error::{NetworkError, NetworkResult};
use crate::network::{Network, Position};

/// One link row: `(start, end, route, ffdelay, params)` with raw 1-based node ids.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSpec {
    pub start: u32,
    pub end: u32,
    pub route: u32,
    pub ffdelay: Real,
    pub params: DelayParams,
}

impl LinkSpec {
    pub fn new(start: u32, end: u32, route: u32, ffdelay: Real, params: DelayParams) -> Self {
        Self {
            start,
            end,
            route,
            ffdelay,
            params,
        }
    }
}

/// One OD row: `(origin, destination, demand)` with raw 1-based node ids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdSpec {
    pub origin: u32,
    pub destination: u32,
    pub demand: Real,
}

impl OdSpec {
    pub fn new(origin: u32, destination: u32, demand: Real) -> Self {
        Self {
            origin,
            destination,
            demand,
        }
    }
}

impl Network {
    /// Build a network from node positions, link rows and optional OD rows.
    pub fn from_lists(
        description: Option<&str>,
        nodes: &[Option<Position>],
        links: &[LinkSpec],
        delay_type: DelayType,
        ods: Option<&[OdSpec]>,
    ) -> NetworkResult<Self> {
        let mut network = match description {
            Some(d) => Network::with_description(d),
            None => Network::new(),
        };
        network.add_nodes_from_list(nodes);
        network.add_links_from_list(links, delay_type)?;
        if let Some(ods) = ods {
            network.add_ods_from_list(ods)?;
        }
        Ok(network)
    }

    /// Append one node per position.
    pub fn add_nodes_from_list(&mut self, positions: &[Option<Position>]) -> Vec<NodeId> {
        positions.iter().map(|p| self.add_node(*p)).collect()
    }

    /// Append links, building each delay function from `delay_type`.
    pub fn add_links_from_list(
        &mut self,
        links: &[LinkSpec],
        delay_type: DelayType,
    ) -> NetworkResult<Vec<LinkId>> {
        let mut staged = self.clone();
        let mut ids = Vec::with_capacity(links.len());
        for spec in links {
            let start = raw_node(spec.start, staged.num_nodes())?;
            let end = raw_node(spec.end, staged.num_nodes())?;
            let function = delay_type.create(spec.ffdelay, &spec.params);
            ids.push(staged.insert_link(start, end, spec.route, spec.ffdelay, function)?);
        }
        *self = staged;
        Ok(ids)
    }

    /// Append OD pairs.
    pub fn add_ods_from_list(&mut self, ods: &[OdSpec]) -> NetworkResult<Vec<OdId>> {
        let mut staged = self.clone();
        let mut ids = Vec::with_capacity(ods.len());
        for spec in ods {
            let origin = raw_node(spec.origin, staged.num_nodes())?;
            let destination = raw_node(spec.destination, staged.num_nodes())?;
            ids.push(staged.add_od(origin, destination, spec.demand)?);
        }
        *self = staged;
        Ok(ids)
    }
}

fn raw_node(raw: u32, count: usize) -> NetworkResult<NodeId> {
    NodeId::new(raw).ok_or(NetworkError::UnknownNode { node: raw, count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::DelayFamily;

    fn two_parallel_links() -> Vec<LinkSpec> {
        vec![
            LinkSpec::new(1, 2, 1, 1.0, DelayParams::new(1.0, vec![])),
            LinkSpec::new(1, 2, 2, 2.0, DelayParams::new(0.5, vec![])),
        ]
    }

    #[test]
    fn from_lists_builds_everything() {
        let net = Network::from_lists(
            Some("parallel"),
            &[Some((0.0, 0.0)), Some((1.0, 0.0))],
            &two_parallel_links(),
            DelayType::Affine,
            Some(&[OdSpec::new(1, 2, 10.0)]),
        )
        .unwrap();
        assert_eq!(net.description(), Some("parallel"));
        assert_eq!(net.num_nodes(), 2);
        assert_eq!(net.num_links(), 2);
        assert_eq!(net.num_ods(), 1);
        assert_eq!(net.delay_family().unwrap(), DelayFamily::Affine);
        assert_eq!(net.links()[1].ffdelay, 2.0);
    }

    #[test]
    fn none_type_keeps_row_ffdelay() {
        let mut net = Network::new();
        net.add_nodes_from_list(&[None, None]);
        net.add_links_from_list(&two_parallel_links(), DelayType::None)
            .unwrap();
        assert_eq!(net.links()[1].ffdelay, 2.0);
        assert_eq!(net.links()[1].delay, 2.0);
    }

    #[test]
    fn bulk_links_are_all_or_nothing() {
        let mut net = Network::new();
        net.add_nodes_from_list(&[None, None]);
        let mut rows = two_parallel_links();
        rows.push(LinkSpec::new(2, 2, 1, 1.0, DelayParams::default()));
        let err = net.add_links_from_list(&rows, DelayType::Affine).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidTopology { .. }));
        assert_eq!(net.num_links(), 0);
        assert!(net.nodes()[0].out_links.is_empty());
    }

    #[test]
    fn bulk_ods_reject_node_zero() {
        let mut net = Network::new();
        net.add_nodes_from_list(&[None, None]);
        let err = net
            .add_ods_from_list(&[OdSpec::new(1, 2, 1.0), OdSpec::new(0, 2, 1.0)])
            .unwrap_err();
        assert_eq!(err, NetworkError::UnknownNode { node: 0, count: 2 });
        assert_eq!(net.num_ods(), 0);
    }
}
