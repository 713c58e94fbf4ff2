//! Core network data structures and the mutation API.

use std::collections::BTreeSet;

use nalgebra::{DMatrix, DVector};
use tracing::debug;
use wardrop_core::{LinkId, NodeId, OdId, PathId, Real, ensure_non_negative};

use crate::delay::{DelayFamily, DelayFunction};
use crate::error::{NetworkError, NetworkResult};
use crate::indexing::IndexTable;
use crate::validate;

/// Opaque coordinate pair attached to a node.
pub type Position = (Real, Real);

/// A node of the network.
///
/// Adjacency and OD memberships are stored as keys; the entities themselves
/// live in the owning [`Network`].
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub position: Option<Position>,
    pub in_links: BTreeSet<LinkId>,
    pub out_links: BTreeSet<LinkId>,
    /// OD pairs with origin at this node
    pub start_ods: BTreeSet<OdId>,
    /// OD pairs with destination at this node
    pub end_ods: BTreeSet<OdId>,
}

impl Node {
    fn new(id: NodeId, position: Option<Position>) -> Self {
        Self {
            id,
            position,
            in_links: BTreeSet::new(),
            out_links: BTreeSet::new(),
            start_ods: BTreeSet::new(),
            end_ods: BTreeSet::new(),
        }
    }
}

/// A directed link with its current flow and delay.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub flow: Real,
    pub delay: Real,
    pub ffdelay: Real,
    pub delay_function: DelayFunction,
    /// Paths traversing this link
    pub paths: BTreeSet<PathId>,
    /// Number of traversals by registered paths (a cyclic path counts every pass)
    pub path_count: usize,
}

impl Link {
    fn new(id: LinkId, ffdelay: Real, delay_function: DelayFunction) -> Self {
        let mut link = Self {
            id,
            flow: 0.0,
            delay: ffdelay,
            ffdelay,
            delay_function,
            paths: BTreeSet::new(),
            path_count: 0,
        };
        link.set_flow(0.0);
        link
    }

    /// Set the flow and recompute the delay; links without a flow model keep their free-flow delay.
    pub(crate) fn set_flow(&mut self, flow: Real) {
        self.flow = flow;
        self.delay = self
            .delay_function
            .compute_delay(flow)
            .unwrap_or(self.ffdelay);
    }
}

/// An origin-destination pair with its demand and candidate paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Od {
    pub id: OdId,
    pub demand: Real,
    pub paths: Vec<PathId>,
    /// Number of registered paths; also the last route number handed out
    pub path_count: u32,
}

/// A path: contiguous link chain from an OD origin to its destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub id: PathId,
    pub links: Vec<LinkId>,
    pub flow: Real,
    pub delay: Real,
    pub ffdelay: Real,
}

/// The network: sole owner of nodes, links, OD pairs, paths and their index tables.
///
/// Entities are append-only. Links, OD pairs and paths are stored in the order
/// of their index-table positions, which is also their row/column order in
/// every vector and matrix this type produces.
#[derive(Debug, Clone, Default)]
pub struct Network {
    description: Option<String>,
    nodes: Vec<Node>,
    links: Vec<Link>,
    link_index: IndexTable<LinkId>,
    ods: Vec<Od>,
    od_index: IndexTable<OdId>,
    paths: Vec<Path>,
    path_index: IndexTable<PathId>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    pub fn num_ods(&self) -> usize {
        self.ods.len()
    }

    pub fn num_paths(&self) -> usize {
        self.paths.len()
    }

    /// Nodes in id order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Links in index order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// OD pairs in index order.
    pub fn ods(&self) -> &[Od] {
        &self.ods
    }

    /// Paths in index order.
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.link_index.position(&id).map(|i| &self.links[i])
    }

    pub fn od(&self, id: OdId) -> Option<&Od> {
        self.od_index.position(&id).map(|i| &self.ods[i])
    }

    pub fn path(&self, id: PathId) -> Option<&Path> {
        self.path_index.position(&id).map(|i| &self.paths[i])
    }

    pub fn link_index(&self) -> &IndexTable<LinkId> {
        &self.link_index
    }

    pub fn od_index(&self) -> &IndexTable<OdId> {
        &self.od_index
    }

    pub fn path_index(&self) -> &IndexTable<PathId> {
        &self.path_index
    }

    /// Append a node at the next dense id.
    pub fn add_node(&mut self, position: Option<Position>) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node::new(id, position));
        id
    }

    /// Add a link; its free-flow delay is taken from the delay function (0 for `None`).
    pub fn add_link(
        &mut self,
        start: NodeId,
        end: NodeId,
        route: u32,
        delay_function: DelayFunction,
    ) -> NetworkResult<LinkId> {
        let ffdelay = delay_function.ffdelay().unwrap_or(0.0);
        self.insert_link(start, end, route, ffdelay, delay_function)
    }

    /// Add a link whose free-flow delay is given explicitly.
    ///
    /// Used by the list constructors, where a `None` delay function still
    /// carries a free-flow delay.
    pub(crate) fn insert_link(
        &mut self,
        start: NodeId,
        end: NodeId,
        route: u32,
        ffdelay: Real,
        delay_function: DelayFunction,
    ) -> NetworkResult<LinkId> {
        validate::endpoints(start, end, self.nodes.len())?;
        let id = LinkId::new(start, end, route);
        if self.link_index.contains(&id) {
            return Err(NetworkError::DuplicateEntity {
                what: "Link",
                key: id.to_string(),
            });
        }
        validate::delay_function(id, ffdelay, &delay_function)?;

        let link = Link::new(id, ffdelay, delay_function);
        self.link_index.insert(id);
        self.links.push(link);
        self.nodes[start.index()].out_links.insert(id);
        self.nodes[end.index()].in_links.insert(id);
        debug!(link = %id, "added link");
        Ok(id)
    }

    /// Add an OD pair with its demand.
    pub fn add_od(
        &mut self,
        origin: NodeId,
        destination: NodeId,
        demand: Real,
    ) -> NetworkResult<OdId> {
        validate::endpoints(origin, destination, self.nodes.len())?;
        let id = OdId::new(origin, destination);
        if self.od_index.contains(&id) {
            return Err(NetworkError::DuplicateEntity {
                what: "OD",
                key: id.to_string(),
            });
        }
        let demand = ensure_non_negative(demand, "OD demand")?;

        self.od_index.insert(id);
        self.ods.push(Od {
            id,
            demand,
            paths: Vec::new(),
            path_count: 0,
        });
        self.nodes[origin.index()].start_ods.insert(id);
        self.nodes[destination.index()].end_ods.insert(id);
        debug!(od = %id, demand, "added OD pair");
        Ok(id)
    }

    /// Add a path given as a sequence of link ids.
    ///
    /// The OD pair is derived from the first and last link. On success the
    /// path gets the next route number of its OD and every traversed link
    /// records it.
    pub fn add_path(&mut self, link_ids: &[LinkId]) -> NetworkResult<PathId> {
        let (Some(first), Some(last)) = (link_ids.first(), link_ids.last()) else {
            return Err(NetworkError::EmptyPath);
        };
        for id in link_ids {
            if !self.link_index.contains(id) {
                return Err(NetworkError::UnknownLink { link: *id });
            }
        }
        let od_id = OdId::new(first.start, last.end);
        let od_pos = self
            .od_index
            .position(&od_id)
            .ok_or(NetworkError::UnknownOd { od: od_id })?;
        validate::contiguous(link_ids)?;

        let od = &self.ods[od_pos];
        if od
            .paths
            .iter()
            .any(|p| self.path(*p).is_some_and(|path| path.links == link_ids))
        {
            return Err(NetworkError::DuplicateEntity {
                what: "Path",
                key: format!("{od_id} via {} links", link_ids.len()),
            });
        }

        let mut delay = 0.0;
        let mut ffdelay = 0.0;
        for id in link_ids {
            let link = &self.links[self.link_position(id)];
            delay += link.delay;
            ffdelay += link.ffdelay;
        }

        let od = &mut self.ods[od_pos];
        od.path_count += 1;
        let id = PathId::new(od_id, od.path_count);
        od.paths.push(id);

        self.path_index.insert(id);
        self.paths.push(Path {
            id,
            links: link_ids.to_vec(),
            flow: 0.0,
            delay,
            ffdelay,
        });
        for link_id in link_ids {
            let pos = self.link_position(link_id);
            let link = &mut self.links[pos];
            link.path_count += 1;
            link.paths.insert(id);
        }
        debug!(path = %id, links = link_ids.len(), "added path");
        Ok(id)
    }

    /// Add a path given as a node sequence, taking the lowest-route link between consecutive nodes.
    pub fn add_path_from_nodes(&mut self, node_ids: &[NodeId]) -> NetworkResult<PathId> {
        if node_ids.len() < 2 {
            return Err(NetworkError::EmptyPath);
        }
        let mut link_ids = Vec::with_capacity(node_ids.len() - 1);
        for pair in node_ids.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let node = self.node(start).ok_or(NetworkError::UnknownNode {
                node: start.get(),
                count: self.nodes.len(),
            })?;
            let link = node
                .out_links
                .iter()
                .find(|l| l.end == end)
                .ok_or(NetworkError::NoLinkBetween { start, end })?;
            link_ids.push(*link);
        }
        self.add_path(&link_ids)
    }

    fn link_position(&self, id: &LinkId) -> usize {
        // Callers only pass ids that were checked against the index table.
        self.link_index.position(id).unwrap_or_default()
    }

    /// Uniform delay family shared by every link.
    pub fn delay_family(&self) -> NetworkResult<DelayFamily> {
        let mut families = self.links.iter().map(|l| l.delay_function.family());
        let Some(first) = families.next() else {
            return Err(NetworkError::IncompatibleDelayFamily {
                what: "network has no links".to_string(),
            });
        };
        if let Some(other) = families.find(|f| *f != first) {
            return Err(NetworkError::IncompatibleDelayFamily {
                what: format!("links mix {first} and {other} delay functions"),
            });
        }
        Ok(first)
    }

    /// Link flows in index order.
    pub fn link_flows(&self) -> DVector<Real> {
        DVector::from_iterator(self.links.len(), self.links.iter().map(|l| l.flow))
    }

    /// Current link delays in index order.
    pub fn link_delays(&self) -> DVector<Real> {
        DVector::from_iterator(self.links.len(), self.links.iter().map(|l| l.delay))
    }

    /// Free-flow delays in index order.
    pub fn ffdelays(&self) -> DVector<Real> {
        DVector::from_iterator(self.links.len(), self.links.iter().map(|l| l.ffdelay))
    }

    /// Slopes in index order; every link needs an affine or polynomial delay function.
    pub fn slopes(&self) -> NetworkResult<DVector<Real>> {
        let mut slopes = DVector::zeros(self.links.len());
        for (i, link) in self.links.iter().enumerate() {
            slopes[i] = link.delay_function.slope().ok_or_else(|| {
                NetworkError::IncompatibleDelayFamily {
                    what: format!(
                        "link {} has a {} delay function without slope",
                        link.id,
                        link.delay_function.family()
                    ),
                }
            })?;
        }
        Ok(slopes)
    }

    /// Polynomial coefficients, one row per link.
    ///
    /// Requires every link to be polynomial. Rows of lower degree are padded
    /// with zeros up to the highest degree present.
    pub fn coefs(&self) -> NetworkResult<DMatrix<Real>> {
        if self.delay_family()? != DelayFamily::Polynomial {
            return Err(NetworkError::IncompatibleDelayFamily {
                what: "delay functions must be polynomial".to_string(),
            });
        }
        let degree = self
            .links
            .iter()
            .map(|l| l.delay_function.degree())
            .max()
            .unwrap_or(0);
        let mut coefs = DMatrix::zeros(self.links.len(), degree);
        for (i, link) in self.links.iter().enumerate() {
            if let DelayFunction::Polynomial { coefs: c, .. } = &link.delay_function {
                for (j, value) in c.iter().enumerate() {
                    coefs[(i, j)] = *value;
                }
            }
        }
        Ok(coefs)
    }

    /// Path flows in index order.
    pub fn path_flows(&self) -> DVector<Real> {
        DVector::from_iterator(self.paths.len(), self.paths.iter().map(|p| p.flow))
    }

    /// Node-link incidence as `(node row, link column, +1/-1)` triplets.
    ///
    /// In-links contribute +1 and out-links -1, node rows in id order.
    pub fn incidence_entries(&self) -> Vec<(usize, usize, Real)> {
        let mut entries = Vec::with_capacity(2 * self.links.len());
        for (row, node) in self.nodes.iter().enumerate() {
            for link in &node.in_links {
                entries.push((row, self.link_position(link), 1.0));
            }
            for link in &node.out_links {
                entries.push((row, self.link_position(link), -1.0));
            }
        }
        entries
    }

    /// Per-node net demand: arriving OD demand minus departing OD demand.
    pub fn net_demands(&self) -> DVector<Real> {
        let mut demands = DVector::zeros(self.nodes.len());
        for od in &self.ods {
            demands[od.id.destination.index()] += od.demand;
            demands[od.id.origin.index()] -= od.demand;
        }
        demands
    }

    /// Link-path incidence (links x paths); entry counts how often a path uses a link.
    pub fn link_path_incidence(&self) -> DMatrix<Real> {
        let mut incidence = DMatrix::zeros(self.links.len(), self.paths.len());
        for (col, path) in self.paths.iter().enumerate() {
            for link in &path.links {
                incidence[(self.link_position(link), col)] += 1.0;
            }
        }
        incidence
    }

    /// Total travel cost `sum(flow * delay)` over links.
    pub fn total_cost(&self) -> Real {
        self.links.iter().map(|l| l.flow * l.delay).sum()
    }

    /// Set every link flow from `flows` (index order) and recompute link delays.
    pub fn update_linkflows_linkdelays(&mut self, flows: &DVector<Real>) -> NetworkResult<()> {
        validate::length("link flows", self.links.len(), flows.len())?;
        for (link, &flow) in self.links.iter_mut().zip(flows.iter()) {
            link.set_flow(flow);
        }
        Ok(())
    }

    /// Recompute every path delay as the sum of its link delays.
    pub fn update_pathdelays(&mut self) {
        for i in 0..self.paths.len() {
            let delay: Real = self.paths[i]
                .links
                .iter()
                .map(|id| self.links[self.link_position(id)].delay)
                .sum();
            self.paths[i].delay = delay;
        }
    }

    /// Set every path flow from `flows` (index order).
    pub fn update_pathflows(&mut self, flows: &DVector<Real>) -> NetworkResult<()> {
        validate::length("path flows", self.paths.len(), flows.len())?;
        for (path, &flow) in self.paths.iter_mut().zip(flows.iter()) {
            path.flow = flow;
        }
        Ok(())
    }
}
