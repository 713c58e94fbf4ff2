//! Network construction and validation errors.

use thiserror::Error;
use wardrop_core::{CoreError, LinkId, NodeId, OdId};

use crate::delay::DelayFamily;

pub type NetworkResult<T> = Result<T, NetworkError>;

/// Every variant is raised before any state is touched, so the network is
/// unchanged when one is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Self-loop not allowed at node {node}")]
    InvalidTopology { node: NodeId },

    #[error("Node {node} doesn't exist, network contains {count} nodes")]
    UnknownNode { node: u32, count: usize },

    #[error("OD {od} doesn't exist")]
    UnknownOd { od: OdId },

    #[error("Link {link} doesn't exist")]
    UnknownLink { link: LinkId },

    #[error("No link from node {start} to node {end}")]
    NoLinkBetween { start: NodeId, end: NodeId },

    #[error("{what} {key} already exists")]
    DuplicateEntity { what: &'static str, key: String },

    #[error("Path not contiguous at position {position}: {from} does not lead into {to}")]
    DiscontinuousPath {
        position: usize,
        from: LinkId,
        to: LinkId,
    },

    #[error("Path has no links")]
    EmptyPath,

    #[error("Incompatible delay functions: {what}")]
    IncompatibleDelayFamily { what: String },

    #[error("Invalid parameters for {family} delay function on link {link}: {source}")]
    InvalidDelayParameters {
        link: LinkId,
        family: DelayFamily,
        source: CoreError,
    },

    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid value: {0}")]
    InvalidValue(#[from] CoreError),
}
