//! Pre-mutation checks shared by the network operations.

use wardrop_core::{LinkId, NodeId, Real, ensure_finite};

use crate::delay::DelayFunction;
use crate::error::{NetworkError, NetworkResult};

/// Endpoints of a link or OD pair: distinct and both within `1..=node_count`.
pub(crate) fn endpoints(start: NodeId, end: NodeId, node_count: usize) -> NetworkResult<()> {
    if start == end {
        return Err(NetworkError::InvalidTopology { node: start });
    }
    for node in [start, end] {
        if node.index() >= node_count {
            return Err(NetworkError::UnknownNode {
                node: node.get(),
                count: node_count,
            });
        }
    }
    Ok(())
}

/// Every delay parameter must be finite.
pub(crate) fn delay_function(
    link: LinkId,
    ffdelay: Real,
    function: &DelayFunction,
) -> NetworkResult<()> {
    let invalid = |source| NetworkError::InvalidDelayParameters {
        link,
        family: function.family(),
        source,
    };
    ensure_finite(ffdelay, "free-flow delay").map_err(invalid)?;
    for value in function.parameters() {
        ensure_finite(value, "delay parameter").map_err(invalid)?;
    }
    Ok(())
}

/// Consecutive links must chain: each end node is the next start node.
pub(crate) fn contiguous(links: &[LinkId]) -> NetworkResult<()> {
    for (position, pair) in links.windows(2).enumerate() {
        if pair[0].end != pair[1].start {
            return Err(NetworkError::DiscontinuousPath {
                position,
                from: pair[0],
                to: pair[1],
            });
        }
    }
    Ok(())
}

pub(crate) fn length(what: &'static str, expected: usize, actual: usize) -> NetworkResult<()> {
    if expected != actual {
        return Err(NetworkError::LengthMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}
