use core::fmt;
use core::num::NonZeroU32;

use crate::error::CoreError;

/// Node identifier: the 1-based id a node receives when it is added.
///
/// - `u32` keeps memory small
/// - `NonZero` makes id 0 unrepresentable and lets `Option<NodeId>` stay 4 bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Wrap a 1-based node id; `None` for 0.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Create a NodeId from a 0-based position by storing index+1.
    pub fn from_index(index: usize) -> Self {
        let index = u32::try_from(index).unwrap_or(u32::MAX - 1);
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    /// The 1-based id.
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Recover the 0-based position.
    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl TryFrom<u32> for NodeId {
    type Error = CoreError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(CoreError::InvalidNodeId { raw })
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.get())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Link key: node pair plus a route number separating parallel links.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId {
    pub start: NodeId,
    pub end: NodeId,
    pub route: u32,
}

impl LinkId {
    pub fn new(start: NodeId, end: NodeId, route: u32) -> Self {
        Self { start, end, route }
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.start, self.end, self.route)
    }
}

/// Origin-destination key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OdId {
    pub origin: NodeId,
    pub destination: NodeId,
}

impl OdId {
    pub fn new(origin: NodeId, destination: NodeId) -> Self {
        Self {
            origin,
            destination,
        }
    }
}

impl fmt::Display for OdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.origin, self.destination)
    }
}

/// Path key: the OD pair plus the route number assigned within that OD.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId {
    pub origin: NodeId,
    pub destination: NodeId,
    pub route: u32,
}

impl PathId {
    pub fn new(od: OdId, route: u32) -> Self {
        Self {
            origin: od.origin,
            destination: od.destination,
            route,
        }
    }

    pub fn od(self) -> OdId {
        OdId::new(self.origin, self.destination)
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.origin, self.destination, self.route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(raw: u32) -> NodeId {
        NodeId::new(raw).unwrap()
    }

    #[test]
    fn node_id_round_trip_index() {
        for i in [0_usize, 1, 2, 42, 10_000] {
            let id = NodeId::from_index(i);
            assert_eq!(id.index(), i);
            assert_eq!(id.get() as usize, i + 1);
        }
    }

    #[test]
    fn node_id_rejects_zero() {
        assert!(NodeId::new(0).is_none());
        assert_eq!(
            NodeId::try_from(0),
            Err(CoreError::InvalidNodeId { raw: 0 })
        );
        assert_eq!(NodeId::try_from(3).unwrap().get(), 3);
    }

    #[test]
    fn option_node_id_is_small() {
        assert_eq!(
            core::mem::size_of::<NodeId>(),
            core::mem::size_of::<Option<NodeId>>()
        );
    }

    #[test]
    fn composite_keys_compare_by_value() {
        let a = LinkId::new(n(1), n(2), 1);
        let b = LinkId::new(n(1), n(2), 1);
        let c = LinkId::new(n(1), n(2), 2);
        assert_eq!(a, b);
        assert!(a < c);
        assert_eq!(a.to_string(), "(1,2,1)");

        let path = PathId::new(OdId::new(n(3), n(4)), 2);
        assert_eq!(path.od(), OdId::new(n(3), n(4)));
        assert_eq!(path.to_string(), "(3,4,2)");
    }
}
