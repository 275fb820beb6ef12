//! Ports and IOPorts (§3): the interfaces a process exposes. Connections
//! are represented as indices into the owning [`crate::ProcessNetwork`]'s
//! arenas rather than back-references, per the arena-with-stable-indices
//! design called out in §9.

use crate::{DataType, ProcessId};
use f2cc_utils::Id;

/// Index of a [`Port`] in [`crate::ProcessNetwork::ports`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct PortId(pub usize);

/// Index of an [`IOPort`] in [`crate::ProcessNetwork::io_ports`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct IOPortId(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    In,
    Out,
}

/// Which face of an [`IOPort`] an [`Endpoint`] refers to: the outside
/// face binds to a sibling in the parent composite, the inside face
/// binds to a child within the composite itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Face {
    Inside,
    Outside,
}

/// A reference to one endpoint of a connection: either a leaf [`Port`]
/// or one face of an [`IOPort`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Endpoint {
    Leaf(PortId),
    Io(IOPortId, Face),
}

/// A leaf process's port: owned by exactly one process, at most one
/// sibling binding (§3 invariant 1, 2).
#[derive(Clone, Debug)]
pub struct Port {
    pub id: Id,
    pub owner: ProcessId,
    pub direction: Direction,
    pub data_type: DataType,
    pub peer: Option<Endpoint>,
}

impl Port {
    pub fn new(
        id: impl Into<Id>,
        owner: ProcessId,
        direction: Direction,
        data_type: DataType,
    ) -> Self {
        Port {
            id: id.into(),
            owner,
            direction,
            data_type,
            peer: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.peer.is_some()
    }
}

/// A composite's IOPort: dual identity, bound on the outside to a
/// sibling in the parent and on the inside to a child, each face
/// carrying its own data type (§3).
#[derive(Clone, Debug)]
pub struct IOPort {
    pub id: Id,
    pub owner: ProcessId,
    pub direction: Direction,
    pub outside_type: DataType,
    pub inside_type: DataType,
    pub outside_peer: Option<Endpoint>,
    pub inside_peer: Option<Endpoint>,
}

impl IOPort {
    pub fn new(
        id: impl Into<Id>,
        owner: ProcessId,
        direction: Direction,
        outside_type: DataType,
        inside_type: DataType,
    ) -> Self {
        IOPort {
            id: id.into(),
            owner,
            direction,
            outside_type,
            inside_type,
            outside_peer: None,
            inside_peer: None,
        }
    }

    pub fn peer(&self, face: Face) -> Option<Endpoint> {
        match face {
            Face::Inside => self.inside_peer,
            Face::Outside => self.outside_peer,
        }
    }

    pub fn data_type(&self, face: Face) -> &DataType {
        match face {
            Face::Inside => &self.inside_type,
            Face::Outside => &self.outside_type,
        }
    }
}
