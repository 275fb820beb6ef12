//! In-memory representation of a ForSyDe-style Process Network (§3): the
//! hierarchical graph of Composites and Leaves connected by typed
//! Ports/IOPorts that the Frontend builds, the ModelModifier rewrites,
//! and the Synthesizer annotates and schedules.
//!
//! Processes and ports live in arenas owned by [`ProcessNetwork`] and are
//! referred to by stable indices ([`ProcessId`], [`PortId`], [`IOPortId`])
//! rather than by pointer or `Rc`, per §9's back-reference design note.

mod data_type;
mod function;
mod network;
mod port;
mod process;
pub mod signal;

pub use data_type::{DataType, PrimKind};
pub use function::{Function, FunctionRegistry, Param};
pub use network::{ProcessNetwork, ROOT_NAME};
pub use port::{Direction, Endpoint, Face, IOPort, IOPortId, Port, PortId};
pub use process::{
    CombKind, Composite, FunctionRef, Leaf, LeafVariant, Moc, ParallelInfo,
    Process, ProcessCommon, ProcessId,
};
pub use signal::{Signal, SignalInfo};

pub use f2cc_utils::{Error, F2ccResult, Id};
