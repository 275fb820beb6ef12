//! Resolve an [`Endpoint`] across composite boundaries to the nearest
//! Leaf [`Port`] in either direction. Once the ModelModifier passes have
//! run, the hierarchy that remains is plumbing only — every Leaf's real
//! neighbour, for scheduling and Signal purposes, is another Leaf's port
//! possibly reached through a chain of `IOPort` hops.

use f2cc_ir::{Endpoint, Face, PortId, ProcessNetwork};

/// Follow the peer chain from `ep`, treating each `IOPort` as a
/// transparent pipe between its two faces, until a Leaf [`Port`] is
/// reached. Returns `None` when the chain dead-ends at an unconnected
/// boundary — i.e. `ep` sits on a model-level input or output.
pub fn resolve_leaf(net: &ProcessNetwork, ep: Endpoint) -> Option<PortId> {
    let mut cur = ep;
    loop {
        match net.peer_of(cur) {
            Some(Endpoint::Leaf(p)) => return Some(p),
            Some(Endpoint::Io(io, face)) => {
                let other = match face {
                    Face::Inside => Face::Outside,
                    Face::Outside => Face::Inside,
                };
                cur = Endpoint::Io(io, other);
            }
            None => return None,
        }
    }
}

/// Resolve a model-level input endpoint (an entry of
/// [`ProcessNetwork::model_inputs`]) to the Leaf [`Port`] it ultimately
/// feeds. Two shapes are accepted: a bare `Endpoint::Leaf`, used when a
/// network is built directly without a wrapping root `IOPort` (e.g. unit
/// tests), and `Endpoint::Io(_, Face::Outside)`, the shape the frontend
/// produces — resolved by walking in from the matching `Inside` face.
pub fn model_input_leaf_port(net: &ProcessNetwork, ep: Endpoint) -> Option<PortId> {
    match ep {
        Endpoint::Leaf(p) => Some(p),
        Endpoint::Io(io, _) => resolve_leaf(net, Endpoint::Io(io, Face::Inside)),
    }
}

/// Resolve a model-level output endpoint (an entry of
/// [`ProcessNetwork::model_outputs`]) to the Leaf [`Port`] that drives
/// it, symmetric to [`model_input_leaf_port`].
pub fn model_output_leaf_port(net: &ProcessNetwork, ep: Endpoint) -> Option<PortId> {
    match ep {
        Endpoint::Leaf(p) => Some(p),
        Endpoint::Io(io, _) => resolve_leaf(net, Endpoint::Io(io, Face::Inside)),
    }
}
