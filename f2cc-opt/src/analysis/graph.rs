//! Leaf-to-leaf successor/predecessor walks over the Process Network's
//! port connections (§3), used by the scheduler (§4.3) and by
//! contained-section discovery (§4.2.1).

use f2cc_ir::{Endpoint, ProcessId, ProcessNetwork};

/// The leaves directly downstream of `id`'s out-ports, in port order.
/// A boundary connection (an out-port bound to the network's own
/// output interface) contributes nothing, since there is no consuming
/// leaf on the other side.
pub fn leaf_successors(net: &ProcessNetwork, id: ProcessId) -> Vec<ProcessId> {
    let Some(leaf) = net.process(id).as_leaf() else {
        return Vec::new();
    };
    leaf.out_ports
        .iter()
        .filter_map(|&p| match net.peer_of(Endpoint::Leaf(p)) {
            Some(Endpoint::Leaf(peer)) => Some(net.port(peer).owner),
            _ => None,
        })
        .collect()
}

/// The leaves directly upstream of `id`'s in-ports, in port order.
pub fn leaf_predecessors(net: &ProcessNetwork, id: ProcessId) -> Vec<ProcessId> {
    let Some(leaf) = net.process(id).as_leaf() else {
        return Vec::new();
    };
    leaf.in_ports
        .iter()
        .filter_map(|&p| match net.peer_of(Endpoint::Leaf(p)) {
            Some(Endpoint::Leaf(peer)) => Some(net.port(peer).owner),
            _ => None,
        })
        .collect()
}
