//! The flow-redirection primitive every split/coalesce/fuse rewrite
//! (§4.2.3) is built from: "replace the set of in-ports of an old-start
//! process and the set of out-ports of an old-end process with those of
//! a new-start/new-end pair, rewiring external neighbours".

use f2cc_ir::{Endpoint, Leaf, Process, ProcessId, ProcessNetwork};
use f2cc_utils::{Error, F2ccResult};

/// Rewire every external neighbour of `old_start`'s in-ports and
/// `old_end`'s out-ports onto the corresponding ports of `new_start`/
/// `new_end`, in port order. `old_start == old_end` and/or
/// `new_start == new_end` are both legal (the common case: a chain
/// collapsing to a single replacement leaf).
pub fn redirect_data_flow(
    net: &mut ProcessNetwork,
    old_start: ProcessId,
    old_end: ProcessId,
    new_start: ProcessId,
    new_end: ProcessId,
) -> F2ccResult<()> {
    let old_in = leaf_in_ports(net, old_start)?;
    let new_in = leaf_in_ports(net, new_start)?;
    if old_in.len() != new_in.len() {
        return Err(Error::illegal_state(format!(
            "redirect: `{}` has {} in-port(s) but replacement `{}` has {}",
            net.process(old_start).id(),
            old_in.len(),
            net.process(new_start).id(),
            new_in.len(),
        )));
    }
    for (old_p, new_p) in old_in.iter().zip(&new_in) {
        let old_ep = Endpoint::Leaf(*old_p);
        if let Some(peer) = net.peer_of(old_ep) {
            net.disconnect(old_ep);
            net.connect(peer, Endpoint::Leaf(*new_p));
        }
    }

    let old_out = leaf_out_ports(net, old_end)?;
    let new_out = leaf_out_ports(net, new_end)?;
    if old_out.len() != new_out.len() {
        return Err(Error::illegal_state(format!(
            "redirect: `{}` has {} out-port(s) but replacement `{}` has {}",
            net.process(old_end).id(),
            old_out.len(),
            net.process(new_end).id(),
            new_out.len(),
        )));
    }
    for (old_p, new_p) in old_out.iter().zip(&new_out) {
        let old_ep = Endpoint::Leaf(*old_p);
        if let Some(peer) = net.peer_of(old_ep) {
            net.disconnect(old_ep);
            net.connect(peer, Endpoint::Leaf(*new_p));
        }
    }
    Ok(())
}

fn leaf_in_ports(net: &ProcessNetwork, id: ProcessId) -> F2ccResult<Vec<f2cc_ir::PortId>> {
    net.process(id)
        .as_leaf()
        .map(|l| l.in_ports.clone())
        .ok_or_else(|| Error::cast(format!("`{}` is not a leaf", net.process(id).id())))
}

fn leaf_out_ports(net: &ProcessNetwork, id: ProcessId) -> F2ccResult<Vec<f2cc_ir::PortId>> {
    net.process(id)
        .as_leaf()
        .map(|l| l.out_ports.clone())
        .ok_or_else(|| Error::cast(format!("`{}` is not a leaf", net.process(id).id())))
}

/// Reserve a fresh process id, let `build` construct its ports and
/// [`Leaf`] body against that id (so port ownership is correct from the
/// start), install it as a child of `old[0]`'s parent, redirect
/// `old.first()`'s in-ports and `old.last()`'s out-ports onto it, and
/// finally unlink every process in `old` from the hierarchy. Returns
/// the new leaf's id.
pub fn replace_leaves(
    net: &mut ProcessNetwork,
    old: &[ProcessId],
    build: impl FnOnce(&mut ProcessNetwork, ProcessId) -> Leaf,
) -> F2ccResult<ProcessId> {
    let first = *old.first().ok_or_else(|| {
        Error::invalid_argument("replace_leaves: empty chain")
    })?;
    let last = *old.last().unwrap();
    let parent = net
        .process(first)
        .common()
        .parent
        .ok_or_else(|| Error::illegal_state("leaf has no parent composite"))?;

    let new_id = net.reserve_process();
    let mut new_leaf = build(net, new_id);
    new_leaf.common.parent = Some(parent);
    net.install_process(new_id, Process::Leaf(new_leaf));
    if let Some(c) = net.process_mut(parent).as_composite_mut() {
        c.children.push(new_id);
    }
    net.recompute_hierarchy(new_id);

    redirect_data_flow(net, first, last, new_id, new_id)?;
    unlink_children(net, parent, old);
    Ok(new_id)
}

/// Remove `old` from its parent's child list without reconnecting
/// anything, for when the caller has already rewired every boundary by
/// hand (e.g. redundancy elimination's direct short-circuit).
pub fn unlink_children(net: &mut ProcessNetwork, parent: ProcessId, old: &[ProcessId]) {
    if let Some(c) = net.process_mut(parent).as_composite_mut() {
        c.children.retain(|id| !old.contains(id));
    }
}

/// Delete a 1-in/1-out leaf by short-circuiting its neighbours directly
/// together (§4.2.5).
pub fn remove_leaf_bypassing(net: &mut ProcessNetwork, id: ProcessId) -> F2ccResult<()> {
    let leaf = net
        .process(id)
        .as_leaf()
        .ok_or_else(|| Error::cast(format!("`{}` is not a leaf", net.process(id).id())))?;
    if leaf.in_ports.len() != 1 || leaf.out_ports.len() != 1 {
        return Err(Error::invalid_process(format!(
            "`{}` is not 1-in/1-out; cannot bypass",
            net.process(id).id()
        )));
    }
    let in_ep = Endpoint::Leaf(leaf.in_ports[0]);
    let out_ep = Endpoint::Leaf(leaf.out_ports[0]);
    let before = net.peer_of(in_ep);
    let after = net.peer_of(out_ep);
    net.disconnect(in_ep);
    net.disconnect(out_ep);
    // A missing neighbour on one side means this leaf's port is itself a
    // model-level interface (§4.2.5: "update model input/output lists if
    // either endpoint was a model-level interface"). Both missing at once
    // is unreachable for a connected model; the §9 Open Question is
    // decided by failing loudly there rather than guessing.
    match (before, after) {
        (Some(b), Some(a)) => net.connect(b, a),
        (None, Some(a)) => {
            for input in net.model_inputs.iter_mut() {
                if *input == in_ep {
                    *input = a;
                }
            }
        }
        (Some(b), None) => {
            for output in net.model_outputs.iter_mut() {
                if *output == out_ep {
                    *output = b;
                }
            }
        }
        (None, None) => {
            return Err(Error::invalid_model(format!(
                "`{}` has no connected neighbour on either side; cannot bypass",
                net.process(id).id()
            )))
        }
    }
    let parent = net
        .process(id)
        .common()
        .parent
        .ok_or_else(|| Error::illegal_state("leaf has no parent composite"))?;
    unlink_children(net, parent, &[id]);
    Ok(())
}
