//! Shared connection helper used by both XML dialects (`rich.rs`,
//! `graphml.rs`): splitting an already-bound source with a synthesized
//! `fanout` leaf (§4.1).

use f2cc_ir::{
    Direction as IrDirection, Endpoint, Leaf, LeafVariant, Port, Process,
    ProcessCommon, ProcessNetwork,
};
use f2cc_utils::F2ccResult;

/// If `ep` is an endpoint that is already connected, insert a `fanout`
/// leaf splitting it in two and return the fresh out-port this signal
/// should bind to instead. A source fanned out more than twice simply
/// grows a chain of binary fanouts rather than one wide fanout; both are
/// valid readings of "duplicates its input to all outputs".
pub fn ensure_fanout(net: &mut ProcessNetwork, ep: Endpoint) -> F2ccResult<Endpoint> {
    if net.peer_of(ep).is_none() {
        return Ok(ep);
    }
    let existing_peer = net.peer_of(ep).unwrap();
    let owner = net.endpoint_owner(ep);
    let parent = net.process(owner).common().parent.unwrap_or(owner);
    let ty = net.endpoint_type(ep).clone();

    let fanout_id = net.reserve_process();
    let in_pid = net.add_port(Port::new("in1", fanout_id, IrDirection::In, ty.clone()));
    let out1_id = net.add_port(Port::new("out1", fanout_id, IrDirection::Out, ty.clone()));
    let out2_id = net.add_port(Port::new("out2", fanout_id, IrDirection::Out, ty));
    let suffix = net.fresh_process_suffix();
    net.install_process(
        fanout_id,
        Process::Leaf(Leaf {
            common: ProcessCommon::new(format!("fanout{suffix}"), Some(parent)),
            in_ports: vec![in_pid],
            out_ports: vec![out1_id, out2_id],
            variant: LeafVariant::Fanout,
        }),
    );
    if let Some(c) = net.process_mut(parent).as_composite_mut() {
        c.children.push(fanout_id);
    }
    net.recompute_hierarchy(fanout_id);

    // Rewire: old_peer <- out1, ep <- out2 via fanout's in.
    net.disconnect(ep);
    net.connect(Endpoint::Leaf(in_pid), ep);
    net.connect(Endpoint::Leaf(out1_id), existing_peer);
    Ok(Endpoint::Leaf(out2_id))
}
