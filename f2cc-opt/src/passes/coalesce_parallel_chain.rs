//! Chain coalescing for `ParallelMap` (§4.2.4): a maximal run of
//! `ParallelMap` leaves connected single-input-to-single-output,
//! sharing the same replication count and with element-compatible
//! adjacent types, collapses into one `ParallelMap` whose function list
//! is the ordered concatenation.

use crate::analysis::{leaf_predecessors, leaf_successors, replace_leaves};
use f2cc_ir::{CombKind, DataType, Direction, Leaf, LeafVariant, Port, ProcessCommon, ProcessId, ProcessNetwork};
use f2cc_utils::F2ccResult;
use std::collections::HashSet;

pub fn coalesce_parallel_map_chains(net: &mut ProcessNetwork) -> F2ccResult<()> {
    let mut consumed: HashSet<ProcessId> = HashSet::new();
    for id in net.reachable_leaves(net.root) {
        if consumed.contains(&id) || pm_info(net, id).is_none() {
            continue;
        }
        let head = chain_head(net, id);
        if consumed.contains(&head) {
            continue;
        }
        let chain = chain_from_head(net, head);
        if chain.len() < 2 {
            continue;
        }
        consumed.extend(chain.iter().copied());
        coalesce_parallel_chain(net, &chain)?;
    }
    Ok(())
}

/// `(replication, in-type, out-type)` for a `ParallelMap` leaf, else `None`.
fn pm_info(net: &ProcessNetwork, id: ProcessId) -> Option<(u64, DataType, DataType)> {
    let leaf = net.process(id).as_leaf()?;
    let LeafVariant::Comb(CombKind::ParallelMap { replication, .. }) = &leaf.variant else {
        return None;
    };
    Some((
        *replication,
        net.port(leaf.in_ports[0]).data_type.clone(),
        net.port(leaf.out_ports[0]).data_type.clone(),
    ))
}

fn coalescable_edge(net: &ProcessNetwork, up: ProcessId, down: ProcessId) -> bool {
    let (Some((rep_u, _, out_u)), Some((rep_d, in_d, _))) = (pm_info(net, up), pm_info(net, down))
    else {
        return false;
    };
    rep_u == rep_d && out_u.compatible_with(&in_d)
}

fn chain_head(net: &ProcessNetwork, id: ProcessId) -> ProcessId {
    let mut cur = id;
    loop {
        let preds = leaf_predecessors(net, cur);
        if preds.len() != 1 {
            break;
        }
        let p = preds[0];
        if !coalescable_edge(net, p, cur) || leaf_successors(net, p).len() != 1 {
            break;
        }
        cur = p;
    }
    cur
}

fn chain_from_head(net: &ProcessNetwork, head: ProcessId) -> Vec<ProcessId> {
    let mut chain = vec![head];
    let mut cur = head;
    loop {
        let succs = leaf_successors(net, cur);
        if succs.len() != 1 {
            break;
        }
        let s = succs[0];
        if !coalescable_edge(net, cur, s) || leaf_predecessors(net, s).len() != 1 {
            break;
        }
        chain.push(s);
        cur = s;
    }
    chain
}

fn coalesce_parallel_chain(net: &mut ProcessNetwork, chain: &[ProcessId]) -> F2ccResult<ProcessId> {
    let (replication, _, _) = pm_info(net, chain[0]).expect("chain member is a ParallelMap");
    let functions: Vec<_> = chain
        .iter()
        .flat_map(|&id| {
            net.process(id)
                .as_leaf()
                .and_then(|l| match &l.variant {
                    LeafVariant::Comb(kind) => Some(kind.functions()),
                    _ => None,
                })
                .unwrap_or_default()
        })
        .collect();
    let in_ty = {
        let first = net.process(chain[0]).as_leaf().unwrap();
        net.port(first.in_ports[0]).data_type.clone()
    };
    let out_ty = {
        let last = net.process(*chain.last().unwrap()).as_leaf().unwrap();
        net.port(last.out_ports[0]).data_type.clone()
    };
    let suffix = net.fresh_process_suffix();
    replace_leaves(net, chain, move |net, new_id| {
        let in_pid = net.add_port(Port::new("in1", new_id, Direction::In, in_ty));
        let out_pid = net.add_port(Port::new("out1", new_id, Direction::Out, out_ty));
        Leaf {
            common: ProcessCommon::new(format!("parallel{suffix}"), None),
            in_ports: vec![in_pid],
            out_ports: vec![out_pid],
            variant: LeafVariant::Comb(CombKind::ParallelMap {
                replication,
                functions,
            }),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use f2cc_ir::{DataType as Dt, Endpoint, PrimKind, Process};

    fn single_parallel_map(net: &mut ProcessNetwork, parent: ProcessId, fname: &str, rep: u64) -> ProcessId {
        let scalar = Dt::array(PrimKind::Int32, Some(rep));
        let id = net.reserve_process();
        let in_p = net.add_port(Port::new("in1", id, Direction::In, scalar.clone()));
        let out_p = net.add_port(Port::new("out1", id, Direction::Out, scalar));
        net.install_process(
            id,
            Process::Leaf(Leaf {
                common: ProcessCommon::new(format!("pm_{fname}"), Some(parent)),
                in_ports: vec![in_p],
                out_ports: vec![out_p],
                variant: LeafVariant::Comb(CombKind::ParallelMap {
                    replication: rep,
                    functions: vec![fname.into()],
                }),
            }),
        );
        if let Some(c) = net.process_mut(parent).as_composite_mut() {
            c.children.push(id);
        }
        id
    }

    #[test]
    fn coalesces_a_two_long_chain() {
        let mut net = ProcessNetwork::new("t");
        let root = net.root;
        let a = single_parallel_map(&mut net, root, "f1", 4);
        let b = single_parallel_map(&mut net, root, "f2", 4);
        let a_out = net.process(a).as_leaf().unwrap().out_ports[0];
        let b_in = net.process(b).as_leaf().unwrap().in_ports[0];
        net.connect(Endpoint::Leaf(a_out), Endpoint::Leaf(b_in));
        net.model_inputs.push(Endpoint::Leaf(net.process(a).as_leaf().unwrap().in_ports[0]));
        net.model_outputs.push(Endpoint::Leaf(net.process(b).as_leaf().unwrap().out_ports[0]));

        coalesce_parallel_map_chains(&mut net).unwrap();
        let leaves = net.reachable_leaves(net.root);
        assert_eq!(leaves.len(), 1);
        let LeafVariant::Comb(CombKind::ParallelMap { functions, .. }) =
            &net.process(leaves[0]).as_leaf().unwrap().variant
        else {
            panic!("expected ParallelMap");
        };
        assert_eq!(functions.len(), 2);
    }
}
