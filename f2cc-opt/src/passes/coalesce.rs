//! Coalesce rewrite (§4.2.3): collapse each data-parallel branch longer
//! than one `Map` into a single `CoalescedMap`, preserving chain order
//! in its function list. The wrapper function that realizes sequential
//! composition is a synthesizer concern (§4.4 Step 4), not this pass's.

use crate::analysis::{classify_data_parallel, find_contained_sections, replace_leaves};
use f2cc_ir::{CombKind, Direction, Leaf, LeafVariant, Port, ProcessCommon, ProcessId, ProcessNetwork};
use f2cc_utils::F2ccResult;

/// Run once over every data-parallel section with chain length > 1;
/// each qualifying branch becomes a `CoalescedMap` leaf in place.
pub fn coalesce_data_parallel_leafs(net: &mut ProcessNetwork) -> F2ccResult<()> {
    for section in find_contained_sections(net) {
        let Some(branches) = classify_data_parallel(net, &section) else {
            continue;
        };
        if branches.first().map_or(true, |b| b.len() <= 1) {
            continue;
        }
        for branch in branches {
            coalesce_leaf_chain(net, &branch)?;
        }
    }
    Ok(())
}

/// Replace the leaves in `chain` (already verified equal-length, all
/// `Map`) with one `CoalescedMap` carrying their functions in order.
fn coalesce_leaf_chain(net: &mut ProcessNetwork, chain: &[ProcessId]) -> F2ccResult<ProcessId> {
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
            common: ProcessCommon::new(format!("coalesced{suffix}"), None),
            in_ports: vec![in_pid],
            out_ports: vec![out_pid],
            variant: LeafVariant::Comb(CombKind::CoalescedMap(functions)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::parallel_network;

    #[test]
    fn collapses_two_element_branches_into_coalesced_maps() {
        let mut net = parallel_network(&[&["f1", "f2"], &["f1", "f2"]]);
        coalesce_data_parallel_leafs(&mut net).unwrap();
        let leaves = net.reachable_leaves(net.root);
        let coalesced: Vec<_> = leaves
            .iter()
            .filter(|&&id| {
                matches!(
                    net.process(id).as_leaf().map(|l| &l.variant),
                    Some(LeafVariant::Comb(CombKind::CoalescedMap(_)))
                )
            })
            .collect();
        assert_eq!(coalesced.len(), 2);
    }

    #[test]
    fn leaves_length_one_branches_untouched() {
        let mut net = parallel_network(&[&["f1"], &["f1"]]);
        coalesce_data_parallel_leafs(&mut net).unwrap();
        let leaves = net.reachable_leaves(net.root);
        assert!(leaves.iter().all(|&id| !matches!(
            net.process(id).as_leaf().map(|l| &l.variant),
            Some(LeafVariant::Comb(CombKind::CoalescedMap(_)))
        )));
    }
}
