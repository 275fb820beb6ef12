//! Fuse rewrite (§4.2.3): collapse a chain-length-1 data-parallel
//! section — the (`unzipx`, maps, `zipx`) triangle — into a single
//! `ParallelMap` leaf whose replication equals the branch count.

use crate::analysis::{classify_data_parallel, find_contained_sections, replace_leaves};
use f2cc_ir::{CombKind, Direction, Leaf, LeafVariant, Port, ProcessCommon, ProcessNetwork};
use f2cc_utils::F2ccResult;

pub fn fuse_unzip_map_zip_leafs(net: &mut ProcessNetwork) -> F2ccResult<()> {
    for section in find_contained_sections(net) {
        let Some(branches) = classify_data_parallel(net, &section) else {
            continue;
        };
        if branches.first().map_or(true, |b| b.len() != 1) {
            continue;
        }
        let replication = branches.len() as u64;
        // All branches are pairwise equal (classify_data_parallel's
        // invariant); the representative's function list stands in for
        // "the branches' functions (or the inner coalesced list)".
        let functions = net
            .process(branches[0][0])
            .as_leaf()
            .and_then(|l| match &l.variant {
                LeafVariant::Comb(kind) => Some(kind.functions()),
                _ => None,
            })
            .unwrap_or_default();

        let in_ty = {
            let unzipx = net.process(section.start).as_leaf().unwrap();
            net.port(unzipx.in_ports[0]).data_type.clone()
        };
        let out_ty = {
            let zipx = net.process(section.end).as_leaf().unwrap();
            net.port(zipx.out_ports[0]).data_type.clone()
        };

        let mut old = vec![section.start];
        old.extend(branches.into_iter().flatten());
        old.push(section.end);

        let suffix = net.fresh_process_suffix();
        replace_leaves(net, &old, move |net, new_id| {
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
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::parallel_network;

    #[test]
    fn fuses_single_stage_branches_into_parallel_map() {
        let mut net = parallel_network(&[&["f1"], &["f1"], &["f1"]]);
        fuse_unzip_map_zip_leafs(&mut net).unwrap();
        let leaves = net.reachable_leaves(net.root);
        assert_eq!(leaves.len(), 1);
        let LeafVariant::Comb(CombKind::ParallelMap { replication, functions }) =
            &net.process(leaves[0]).as_leaf().unwrap().variant
        else {
            panic!("expected a ParallelMap leaf");
        };
        assert_eq!(*replication, 3);
        assert_eq!(functions.len(), 1);
    }

    #[test]
    fn leaves_longer_branches_untouched() {
        let mut net = parallel_network(&[&["f1", "f2"], &["f1", "f2"]]);
        fuse_unzip_map_zip_leafs(&mut net).unwrap();
        assert_eq!(net.reachable_leaves(net.root).len(), 5);
    }
}
