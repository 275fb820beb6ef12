//! Redundancy elimination (§4.2.5): a `zipx`/`unzipx` with exactly one
//! in-port and one out-port does nothing but pass its value through —
//! delete it by short-circuiting the connection.

use crate::analysis::remove_leaf_bypassing;
use f2cc_ir::{LeafVariant, ProcessNetwork};
use f2cc_utils::F2ccResult;

pub fn remove_redundant_leafs(net: &mut ProcessNetwork) -> F2ccResult<()> {
    loop {
        let target = net.reachable_leaves(net.root).into_iter().find(|&id| {
            let Some(leaf) = net.process(id).as_leaf() else {
                return false;
            };
            matches!(leaf.variant, LeafVariant::ZipX | LeafVariant::UnzipX)
                && leaf.in_ports.len() == 1
                && leaf.out_ports.len() == 1
        });
        let Some(id) = target else { break };
        remove_leaf_bypassing(net, id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::parallel_network;

    #[test]
    fn removes_single_port_zipx_and_unzipx() {
        // A single-branch section: unzipx(1-in,1-out) -> map -> zipx(1-in,1-out),
        // both brackets degenerate to pass-through and should disappear.
        let mut net = parallel_network(&[&["f1"]]);
        remove_redundant_leafs(&mut net).unwrap();
        let leaves = net.reachable_leaves(net.root);
        assert_eq!(leaves.len(), 1);
        assert!(matches!(
            net.process(leaves[0]).as_leaf().unwrap().variant,
            LeafVariant::Comb(_)
        ));
    }

    #[test]
    fn leaves_multi_port_zipx_untouched() {
        let mut net = parallel_network(&[&["f1"], &["f1"]]);
        remove_redundant_leafs(&mut net).unwrap();
        let leaves = net.reachable_leaves(net.root);
        assert_eq!(leaves.len(), 4);
    }
}
