//! Arity normalization (§4.2.6): a `ZipWithN` with a single in-port is
//! equivalent to a `Map` — rewrite it as such.

use crate::analysis::replace_leaves;
use f2cc_ir::{CombKind, Direction, Leaf, LeafVariant, Port, ProcessCommon, ProcessNetwork};
use f2cc_utils::F2ccResult;

pub fn convert_zip_with1_to_map(net: &mut ProcessNetwork) -> F2ccResult<()> {
    loop {
        let target = net.reachable_leaves(net.root).into_iter().find(|&id| {
            let Some(leaf) = net.process(id).as_leaf() else {
                return false;
            };
            matches!(leaf.variant, LeafVariant::Comb(CombKind::ZipWithN(_))) && leaf.in_ports.len() == 1
        });
        let Some(id) = target else { break };
        convert_one(net, id)?;
    }
    Ok(())
}

fn convert_one(net: &mut ProcessNetwork, id: f2cc_ir::ProcessId) -> F2ccResult<f2cc_ir::ProcessId> {
    let leaf = net.process(id).as_leaf().unwrap();
    let LeafVariant::Comb(CombKind::ZipWithN(f)) = leaf.variant.clone() else {
        unreachable!("caller filtered for ZipWithN")
    };
    let in_ty = net.port(leaf.in_ports[0]).data_type.clone();
    let out_ty = net.port(leaf.out_ports[0]).data_type.clone();
    replace_leaves(net, &[id], move |net, new_id| {
        let in_pid = net.add_port(Port::new("in1", new_id, Direction::In, in_ty));
        let out_pid = net.add_port(Port::new("out1", new_id, Direction::Out, out_ty));
        Leaf {
            common: ProcessCommon::new(net.process(id).id(), None),
            in_ports: vec![in_pid],
            out_ports: vec![out_pid],
            variant: LeafVariant::Comb(CombKind::Map(f)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::linear_chain;

    #[test]
    fn rewrites_single_input_zip_with_n_as_map() {
        let mut net = linear_chain(&["f1"]);
        let id = net.reachable_leaves(net.root)[0];
        net.process_mut(id).as_leaf_mut().unwrap().variant =
            LeafVariant::Comb(CombKind::ZipWithN("f1".into()));
        convert_zip_with1_to_map(&mut net).unwrap();
        let leaves = net.reachable_leaves(net.root);
        assert_eq!(leaves.len(), 1);
        assert!(matches!(
            net.process(leaves[0]).as_leaf().unwrap().variant,
            LeafVariant::Comb(CombKind::Map(_))
        ));
    }
}
