//! Split rewrite (§4.2.3): insert a `zipx`/`unzipx` pair between every
//! pair of adjacent segments of an equal-length data-parallel chain,
//! turning one contained section into a sequence of chain-length-1
//! sections that expose finer pipeline stages to the fuse rewrite.

use crate::analysis::{classify_data_parallel, find_contained_sections};
use f2cc_ir::{
    DataType, Direction, Endpoint, Leaf, LeafVariant, Port, ProcessCommon, ProcessNetwork,
};
use f2cc_utils::F2ccResult;

pub fn split_data_parallel_sections(net: &mut ProcessNetwork) -> F2ccResult<()> {
    for section in find_contained_sections(net) {
        let Some(branches) = classify_data_parallel(net, &section) else {
            continue;
        };
        let len = branches[0].len();
        if len < 2 {
            continue;
        }
        split_section(net, &branches, len)?;
    }
    Ok(())
}

fn split_section(
    net: &mut ProcessNetwork,
    branches: &[Vec<f2cc_ir::ProcessId>],
    len: usize,
) -> F2ccResult<()> {
    let n = branches.len() as u64;
    let parent = net
        .process(branches[0][0])
        .common()
        .parent
        .expect("branch leaf has a parent composite");

    for boundary in 0..len - 1 {
        let elem_ty = {
            let up = net.process(branches[0][boundary]).as_leaf().unwrap();
            net.port(up.out_ports[0]).data_type.clone()
        };
        let array_ty = DataType::array(elem_ty.kind.clone(), Some(n));

        let zipx_id = net.reserve_process();
        let zipx_ins: Vec<_> = (0..branches.len())
            .map(|i| net.add_port(Port::new(format!("in{}", i + 1), zipx_id, Direction::In, elem_ty.clone())))
            .collect();
        let zipx_out = net.add_port(Port::new("out1", zipx_id, Direction::Out, array_ty.clone()));
        net.install_process(
            zipx_id,
            f2cc_ir::Process::Leaf(Leaf {
                common: ProcessCommon::new(
                    format!("zipx{}", net.fresh_process_suffix()),
                    Some(parent),
                ),
                in_ports: zipx_ins.clone(),
                out_ports: vec![zipx_out],
                variant: LeafVariant::ZipX,
            }),
        );

        let unzipx_id = net.reserve_process();
        let unzipx_in = net.add_port(Port::new("in1", unzipx_id, Direction::In, array_ty));
        let unzipx_outs: Vec<_> = (0..branches.len())
            .map(|i| net.add_port(Port::new(format!("out{}", i + 1), unzipx_id, Direction::Out, elem_ty.clone())))
            .collect();
        net.install_process(
            unzipx_id,
            f2cc_ir::Process::Leaf(Leaf {
                common: ProcessCommon::new(
                    format!("unzipx{}", net.fresh_process_suffix()),
                    Some(parent),
                ),
                in_ports: vec![unzipx_in],
                out_ports: unzipx_outs.clone(),
                variant: LeafVariant::UnzipX,
            }),
        );

        if let Some(c) = net.process_mut(parent).as_composite_mut() {
            c.children.push(zipx_id);
            c.children.push(unzipx_id);
        }
        net.recompute_hierarchy(zipx_id);
        net.recompute_hierarchy(unzipx_id);

        net.connect(Endpoint::Leaf(zipx_out), Endpoint::Leaf(unzipx_in));

        for (branch_idx, branch) in branches.iter().enumerate() {
            let up_out = net.process(branch[boundary]).as_leaf().unwrap().out_ports[0];
            let down_in = net.process(branch[boundary + 1]).as_leaf().unwrap().in_ports[0];
            net.disconnect(Endpoint::Leaf(up_out));
            net.connect(Endpoint::Leaf(up_out), Endpoint::Leaf(zipx_ins[branch_idx]));
            net.connect(Endpoint::Leaf(unzipx_outs[branch_idx]), Endpoint::Leaf(down_in));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::parallel_network;

    #[test]
    fn splitting_a_two_stage_section_yields_two_single_stage_sections() {
        let mut net = parallel_network(&[&["f1", "f2"], &["f1", "f2"]]);
        split_data_parallel_sections(&mut net).unwrap();
        let sections = find_contained_sections(&net);
        assert_eq!(sections.len(), 2);
        for s in &sections {
            let branches = classify_data_parallel(&net, s).expect("still data-parallel");
            assert_eq!(branches[0].len(), 1);
        }
    }
}
