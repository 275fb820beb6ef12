//! Shared network builders for pass/scheduler unit tests.
#![cfg(test)]

use f2cc_ir::{
    CombKind, DataType, Direction, Endpoint, Leaf, LeafVariant, Port, PrimKind, Process,
    ProcessCommon, ProcessNetwork,
};

/// A root composite holding one `unzipx`/`zipx`-bracketed contained
/// section: one branch per entry of `branch_fns`, each branch a chain
/// of `Map` leaves named after that entry's function names in order.
/// The model input feeds the `unzipx`; the `zipx`'s output feeds the
/// model output. Branches may be empty-named (`&[]`) to build a
/// malformed section for negative tests.
pub(crate) fn parallel_network(branch_fns: &[&[&str]]) -> ProcessNetwork {
    let mut net = ProcessNetwork::new("t");
    let root = net.root;
    let scalar = DataType::scalar(PrimKind::Int32);
    let n = branch_fns.len() as u64;

    let unzipx_id = net.reserve_process();
    let unzipx_in = net.add_port(Port::new(
        "in1",
        unzipx_id,
        Direction::In,
        DataType::array(PrimKind::Int32, Some(n)),
    ));
    let unzipx_outs: Vec<_> = (0..branch_fns.len())
        .map(|i| net.add_port(Port::new(format!("out{}", i + 1), unzipx_id, Direction::Out, scalar.clone())))
        .collect();
    net.install_process(
        unzipx_id,
        Process::Leaf(Leaf {
            common: ProcessCommon::new("unzipx1", Some(root)),
            in_ports: vec![unzipx_in],
            out_ports: unzipx_outs.clone(),
            variant: LeafVariant::UnzipX,
        }),
    );

    let zipx_id = net.reserve_process();
    let zipx_ins: Vec<_> = (0..branch_fns.len())
        .map(|i| net.add_port(Port::new(format!("in{}", i + 1), zipx_id, Direction::In, scalar.clone())))
        .collect();
    let zipx_out = net.add_port(Port::new(
        "out1",
        zipx_id,
        Direction::Out,
        DataType::array(PrimKind::Int32, Some(n)),
    ));
    net.install_process(
        zipx_id,
        Process::Leaf(Leaf {
            common: ProcessCommon::new("zipx1", Some(root)),
            in_ports: zipx_ins.clone(),
            out_ports: vec![zipx_out],
            variant: LeafVariant::ZipX,
        }),
    );

    if let Some(c) = net.process_mut(root).as_composite_mut() {
        c.children.push(unzipx_id);
        c.children.push(zipx_id);
    }

    for (branch_idx, fns) in branch_fns.iter().enumerate() {
        let mut prev_out = unzipx_outs[branch_idx];
        for (i, fname) in fns.iter().enumerate() {
            let map_id = net.reserve_process();
            let in_p = net.add_port(Port::new("in1", map_id, Direction::In, scalar.clone()));
            let out_p = net.add_port(Port::new("out1", map_id, Direction::Out, scalar.clone()));
            net.install_process(
                map_id,
                Process::Leaf(Leaf {
                    common: ProcessCommon::new(format!("map_b{branch_idx}_{i}"), Some(root)),
                    in_ports: vec![in_p],
                    out_ports: vec![out_p],
                    variant: LeafVariant::Comb(CombKind::Map((*fname).into())),
                }),
            );
            if let Some(c) = net.process_mut(root).as_composite_mut() {
                c.children.push(map_id);
            }
            net.connect(Endpoint::Leaf(prev_out), Endpoint::Leaf(in_p));
            prev_out = out_p;
        }
        net.connect(Endpoint::Leaf(prev_out), Endpoint::Leaf(zipx_ins[branch_idx]));
    }

    net.model_inputs.push(Endpoint::Leaf(unzipx_in));
    net.model_outputs.push(Endpoint::Leaf(zipx_out));
    net
}

/// A root composite with a plain linear chain of `Map` leaves (no
/// `unzipx`/`zipx` bracket), the model input feeding the first and the
/// model output fed by the last — for chain-coalescing/normalization
/// tests that don't need a data-parallel section.
pub(crate) fn linear_chain(fns: &[&str]) -> ProcessNetwork {
    let mut net = ProcessNetwork::new("t");
    let root = net.root;
    let scalar = DataType::scalar(PrimKind::Int32);
    let mut prev: Option<f2cc_ir::PortId> = None;
    for (i, fname) in fns.iter().enumerate() {
        let id = net.reserve_process();
        let in_p = net.add_port(Port::new("in1", id, Direction::In, scalar.clone()));
        let out_p = net.add_port(Port::new("out1", id, Direction::Out, scalar.clone()));
        net.install_process(
            id,
            Process::Leaf(Leaf {
                common: ProcessCommon::new(format!("map{i}"), Some(root)),
                in_ports: vec![in_p],
                out_ports: vec![out_p],
                variant: LeafVariant::Comb(CombKind::Map((*fname).into())),
            }),
        );
        if let Some(c) = net.process_mut(root).as_composite_mut() {
            c.children.push(id);
        }
        if let Some(p) = prev {
            net.connect(Endpoint::Leaf(p), Endpoint::Leaf(in_p));
        } else {
            net.model_inputs.push(Endpoint::Leaf(in_p));
        }
        prev = Some(out_p);
    }
    if let Some(p) = prev {
        net.model_outputs.push(Endpoint::Leaf(p));
    }
    net
}
