//! Hierarchical parallelization, SystemC variant (§4.2.7, experimental):
//! collapse each equivalence class of size > 1 among the root's direct
//! children (same component name for composites, same function name
//! for combs) into one `ParallelComposite` holding a single
//! representative, wrapped by a `zipx` converging every original
//! producer per input face and an `unzipx` diverging to every original
//! consumer per output face.
//!
//! Gated behind [`f2cc_utils::Config::experimental_parallelization`];
//! scoped to flattening the root by one level, as specified.

use f2cc_ir::{
    Composite, DataType, Direction, Endpoint, Face, IOPort, Leaf, LeafVariant, ParallelInfo, Port,
    Process, ProcessCommon, ProcessId, ProcessNetwork,
};
use f2cc_utils::F2ccResult;

pub fn hierarchical_parallelize(net: &mut ProcessNetwork) -> F2ccResult<()> {
    let root = net.root;
    for class in net.equivalence_classes(root) {
        if class.len() > 1 {
            parallelize_group(net, root, &class)?;
        }
    }
    Ok(())
}

/// One interface slot of a process's boundary, in declared order: a
/// leaf contributes its in-ports then its out-ports; a composite
/// contributes its IOPorts' outside face in declaration order.
fn interface_slots(net: &ProcessNetwork, id: ProcessId) -> Vec<(Direction, Endpoint, DataType)> {
    match net.process(id) {
        Process::Leaf(l) => {
            let mut v = Vec::new();
            for &p in &l.in_ports {
                v.push((Direction::In, Endpoint::Leaf(p), net.port(p).data_type.clone()));
            }
            for &p in &l.out_ports {
                v.push((Direction::Out, Endpoint::Leaf(p), net.port(p).data_type.clone()));
            }
            v
        }
        Process::Composite(c) => c
            .io_ports
            .iter()
            .map(|&io| {
                let iop = net.io_port(io);
                (
                    iop.direction,
                    Endpoint::Io(io, Face::Outside),
                    iop.outside_type.clone(),
                )
            })
            .collect(),
    }
}

fn parallelize_group(
    net: &mut ProcessNetwork,
    parent: ProcessId,
    group: &[ProcessId],
) -> F2ccResult<()> {
    let n = group.len() as u64;
    let representative = group[0];

    let rep_slots = interface_slots(net, representative);
    let member_slots: Vec<_> = group.iter().map(|&m| interface_slots(net, m)).collect();

    if let Some(c) = net.process_mut(parent).as_composite_mut() {
        c.children.retain(|id| !group.contains(id));
    }

    let pc_id = net.reserve_process();
    let mut new_io_ports = Vec::new();

    for (slot_idx, &(direction, rep_ep, ref elem_ty)) in rep_slots.iter().enumerate() {
        let array_ty = DataType::array(elem_ty.kind.clone(), Some(n)).with_const(elem_ty.is_const);
        match direction {
            Direction::In => {
                let zipx_id = net.reserve_process();
                let mut zipx_ins = Vec::with_capacity(group.len());
                for (member_idx, slots) in member_slots.iter().enumerate() {
                    let (_, m_ep, m_ty) = &slots[slot_idx];
                    let zin = net.add_port(Port::new(
                        format!("in{}", member_idx + 1),
                        zipx_id,
                        Direction::In,
                        m_ty.clone(),
                    ));
                    zipx_ins.push(zin);
                    if let Some(producer) = net.peer_of(*m_ep) {
                        net.disconnect(*m_ep);
                        net.connect(producer, Endpoint::Leaf(zin));
                    }
                }
                let zout = net.add_port(Port::new("out1", zipx_id, Direction::Out, array_ty.clone()));
                net.install_process(
                    zipx_id,
                    Process::Leaf(Leaf {
                        common: ProcessCommon::new(
                            format!("zipx{}", net.fresh_process_suffix()),
                            Some(parent),
                        ),
                        in_ports: zipx_ins,
                        out_ports: vec![zout],
                        variant: LeafVariant::ZipX,
                    }),
                );
                if let Some(c) = net.process_mut(parent).as_composite_mut() {
                    c.children.push(zipx_id);
                }

                let io_id = net.add_io_port(IOPort::new(
                    format!("in{}", slot_idx + 1),
                    pc_id,
                    Direction::In,
                    array_ty,
                    elem_ty.clone(),
                ));
                net.connect(Endpoint::Leaf(zout), Endpoint::Io(io_id, Face::Outside));
                net.connect(Endpoint::Io(io_id, Face::Inside), rep_ep);
                new_io_ports.push(io_id);
            }
            Direction::Out => {
                let unzipx_id = net.reserve_process();
                let uin = net.add_port(Port::new("in1", unzipx_id, Direction::In, array_ty.clone()));
                let mut unzipx_outs = Vec::with_capacity(group.len());
                for (member_idx, slots) in member_slots.iter().enumerate() {
                    let (_, m_ep, m_ty) = &slots[slot_idx];
                    let uout = net.add_port(Port::new(
                        format!("out{}", member_idx + 1),
                        unzipx_id,
                        Direction::Out,
                        m_ty.clone(),
                    ));
                    unzipx_outs.push(uout);
                    if let Some(consumer) = net.peer_of(*m_ep) {
                        net.disconnect(*m_ep);
                        net.connect(Endpoint::Leaf(uout), consumer);
                    }
                }
                net.install_process(
                    unzipx_id,
                    Process::Leaf(Leaf {
                        common: ProcessCommon::new(
                            format!("unzipx{}", net.fresh_process_suffix()),
                            Some(parent),
                        ),
                        in_ports: vec![uin],
                        out_ports: unzipx_outs,
                        variant: LeafVariant::UnzipX,
                    }),
                );
                if let Some(c) = net.process_mut(parent).as_composite_mut() {
                    c.children.push(unzipx_id);
                }

                let io_id = net.add_io_port(IOPort::new(
                    format!("out{}", slot_idx + 1),
                    pc_id,
                    Direction::Out,
                    array_ty,
                    elem_ty.clone(),
                ));
                net.connect(Endpoint::Io(io_id, Face::Outside), Endpoint::Leaf(uin));
                net.connect(rep_ep, Endpoint::Io(io_id, Face::Inside));
                new_io_ports.push(io_id);
            }
        }
    }

    net.install_process(
        pc_id,
        Process::Composite(Composite {
            common: ProcessCommon::new(format!("parallel{}", net.fresh_process_suffix()), Some(parent)),
            children: vec![representative],
            io_ports: new_io_ports,
            parallel: Some(ParallelInfo {
                replication: n,
                contained: representative,
            }),
        }),
    );
    net.process_mut(representative).common_mut().parent = Some(pc_id);
    if let Some(c) = net.process_mut(parent).as_composite_mut() {
        c.children.push(pc_id);
    }
    net.recompute_hierarchy(pc_id);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use f2cc_ir::{CombKind, DataType as Dt, PrimKind};

    fn leaf_map(net: &mut ProcessNetwork, parent: ProcessId, name: &str, fname: &str) -> ProcessId {
        let scalar = Dt::scalar(PrimKind::Int32);
        let id = net.reserve_process();
        let in_p = net.add_port(Port::new("in1", id, Direction::In, scalar.clone()));
        let out_p = net.add_port(Port::new("out1", id, Direction::Out, scalar));
        net.install_process(
            id,
            Process::Leaf(Leaf {
                common: ProcessCommon::new(name, Some(parent)),
                in_ports: vec![in_p],
                out_ports: vec![out_p],
                variant: LeafVariant::Comb(CombKind::Map(fname.into())),
            }),
        );
        if let Some(c) = net.process_mut(parent).as_composite_mut() {
            c.children.push(id);
        }
        id
    }

    #[test]
    fn collapses_two_equivalent_combs_into_one_parallel_composite() {
        let mut net = ProcessNetwork::new("t");
        let root = net.root;
        let a = leaf_map(&mut net, root, "map1", "f");
        let b = leaf_map(&mut net, root, "map2", "f");
        let a_in = net.process(a).as_leaf().unwrap().in_ports[0];
        let b_in = net.process(b).as_leaf().unwrap().in_ports[0];
        net.model_inputs.push(Endpoint::Leaf(a_in));
        net.model_inputs.push(Endpoint::Leaf(b_in));
        let a_out = net.process(a).as_leaf().unwrap().out_ports[0];
        let b_out = net.process(b).as_leaf().unwrap().out_ports[0];
        net.model_outputs.push(Endpoint::Leaf(a_out));
        net.model_outputs.push(Endpoint::Leaf(b_out));

        hierarchical_parallelize(&mut net).unwrap();

        let children = net.process(root).as_composite().unwrap().children.clone();
        let pcomp = children
            .iter()
            .find(|&&id| net.process(id).as_composite().map_or(false, |c| c.parallel.is_some()))
            .copied()
            .expect("a ParallelComposite sibling");
        let info = net.process(pcomp).as_composite().unwrap().parallel.clone().unwrap();
        assert_eq!(info.replication, 2);
        assert_eq!(net.process(info.contained).common().parent, Some(pcomp));
    }
}
