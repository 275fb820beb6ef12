//! Branch value-equality (§4.2.2): "modulo Id — same function body and
//! port data types". Two leaves compare equal when they are the same
//! variant, reference the same function(s) by name (function bodies are
//! themselves deduplicated by name in the registry, §4.1), and carry the
//! same port data types in order.

use f2cc_ir::{LeafVariant, ProcessId, ProcessNetwork};

pub fn leaves_equal(net: &ProcessNetwork, a: ProcessId, b: ProcessId) -> bool {
    let (Some(la), Some(lb)) = (
        net.process(a).as_leaf(),
        net.process(b).as_leaf(),
    ) else {
        return false;
    };
    if !variant_eq(&la.variant, &lb.variant) {
        return false;
    }
    if la.in_ports.len() != lb.in_ports.len() || la.out_ports.len() != lb.out_ports.len() {
        return false;
    }
    la.in_ports
        .iter()
        .zip(&lb.in_ports)
        .all(|(&p, &q)| net.port(p).data_type == net.port(q).data_type)
        && la
            .out_ports
            .iter()
            .zip(&lb.out_ports)
            .all(|(&p, &q)| net.port(p).data_type == net.port(q).data_type)
}

fn variant_eq(a: &LeafVariant, b: &LeafVariant) -> bool {
    use f2cc_ir::CombKind::*;
    match (a, b) {
        (LeafVariant::Comb(Map(f)), LeafVariant::Comb(Map(g))) => f == g,
        (LeafVariant::Comb(ZipWithN(f)), LeafVariant::Comb(ZipWithN(g))) => f == g,
        (LeafVariant::Comb(CoalescedMap(f)), LeafVariant::Comb(CoalescedMap(g))) => f == g,
        (
            LeafVariant::Comb(ParallelMap {
                replication: ra,
                functions: fa,
            }),
            LeafVariant::Comb(ParallelMap {
                replication: rb,
                functions: fb,
            }),
        ) => ra == rb && fa == fb,
        (LeafVariant::Delay { init_value: a }, LeafVariant::Delay { init_value: b }) => a == b,
        (LeafVariant::ZipX, LeafVariant::ZipX) => true,
        (LeafVariant::UnzipX, LeafVariant::UnzipX) => true,
        (LeafVariant::Fanout, LeafVariant::Fanout) => true,
        _ => false,
    }
}

/// Two chains are equal iff they have the same length and every
/// corresponding pair of leaves is equal (§4.2.2: "Branch equality uses
/// leaf value-equality rather than reference equality").
pub fn chains_equal(net: &ProcessNetwork, a: &[ProcessId], b: &[ProcessId]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| leaves_equal(net, x, y))
}
