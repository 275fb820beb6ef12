//! Scheduler (§4.3): a total order over every Leaf reachable from the
//! root such that, for every non-delay signal, the producer precedes the
//! consumer. Built directly on `petgraph`: one node per leaf, one edge
//! per non-delay signal, `toposort` for the order.

use crate::boundary::resolve_leaf;
use f2cc_ir::{Endpoint, LeafVariant, ProcessId, ProcessNetwork};
use f2cc_utils::{Error, F2ccResult};
use petgraph::{
    algo,
    graph::{DiGraph, NodeIndex},
};
use std::collections::HashMap;

/// Produce the schedule: every reachable leaf, delay leaves included (a
/// `delay`'s emitter is a no-op — §4.4 Step 11.6 — so its position among
/// the isolated nodes petgraph assigns it is immaterial), ordered so
/// every non-delay edge runs producer-before-consumer.
pub fn schedule(net: &ProcessNetwork) -> F2ccResult<Vec<ProcessId>> {
    let leaves = net.reachable_leaves(net.root);
    let mut graph: DiGraph<ProcessId, ()> = DiGraph::new();
    let mut nodes: HashMap<ProcessId, NodeIndex> = HashMap::new();
    for &id in &leaves {
        nodes.insert(id, graph.add_node(id));
    }

    for &id in &leaves {
        let leaf = net
            .process(id)
            .as_leaf()
            .expect("reachable_leaves only returns leaves");
        if matches!(leaf.variant, LeafVariant::Delay { .. }) {
            // A delay is a sequential boundary: its two-phase read/write
            // (§4.4 Steps 5/7) never induces a scheduling edge.
            continue;
        }
        for &in_port in &leaf.in_ports {
            let Some(producer_port) = resolve_leaf(net, Endpoint::Leaf(in_port)) else {
                continue;
            };
            let producer = net.port(producer_port).owner;
            if let Some(producer_leaf) = net.process(producer).as_leaf() {
                if matches!(producer_leaf.variant, LeafVariant::Delay { .. }) {
                    continue;
                }
            }
            if let (Some(&a), Some(&b)) = (nodes.get(&producer), nodes.get(&id)) {
                graph.add_edge(a, b, ());
            }
        }
    }

    algo::toposort(&graph, None)
        .map(|order| order.into_iter().map(|idx| graph[idx]).collect())
        .map_err(|cycle| {
            let culprits: Vec<String> = algo::kosaraju_scc(&graph)
                .into_iter()
                .filter(|scc| scc.len() > 1 || scc.contains(&cycle.node_id()))
                .flat_map(|scc| scc.into_iter().map(|idx| net.process(graph[idx]).id().to_string()))
                .collect();
            Error::invalid_model(format!(
                "scheduling failed: non-delay cycle among leaves [{}]",
                culprits.join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use f2cc_ir::{CombKind, DataType, Direction, Leaf, Port, PrimKind, Process, ProcessCommon};

    fn map_leaf(net: &mut ProcessNetwork, parent: ProcessId, name: &str, fname: &str) -> ProcessId {
        let scalar = DataType::scalar(PrimKind::Int32);
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
    fn orders_a_chain_of_two_maps_producer_first() {
        let mut net = ProcessNetwork::new("t");
        let root = net.root;
        let a = map_leaf(&mut net, root, "map1", "f");
        let b = map_leaf(&mut net, root, "map2", "g");
        let a_out = net.process(a).as_leaf().unwrap().out_ports[0];
        let b_in = net.process(b).as_leaf().unwrap().in_ports[0];
        net.connect(Endpoint::Leaf(a_out), Endpoint::Leaf(b_in));

        let order = schedule(&net).unwrap();
        let pos_a = order.iter().position(|&p| p == a).unwrap();
        let pos_b = order.iter().position(|&p| p == b).unwrap();
        assert!(pos_a < pos_b);
    }

    #[test]
    fn a_one_step_delay_feedback_loop_is_schedulable() {
        // map(f) -> delay(0) -> map(f), the delay edges excluded (Scenario E).
        let mut net = ProcessNetwork::new("t");
        let root = net.root;
        let m1 = map_leaf(&mut net, root, "map1", "f");
        let m2 = map_leaf(&mut net, root, "map2", "f");

        let scalar = DataType::scalar(PrimKind::Int32);
        let d_id = net.reserve_process();
        let d_in = net.add_port(Port::new("in1", d_id, Direction::In, scalar.clone()));
        let d_out = net.add_port(Port::new("out1", d_id, Direction::Out, scalar));
        net.install_process(
            d_id,
            Process::Leaf(Leaf {
                common: ProcessCommon::new("delay1", Some(root)),
                in_ports: vec![d_in],
                out_ports: vec![d_out],
                variant: LeafVariant::Delay {
                    init_value: "0".into(),
                },
            }),
        );
        net.process_mut(root).as_composite_mut().unwrap().children.push(d_id);

        let m1_out = net.process(m1).as_leaf().unwrap().out_ports[0];
        let m2_in = net.process(m2).as_leaf().unwrap().in_ports[0];
        let m2_out = net.process(m2).as_leaf().unwrap().out_ports[0];
        let m1_in = net.process(m1).as_leaf().unwrap().in_ports[0];

        net.connect(Endpoint::Leaf(m1_out), Endpoint::Leaf(d_in));
        net.connect(Endpoint::Leaf(d_out), Endpoint::Leaf(m2_in));
        net.connect(Endpoint::Leaf(m2_out), Endpoint::Leaf(m1_in));

        let order = schedule(&net).unwrap();
        assert_eq!(order.len(), 3);
    }
}
