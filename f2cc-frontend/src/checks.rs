//! Post-parse model checking: beyond the generic §3 invariants already
//! enforced by [`f2cc_ir::ProcessNetwork::check_invariants`], every port
//! must be connected, must not loop back onto its own process, and its
//! peer's owning process must itself be registered in the network.

use f2cc_ir::{Endpoint, ProcessNetwork};
use f2cc_utils::{Error, F2ccResult};

pub fn check_model(net: &ProcessNetwork) -> F2ccResult<()> {
    net.check_invariants()?;
    check_ports(net)?;
    Ok(())
}

fn check_ports(net: &ProcessNetwork) -> F2ccResult<()> {
    for id in net.process_ids() {
        let Some(leaf) = net.process(id).as_leaf() else {
            continue;
        };
        for &p in leaf.in_ports.iter().chain(leaf.out_ports.iter()) {
            let ep = Endpoint::Leaf(p);
            let peer = net.peer_of(ep).ok_or_else(|| {
                Error::invalid_model(format!(
                    "port `{}` of process `{}` is not connected",
                    net.port(p).id,
                    net.process(id).id(),
                ))
            })?;
            let peer_owner = net.endpoint_owner(peer);
            if peer_owner == id {
                return Err(Error::invalid_model(format!(
                    "port `{}` of process `{}` loops back onto its own process",
                    net.port(p).id,
                    net.process(id).id(),
                )));
            }
            if net.process(peer_owner).id() == f2cc_utils::Id::new("<reserved>") {
                return Err(Error::invalid_model(format!(
                    "port `{}` of process `{}` is bound to a peer owned by \
                     an unregistered process",
                    net.port(p).id,
                    net.process(id).id(),
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use f2cc_ir::{DataType, Direction, Port, PrimKind, Process};

    #[test]
    fn rejects_unconnected_port() {
        let mut net = ProcessNetwork::new("t");
        let root = net.root;
        let id = net.reserve_process();
        let pid = net.add_port(Port::new(
            "in1",
            id,
            Direction::In,
            DataType::scalar(PrimKind::Int32),
        ));
        let leaf = f2cc_ir::Leaf {
            common: f2cc_ir::ProcessCommon::new("p", Some(root)),
            in_ports: vec![pid],
            out_ports: vec![],
            variant: f2cc_ir::LeafVariant::Fanout,
        };
        net.install_process(id, Process::Leaf(leaf));
        if let Some(c) = net.process_mut(root).as_composite_mut() {
            c.children.push(id);
        }
        net.recompute_hierarchy(id);
        assert!(check_model(&net).is_err());
    }
}
