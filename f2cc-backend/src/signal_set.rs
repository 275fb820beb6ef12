//! Synthesizer Step 6 (§4.4): materialize one [`Signal`] per reachable
//! edge of the schedule, deduplicated structurally by (out-port,
//! in-port) with a `HashMap<key, canonical>` to collapse repeats.

use crate::boundary::{model_input_leaf_port, model_output_leaf_port, resolve_leaf};
use f2cc_ir::{Endpoint, ProcessId, ProcessNetwork, Signal, SignalInfo};
use f2cc_utils::{Error, F2ccResult};
use std::collections::HashMap;

/// The synthesizer's accumulated view of every [`Signal`] in the
/// network, plus the model-level input/output ordinals used to name
/// `executeProcessNetwork`'s parameters (§4.4 Step 11).
pub struct SignalSet {
    infos: HashMap<Signal, SignalInfo>,
    /// Insertion order, used only as a stable iteration fallback before
    /// variable names are assigned; final emission order is by name
    /// (§9: "Ordering used in sets is the lexicographic order of the
    /// derived variable name").
    order: Vec<Signal>,
    /// `Signal` (model input, ordinal) in declaration order.
    pub model_input_signals: Vec<Signal>,
    /// `Signal` (model output, ordinal) in declaration order.
    pub model_output_signals: Vec<Signal>,
}

impl SignalSet {
    fn get_or_insert(&mut self, sig: Signal) -> &mut SignalInfo {
        if !self.infos.contains_key(&sig) {
            self.infos.insert(sig.clone(), SignalInfo::new());
            self.order.push(sig.clone());
        }
        self.infos.get_mut(&sig).unwrap()
    }

    pub fn get(&self, sig: &Signal) -> Option<&SignalInfo> {
        self.infos.get(sig)
    }

    pub fn get_mut(&mut self, sig: &Signal) -> Option<&mut SignalInfo> {
        self.infos.get_mut(sig)
    }

    /// Every signal, in stable variable-name order. Panics (an
    /// `IllegalState` in `debug_assert` terms) if called before every
    /// signal has a name, which [`build`] guarantees.
    pub fn ordered(&self) -> Vec<(&Signal, &SignalInfo)> {
        let mut v: Vec<_> = self.infos.iter().collect();
        v.sort_by(|a, b| {
            a.1.var_name
                .as_deref()
                .unwrap_or_default()
                .cmp(b.1.var_name.as_deref().unwrap_or_default())
        });
        v
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Signal, &SignalInfo)> {
        self.infos.iter()
    }
}

/// Build the full [`SignalSet`] for `net`'s `schedule` (§4.4 Step 6):
/// one signal per model input, one per model output, and one per
/// leaf-to-leaf edge, each assigned a generated variable name.
pub fn build(net: &ProcessNetwork, schedule: &[ProcessId]) -> F2ccResult<SignalSet> {
    let mut set = SignalSet {
        infos: HashMap::new(),
        order: Vec::new(),
        model_input_signals: Vec::new(),
        model_output_signals: Vec::new(),
    };

    for &ep in &net.model_inputs {
        let leaf_port = model_input_leaf_port(net, ep).ok_or_else(|| {
            Error::invalid_model("model input does not resolve to any leaf port")
        })?;
        let sig = Signal::new(None, Some(Endpoint::Leaf(leaf_port)));
        name_signal(net, &sig, set.get_or_insert(sig.clone()));
        set.model_input_signals.push(sig);
    }

    for &ep in &net.model_outputs {
        let leaf_port = model_output_leaf_port(net, ep).ok_or_else(|| {
            Error::invalid_model("model output does not resolve to any leaf port")
        })?;
        let sig = Signal::new(Some(Endpoint::Leaf(leaf_port)), None);
        name_signal(net, &sig, set.get_or_insert(sig.clone()));
        set.model_output_signals.push(sig);
    }

    for &id in schedule {
        let leaf = net
            .process(id)
            .as_leaf()
            .expect("schedule only contains leaves");
        for &in_port in &leaf.in_ports {
            let producer = resolve_leaf(net, Endpoint::Leaf(in_port));
            let sig = Signal::new(
                producer.map(Endpoint::Leaf),
                Some(Endpoint::Leaf(in_port)),
            );
            name_signal(net, &sig, set.get_or_insert(sig.clone()));
        }
    }

    Ok(set)
}

/// Derive a stable C variable name from a signal's endpoints: prefer
/// the producer side (`v_<leaf>_<port>`) since it is the more
/// informative "who made this value" name; fall back to the consumer
/// side for a model-level input, whose producer is absent (§3, §9).
fn name_signal(net: &ProcessNetwork, sig: &Signal, info: &mut SignalInfo) {
    if info.var_name.is_some() {
        return;
    }
    let name = if let Some(Endpoint::Leaf(p)) = sig.out {
        let owner = net.port(p).owner;
        format!("v_{}_{}", net.process(owner).id(), net.port(p).id)
    } else if let Some(Endpoint::Leaf(p)) = sig.in_ {
        format!("v_{}", net.port(p).id)
    } else {
        unreachable!("a signal always has at least one endpoint")
    };
    info.var_name = Some(name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::schedule;
    use f2cc_ir::{
        CombKind, DataType, Direction, Leaf, LeafVariant, Port, PrimKind, Process, ProcessCommon,
    };

    #[test]
    fn model_io_signals_get_in_and_out_based_names() {
        let mut net = ProcessNetwork::new("t");
        let root = net.root;
        let scalar = DataType::scalar(PrimKind::Int32);
        let id = net.reserve_process();
        let in_p = net.add_port(Port::new("in1", id, Direction::In, scalar.clone()));
        let out_p = net.add_port(Port::new("out1", id, Direction::Out, scalar));
        net.install_process(
            id,
            Process::Leaf(Leaf {
                common: ProcessCommon::new("map1", Some(root)),
                in_ports: vec![in_p],
                out_ports: vec![out_p],
                variant: LeafVariant::Comb(CombKind::Map("f".into())),
            }),
        );
        net.process_mut(root).as_composite_mut().unwrap().children.push(id);
        net.model_inputs.push(Endpoint::Leaf(in_p));
        net.model_outputs.push(Endpoint::Leaf(out_p));

        let sched = schedule(&net).unwrap();
        let set = build(&net, &sched).unwrap();
        let in_sig = &set.model_input_signals[0];
        let out_sig = &set.model_output_signals[0];
        assert_eq!(set.get(in_sig).unwrap().var_name.as_deref(), Some("v_in1"));
        assert_eq!(
            set.get(out_sig).unwrap().var_name.as_deref(),
            Some("v_map1_out1")
        );
    }
}
