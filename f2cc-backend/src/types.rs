//! Synthesizer Steps 7–9 (§4.4): infer every [`Signal`]'s data type,
//! then its array size, then mark model-input arrays `const`.
//!
//! Per §9's Design Notes, the source's "first success wins" ambiguity
//! between the backward and forward searches is tightened here: when
//! both searches yield a concrete type, they must agree (same
//! primitive kind and array-ness) or the signal fails with
//! `InvalidModel` naming both endpoints, rather than silently
//! preferring one.

use crate::signal_set::SignalSet;
use f2cc_ir::{CombKind, DataType, Endpoint, LeafVariant, PortId, ProcessNetwork, Signal};
use f2cc_utils::{Error, F2ccResult, Id};

/// Step 7: assign every signal a `DataType` (kind, array-ness, const,
/// pointer); `array_size` is left for [`infer_array_sizes`] except
/// where a leaf's own semantics determines it directly (`ParallelMap`).
pub fn infer_types(net: &ProcessNetwork, signals: &mut SignalSet) -> F2ccResult<()> {
    let keys: Vec<Signal> = signals.iter().map(|(s, _)| s.clone()).collect();
    for sig in &keys {
        let backward = match sig.out {
            Some(Endpoint::Leaf(p)) => Some(backward_type(net, p)?),
            _ => None,
        };
        let forward = match sig.in_ {
            Some(Endpoint::Leaf(p)) => Some(net.port(p).data_type.clone()),
            _ => None,
        };
        let ty = reconcile(signals, sig, backward, forward)?;
        signals.get_mut(sig).unwrap().data_type = Some(ty);
    }
    Ok(())
}

fn reconcile(
    signals: &SignalSet,
    sig: &Signal,
    backward: Option<DataType>,
    forward: Option<DataType>,
) -> F2ccResult<DataType> {
    match (backward, forward) {
        (Some(b), Some(f)) => {
            if !b.compatible_with(&f) {
                let name = signals
                    .get(sig)
                    .and_then(|i| i.var_name.clone())
                    .unwrap_or_default();
                return Err(Error::invalid_model(format!(
                    "signal `{name}`: producer type `{b}` disagrees with consumer type `{f}`"
                )));
            }
            Ok(DataType {
                is_const: f.is_const || b.is_const,
                is_pointer: f.is_pointer,
                array_size: b.array_size.or(f.array_size),
                ..b
            })
        }
        (Some(b), None) => Ok(b),
        (None, Some(f)) => Ok(f),
        (None, None) => Err(Error::invalid_model(
            "signal has neither a resolvable producer nor consumer type",
        )),
    }
}

/// The authoritative type a producing leaf gives to the out-port `port`
/// (§4.4 Step 7's backward search).
fn backward_type(net: &ProcessNetwork, port: PortId) -> F2ccResult<DataType> {
    let owner = net.port(port).owner;
    let leaf = net
        .process(owner)
        .as_leaf()
        .ok_or_else(|| Error::cast(format!("producer `{}` is not a leaf", net.process(owner).id())))?;
    match &leaf.variant {
        LeafVariant::Comb(kind) => comb_result_type(net, kind),
        LeafVariant::ZipX => {
            let first_in = net.port(leaf.in_ports[0]).data_type.clone();
            let elem = as_element(&first_in);
            Ok(DataType::array(elem.kind, None).with_const(elem.is_const))
        }
        LeafVariant::UnzipX => {
            let own_declared = &net.port(port).data_type;
            let in_arr = &net.port(leaf.in_ports[0]).data_type;
            if own_declared.is_array {
                Ok(DataType::array(in_arr.kind.clone(), None).with_const(in_arr.is_const))
            } else {
                Ok(in_arr.element_type())
            }
        }
        // A delay passes its stored value through unchanged; a fanout
        // copies its single input verbatim (§4.4 Step 7: "otherwise
        // recurse via the producing leaf's in-ports").
        LeafVariant::Delay { .. } => Ok(net.port(port).data_type.clone()),
        LeafVariant::Fanout => Ok(net.port(leaf.in_ports[0]).data_type.clone()),
    }
}

fn as_element(ty: &DataType) -> DataType {
    if ty.is_array {
        ty.element_type()
    } else {
        ty.clone()
    }
}

fn comb_result_type(net: &ProcessNetwork, kind: &CombKind) -> F2ccResult<DataType> {
    match kind {
        CombKind::Map(f) | CombKind::ZipWithN(f) => Ok(lookup(net, *f)?.result_type().clone()),
        CombKind::CoalescedMap(fs) => {
            let last = fs
                .last()
                .ok_or_else(|| Error::invalid_model("CoalescedMap leaf has no functions"))?;
            Ok(lookup(net, *last)?.result_type().clone())
        }
        CombKind::ParallelMap {
            replication,
            functions,
        } => {
            let last = functions
                .last()
                .ok_or_else(|| Error::invalid_model("ParallelMap leaf has no functions"))?;
            let inner = lookup(net, *last)?.result_type().clone();
            if inner.is_array {
                Ok(DataType {
                    array_size: inner.array_size.map(|s| s * replication),
                    ..inner
                })
            } else {
                Ok(DataType::array(inner.kind.clone(), Some(*replication))
                    .with_const(inner.is_const))
            }
        }
    }
}

fn lookup(net: &ProcessNetwork, name: Id) -> F2ccResult<&f2cc_ir::Function> {
    net.functions
        .get(name)
        .ok_or_else(|| Error::illegal_state(format!("function `{name}` is not registered")))
}

/// Step 8: fill in every still-unknown array size by a fixed-point
/// sweep over `zipx`'s "out size = sum of in sizes" /
/// `unzipx`'s "in size = sum of out sizes" rules (§4.4 Step 8), plus
/// pass-through for any other leaf whose in/out array element kinds
/// match. Fatal (`UnknownArraySize`) if anything is still unresolved
/// once the sweep reaches a fixed point.
pub fn infer_array_sizes(net: &ProcessNetwork, signals: &mut SignalSet) -> F2ccResult<()> {
    let leaves = net.reachable_leaves(net.root);
    let rounds = signals.iter().count() * 2 + 8;
    for _ in 0..rounds {
        let mut changed = false;
        for &id in &leaves {
            changed |= propagate_leaf(net, signals, id)?;
        }
        if !changed {
            break;
        }
    }
    for (sig, info) in signals.iter() {
        if let Some(ty) = &info.data_type {
            if ty.is_array && ty.array_size.is_none() {
                return Err(Error::unknown_array_size(Id::new(
                    info.var_name.clone().unwrap_or_default(),
                )));
            }
        }
        let _ = sig;
    }
    Ok(())
}

pub(crate) fn signal_array_size(signals: &SignalSet, port: PortId) -> Option<u64> {
    signals
        .iter()
        .find(|(s, _)| s.in_ == Some(Endpoint::Leaf(port)) || s.out == Some(Endpoint::Leaf(port)))
        .and_then(|(_, i)| i.data_type.as_ref())
        .and_then(|t| if t.is_array { t.array_size } else { Some(1) })
}

fn set_signal_array_size(
    net: &ProcessNetwork,
    signals: &mut SignalSet,
    port: PortId,
    size: u64,
) -> bool {
    let mut changed = false;
    for &ep in [Endpoint::Leaf(port)].iter() {
        let sigs: Vec<Signal> = signals
            .iter()
            .filter(|(s, _)| s.in_ == Some(ep) || s.out == Some(ep))
            .map(|(s, _)| s.clone())
            .collect();
        for sig in sigs {
            if let Some(info) = signals.get_mut(&sig) {
                if let Some(ty) = &mut info.data_type {
                    if ty.is_array && ty.array_size.is_none() {
                        ty.array_size = Some(size);
                        changed = true;
                    }
                }
            }
        }
    }
    let _ = net;
    changed
}

fn propagate_leaf(
    net: &ProcessNetwork,
    signals: &mut SignalSet,
    id: f2cc_ir::ProcessId,
) -> F2ccResult<bool> {
    let leaf = net.process(id).as_leaf().unwrap();
    let mut changed = false;
    match &leaf.variant {
        LeafVariant::ZipX => {
            let sizes: Option<u64> = leaf
                .in_ports
                .iter()
                .try_fold(0u64, |acc, &p| signal_array_size(signals, p).map(|s| acc + s));
            if let Some(total) = sizes {
                changed |= set_signal_array_size(net, signals, leaf.out_ports[0], total);
            }
        }
        LeafVariant::UnzipX => {
            let sizes: Option<u64> = leaf
                .out_ports
                .iter()
                .try_fold(0u64, |acc, &p| signal_array_size(signals, p).map(|s| acc + s));
            if let Some(total) = sizes {
                changed |= set_signal_array_size(net, signals, leaf.in_ports[0], total);
            }
        }
        LeafVariant::Comb(CombKind::ParallelMap {
            replication,
            functions,
        }) => {
            let last = functions.last().ok_or_else(|| {
                Error::invalid_model("ParallelMap leaf has no functions")
            })?;
            let f = lookup(net, *last)?;
            let per_replica_in = f
                .params
                .iter()
                .find(|p| !p.is_output)
                .and_then(|p| p.ty.array_size)
                .unwrap_or(1);
            changed |= set_signal_array_size(
                net,
                signals,
                leaf.in_ports[0],
                replication * per_replica_in,
            );
        }
        LeafVariant::Delay { .. } | LeafVariant::Fanout => {
            if let Some(size) = leaf
                .in_ports
                .iter()
                .chain(leaf.out_ports.iter())
                .find_map(|&p| signal_array_size(signals, p))
            {
                for &p in leaf.in_ports.iter().chain(leaf.out_ports.iter()) {
                    changed |= set_signal_array_size(net, signals, p, size);
                }
            }
        }
        LeafVariant::Comb(CombKind::Map(_) | CombKind::CoalescedMap(_)) => {
            // A single-in/single-out elementwise transform: if the in and
            // out ports agree on kind and are both arrays, their sizes
            // must match (§9: conservative pass-through, not assumed for
            // genuinely reshaping transforms, which this IR has no way
            // to express differently anyway).
            if leaf.in_ports.len() == 1 && leaf.out_ports.len() == 1 {
                let in_p = leaf.in_ports[0];
                let out_p = leaf.out_ports[0];
                if net.port(in_p).data_type.kind == net.port(out_p).data_type.kind {
                    if let Some(size) = signal_array_size(signals, in_p) {
                        changed |= set_signal_array_size(net, signals, out_p, size);
                    }
                    if let Some(size) = signal_array_size(signals, out_p) {
                        changed |= set_signal_array_size(net, signals, in_p, size);
                    }
                }
            }
        }
        LeafVariant::Comb(CombKind::ZipWithN(_)) => {}
    }
    Ok(changed)
}

/// Step 9: every model-level input array signal is marked `const`.
pub fn mark_model_input_consts(signals: &mut SignalSet) {
    let inputs = signals.model_input_signals.clone();
    for sig in inputs {
        if let Some(info) = signals.get_mut(&sig) {
            if let Some(ty) = &mut info.data_type {
                if ty.is_array {
                    ty.is_const = true;
                }
            }
        }
    }
}
