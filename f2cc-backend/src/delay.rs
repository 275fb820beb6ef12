//! Synthesizer Step 10 (§4.4): allocate one static storage variable per
//! `delay` leaf. The delay's own in/out ports still get ordinary
//! [`crate::Signal`]s from Step 6 — `v_delay_element<n>` is the extra
//! piece of state that persists the value *between* invocations of
//! `executeProcessNetwork`, copied into the out-signal at the top of
//! the body and refreshed from the in-signal at the bottom (§4.4 Step
//! 11.5, 11.7).

use crate::boundary::resolve_leaf;
use crate::signal_set::SignalSet;
use f2cc_ir::{DataType, Endpoint, LeafVariant, ProcessId, ProcessNetwork, Signal};
use f2cc_utils::{Error, F2ccResult};

pub struct DelayVar {
    pub leaf: ProcessId,
    pub static_name: String,
    pub ty: DataType,
    pub init_value: String,
    /// The ordinary signal fed by this delay's stored value.
    pub out_signal: Signal,
    /// The ordinary signal this delay latches at the end of a cycle.
    pub in_signal: Signal,
}

/// One `DelayVar` per delay leaf in `schedule`, numbered by their
/// position among delays in schedule order.
pub fn collect_delay_vars(
    net: &ProcessNetwork,
    signals: &SignalSet,
    schedule: &[ProcessId],
) -> F2ccResult<Vec<DelayVar>> {
    let mut out = Vec::new();
    let mut n = 0u64;
    for &id in schedule {
        let leaf = net.process(id).as_leaf().unwrap();
        let LeafVariant::Delay { init_value } = &leaf.variant else {
            continue;
        };
        n += 1;
        let out_port = leaf.out_ports[0];
        let in_port = leaf.in_ports[0];

        let out_signal = find_by_out(signals, out_port).ok_or_else(|| {
            Error::illegal_state(format!(
                "delay `{}`'s out-port has no signal from Step 6",
                net.process(id).id()
            ))
        })?;
        let producer = resolve_leaf(net, Endpoint::Leaf(in_port));
        let in_signal = Signal::new(producer.map(Endpoint::Leaf), Some(Endpoint::Leaf(in_port)));

        out.push(DelayVar {
            leaf: id,
            static_name: format!("v_delay_element{n}"),
            ty: net.port(out_port).data_type.clone(),
            init_value: init_value.clone(),
            out_signal,
            in_signal,
        });
    }
    Ok(out)
}

fn find_by_out(signals: &SignalSet, port: f2cc_ir::PortId) -> Option<Signal> {
    signals
        .iter()
        .find(|(s, _)| s.out == Some(Endpoint::Leaf(port)))
        .map(|(s, _)| s.clone())
}
