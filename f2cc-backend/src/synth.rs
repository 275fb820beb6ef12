//! The Synthesizer's top-level entry point (§4.4): run all eleven
//! steps over a ModelModifier-transformed network and return the
//! generated translation unit.

use crate::{delay, emit, rename, scheduler, signal_set, types, wrap};
use f2cc_ir::ProcessNetwork;
use f2cc_utils::{Config, F2ccResult};

pub use emit::CodeSet;

/// Run the full Synthesizer pipeline. `net` is mutated in place (Step 2
/// renames functions, Steps 4/5 insert wrapper functions) but its graph
/// topology is never touched, matching §9's Design Note: "the Synthesizer
/// mutates the model only by data-type annotation and function insertion,
/// never by altering topology."
pub fn synthesize(net: &mut ProcessNetwork, cfg: &Config) -> F2ccResult<CodeSet> {
    // Step 1: validate.
    net.check_invariants()?;

    let sched = scheduler::schedule(net)?;

    // Steps 2-3: rename then dedup functions, in schedule order.
    rename::rename_and_dedup_functions(net, &sched)?;

    // Steps 4-5: wrap coalesced chains and parallel-map replicas.
    let wrap_out = wrap::wrap_chains(net, cfg)?;

    // Step 6: materialize signals.
    let mut signals = signal_set::build(net, &sched)?;

    // Steps 7-9: infer types, then array sizes, then mark constness.
    types::infer_types(net, &mut signals)?;
    types::infer_array_sizes(net, &mut signals)?;
    types::mark_model_input_consts(&mut signals);

    // Step 10: allocate delay storage.
    let delay_vars = delay::collect_delay_vars(net, &signals, &sched)?;

    // Step 11: emit.
    let raw: Vec<String> = wrap_out.raw.into_iter().map(|r| r.text).collect();
    emit::emit(
        net,
        cfg,
        &sched,
        &signals,
        &delay_vars,
        &raw,
        &wrap_out.device_functions,
    )
}
