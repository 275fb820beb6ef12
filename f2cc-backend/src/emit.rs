//! Synthesizer Step 11 (§4.4): emit the C/CUDA-C header and
//! implementation for `executeProcessNetwork`, the schedule-ordered
//! translation of the network's leaves.

use crate::codegen::call_into;
use crate::delay::DelayVar;
use crate::signal_set::SignalSet;
use crate::wrap::cuda_runtime_support;
use f2cc_ir::{DataType, Endpoint, LeafVariant, ProcessId, ProcessNetwork, Signal};
use f2cc_utils::{Config, Error, F2ccResult, Id, Target};
use std::collections::HashSet;
use std::fmt::Write as _;

/// The two generated translation-unit halves (§6 CLI: `-o`/`--header`).
pub struct CodeSet {
    pub header: String,
    pub implementation: String,
}

const ENTRY_POINT: &str = "executeProcessNetwork";

/// §4.4 Step 11: "a boilerplate banner identifying the tool version",
/// prefixed to both translation-unit halves.
fn banner() -> String {
    format!(
        "// Generated by f2cc {} -- do not edit by hand.\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// §4.4 Step 11: the Javadoc-style comment describing the entry point's
/// generated `input`/`output` parameter names, with array sizes where
/// applicable.
fn param_doc(params: &[(String, DataType)], n_inputs: usize) -> String {
    let mut s = String::new();
    writeln!(s, "/**").unwrap();
    writeln!(s, " * {ENTRY_POINT} -- the synthesized process-network entry point.").unwrap();
    for (i, (name, ty)) in params.iter().enumerate() {
        let role = if i < n_inputs { "model input" } else { "model output" };
        if ty.is_array {
            let size = ty
                .array_size
                .map(|n| n.to_string())
                .unwrap_or_else(|| "?".to_string());
            writeln!(s, " * @param {name} {role}, array of {size} `{}`", ty.kind).unwrap();
        } else {
            writeln!(s, " * @param {name} {role}, scalar `{}`", ty.kind).unwrap();
        }
    }
    writeln!(s, " */").unwrap();
    s
}

pub fn emit(
    net: &ProcessNetwork,
    cfg: &Config,
    schedule: &[ProcessId],
    signals: &SignalSet,
    delay_vars: &[DelayVar],
    extra_raw_functions: &[String],
    device_functions: &HashSet<Id>,
) -> F2ccResult<CodeSet> {
    let params = param_list(signals)?;
    let signature = format!(
        "void {ENTRY_POINT}({})",
        params
            .iter()
            .map(|(name, ty)| format!("{} {name}", ty.c_spelling()))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut header = String::new();
    write!(header, "{}", banner()).unwrap();
    writeln!(header).unwrap();
    writeln!(header, "#ifndef F2CC_GENERATED_H").unwrap();
    writeln!(header, "#define F2CC_GENERATED_H").unwrap();
    writeln!(header).unwrap();
    writeln!(header, "#include <stdint.h>").unwrap();
    writeln!(header, "#include <stdbool.h>").unwrap();
    writeln!(header).unwrap();
    write!(header, "{}", param_doc(&params, signals.model_input_signals.len())).unwrap();
    writeln!(header, "{signature};").unwrap();
    writeln!(header).unwrap();
    writeln!(header, "#endif // F2CC_GENERATED_H").unwrap();

    let mut implementation = String::new();
    write!(implementation, "{}", banner()).unwrap();
    writeln!(implementation).unwrap();
    writeln!(implementation, "#include \"{}.h\"", net.name).unwrap();
    writeln!(implementation).unwrap();

    if cfg.target == Target::Cuda {
        write!(implementation, "{}", cuda_runtime_support()).unwrap();
        writeln!(implementation).unwrap();
    }

    // Unique leaf functions, reverse schedule order (§4.4 Step 11): a
    // leaf's own function list is reversed too, so a wrapper a leaf
    // installed at the head of its list (Steps 4-5) is always defined
    // after the inner functions its body calls.
    for name in ordered_functions(net, schedule) {
        let f = net.functions.get(name).ok_or_else(|| {
            Error::illegal_state(format!(
                "function `{name}` referenced by the schedule is not registered"
            ))
        })?;
        let qualifier = device_functions.contains(&name).then_some("__device__");
        let proto = function_prototype(f, qualifier);
        if f.body.trim().is_empty() {
            // Opaque external function: only a prototype is known, the
            // caller links the real definition in separately (§4.1).
            writeln!(implementation, "extern {proto};").unwrap();
        } else {
            writeln!(implementation, "{proto} {{").unwrap();
            write!(implementation, "{}", f.body).unwrap();
            writeln!(implementation, "}}").unwrap();
        }
        writeln!(implementation).unwrap();
    }

    // The `__global__` kernels themselves: emitted last among functions,
    // after every `__device__` function they (transitively) call.
    for raw in extra_raw_functions {
        writeln!(implementation, "{raw}").unwrap();
    }

    writeln!(implementation, "{signature} {{").unwrap();

    // 1. local declarations for every signal.
    let model_in_set: std::collections::HashSet<&Signal> =
        signals.model_input_signals.iter().collect();
    let model_out_set: std::collections::HashSet<&Signal> =
        signals.model_output_signals.iter().collect();
    let ordered = signals.ordered();
    for (sig, info) in ordered.iter() {
        let ty = info
            .data_type
            .as_ref()
            .ok_or_else(|| Error::invalid_model("signal has no inferred type at emission time"))?;
        let name = info.var_name.as_deref().unwrap_or("v_unnamed");
        if ty.is_array {
            if model_in_set.contains(sig) {
                writeln!(
                    implementation,
                    "    {} {name} = {};",
                    ty.c_spelling(),
                    input_param_name(signals, sig)
                )
                .unwrap();
            } else if model_out_set.contains(sig) {
                writeln!(
                    implementation,
                    "    {} {name} = {};",
                    ty.c_spelling(),
                    output_param_name(signals, sig)
                )
                .unwrap();
            } else {
                writeln!(
                    implementation,
                    "    {}* {name} = new {}[{}];",
                    ty.kind,
                    ty.kind,
                    ty.array_size.unwrap_or(0)
                )
                .unwrap();
            }
        } else {
            writeln!(implementation, "    {} {name};", ty.c_spelling()).unwrap();
        }
    }
    writeln!(implementation).unwrap();

    // 2. delay static storage.
    for dv in delay_vars {
        writeln!(
            implementation,
            "    static {} {} = {};",
            dv.ty.c_spelling(),
            dv.static_name,
            dv.init_value
        )
        .unwrap();
    }
    writeln!(implementation).unwrap();

    // 3. copy model-input scalar arguments into their signal locals.
    for sig in &signals.model_input_signals {
        let info = signals
            .get(sig)
            .ok_or_else(|| Error::illegal_state("model input signal missing from set"))?;
        let ty = info.data_type.as_ref().unwrap();
        if !ty.is_array {
            let name = info.var_name.as_deref().unwrap_or("v_unnamed");
            writeln!(
                implementation,
                "    {name} = {};",
                input_param_name(signals, sig)
            )
            .unwrap();
        }
    }
    writeln!(implementation).unwrap();

    // 4. for every delay, copy its stored value into its out-signal.
    for dv in delay_vars {
        let info = signals.get(&dv.out_signal).ok_or_else(|| {
            Error::illegal_state("delay out-signal missing from signal set")
        })?;
        let name = info.var_name.as_deref().unwrap_or("v_unnamed");
        writeln!(implementation, "    {name} = {};", dv.static_name).unwrap();
    }
    writeln!(implementation).unwrap();

    // 5. the scheduled leaf calls themselves, in order. Delays are a
    // no-op here (their value transfer happened above / happens below).
    for &id in schedule {
        let leaf = net.process(id).as_leaf().unwrap();
        if matches!(leaf.variant, LeafVariant::Delay { .. }) {
            continue;
        }
        emit_leaf_call(net, signals, id, &mut implementation)?;
    }
    writeln!(implementation).unwrap();

    // 6. copy model-output scalars out through their pointer parameters.
    for sig in &signals.model_output_signals {
        let info = signals
            .get(sig)
            .ok_or_else(|| Error::illegal_state("model output signal missing from set"))?;
        let ty = info.data_type.as_ref().unwrap();
        if !ty.is_array {
            let name = info.var_name.as_deref().unwrap_or("v_unnamed");
            writeln!(
                implementation,
                "    *{} = {name};",
                output_param_name(signals, sig)
            )
            .unwrap();
        }
    }
    writeln!(implementation).unwrap();

    // 7. latch every delay's in-signal into its static storage for the
    // next invocation.
    for dv in delay_vars {
        let info = signals
            .get(&dv.in_signal)
            .ok_or_else(|| Error::illegal_state("delay in-signal missing from signal set"))?;
        let name = info.var_name.as_deref().unwrap_or("v_unnamed");
        writeln!(implementation, "    {} = {name};", dv.static_name).unwrap();
    }
    writeln!(implementation).unwrap();

    // 8. delete every heap-allocated (non-aliased, array) signal.
    for (sig, info) in &ordered {
        let ty = info.data_type.as_ref().unwrap();
        if ty.is_array && !model_in_set.contains(sig) && !model_out_set.contains(sig) {
            let name = info.var_name.as_deref().unwrap_or("v_unnamed");
            writeln!(implementation, "    delete[] {name};").unwrap();
        }
    }

    writeln!(implementation, "}}").unwrap();

    Ok(CodeSet {
        header,
        implementation,
    })
}

fn input_ordinal(signals: &SignalSet, sig: &Signal) -> usize {
    signals
        .model_input_signals
        .iter()
        .position(|s| s == sig)
        .unwrap_or(0)
}

fn input_param_name(signals: &SignalSet, sig: &Signal) -> String {
    format!("input{}", input_ordinal(signals, sig) + 1)
}

fn output_param_name(signals: &SignalSet, sig: &Signal) -> String {
    let idx = signals
        .model_output_signals
        .iter()
        .position(|s| s == sig)
        .unwrap_or(0);
    format!("output{}", idx + 1)
}

/// `(param name, qualified type)` for every model input then every
/// model output, in declaration order — the entry point's parameter
/// list (§4.4 Step 11).
fn param_list(signals: &SignalSet) -> F2ccResult<Vec<(String, f2cc_ir::DataType)>> {
    let mut out = Vec::new();
    for (i, sig) in signals.model_input_signals.iter().enumerate() {
        let ty = signals
            .get(sig)
            .and_then(|info| info.data_type.clone())
            .ok_or_else(|| Error::invalid_model("model input signal has no inferred type"))?;
        // §4.4 Step 11: array inputs pass by (const) pointer; scalar
        // inputs pass by value but are still qualified `const` — the
        // entry point never writes back through an input parameter.
        let ty = if ty.is_array {
            ty.with_pointer(true).with_const(true)
        } else {
            ty.with_const(true)
        };
        out.push((format!("input{}", i + 1), ty));
    }
    for (i, sig) in signals.model_output_signals.iter().enumerate() {
        let ty = signals
            .get(sig)
            .and_then(|info| info.data_type.clone())
            .ok_or_else(|| Error::invalid_model("model output signal has no inferred type"))?;
        out.push((format!("output{}", i + 1), ty.with_pointer(true)));
    }
    Ok(out)
}

fn function_prototype(f: &f2cc_ir::Function, qualifier: Option<&str>) -> String {
    let params: Vec<String> = f
        .params
        .iter()
        .map(|p| {
            if p.is_output {
                format!("{}* {}", p.ty.c_spelling(), p.name)
            } else {
                format!("{} {}", p.ty.c_spelling(), p.name)
            }
        })
        .collect();
    let ret = match &f.ret {
        Some(t) => t.c_spelling(),
        None => "void".to_string(),
    };
    match qualifier {
        Some(q) => format!("{q} {ret} {}({})", f.name, params.join(", ")),
        None => format!("{ret} {}({})", f.name, params.join(", ")),
    }
}

/// §4.4 Step 11: every function a reachable `comb` leaf actually calls,
/// deduplicated and ordered in reverse schedule order — the single
/// source of both "which functions get emitted" and "in what order",
/// replacing a separate membership test against registry-insertion
/// order with an ordering that is correct by construction.
fn ordered_functions(net: &ProcessNetwork, schedule: &[ProcessId]) -> Vec<Id> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    for &id in schedule.iter().rev() {
        let Some(leaf) = net.process(id).as_leaf() else {
            continue;
        };
        let LeafVariant::Comb(kind) = &leaf.variant else {
            continue;
        };
        for name in kind.functions().into_iter().rev() {
            if seen.insert(name) {
                order.push(name);
            }
        }
    }
    order
}

fn emit_leaf_call(
    net: &ProcessNetwork,
    signals: &SignalSet,
    id: ProcessId,
    out: &mut String,
) -> F2ccResult<()> {
    let leaf = net.process(id).as_leaf().unwrap();
    let leaf_name = net.process(id).id();

    let arg_name = |port: f2cc_ir::PortId| -> F2ccResult<String> {
        let sig = signals
            .iter()
            .find(|(s, _)| s.in_ == Some(Endpoint::Leaf(port)))
            .map(|(s, _)| s.clone())
            .ok_or_else(|| {
                Error::illegal_state(format!("in-port of `{leaf_name}` has no signal"))
            })?;
        Ok(signals
            .get(&sig)
            .and_then(|i| i.var_name.clone())
            .unwrap_or_default())
    };
    let dest_name = |port: f2cc_ir::PortId| -> F2ccResult<String> {
        let sig = signals
            .iter()
            .find(|(s, _)| s.out == Some(Endpoint::Leaf(port)))
            .map(|(s, _)| s.clone())
            .ok_or_else(|| {
                Error::illegal_state(format!("out-port of `{leaf_name}` has no signal"))
            })?;
        Ok(signals
            .get(&sig)
            .and_then(|i| i.var_name.clone())
            .unwrap_or_default())
    };

    match &leaf.variant {
        LeafVariant::Comb(kind) => {
            let fname = kind
                .functions()
                .first()
                .copied()
                .ok_or_else(|| Error::invalid_model("comb leaf has no function"))?;
            let f = net.functions.get(fname).ok_or_else(|| {
                Error::illegal_state(format!("function `{fname}` is not registered"))
            })?;
            let args: F2ccResult<Vec<String>> =
                leaf.in_ports.iter().map(|&p| arg_name(p)).collect();
            let args = args?;
            let dest = dest_name(leaf.out_ports[0])?;
            writeln!(out, "    {}", call_into(f, &args, &dest)).unwrap();
        }
        LeafVariant::ZipX => {
            let dest = dest_name(leaf.out_ports[0])?;
            let mut offset = 0u64;
            for &p in &leaf.in_ports {
                let src = arg_name(p)?;
                let n = element_count_hint(signals, p);
                for k in 0..n {
                    writeln!(out, "    {dest}[{}] = {src}[{k}];", offset + k).unwrap();
                }
                offset += n;
            }
        }
        LeafVariant::UnzipX => {
            let src = arg_name(leaf.in_ports[0])?;
            let mut offset = 0u64;
            for &p in &leaf.out_ports {
                let dest = dest_name(p)?;
                let n = element_count_hint(signals, p);
                for k in 0..n {
                    writeln!(out, "    {dest}[{k}] = {src}[{}];", offset + k).unwrap();
                }
                offset += n;
            }
        }
        LeafVariant::Fanout => {
            let src = arg_name(leaf.in_ports[0])?;
            for &p in &leaf.out_ports {
                let dest = dest_name(p)?;
                writeln!(out, "    {dest} = {src};").unwrap();
            }
        }
        LeafVariant::Delay { .. } => unreachable!("delays are skipped by the caller"),
    }
    Ok(())
}

fn element_count_hint(signals: &SignalSet, port: f2cc_ir::PortId) -> u64 {
    crate::types::signal_array_size(signals, port).unwrap_or(1)
}
