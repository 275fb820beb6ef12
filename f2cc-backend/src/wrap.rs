//! Synthesizer Steps 4–5 (§4.4): wrap a `CoalescedMap`'s function chain
//! in a single `_wrapper` function, and wrap a `ParallelMap`'s chain in
//! either a scalar `for`-loop wrapper or, on the CUDA target, a device
//! `kernel` plus a host-side `kernel_wrapper`. After this pass every
//! `comb` leaf's `functions()[0]` is the single function its call site
//! invokes — Map and ZipWithN already satisfy this trivially, since
//! they only ever carry one function.

use crate::codegen::{call_expr, call_into};
use f2cc_ir::{CombKind, DataType, Function, LeafVariant, Param, ProcessNetwork};
use f2cc_utils::{Config, Error, F2ccResult, Id, Target};
use std::collections::HashSet;
use std::fmt::Write as _;

/// Raw text the synthesizer must emit verbatim outside the `Function`
/// abstraction — a CUDA `__global__` kernel is never "called" through
/// the ordinary `(args) -> T` convention the rest of the pipeline uses.
pub struct RawFunction {
    pub text: String,
}

pub struct WrapOutput {
    pub raw: Vec<RawFunction>,
    /// Functions reachable only from device code (a `__global__` kernel
    /// or, transitively, from a function the kernel calls) and that
    /// therefore must be emitted `__device__` rather than plain C (§4.4
    /// Step 11, §6 "accepted by a standard C99/CUDA-C compiler").
    pub device_functions: HashSet<Id>,
}

/// Run both Step 4 and Step 5 over every reachable leaf.
pub fn wrap_chains(net: &mut ProcessNetwork, cfg: &Config) -> F2ccResult<WrapOutput> {
    let mut raw = Vec::new();
    let mut device_functions = HashSet::new();
    for id in net.reachable_leaves(net.root) {
        let leaf = net.process(id).as_leaf().unwrap();
        let leaf_name = net.process(id).id();
        match &leaf.variant {
            LeafVariant::Comb(CombKind::CoalescedMap(fns)) if fns.len() > 1 => {
                let chain = fns.clone();
                let in_ty = net.port(leaf.in_ports[0]).data_type.clone();
                let out_ty = net.port(leaf.out_ports[0]).data_type.clone();
                let wrapper = build_func_wrapper(net, leaf_name, &chain, &in_ty, &out_ty)?;
                net.functions.insert(wrapper.clone());
                let mut new_list = vec![wrapper.name];
                new_list.extend(chain);
                if let LeafVariant::Comb(CombKind::CoalescedMap(fns)) =
                    &mut net.process_mut(id).as_leaf_mut().unwrap().variant
                {
                    *fns = new_list;
                }
            }
            LeafVariant::Comb(CombKind::ParallelMap {
                replication,
                functions,
            }) => {
                let replication = *replication;
                let chain = functions.clone();
                let in_ty = net.port(leaf.in_ports[0]).data_type.clone();
                let out_ty = net.port(leaf.out_ports[0]).data_type.clone();
                let per_replica_fn = if chain.len() > 1 {
                    let w = build_func_wrapper(
                        net,
                        leaf_name,
                        &chain,
                        &in_ty.element_type(),
                        &out_ty.element_type(),
                    )?;
                    net.functions.insert(w.clone());
                    w
                } else {
                    net.functions.get(chain[0]).cloned().ok_or_else(|| {
                        Error::illegal_state(format!(
                            "function `{}` referenced by `{leaf_name}` is not registered",
                            chain[0]
                        ))
                    })?
                };

                let external = match cfg.target {
                    Target::Scalar => {
                        let w = build_parallel_wrapper(
                            leaf_name,
                            &per_replica_fn,
                            replication,
                            &in_ty,
                            &out_ty,
                        );
                        net.functions.insert(w.clone());
                        w.name
                    }
                    Target::Cuda => {
                        let kernel_name = Id::new(format!("{leaf_name}_kernel"));
                        raw.push(RawFunction {
                            text: build_kernel(
                                kernel_name,
                                &per_replica_fn,
                                &in_ty,
                                &out_ty,
                                cfg.use_shared_memory,
                            ),
                        });
                        // Everything the kernel calls, directly or (via
                        // a coalesced per-replica wrapper) transitively,
                        // runs on the device and needs `__device__`.
                        device_functions.insert(per_replica_fn.name);
                        for fname in &chain {
                            device_functions.insert(*fname);
                        }
                        let w = build_kernel_wrapper(
                            leaf_name,
                            kernel_name,
                            &in_ty,
                            &out_ty,
                            replication,
                            cfg.watchdog_timeout,
                        );
                        net.functions.insert(w.clone());
                        w.name
                    }
                };

                let mut new_list = vec![external];
                if chain.len() > 1 {
                    // `per_replica_fn` is the synthesized sequential
                    // wrapper built above; it is a real function the
                    // kernel/parallel-wrapper calls and must be tracked
                    // alongside the chain it wraps so it gets emitted.
                    new_list.push(per_replica_fn.name);
                }
                new_list.extend(chain);
                if let LeafVariant::Comb(CombKind::ParallelMap { functions, .. }) =
                    &mut net.process_mut(id).as_leaf_mut().unwrap().variant
                {
                    *functions = new_list;
                }
            }
            _ => {}
        }
    }
    Ok(WrapOutput {
        raw,
        device_functions,
    })
}

/// Step 4: synthesize `<leaf>_wrapper`, a straight-line function that
/// calls `chain[0]`, then `chain[1]` on its result, and so on, returning
/// (or writing through its own out-parameter) the last stage's result.
fn build_func_wrapper(
    net: &ProcessNetwork,
    leaf_name: Id,
    chain: &[Id],
    in_ty: &DataType,
    out_ty: &DataType,
) -> F2ccResult<Function> {
    let wrapper_name = Id::new(format!("{leaf_name}_wrapper"));
    let mut body = String::new();
    let mut cur_var = "in1".to_string();

    for (i, fname) in chain.iter().enumerate() {
        let f = net.functions.get(*fname).ok_or_else(|| {
            Error::illegal_state(format!("function `{fname}` not registered"))
        })?;
        let is_last = i + 1 == chain.len();
        if is_last {
            if out_ty.is_array {
                writeln!(body, "    {}", call_into(f, &[cur_var.clone()], "out")).unwrap();
            } else {
                writeln!(body, "    return {};", call_expr(f, &[cur_var.clone()])).unwrap();
            }
        } else {
            let next_var = format!("t{}", i + 1);
            let result_ty = f.result_type().clone();
            writeln!(body, "    {} {};", result_ty.c_spelling(), next_var).unwrap();
            writeln!(body, "    {}", call_into(f, &[cur_var.clone()], &next_var)).unwrap();
            cur_var = next_var;
        }
    }

    let mut params = vec![Param::input("in1", in_ty.clone())];
    if out_ty.is_array {
        params.push(Param::output("out", out_ty.clone().with_pointer(true)));
        Ok(Function::new(wrapper_name, params, None, body))
    } else {
        Ok(Function::new(wrapper_name, params, Some(out_ty.clone()), body))
    }
}

/// Step 5 (scalar target): `N` sequential calls to `f`, each over its
/// own stripe of the input/output arrays.
fn build_parallel_wrapper(
    leaf_name: Id,
    f: &Function,
    replication: u64,
    in_ty: &DataType,
    out_ty: &DataType,
) -> Function {
    let name = Id::new(format!("{leaf_name}_parallel_wrapper"));
    let in_stride = f
        .params
        .iter()
        .find(|p| !p.is_output)
        .map(|p| if p.ty.is_array { p.ty.array_size.unwrap_or(1) } else { 1 })
        .unwrap_or(1);
    let out_stride = if f.result_type().is_array {
        f.result_type().array_size.unwrap_or(1)
    } else {
        1
    };

    let mut body = String::new();
    writeln!(body, "    for (int i = 0; i < {replication}; i++) {{").unwrap();
    let in_arg = if in_stride == 1 {
        "in1[i]".to_string()
    } else {
        format!("&in1[i * {in_stride}]")
    };
    if out_stride == 1 && !f.is_void_returning() {
        writeln!(body, "        out[i] = {};", call_expr(f, &[in_arg])).unwrap();
    } else {
        let dest = if out_stride == 1 {
            "out[i]".to_string()
        } else {
            format!("out[i * {out_stride}]")
        };
        writeln!(body, "        {}", call_into(f, &[in_arg], &dest)).unwrap();
    }
    writeln!(body, "    }}").unwrap();

    Function::new(
        name,
        vec![
            Param::input("in1", in_ty.clone()),
            Param::output("out", out_ty.clone().with_pointer(true)),
        ],
        None,
        body,
    )
}

/// Step 5 (CUDA target): the `__global__` device kernel, one thread per
/// replica. Optionally stages its stripe of the input through
/// `__shared__` memory first (`cfg.use_shared_memory`).
fn build_kernel(
    name: Id,
    f: &Function,
    in_ty: &DataType,
    out_ty: &DataType,
    use_shared_memory: bool,
) -> String {
    let in_stride = f
        .params
        .iter()
        .find(|p| !p.is_output)
        .map(|p| if p.ty.is_array { p.ty.array_size.unwrap_or(1) } else { 1 })
        .unwrap_or(1);
    let out_stride = if f.result_type().is_array {
        f.result_type().array_size.unwrap_or(1)
    } else {
        1
    };
    let elem = in_ty.element_type();
    let out_elem = out_ty.element_type();

    let mut s = String::new();
    writeln!(
        s,
        "__global__ void {name}(const {}* in1, {}* out, int n, int offset) {{",
        elem.kind, out_elem.kind
    )
    .unwrap();
    writeln!(
        s,
        "    int global_index = blockIdx.x * blockDim.x + threadIdx.x + offset;"
    )
    .unwrap();
    writeln!(s, "    if (global_index >= n) return;").unwrap();
    if use_shared_memory {
        writeln!(s, "    extern __shared__ {} shared_in[];", elem.kind).unwrap();
        for k in 0..in_stride {
            writeln!(
                s,
                "    shared_in[threadIdx.x * {in_stride} + {k}] = in1[global_index * {in_stride} + {k}];"
            )
            .unwrap();
        }
        writeln!(s, "    __syncthreads();").unwrap();
    }
    let in_base = if use_shared_memory {
        "shared_in".to_string()
    } else {
        "in1".to_string()
    };
    let in_arg = if in_stride == 1 {
        format!("{in_base}[global_index]")
    } else if use_shared_memory {
        format!("&{in_base}[threadIdx.x * {in_stride}]")
    } else {
        format!("&{in_base}[global_index * {in_stride}]")
    };
    if out_stride == 1 && !f.is_void_returning() {
        writeln!(s, "    out[global_index] = {};", call_expr(f, &[in_arg])).unwrap();
    } else {
        let dest = if out_stride == 1 {
            "out[global_index]".to_string()
        } else {
            format!("out[global_index * {out_stride}]")
        };
        writeln!(s, "    {}", call_into(f, &[in_arg], &dest)).unwrap();
    }
    writeln!(s, "}}").unwrap();
    s
}

/// Step 5 (CUDA target): the host-side `kernel_wrapper`, an ordinary
/// `(in, out) -> void` function allocating device buffers, copying in,
/// launching `<leaf>_kernel` (possibly split into multiple launches when
/// `watchdog_timeout` bounds each launch to `calculateBestKernelConfig`'s
/// full-utilization thread count), and copying the result back.
fn build_kernel_wrapper(
    leaf_name: Id,
    kernel_name: Id,
    in_ty: &DataType,
    out_ty: &DataType,
    replication: u64,
    watchdog_timeout: bool,
) -> Function {
    let name = Id::new(format!("{leaf_name}_kernel_wrapper"));
    let elem = in_ty.element_type();
    let out_elem = out_ty.element_type();

    let mut body = String::new();
    writeln!(body, "    {}* d_in;", elem.kind).unwrap();
    writeln!(body, "    {}* d_out;", out_elem.kind).unwrap();
    writeln!(
        body,
        "    cudaMalloc((void**)&d_in, {replication} * sizeof({}));",
        elem.kind
    )
    .unwrap();
    writeln!(
        body,
        "    cudaMalloc((void**)&d_out, {replication} * sizeof({}));",
        out_elem.kind
    )
    .unwrap();
    writeln!(
        body,
        "    cudaMemcpy(d_in, in1, {replication} * sizeof({}), cudaMemcpyHostToDevice);",
        elem.kind
    )
    .unwrap();
    writeln!(
        body,
        "    KernelConfig kc = calculateBestKernelConfig({replication});"
    )
    .unwrap();
    if watchdog_timeout {
        writeln!(body, "    int done = 0;").unwrap();
        writeln!(body, "    while (done < {replication}) {{").unwrap();
        writeln!(body, "        int batch = kc.max_threads;").unwrap();
        writeln!(
            body,
            "        if (done + batch > {replication}) batch = {replication} - done;"
        )
        .unwrap();
        writeln!(
            body,
            "        {kernel_name}<<<(batch + kc.block_size - 1) / kc.block_size, kc.block_size>>>(d_in, d_out, {replication}, done);"
        )
        .unwrap();
        writeln!(body, "        cudaDeviceSynchronize();").unwrap();
        writeln!(body, "        done += batch;").unwrap();
        writeln!(body, "    }}").unwrap();
    } else {
        writeln!(
            body,
            "    {kernel_name}<<<kc.grid_size, kc.block_size>>>(d_in, d_out, {replication}, 0);"
        )
        .unwrap();
    }
    writeln!(
        body,
        "    cudaMemcpy(out, d_out, {replication} * sizeof({}), cudaMemcpyDeviceToHost);",
        out_elem.kind
    )
    .unwrap();
    writeln!(body, "    cudaFree(d_in);").unwrap();
    writeln!(body, "    cudaFree(d_out);").unwrap();

    Function::new(
        name,
        vec![
            Param::input("in1", in_ty.clone()),
            Param::output("out", out_ty.clone().with_pointer(true)),
        ],
        None,
        body,
    )
}

/// Emitted once per CUDA translation unit (§4.4 Step 5 Design Note),
/// not per leaf: the launch-configuration struct and its heuristic,
/// grounded on the source's `calculateBestKernelConfig`.
pub fn cuda_runtime_support() -> String {
    let mut s = String::new();
    writeln!(s, "struct KernelConfig {{").unwrap();
    writeln!(s, "    int grid_size;").unwrap();
    writeln!(s, "    int block_size;").unwrap();
    writeln!(s, "    int max_threads;").unwrap();
    writeln!(s, "}};").unwrap();
    writeln!(s).unwrap();
    writeln!(s, "static KernelConfig calculateBestKernelConfig(int n) {{").unwrap();
    writeln!(s, "    KernelConfig kc;").unwrap();
    writeln!(s, "    kc.block_size = 256;").unwrap();
    writeln!(s, "    kc.max_threads = n;").unwrap();
    writeln!(
        s,
        "    kc.grid_size = (n + kc.block_size - 1) / kc.block_size;"
    )
    .unwrap();
    writeln!(s, "    return kc;").unwrap();
    writeln!(s, "}}").unwrap();
    s
}
