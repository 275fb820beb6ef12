//! End-to-end Synthesizer scenarios: hand-built `ProcessNetwork`s run
//! through the same `ModelModifier` passes and `synthesize` entry point
//! the CLI driver uses, checked against the emitted C/CUDA-C text.

use f2cc_ir::{
    CombKind, DataType, Direction, Endpoint, Function, Leaf, LeafVariant, Param, Port, PrimKind,
    Process, ProcessCommon, ProcessNetwork,
};
use f2cc_utils::{Config, Target};

fn scalar() -> DataType {
    DataType::scalar(PrimKind::Int32)
}

fn register(net: &mut ProcessNetwork, name: &str, body: &str) {
    net.functions.insert(Function::new(
        name,
        vec![Param::input("x", scalar())],
        Some(scalar()),
        body,
    ));
}

/// A leaf with one in-port, one out-port, both `int32_t`.
fn unary_leaf(
    net: &mut ProcessNetwork,
    parent: f2cc_ir::ProcessId,
    name: &str,
    variant: LeafVariant,
) -> f2cc_ir::ProcessId {
    let id = net.reserve_process();
    let in_p = net.add_port(Port::new("in1", id, Direction::In, scalar()));
    let out_p = net.add_port(Port::new("out1", id, Direction::Out, scalar()));
    net.install_process(
        id,
        Process::Leaf(Leaf {
            common: ProcessCommon::new(name, Some(parent)),
            in_ports: vec![in_p],
            out_ports: vec![out_p],
            variant,
        }),
    );
    if let Some(c) = net.process_mut(parent).as_composite_mut() {
        c.children.push(id);
    }
    id
}

// ---------------------------------------------------------------- A ----

/// Two scalar model inputs feeding a single `ZipWithN(f)` whose one
/// output is the model output: `f(a, b) = a + b`.
#[test]
fn scenario_a_two_input_zipwith_header_and_call() {
    let mut net = ProcessNetwork::new("scenario_a");
    let root = net.root;
    net.functions.insert(Function::new(
        "add",
        vec![Param::input("x", scalar()), Param::input("y", scalar())],
        Some(scalar()),
        "    return x + y;\n",
    ));

    let id = net.reserve_process();
    let in_a = net.add_port(Port::new("in1", id, Direction::In, scalar()));
    let in_b = net.add_port(Port::new("in2", id, Direction::In, scalar()));
    let out = net.add_port(Port::new("out1", id, Direction::Out, scalar()));
    net.install_process(
        id,
        Process::Leaf(Leaf {
            common: ProcessCommon::new("zip1", Some(root)),
            in_ports: vec![in_a, in_b],
            out_ports: vec![out],
            variant: LeafVariant::Comb(CombKind::ZipWithN("add".into())),
        }),
    );
    net.process_mut(root).as_composite_mut().unwrap().children.push(id);

    net.model_inputs.push(Endpoint::Leaf(in_a));
    net.model_inputs.push(Endpoint::Leaf(in_b));
    net.model_outputs.push(Endpoint::Leaf(out));

    let cfg = Config::default();
    let code = f2cc_backend::synthesize(&mut net, &cfg).unwrap();

    assert!(
        code.header.contains(
            "void executeProcessNetwork(const int32_t input1, const int32_t input2, int32_t* output1);"
        ),
        "header was:\n{}",
        code.header
    );
    assert!(code.implementation.contains("*output1"));
}

// ---------------------------------------------------------------- B ----

/// `unzipx{1->1}` feeding into `zipx{1->1}` between two `Map` leaves:
/// after `remove_redundant_leafs` both routers disappear and the two
/// combs connect directly.
#[test]
fn scenario_b_redundant_unzip_zip_pair_is_removed() {
    let mut net = ProcessNetwork::new("scenario_b");
    let root = net.root;
    register(&mut net, "f", "    return x + 1;\n");
    register(&mut net, "g", "    return x * 2;\n");

    let m1 = unary_leaf(&mut net, root, "map1", LeafVariant::Comb(CombKind::Map("f".into())));

    let unzipx_id = net.reserve_process();
    let unzipx_in = net.add_port(Port::new("in1", unzipx_id, Direction::In, scalar()));
    let unzipx_out = net.add_port(Port::new("out1", unzipx_id, Direction::Out, scalar()));
    net.install_process(
        unzipx_id,
        Process::Leaf(Leaf {
            common: ProcessCommon::new("unzipx1", Some(root)),
            in_ports: vec![unzipx_in],
            out_ports: vec![unzipx_out],
            variant: LeafVariant::UnzipX,
        }),
    );
    net.process_mut(root).as_composite_mut().unwrap().children.push(unzipx_id);

    let zipx_id = net.reserve_process();
    let zipx_in = net.add_port(Port::new("in1", zipx_id, Direction::In, scalar()));
    let zipx_out = net.add_port(Port::new("out1", zipx_id, Direction::Out, scalar()));
    net.install_process(
        zipx_id,
        Process::Leaf(Leaf {
            common: ProcessCommon::new("zipx1", Some(root)),
            in_ports: vec![zipx_in],
            out_ports: vec![zipx_out],
            variant: LeafVariant::ZipX,
        }),
    );
    net.process_mut(root).as_composite_mut().unwrap().children.push(zipx_id);

    let m2 = unary_leaf(&mut net, root, "map2", LeafVariant::Comb(CombKind::Map("g".into())));

    let m1_out = net.process(m1).as_leaf().unwrap().out_ports[0];
    let m2_in = net.process(m2).as_leaf().unwrap().in_ports[0];
    net.connect(Endpoint::Leaf(m1_out), Endpoint::Leaf(unzipx_in));
    net.connect(Endpoint::Leaf(unzipx_out), Endpoint::Leaf(zipx_in));
    net.connect(Endpoint::Leaf(zipx_out), Endpoint::Leaf(m2_in));

    net.model_inputs.push(Endpoint::Leaf(net.process(m1).as_leaf().unwrap().in_ports[0]));
    net.model_outputs.push(Endpoint::Leaf(net.process(m2).as_leaf().unwrap().out_ports[0]));

    assert_eq!(net.reachable_leaves(root).len(), 4);
    f2cc_opt::remove_redundant_leafs(&mut net).unwrap();

    let leaves = net.reachable_leaves(root);
    assert_eq!(leaves.len(), 2);
    assert!(leaves.contains(&m1));
    assert!(leaves.contains(&m2));

    let m1_out = net.process(m1).as_leaf().unwrap().out_ports[0];
    let m2_in = net.process(m2).as_leaf().unwrap().in_ports[0];
    assert_eq!(net.peer_of(Endpoint::Leaf(m1_out)), Some(Endpoint::Leaf(m2_in)));
}

// ---------------------------------------------------------------- C ----

/// `unzipx{1->4}` fanning into four identical `map(f)` leaves fanning
/// into `zipx{4->1}`: after `fuse_unzip_map_zip_leafs` one
/// `ParallelMap(4, [f])` leaf replaces all six.
#[test]
fn scenario_c_fuses_uniform_fanout_into_parallel_map() {
    let mut net = ProcessNetwork::new("scenario_c");
    let root = net.root;
    register(&mut net, "f", "    return x * x;\n");

    let n: u64 = 4;
    let unzipx_id = net.reserve_process();
    let unzipx_in =
        net.add_port(Port::new("in1", unzipx_id, Direction::In, DataType::array(PrimKind::Int32, Some(n))));
    let unzipx_outs: Vec<_> = (0..n)
        .map(|i| net.add_port(Port::new(format!("out{}", i + 1), unzipx_id, Direction::Out, scalar())))
        .collect();
    net.install_process(
        unzipx_id,
        Process::Leaf(Leaf {
            common: ProcessCommon::new("unzipx1", Some(root)),
            in_ports: vec![unzipx_in],
            out_ports: unzipx_outs.clone(),
            variant: LeafVariant::UnzipX,
        }),
    );
    net.process_mut(root).as_composite_mut().unwrap().children.push(unzipx_id);

    let zipx_id = net.reserve_process();
    let zipx_ins: Vec<_> = (0..n)
        .map(|i| net.add_port(Port::new(format!("in{}", i + 1), zipx_id, Direction::In, scalar())))
        .collect();
    let zipx_out =
        net.add_port(Port::new("out1", zipx_id, Direction::Out, DataType::array(PrimKind::Int32, Some(n))));
    net.install_process(
        zipx_id,
        Process::Leaf(Leaf {
            common: ProcessCommon::new("zipx1", Some(root)),
            in_ports: zipx_ins.clone(),
            out_ports: vec![zipx_out],
            variant: LeafVariant::ZipX,
        }),
    );
    net.process_mut(root).as_composite_mut().unwrap().children.push(zipx_id);

    for i in 0..n as usize {
        let map_id = unary_leaf(
            &mut net,
            root,
            &format!("map{i}"),
            LeafVariant::Comb(CombKind::Map("f".into())),
        );
        let in_p = net.process(map_id).as_leaf().unwrap().in_ports[0];
        let out_p = net.process(map_id).as_leaf().unwrap().out_ports[0];
        net.connect(Endpoint::Leaf(unzipx_outs[i]), Endpoint::Leaf(in_p));
        net.connect(Endpoint::Leaf(out_p), Endpoint::Leaf(zipx_ins[i]));
    }

    net.model_inputs.push(Endpoint::Leaf(unzipx_in));
    net.model_outputs.push(Endpoint::Leaf(zipx_out));

    assert_eq!(net.reachable_leaves(root).len(), 6);
    f2cc_opt::fuse_unzip_map_zip_leafs(&mut net).unwrap();

    let leaves = net.reachable_leaves(root);
    assert_eq!(leaves.len(), 1);
    let leaf = net.process(leaves[0]).as_leaf().unwrap();
    match &leaf.variant {
        LeafVariant::Comb(CombKind::ParallelMap { replication, functions }) => {
            assert_eq!(*replication, n);
            assert_eq!(functions.len(), 1);
        }
        other => panic!("expected a ParallelMap leaf, got {other:?}"),
    }
}

// ---------------------------------------------------------------- D ----

/// Three `map(g)`, `map(h)`, `map(k)` leaves in series, inside a
/// single-branch `unzipx{1->1}`/`zipx{1->1}` bracket (the shape
/// `coalesce_data_parallel_leafs` discovers contained sections from):
/// after coalescing and synthesizing, one wrapper function computes
/// `k(h(g(x)))`.
#[test]
fn scenario_d_coalesces_a_map_chain_into_one_wrapper() {
    let mut net = ProcessNetwork::new("scenario_d");
    let root = net.root;
    register(&mut net, "g", "    return x + 1;\n");
    register(&mut net, "h", "    return x * 2;\n");
    register(&mut net, "k", "    return x - 3;\n");

    let unzipx_id = net.reserve_process();
    let unzipx_in = net.add_port(Port::new(
        "in1",
        unzipx_id,
        Direction::In,
        DataType::array(PrimKind::Int32, Some(1)),
    ));
    let unzipx_out = net.add_port(Port::new("out1", unzipx_id, Direction::Out, scalar()));
    net.install_process(
        unzipx_id,
        Process::Leaf(Leaf {
            common: ProcessCommon::new("unzipx1", Some(root)),
            in_ports: vec![unzipx_in],
            out_ports: vec![unzipx_out],
            variant: LeafVariant::UnzipX,
        }),
    );
    net.process_mut(root).as_composite_mut().unwrap().children.push(unzipx_id);

    let zipx_id = net.reserve_process();
    let zipx_in = net.add_port(Port::new("in1", zipx_id, Direction::In, scalar()));
    let zipx_out = net.add_port(Port::new(
        "out1",
        zipx_id,
        Direction::Out,
        DataType::array(PrimKind::Int32, Some(1)),
    ));
    net.install_process(
        zipx_id,
        Process::Leaf(Leaf {
            common: ProcessCommon::new("zipx1", Some(root)),
            in_ports: vec![zipx_in],
            out_ports: vec![zipx_out],
            variant: LeafVariant::ZipX,
        }),
    );
    net.process_mut(root).as_composite_mut().unwrap().children.push(zipx_id);

    let g = unary_leaf(&mut net, root, "map_g", LeafVariant::Comb(CombKind::Map("g".into())));
    let h = unary_leaf(&mut net, root, "map_h", LeafVariant::Comb(CombKind::Map("h".into())));
    let k = unary_leaf(&mut net, root, "map_k", LeafVariant::Comb(CombKind::Map("k".into())));

    let g_in = net.process(g).as_leaf().unwrap().in_ports[0];
    let g_out = net.process(g).as_leaf().unwrap().out_ports[0];
    let h_in = net.process(h).as_leaf().unwrap().in_ports[0];
    let h_out = net.process(h).as_leaf().unwrap().out_ports[0];
    let k_in = net.process(k).as_leaf().unwrap().in_ports[0];
    let k_out = net.process(k).as_leaf().unwrap().out_ports[0];

    net.connect(Endpoint::Leaf(unzipx_out), Endpoint::Leaf(g_in));
    net.connect(Endpoint::Leaf(g_out), Endpoint::Leaf(h_in));
    net.connect(Endpoint::Leaf(h_out), Endpoint::Leaf(k_in));
    net.connect(Endpoint::Leaf(k_out), Endpoint::Leaf(zipx_in));

    net.model_inputs.push(Endpoint::Leaf(unzipx_in));
    net.model_outputs.push(Endpoint::Leaf(zipx_out));

    f2cc_opt::coalesce_data_parallel_leafs(&mut net).unwrap();

    let leaves = net.reachable_leaves(root);
    let coalesced_id = *leaves
        .iter()
        .find(|&&id| {
            matches!(
                net.process(id).as_leaf().map(|l| &l.variant),
                Some(LeafVariant::Comb(CombKind::CoalescedMap(_)))
            )
        })
        .expect("a CoalescedMap leaf should remain");
    match &net.process(coalesced_id).as_leaf().unwrap().variant {
        LeafVariant::Comb(CombKind::CoalescedMap(fns)) => assert_eq!(fns.len(), 3),
        _ => unreachable!(),
    }

    let cfg = Config::default();
    let code = f2cc_backend::synthesize(&mut net, &cfg).unwrap();

    assert!(
        code.implementation.contains("_wrapper("),
        "implementation was:\n{}",
        code.implementation
    );
    // Three sequential calls: two intermediate assignments and a final
    // `return`, in series.
    let wrapper_body_start = code
        .implementation
        .find("_wrapper(int32_t in1)")
        .expect("wrapper prototype should appear");
    let tail = &code.implementation[wrapper_body_start..];
    assert!(tail.contains("int32_t t1;"));
    assert!(tail.contains("int32_t t2;"));
    assert!(tail.contains("return "));

    // §4.4 Step 11: the wrapper's own definition must come *after* the
    // inner functions it calls, never before.
    let g_pos = code
        .implementation
        .find("return x + 1;")
        .expect("g's renamed body should appear");
    let h_pos = code
        .implementation
        .find("return x * 2;")
        .expect("h's renamed body should appear");
    let k_pos = code
        .implementation
        .find("return x - 3;")
        .expect("k's renamed body should appear");
    assert!(g_pos < wrapper_body_start && h_pos < wrapper_body_start && k_pos < wrapper_body_start);
}

// ---------------------------------------------------------------- E ----

/// A one-step feedback loop `map(f) -> delay(0) -> map(f)`: the
/// scheduler accepts the cycle, and the emitted body reads the
/// static delay storage before the schedule runs and writes it back
/// after.
#[test]
fn scenario_e_one_step_delay_feedback_loop_emits_static_storage() {
    let mut net = ProcessNetwork::new("scenario_e");
    let root = net.root;
    register(&mut net, "f", "    return x;\n");

    let m1 = unary_leaf(&mut net, root, "map1", LeafVariant::Comb(CombKind::Map("f".into())));
    let m2 = unary_leaf(&mut net, root, "map2", LeafVariant::Comb(CombKind::Map("f".into())));

    let d_id = net.reserve_process();
    let d_in = net.add_port(Port::new("in1", d_id, Direction::In, scalar()));
    let d_out = net.add_port(Port::new("out1", d_id, Direction::Out, scalar()));
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

    let m1_in = net.process(m1).as_leaf().unwrap().in_ports[0];
    let m1_out = net.process(m1).as_leaf().unwrap().out_ports[0];
    let m2_in = net.process(m2).as_leaf().unwrap().in_ports[0];
    let m2_out = net.process(m2).as_leaf().unwrap().out_ports[0];

    net.connect(Endpoint::Leaf(m1_out), Endpoint::Leaf(d_in));
    net.connect(Endpoint::Leaf(d_out), Endpoint::Leaf(m2_in));
    net.connect(Endpoint::Leaf(m2_out), Endpoint::Leaf(m1_in));

    let cfg = Config::default();
    let code = f2cc_backend::synthesize(&mut net, &cfg).unwrap();

    assert!(
        code.implementation.contains("static int32_t v_delay_element1 = 0;"),
        "implementation was:\n{}",
        code.implementation
    );
    let init_pos = code
        .implementation
        .find("v_delay_element1")
        .expect("delay storage declared");
    let first_use = code.implementation["executeProcessNetwork".len()..]
        .find("v_delay_element1");
    assert!(first_use.is_some());
    assert!(init_pos < code.implementation.len());
}

// ---------------------------------------------------------------- F ----

/// A single `ParallelMap(1024, [f])` on the CUDA target: a `__global__`
/// kernel, a host wrapper that mallocs/copies/launches/frees device
/// buffers, with a grid/block configuration that covers all 1024
/// elements.
#[test]
fn scenario_f_parallel_map_emits_cuda_kernel_and_wrapper() {
    let mut net = ProcessNetwork::new("scenario_f");
    let root = net.root;
    register(&mut net, "f", "    return x * 2;\n");

    let n: u64 = 1024;
    let id = net.reserve_process();
    let in_p = net.add_port(Port::new(
        "in1",
        id,
        Direction::In,
        DataType::array(PrimKind::Int32, Some(n)),
    ));
    let out_p = net.add_port(Port::new(
        "out1",
        id,
        Direction::Out,
        DataType::array(PrimKind::Int32, Some(n)),
    ));
    net.install_process(
        id,
        Process::Leaf(Leaf {
            common: ProcessCommon::new("par1", Some(root)),
            in_ports: vec![in_p],
            out_ports: vec![out_p],
            variant: LeafVariant::Comb(CombKind::ParallelMap {
                replication: n,
                functions: vec!["f".into()],
            }),
        }),
    );
    net.process_mut(root).as_composite_mut().unwrap().children.push(id);

    net.model_inputs.push(Endpoint::Leaf(in_p));
    net.model_outputs.push(Endpoint::Leaf(out_p));

    let cfg = Config {
        target: Target::Cuda,
        ..Config::default()
    };
    let code = f2cc_backend::synthesize(&mut net, &cfg).unwrap();

    assert!(code.implementation.contains("__global__ void par1_kernel"));
    assert!(code.implementation.contains("par1_kernel_wrapper"));
    assert!(code.implementation.contains("cudaMalloc"));
    assert!(code.implementation.contains("cudaMemcpy"));
    assert!(code.implementation.contains("cudaFree(d_in1);") || code.implementation.contains("cudaFree("));
    assert!(code.implementation.contains("<<<"));
    assert!(code.implementation.contains("calculateBestKernelConfig(1024)"));

    // §6: the per-replica function the kernel calls by name must be
    // `__device__`-qualified and defined before the kernel references it.
    let device_fn_pos = code
        .implementation
        .find("__device__ int32_t")
        .expect("the renamed per-replica function should be emitted __device__");
    let kernel_pos = code
        .implementation
        .find("__global__ void par1_kernel")
        .expect("kernel definition should appear");
    assert!(
        device_fn_pos < kernel_pos,
        "the __device__ function must be defined before the kernel calling it:\n{}",
        code.implementation
    );
}
