//! The legacy "GraphML"-style dialect (§4.1 supplement, §6): rooted at
//! `graphml/graph/node+edge`, with per-element `data` key/value children
//! carrying `leaf_type`, `procfun_arg`, `num_leafs`, `initial_value`, and
//! `array_size`. Produces the same IR as the rich dialect (`rich.rs`).

use crate::wiring::ensure_fanout;
use crate::xml_tree::XmlNode;
use f2cc_ir::{
    CombKind, DataType, Direction as IrDirection, Endpoint, Face, Function,
    IOPort, Leaf, LeafVariant, Param, Port, PortId, Process, ProcessCommon,
    ProcessId, ProcessNetwork,
};
use f2cc_utils::{Error, F2ccResult, Id};
use std::collections::HashMap;

/// Where an `<edge>` endpoint resolves to: either a regular leaf's port
/// (disambiguated later by direction/name) or a model-boundary IOPort
/// created directly from a legacy `inport`/`outport` node.
enum NodeRef {
    Leaf(ProcessId),
    Boundary(Endpoint),
}

pub fn parse(root_xml: &XmlNode) -> F2ccResult<ProcessNetwork> {
    if root_xml.name != "graphml" {
        return Err(Error::parse(format!(
            "expected root element `graphml`, found `{}`",
            root_xml.name
        )));
    }
    let graph = root_xml
        .child_named("graph")
        .ok_or_else(|| Error::parse("`graphml` element has no `graph` child"))?;

    let mut net = ProcessNetwork::new("graphml_model");
    let root = net.root;

    // Pass 1: create one leaf per `node` (or, for the legacy `inport`/
    // `outport` placeholder types, a model-boundary IOPort directly),
    // with ports sized from its `leaf_type` and `num_leafs`/arity data,
    // but not yet connected.
    let mut by_name: HashMap<Id, NodeRef> = HashMap::new();
    for node in graph.children_named("node") {
        let (name, node_ref) = build_node(&mut net, root, node)?;
        by_name.insert(name, node_ref);
    }

    // Pass 2: wire every `edge`, inserting `fanout` on a second binding
    // of the same source port, exactly as the rich dialect does.
    for edge in graph.children_named("edge") {
        bind_edge(&mut net, &by_name, edge)?;
    }

    Ok(net)
}

/// Create a root-level model-boundary IOPort for a legacy `inport`/
/// `outport` node (§4.1 supplement: these stand in for the process
/// network's own input/output interfaces, as `<port>` elements do in
/// the rich dialect).
fn build_boundary_port(
    net: &mut ProcessNetwork,
    root: ProcessId,
    name: &str,
    direction: IrDirection,
) -> F2ccResult<NodeRef> {
    let ty = DataType::scalar(f2cc_ir::PrimKind::Custom("auto".into()));
    let io = IOPort::new(name, root, direction, ty.clone(), ty);
    let id = net.add_io_port(io);
    if let Some(c) = net.process_mut(root).as_composite_mut() {
        c.io_ports.push(id);
    }
    let ep = Endpoint::Io(id, Face::Inside);
    match direction {
        IrDirection::In => net.model_inputs.push(Endpoint::Io(id, Face::Outside)),
        IrDirection::Out => net.model_outputs.push(Endpoint::Io(id, Face::Outside)),
    }
    Ok(NodeRef::Boundary(ep))
}

fn data_value<'a>(xml: &'a XmlNode, key: &str) -> Option<&'a str> {
    xml.children_named("data")
        .find(|d| d.attr("key") == Some(key))
        .map(|d| d.text.trim())
}

fn required_data<'a>(xml: &'a XmlNode, key: &str) -> F2ccResult<&'a str> {
    data_value(xml, key).ok_or_else(|| {
        Error::parse(format!(
            "node `{}` is missing required `data key=\"{key}\"`",
            xml.attr("id").unwrap_or("?")
        ))
    })
}

/// Build one leaf, or a model-boundary IOPort for the legacy `inport`/
/// `outport` placeholder types, from a `<node>` element.
fn build_node(
    net: &mut ProcessNetwork,
    root: ProcessId,
    xml: &XmlNode,
) -> F2ccResult<(Id, NodeRef)> {
    let name = xml.required_attr("id")?;
    let leaf_type = required_data(xml, "leaf_type")?.to_lowercase();

    if leaf_type == "inport" {
        return Ok((Id::new(name), build_boundary_port(net, root, name, IrDirection::In)?));
    }
    if leaf_type == "outport" {
        return Ok((Id::new(name), build_boundary_port(net, root, name, IrDirection::Out)?));
    }

    let id = net.reserve_process();
    let (variant, in_arity, out_arity) = match leaf_type.as_str() {
        "delaysy" => {
            let init = required_data(xml, "initial_value")?.to_string();
            (LeafVariant::Delay { init_value: init }, 1, 1)
        }
        "unzipxsy" => {
            let n = required_data(xml, "num_leafs")?
                .parse::<usize>()
                .map_err(|_| Error::parse("`num_leafs` is not an integer"))?;
            (LeafVariant::UnzipX, 1, n)
        }
        "zipxsy" => {
            let n = required_data(xml, "num_leafs")?
                .parse::<usize>()
                .map_err(|_| Error::parse("`num_leafs` is not an integer"))?;
            (LeafVariant::ZipX, n, 1)
        }
        "mapsy" => {
            let func = Id::new(required_data(xml, "procfun_arg")?);
            (LeafVariant::Comb(CombKind::Map(func)), 1, 1)
        }
        "zipwithnsy" => {
            let func = Id::new(required_data(xml, "procfun_arg")?);
            let n = required_data(xml, "num_leafs")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(2);
            (LeafVariant::Comb(CombKind::ZipWithN(func)), n, 1)
        }
        "parallelmapsy" => {
            let func = Id::new(required_data(xml, "procfun_arg")?);
            let n = required_data(xml, "num_leafs")?
                .parse::<u64>()
                .map_err(|_| Error::parse("`num_leafs` is not an integer"))?;
            (
                LeafVariant::Comb(CombKind::ParallelMap {
                    replication: n,
                    functions: vec![func],
                }),
                1,
                1,
            )
        }
        other => {
            return Err(Error::not_supported(format!(
                "unrecognized legacy `leaf_type` `{other}`"
            )))
        }
    };

    // The legacy dialect carries no per-port type information on the
    // node itself; ports default to an untyped (`Custom`) scalar and are
    // refined by the synthesizer's type-inference pass (§4.4 Step 7).
    let array_size: Option<u64> = data_value(xml, "array_size")
        .and_then(|s| s.parse::<u64>().ok());
    let elem_ty = DataType::scalar(f2cc_ir::PrimKind::Custom("auto".into()));

    let mut in_ports = Vec::with_capacity(in_arity);
    let mut out_ports = Vec::with_capacity(out_arity);
    for i in 0..in_arity {
        let ty = if in_arity > 1 || leaf_type == "zipxsy" {
            elem_ty.clone()
        } else if let Some(sz) = array_size {
            DataType::array(elem_ty.kind.clone(), Some(sz))
        } else {
            elem_ty.clone()
        };
        in_ports.push(make_port(net, id, &format!("in{}", i + 1), IrDirection::In, ty));
    }
    for i in 0..out_arity {
        let ty = if out_arity > 1 || leaf_type == "unzipxsy" {
            elem_ty.clone()
        } else if let Some(sz) = array_size {
            DataType::array(elem_ty.kind.clone(), Some(sz))
        } else {
            elem_ty.clone()
        };
        out_ports.push(make_port(net, id, &format!("out{}", i + 1), IrDirection::Out, ty));
    }

    if let LeafVariant::Comb(CombKind::Map(f)) | LeafVariant::Comb(CombKind::ZipWithN(f)) =
        &variant
    {
        register_function(net, *f, &in_ports, &out_ports)?;
    }
    if let LeafVariant::Comb(CombKind::ParallelMap { functions, .. }) = &variant {
        register_function(net, functions[0], &in_ports, &out_ports)?;
    }

    let leaf = Leaf {
        common: ProcessCommon::new(name, Some(root)),
        in_ports,
        out_ports,
        variant,
    };
    leaf.check_arity().map_err(Error::invalid_process)?;
    net.install_process(id, Process::Leaf(leaf));
    if let Some(c) = net.process_mut(root).as_composite_mut() {
        c.children.push(id);
    }
    net.recompute_hierarchy(id);
    Ok((Id::new(name), NodeRef::Leaf(id)))
}

fn make_port(
    net: &mut ProcessNetwork,
    owner: ProcessId,
    name: &str,
    direction: IrDirection,
    ty: DataType,
) -> PortId {
    net.add_port(Port::new(name, owner, direction, ty))
}

fn register_function(
    net: &mut ProcessNetwork,
    fn_id: Id,
    in_ports: &[PortId],
    out_ports: &[PortId],
) -> F2ccResult<()> {
    if out_ports.len() != 1 {
        return Err(Error::invalid_process(format!(
            "comb function `{fn_id}` must drive exactly one out-port"
        )));
    }
    let out_ty = net.port(out_ports[0]).data_type.clone();
    let in_tys: Vec<DataType> =
        in_ports.iter().map(|&p| net.port(p).data_type.clone()).collect();
    net.functions.get_or_insert_with(fn_id, || {
        let params: Vec<Param> = in_tys
            .into_iter()
            .enumerate()
            .map(|(i, mut ty)| {
                if ty.is_array || ty.is_pointer {
                    ty = ty.with_const(true);
                }
                Param::input(format!("in{i}"), ty)
            })
            .collect();
        if out_ty.is_array {
            let mut params = params;
            params.push(Param::output("out", out_ty.clone().with_pointer(true)));
            Function::new(fn_id, params, None, String::new())
        } else {
            Function::new(fn_id, params, Some(out_ty.clone()), String::new())
        }
    });
    Ok(())
}

/// Bind one `<edge>` element: `source`/`target` reference node `id`s
/// directly (no per-port naming in the legacy dialect beyond ordinal
/// `in`/`out` slots), so the first free port of the matching direction
/// on each side is consumed in declaration order.
fn bind_edge(
    net: &mut ProcessNetwork,
    by_name: &HashMap<Id, NodeRef>,
    xml: &XmlNode,
) -> F2ccResult<()> {
    let source = xml.required_attr("source")?;
    let target = xml.required_attr("target")?;
    let source_port = xml.attr("sourceport");
    let target_port = xml.attr("targetport");

    let src_ref = by_name.get(&Id::new(source)).ok_or_else(|| {
        Error::invalid_model(format!("edge refers to unknown node `{source}`"))
    })?;
    let dst_ref = by_name.get(&Id::new(target)).ok_or_else(|| {
        Error::invalid_model(format!("edge refers to unknown node `{target}`"))
    })?;

    let src_ep = resolve_node_ref(net, src_ref, IrDirection::Out, source_port)?;
    let dst_ep = resolve_node_ref(net, dst_ref, IrDirection::In, target_port)?;

    let src_ep = ensure_fanout(net, src_ep)?;
    net.connect(src_ep, dst_ep);
    Ok(())
}

fn resolve_node_ref(
    net: &ProcessNetwork,
    node_ref: &NodeRef,
    direction: IrDirection,
    named: Option<&str>,
) -> F2ccResult<Endpoint> {
    match node_ref {
        NodeRef::Boundary(ep) => Ok(*ep),
        NodeRef::Leaf(id) => pick_port(net, *id, direction, named).map(Endpoint::Leaf),
    }
}

/// Pick the named port if given, else the first unconnected port of
/// `direction` on `owner`.
fn pick_port(
    net: &ProcessNetwork,
    owner: ProcessId,
    direction: IrDirection,
    named: Option<&str>,
) -> F2ccResult<PortId> {
    let leaf = net.process(owner).as_leaf().ok_or_else(|| {
        Error::invalid_model("edge endpoint resolves to a non-leaf process")
    })?;
    let candidates = match direction {
        IrDirection::Out => &leaf.out_ports,
        IrDirection::In => &leaf.in_ports,
    };
    if let Some(name) = named {
        return candidates
            .iter()
            .copied()
            .find(|&p| net.port(p).id == Id::new(name))
            .ok_or_else(|| {
                Error::invalid_model(format!(
                    "process `{}` has no port `{name}`",
                    net.process(owner).id()
                ))
            });
    }
    candidates
        .iter()
        .copied()
        .find(|&p| !net.port(p).is_connected())
        .ok_or_else(|| {
            Error::invalid_model(format!(
                "process `{}` has no free {direction:?} port for this edge",
                net.process(owner).id()
            ))
        })
}

