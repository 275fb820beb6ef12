//! Debug XML dumper (§4.5), gated by `Config::dump_xml`. Not a full
//! inverse of the frontend's parser — it exists so a developer can see
//! the network's shape after the ModelModifier has run, the same way a
//! compiler's own IR-dump pass prints an intermediate form for
//! inspection rather than to round-trip it back through the parser.

use f2cc_ir::{Endpoint, Face, LeafVariant, Process, ProcessId, ProcessNetwork};
use f2cc_utils::{F2ccResult, OutputFile};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::Cursor;

/// Serialize `net`'s post-transform shape as XML and write it to
/// `out` (typically an [`OutputFile::File`] built from
/// `Config::dump_xml`).
pub fn dump(net: &ProcessNetwork, out: &mut OutputFile) -> F2ccResult<()> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    let mut root = BytesStart::new("process_network");
    root.push_attribute(("name", net.name.as_str()));
    writer.write_event(Event::Start(root.clone()))?;
    write_process(net, net.root, &mut writer)?;
    writer.write_event(Event::End(BytesEnd::new("process_network")))?;

    let bytes = writer.into_inner().into_inner();
    use std::io::Write;
    let mut handle = out.get_write();
    handle.write_all(&bytes).map_err(f2cc_utils::Error::from)?;
    handle.write_all(b"\n").map_err(f2cc_utils::Error::from)?;
    Ok(())
}

fn write_process(
    net: &ProcessNetwork,
    id: ProcessId,
    writer: &mut Writer<Cursor<Vec<u8>>>,
) -> F2ccResult<()> {
    match net.process(id) {
        Process::Leaf(leaf) => {
            let mut el = BytesStart::new("leaf_process");
            el.push_attribute(("name", net.process(id).id().as_ref()));
            el.push_attribute(("kind", leaf.variant.name()));
            writer.write_event(Event::Start(el.clone()))?;
            for &p in &leaf.in_ports {
                write_port(net, p, writer)?;
            }
            for &p in &leaf.out_ports {
                write_port(net, p, writer)?;
            }
            if let LeafVariant::Comb(kind) = &leaf.variant {
                for f in kind.functions() {
                    let mut fel = BytesStart::new("function");
                    fel.push_attribute(("name", f.as_ref()));
                    writer.write_event(Event::Empty(fel))?;
                }
            }
            writer.write_event(Event::End(BytesEnd::new("leaf_process")))?;
        }
        Process::Composite(comp) => {
            let mut el = BytesStart::new("composite_process");
            el.push_attribute(("name", net.process(id).id().as_ref()));
            writer.write_event(Event::Start(el.clone()))?;
            for &io in &comp.io_ports {
                let mut io_el = BytesStart::new("io_port");
                io_el.push_attribute(("name", net.io_port(io).id.as_ref()));
                io_el.push_attribute((
                    "outside_peer",
                    endpoint_label(net, net.io_port(io).peer(Face::Outside)).as_str(),
                ));
                io_el.push_attribute((
                    "inside_peer",
                    endpoint_label(net, net.io_port(io).peer(Face::Inside)).as_str(),
                ));
                writer.write_event(Event::Empty(io_el))?;
            }
            let children = comp.children.clone();
            for child in children {
                write_process(net, child, writer)?;
            }
            writer.write_event(Event::End(BytesEnd::new("composite_process")))?;
        }
    }
    Ok(())
}

fn write_port(
    net: &ProcessNetwork,
    port: f2cc_ir::PortId,
    writer: &mut Writer<Cursor<Vec<u8>>>,
) -> F2ccResult<()> {
    let p = net.port(port);
    let mut el = BytesStart::new("port");
    el.push_attribute(("name", p.id.as_ref()));
    el.push_attribute((
        "direction",
        match p.direction {
            f2cc_ir::Direction::In => "in",
            f2cc_ir::Direction::Out => "out",
        },
    ));
    el.push_attribute(("type", p.data_type.c_spelling().as_str()));
    el.push_attribute(("peer", endpoint_label(net, p.peer).as_str()));
    writer.write_event(Event::Empty(el))?;
    Ok(())
}

fn endpoint_label(net: &ProcessNetwork, ep: Option<Endpoint>) -> String {
    match ep {
        None => "unconnected".to_string(),
        Some(e) => net.endpoint_id(e).to_string(),
    }
}
