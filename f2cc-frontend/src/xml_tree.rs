//! A minimal, schema-agnostic XML element tree, built once from the raw
//! document with a `quick_xml::Reader` pull-parser so that both accepted
//! dialects (§6: the rich `process_network` dialect and the legacy
//! `graphml` dialect) can be walked as plain trees instead of repeating
//! event-loop bookkeeping in each dialect module.

use f2cc_utils::{Error, F2ccResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

/// One XML element: its tag name, attributes in document order, child
/// elements, and any directly-contained text (comments/PIs are dropped).
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub name: String,
    pub attrs: HashMap<String, String>,
    pub children: Vec<XmlNode>,
    pub text: String,
    /// Byte offset of the opening tag in the source document, used to
    /// give `Parse`/`InvalidModel` errors a useful location.
    pub byte_offset: usize,
}

impl XmlNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// A required attribute; `Parse` failure (§7) if absent.
    pub fn required_attr(&self, name: &str) -> F2ccResult<&str> {
        self.attr(name).ok_or_else(|| {
            Error::parse(format!(
                "`<{}>` element is missing required attribute `{name}`",
                self.name
            ))
        })
    }

    pub fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn child_named(&self, name: &str) -> Option<&XmlNode> {
        self.children_named(name).next()
    }
}

/// Parse a full XML document into a single root [`XmlNode`].
pub fn parse_document(content: &str) -> F2ccResult<XmlNode> {
    let mut reader = Reader::from_str(content);
    {
        let cfg = reader.config_mut();
        cfg.trim_text(true);
        cfg.check_end_names = true;
    }

    // Stack of (node-being-built) for every currently open element; the
    // top of the stack is the element whose children we're collecting.
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;
    let mut buf = Vec::new();

    loop {
        let offset = reader.buffer_position() as usize;
        match reader.read_event_into(&mut buf).map_err(Error::from)? {
            Event::Eof => break,
            Event::Start(e) => {
                let node = start_node(&e, offset)?;
                stack.push(node);
            }
            Event::Empty(e) => {
                let node = start_node(&e, offset)?;
                close_node(&mut stack, &mut root, node);
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| {
                    Error::parse("unbalanced closing tag in XML document")
                })?;
                close_node(&mut stack, &mut root, node);
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let text = t.unescape().map_err(Error::from)?;
                    top.text.push_str(&text);
                }
            }
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| Error::parse("XML document has no root element"))
}

fn start_node(
    e: &quick_xml::events::BytesStart,
    byte_offset: usize,
) -> F2ccResult<XmlNode> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(Error::from)?;
        let key =
            String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(Error::from)?
            .into_owned();
        attrs.insert(key, value);
    }
    Ok(XmlNode {
        name,
        attrs,
        children: Vec::new(),
        text: String::new(),
        byte_offset,
    })
}

fn close_node(
    stack: &mut Vec<XmlNode>,
    root: &mut Option<XmlNode>,
    node: XmlNode,
) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else {
        *root = Some(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_with_attrs() {
        let doc = parse_document(
            r#"<process_network name="net">
                 <leaf_process name="p1">
                   <port name="in1" direction="in" type="int32_t"/>
                 </leaf_process>
               </process_network>"#,
        )
        .unwrap();
        assert_eq!(doc.name, "process_network");
        assert_eq!(doc.attr("name"), Some("net"));
        let leaf = doc.child_named("leaf_process").unwrap();
        assert_eq!(leaf.attr("name"), Some("p1"));
        let port = leaf.child_named("port").unwrap();
        assert_eq!(port.attr("direction"), Some("in"));
    }

    #[test]
    fn rejects_unbalanced_document() {
        assert!(parse_document("<a><b></a>").is_err());
    }
}
