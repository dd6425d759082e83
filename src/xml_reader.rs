//! Namespace-aware DOM reader.
//!
//! Builds an in-memory, order-preserving element tree from an XML document
//! and exposes the two query primitives the rest of the analyzer needs:
//! find-first-child-with-local-name and find-all-children-with-local-name,
//! both scoped to the SCXML namespace. Everything outside that namespace is
//! invisible to callers, matching how the reference reader this module is
//! modeled after strips namespace prefixes before comparing tag names.

use std::collections::HashMap;
use std::path::Path;

use log::debug;
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::error::{AnalysisError, Result};

pub const SCXML_NS: &[u8] = b"http://www.w3.org/2005/07/scxml";

/// One XML element, with its attributes, text content and children in
/// document order.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub name: String,
    pub in_scxml_ns: bool,
    pub attributes: HashMap<String, String>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn attr_or_empty(&self, name: &str) -> &str {
        self.attr(name).unwrap_or("")
    }

    /// First direct child whose local name matches and which resolved into
    /// the SCXML namespace.
    pub fn find_first_child(&self, local_name: &str) -> Option<&Element> {
        self.children
            .iter()
            .find(|c| c.in_scxml_ns && c.name == local_name)
    }

    /// All direct children whose local name matches and which resolved into
    /// the SCXML namespace, in document order.
    pub fn find_all_children(&self, local_name: &str) -> Vec<&Element> {
        self.children
            .iter()
            .filter(|c| c.in_scxml_ns && c.name == local_name)
            .collect()
    }

    /// All direct children that are elements in the SCXML namespace,
    /// regardless of name, in document order.
    pub fn scxml_children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter(|c| c.in_scxml_ns)
    }
}

/// Reads `path` and returns the root element of the parsed document.
pub fn read_document(path: &Path) -> Result<Element> {
    let bytes = std::fs::read(path).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&bytes, path)
}

/// Parses an in-memory XML byte buffer, as if it had been read from `path`
/// (used only for error messages).
pub fn parse_document(bytes: &[u8], path: &Path) -> Result<Element> {
    let text = std::str::from_utf8(bytes).map_err(|e| AnalysisError::Xml {
        path: path.to_path_buf(),
        message: format!("not valid utf-8: {}", e),
    })?;

    let mut reader = NsReader::from_str(text);
    reader.config_mut().trim_text(false);

    // Stack of partially-built elements; top is the element currently open.
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| AnalysisError::Xml {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        match event {
            Event::Start(e) => {
                let el = build_element(&reader, &e, false, path)?;
                stack.push(el);
            }
            Event::Empty(e) => {
                let el = build_element(&reader, &e, true, path)?;
                push_finished(&mut stack, &mut root, el);
            }
            Event::End(_) => {
                let el = stack.pop().ok_or_else(|| AnalysisError::Xml {
                    path: path.to_path_buf(),
                    message: "unbalanced end tag".to_string(),
                })?;
                push_finished(&mut stack, &mut root, el);
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let decoded = t.unescape().map_err(|e| AnalysisError::Xml {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                    top.text.push_str(&decoded);
                }
            }
            Event::CData(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(t.as_ref()));
                }
            }
            Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    root.ok_or_else(|| AnalysisError::InvalidDocument {
        path: path.to_path_buf(),
        message: "document has no root element".to_string(),
    })
}

fn push_finished(stack: &mut Vec<Element>, root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None => *root = Some(el),
    }
}

fn build_element(
    reader: &NsReader<&[u8]>,
    e: &quick_xml::events::BytesStart,
    _empty: bool,
    path: &Path,
) -> Result<Element> {
    let (resolved, local) = reader.resolve_element(e.name());
    let in_scxml_ns = matches!(resolved, ResolveResult::Bound(ns) if ns.as_ref() == SCXML_NS);
    let name = String::from_utf8_lossy(local.as_ref()).into_owned();

    let mut attributes = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| AnalysisError::Xml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let (_resolved_attr_ns, attr_local) = reader.resolve_attribute(attr.key);
        let key = String::from_utf8_lossy(attr_local.as_ref()).into_owned();
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map_err(|e| AnalysisError::Xml {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .into_owned();
        attributes.insert(key, value);
    }

    debug!("xml element: {} (scxml-ns={})", name, in_scxml_ns);

    Ok(Element {
        name,
        in_scxml_ns,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Element {
        parse_document(xml.as_bytes(), Path::new("test.scxml")).unwrap()
    }

    #[test]
    fn reads_root_and_children_in_order() {
        let root = parse(
            r#"<scxml xmlns="http://www.w3.org/2005/07/scxml" initial="a">
                 <state id="a"/>
                 <state id="b"/>
               </scxml>"#,
        );
        assert_eq!(root.name, "scxml");
        assert!(root.in_scxml_ns);
        assert_eq!(root.attr("initial"), Some("a"));
        let states = root.find_all_children("state");
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].attr("id"), Some("a"));
        assert_eq!(states[1].attr("id"), Some("b"));
    }

    #[test]
    fn ignores_elements_outside_scxml_namespace() {
        let root = parse(
            r#"<scxml xmlns="http://www.w3.org/2005/07/scxml">
                 <foo:state xmlns:foo="urn:something-else" id="x"/>
                 <state id="y"/>
               </scxml>"#,
        );
        let states = root.find_all_children("state");
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].attr("id"), Some("y"));
    }

    #[test]
    fn find_first_child_returns_none_when_absent() {
        let root = parse(r#"<scxml xmlns="http://www.w3.org/2005/07/scxml"/>"#);
        assert!(root.find_first_child("state").is_none());
    }

    #[test]
    fn preserves_text_content_verbatim() {
        let root = parse(
            r#"<scxml xmlns="http://www.w3.org/2005/07/scxml">
                 <script>  var x = 1;  </script>
               </scxml>"#,
        );
        let script = root.find_first_child("script").unwrap();
        assert_eq!(script.text, "  var x = 1;  ");
    }

    #[test]
    fn rejects_malformed_xml() {
        let err = parse_document(b"<scxml><state></scxml>", Path::new("bad.scxml"))
            .expect_err("should fail");
        assert!(matches!(err, AnalysisError::Xml { .. }));
    }
}
