//! Classifies `<invoke>` elements as static or dynamic, and for static
//! invokes with inline child SCXML, extracts the child to a sibling file
//! and recursively analyzes it to propagate its feature flags.

use std::path::{Path, PathBuf};

use log::warn;

use crate::model::{Invoke, Model, Param, StaticInvoke};
use crate::xml_reader::Element;

const TAG_PARAM: &str = "param";
const TAG_CONTENT: &str = "content";
const TAG_FINALIZE: &str = "finalize";
const TAG_SCXML: &str = "scxml";

const STATIC_TYPES: &[&str] = &["", "scxml", "http://www.w3.org/TR/scxml/"];

/// Parses one `<invoke>` element, returning the parsed record and, if the
/// invoke is static, the flattened record for `Model::static_invokes`.
/// `out_dir`, when set, overrides the directory inline child SCXML is
/// extracted into; `None` extracts beside `source_path`.
pub fn resolve(
    el: &Element,
    state_id: &str,
    invoke_index: usize,
    model: &mut Model,
    source_path: &Path,
    out_dir: Option<&Path>,
) -> (Invoke, Option<StaticInvoke>) {
    let invoke_type = el.attr_or_empty("type").to_string();
    let type_expr = el.attr_or_empty("typeexpr").to_string();
    let src = el.attr_or_empty("src").to_string();
    let src_expr = el.attr_or_empty("srcexpr").to_string();

    let content_el = el.find_first_child(TAG_CONTENT);
    let content_expr = content_el
        .and_then(|c| c.attr("expr"))
        .unwrap_or("")
        .to_string();
    let inline_scxml = content_el.and_then(|c| c.find_first_child(TAG_SCXML));

    let is_static = type_expr.is_empty()
        && STATIC_TYPES.contains(&invoke_type.as_str())
        && src_expr.is_empty()
        && content_expr.is_empty()
        && ((!src.is_empty()) ^ inline_scxml.is_some());

    let mut id = el.attr_or_empty("id").to_string();
    if id.is_empty() && is_static {
        id = format!("{}_invoke_{}", state_id, invoke_index);
    }

    let finalize = el
        .find_first_child(TAG_FINALIZE)
        .map(|f| crate::executable_content::parse_actions(f, model))
        .unwrap_or_default();

    let content_text = content_el
        .filter(|_| inline_scxml.is_none())
        .map(|c| c.text.clone())
        .unwrap_or_default();

    let invoke = Invoke {
        id: id.clone(),
        id_location: el.attr_or_empty("idlocation").to_string(),
        invoke_type: invoke_type.clone(),
        type_expr,
        src: src.clone(),
        src_expr,
        autoforward: el.attr_or_empty("autoforward") == "true",
        namelist: el.attr_or_empty("namelist").to_string(),
        params: parse_params(el),
        finalize,
        content: content_text,
        content_expr,
        is_static,
    };

    if !is_static {
        return (invoke, None);
    }

    let static_record = if !src.is_empty() {
        resolve_src_invoke(&src, source_path, out_dir)
    } else if let Some(inline) = inline_scxml {
        resolve_inline_invoke(inline, model, source_path, out_dir)
    } else {
        None
    };

    let static_record = static_record.map(|mut r| {
        r.state_id = state_id.to_string();
        r.invoke_id = id;
        r
    });

    (invoke, static_record)
}

fn parse_params(el: &Element) -> Vec<Param> {
    el.find_all_children(TAG_PARAM)
        .into_iter()
        .map(|p| Param {
            name: p.attr_or_empty("name").to_string(),
            expr: p.attr_or_empty("expr").to_string(),
            location: p.attr_or_empty("location").to_string(),
        })
        .collect()
}

fn resolve_src_invoke(src: &str, source_path: &Path, out_dir: Option<&Path>) -> Option<StaticInvoke> {
    let stripped = src.strip_prefix("file:").unwrap_or(src);
    let dir = source_path.parent().unwrap_or_else(|| Path::new("."));
    let child_path = dir.join(stripped);
    let child_name = Path::new(stripped)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| stripped.to_string());

    let child_needs_jsengine = match crate::analyze_file_in(&child_path, out_dir) {
        Ok(child_model) => child_model.needs_jsengine,
        Err(err) => {
            warn!("could not read invoke source '{}': {}", child_path.display(), err);
            true
        }
    };

    Some(StaticInvoke {
        state_id: String::new(),
        invoke_id: String::new(),
        child_name,
        child_needs_jsengine,
    })
}

fn resolve_inline_invoke(
    inline: &Element,
    model: &mut Model,
    source_path: &Path,
    out_dir: Option<&Path>,
) -> Option<StaticInvoke> {
    let inline_name = inline.attr("name").filter(|n| !n.is_empty());
    let counter = model.static_invokes.len();
    let child_name = match inline_name {
        Some(n) => format!("{}_{}", model.name, n),
        None => format!("{}_child{}", model.name, counter),
    };

    let dir = out_dir.unwrap_or_else(|| source_path.parent().unwrap_or_else(|| Path::new(".")));
    let child_path = dir.join(format!("{}.scxml", child_name));

    let serialized = serialize_element(inline);
    if let Err(err) = write_atomically(&child_path, &serialized) {
        warn!("could not write extracted invoke '{}': {}", child_path.display(), err);
        return Some(StaticInvoke {
            state_id: String::new(),
            invoke_id: String::new(),
            child_name,
            child_needs_jsengine: true,
        });
    }

    let child_needs_jsengine = match crate::analyze_file_in(&child_path, out_dir) {
        Ok(child_model) => child_model.needs_jsengine,
        Err(err) => {
            warn!("could not re-analyze extracted invoke '{}': {}", child_path.display(), err);
            true
        }
    };

    Some(StaticInvoke {
        state_id: String::new(),
        invoke_id: String::new(),
        child_name,
        child_needs_jsengine,
    })
}

/// Write-then-rename so a build watching the parent directory never
/// observes a partially-written sibling file.
fn write_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    let tmp_path = tmp_path_for(path);
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn serialize_element(el: &Element) -> String {
    let mut out = String::new();
    serialize_into(el, &mut out);
    out
}

fn serialize_into(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    if el.name == "scxml" {
        out.push_str(" xmlns=\"http://www.w3.org/2005/07/scxml\"");
    }
    let mut keys: Vec<&String> = el.attributes.keys().collect();
    keys.sort();
    for key in keys {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attr(&el.attributes[key]));
        out.push('"');
    }
    if el.children.is_empty() && el.text.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    out.push_str(&escape_text(&el.text));
    for child in &el.children {
        serialize_into(child, out);
    }
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;")
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;")
}
