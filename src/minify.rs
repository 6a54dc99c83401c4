//! Minifying serializer.
//!
//! A single depth-first walk that writes the tree as compact markup:
//!
//! - every whitespace run in text and comments becomes one space (no
//!   exemption for `<pre>`)
//! - empty void elements are written `<br>`, other empty self-closed ones
//!   `<tag />`
//! - the doctype is rewritten to the `html` skeleton, keeping any ids

use crate::dom::{Document, NodeId, NodeKind, is_void, write_open_tag};
use regex::Regex;
use std::{
    fmt::Write,
    fs, io,
    path::Path,
    sync::LazyLock,
};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?-u:\s)+").unwrap());

// ============================================================================
// Entry Points
// ============================================================================

/// Minify a document into a string.
pub fn minify(doc: &Document) -> String {
    let mut out = String::new();
    write_node(doc, doc.root(), &mut out);
    out
}

/// Minify a document straight to `path`.
pub fn minify_to(doc: &Document, path: &Path) -> io::Result<()> {
    fs::write(path, minify(doc))
}

/// Collapse all whitespace runs to a single space.
#[inline]
pub fn collapse_whitespace(text: &str) -> std::borrow::Cow<'_, str> {
    WHITESPACE.replace_all(text, " ")
}

// ============================================================================
// Traversal
// ============================================================================

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        NodeKind::Root => {
            for &child in doc.children(id) {
                write_node(doc, child, out);
            }
        }
        NodeKind::Doctype(doctype) => {
            out.push_str("<!DOCTYPE html");
            match (&doctype.public_id, &doctype.system_id) {
                (Some(public), system) => {
                    let _ = write!(out, " PUBLIC \"{public}\"");
                    if let Some(system) = system {
                        let _ = write!(out, " \"{system}\"");
                    }
                }
                (None, Some(system)) => {
                    let _ = write!(out, " SYSTEM \"{system}\"");
                }
                (None, None) => {}
            }
            out.push('>');
        }
        NodeKind::Element(el) => {
            write_open_tag(out, el);

            let children = doc.children(id);
            if children.is_empty() && is_void(el.local_name()) {
                out.push('>');
                return;
            }
            if children.is_empty() && el.self_closing {
                out.push_str(" />");
                return;
            }

            out.push('>');
            for &child in children {
                write_node(doc, child, out);
            }
            let _ = write!(out, "</{}>", el.name);
        }
        NodeKind::Text(text) => out.push_str(&collapse_whitespace(text)),
        NodeKind::Comment(data) => {
            let _ = write!(out, "<!--{}-->", collapse_whitespace(data));
        }
    }
}
