//! Plain serializer.
//!
//! Writes the tree back out without touching whitespace. Used for parameter
//! values, conditional-comment bodies and tests; the delivered output goes
//! through [`crate::minify`] instead.

use super::{Document, Element, NodeId, NodeKind, is_void};
use std::{borrow::Cow, fmt::Write};

impl Document {
    /// Markup of the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(&mut out, child);
        }
        out
    }

    /// Markup of the whole document.
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    fn write_node(&self, out: &mut String, id: NodeId) {
        match self.kind(id) {
            NodeKind::Root => {
                for &child in self.children(id) {
                    self.write_node(out, child);
                }
            }
            NodeKind::Element(el) => {
                write_open_tag(out, el);
                let children = self.children(id);
                if children.is_empty() {
                    if el.self_closing {
                        out.push_str(" />");
                    } else if is_void(el.local_name()) {
                        out.push('>');
                    } else {
                        let _ = write!(out, "></{}>", el.name);
                    }
                    return;
                }
                out.push('>');
                for &child in children {
                    self.write_node(out, child);
                }
                let _ = write!(out, "</{}>", el.name);
            }
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Comment(data) => {
                let _ = write!(out, "<!--{data}-->");
            }
            NodeKind::Doctype(doctype) => {
                let _ = write!(out, "<!DOCTYPE {}", doctype.name);
                match (&doctype.public_id, &doctype.system_id) {
                    (Some(public), Some(system)) => {
                        let _ = write!(out, " PUBLIC \"{public}\" \"{system}\"");
                    }
                    (Some(public), None) => {
                        let _ = write!(out, " PUBLIC \"{public}\"");
                    }
                    (None, Some(system)) => {
                        let _ = write!(out, " SYSTEM \"{system}\"");
                    }
                    (None, None) => {}
                }
                out.push('>');
            }
        }
    }
}

/// `<name attr="value"` without the closing bracket.
pub(crate) fn write_open_tag(out: &mut String, el: &Element) {
    out.push('<');
    out.push_str(&el.name);
    for attr in &el.attrs {
        let _ = write!(out, " {}=\"{}\"", attr.name, escape_attr(&attr.value));
    }
}

/// Make a raw attribute value safe inside double quotes.
///
/// Values keep their entity references as written, so only `"` changes.
fn escape_attr(value: &str) -> Cow<'_, str> {
    if value.contains('"') {
        Cow::Owned(value.replace('"', "&quot;"))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_html() {
        let doc = Document::parse("<tr><td><b>x</b> y</td></tr>").unwrap();
        let td = doc.first_element("td").unwrap();
        assert_eq!(doc.inner_html(td), "<b>x</b> y");
        let tr = doc.first_element("tr").unwrap();
        assert_eq!(doc.inner_html(tr), "<td><b>x</b> y</td>");
    }

    #[test]
    fn test_empty_element_forms() {
        let doc = Document::parse("<div></div><br><span/>").unwrap();
        assert_eq!(doc.to_html(), "<div></div><br><span />");
    }

    #[test]
    fn test_comment_and_doctype() {
        let doc = Document::parse("<!DOCTYPE html><!--[if mso]>x<![endif]-->").unwrap();
        assert_eq!(doc.to_html(), "<!DOCTYPE html><!--[if mso]>x<![endif]-->");
    }

    #[test]
    fn test_quote_in_attribute_escaped() {
        let doc = Document::parse(r#"<a title='say "hi"' href="x?a=1&amp;b=2">t</a>"#).unwrap();
        assert_eq!(
            doc.to_html(),
            r#"<a title="say &quot;hi&quot;" href="x?a=1&amp;b=2">t</a>"#
        );
        assert_eq!(escape_attr("plain"), "plain");
    }

    #[test]
    fn test_valueless_attribute_written_empty() {
        let doc = Document::parse("<style ui:inline>p{}</style>").unwrap();
        assert_eq!(doc.to_html(), "<style ui:inline=\"\">p{}</style>");
    }
}
