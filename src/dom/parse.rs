//! Tolerant markup parser built on `quick-xml`.
//!
//! Sources are read in XML mode so that prefixed marker tags (`ui:section`)
//! and self-closing custom elements survive untouched. A few HTML habits are
//! accepted on top of that:
//!
//! - void elements (`<meta>`, `<br>`, …) never take children, closed or not
//! - `<link rel="import">` may carry `<parameter>` children
//! - stray end tags are ignored, an end tag closes the nearest open match
//! - entity references (`&nbsp;`) are kept verbatim, a lone `&` is plain text
//! - a `<` that cannot open a tag (`1 < 2`, `<3`) is read as `&lt;`

use super::{Attribute, Doctype, Document, Element, NodeId, NodeKind};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use std::borrow::Cow;
use thiserror::Error;

/// HTML elements that never have content.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Debug, Error)]
#[error("malformed markup at byte {position}: {message}")]
pub struct ParseError {
    pub position: u64,
    pub message: String,
}

/// Whether `local` names an HTML void element.
#[inline]
pub fn is_void(local: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(local))
}

impl Document {
    /// Parse markup into a new document.
    ///
    /// Fragments with several top-level nodes are fine: they all become
    /// children of the synthetic root.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let text = escape_stray_lt(text);
        let mut reader = Reader::from_str(&text);
        let config = reader.config_mut();
        config.trim_text(false);
        config.enable_all_checks(false);
        config.allow_unmatched_ends = true;
        config.allow_dangling_amp = true;

        let mut doc = Document::new();
        let mut stack = vec![doc.root()];

        loop {
            let parent = *stack.last().unwrap_or(&doc.root());
            match reader.read_event() {
                Ok(Event::Start(tag)) => {
                    let element = read_element(&tag, false);
                    let container = !is_void(element.local_name()) || is_import_link(&element);
                    let id = doc.create_element(element);
                    doc.append(parent, id);
                    if container {
                        stack.push(id);
                    }
                }
                Ok(Event::Empty(tag)) => {
                    let id = doc.create_element(read_element(&tag, true));
                    doc.append(parent, id);
                }
                Ok(Event::End(tag)) => {
                    let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
                    let open = stack.iter().rposition(|&id| {
                        doc.element(id)
                            .is_some_and(|el| el.name.eq_ignore_ascii_case(&name))
                    });
                    if let Some(pos) = open {
                        stack.truncate(pos);
                    }
                }
                Ok(Event::Text(text)) => push_text(&mut doc, parent, &String::from_utf8_lossy(&text)),
                Ok(Event::GeneralRef(entity)) => {
                    push_text(&mut doc, parent, &format!("&{};", String::from_utf8_lossy(&entity)));
                }
                Ok(Event::CData(data)) => {
                    let raw = format!("<![CDATA[{}]]>", String::from_utf8_lossy(&data));
                    push_text(&mut doc, parent, &raw);
                }
                Ok(Event::Comment(comment)) => {
                    let id = doc.create(NodeKind::Comment(
                        String::from_utf8_lossy(&comment).into_owned(),
                    ));
                    doc.append(parent, id);
                }
                Ok(Event::DocType(decl)) => {
                    let id = doc.create(NodeKind::Doctype(parse_doctype(
                        &String::from_utf8_lossy(&decl),
                    )));
                    doc.append(parent, id);
                }
                Ok(Event::Eof) => break,
                // `<?xml …?>` declarations and processing instructions are dropped
                Ok(_) => {}
                Err(e) => {
                    return Err(ParseError {
                        position: reader.error_position() as u64,
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(doc)
    }
}

/// Replace every `<` that does not start markup with `&lt;`.
///
/// Markup starts with a letter (`<p`), `</` plus a letter, `<!` or `<?`.
/// Comment and CDATA bodies are copied untouched.
fn escape_stray_lt(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut i = 0;

    while let Some(offset) = text[i..].find('<') {
        let at = i + offset;
        let rest = &text[at..];
        let skip_to = if rest.starts_with("<!--") {
            Some(rest.find("-->").map_or(text.len(), |end| at + end + 3))
        } else if rest.starts_with("<![CDATA[") {
            Some(rest.find("]]>").map_or(text.len(), |end| at + end + 3))
        } else {
            None
        };
        if let Some(end) = skip_to {
            i = end;
            continue;
        }

        let opens_markup = match bytes.get(at + 1).copied() {
            Some(c) if c.is_ascii_alphabetic() || matches!(c, b'!' | b'?') => true,
            Some(b'/') => bytes.get(at + 2).is_some_and(u8::is_ascii_alphabetic),
            _ => false,
        };
        if !opens_markup {
            let out = out.get_or_insert_with(|| String::with_capacity(text.len() + 8));
            out.push_str(&text[copied..at]);
            out.push_str("&lt;");
            copied = at + 1;
        }
        i = at + 1;
    }

    match out {
        Some(mut out) => {
            out.push_str(&text[copied..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(text),
    }
}

fn read_element(tag: &BytesStart<'_>, self_closing: bool) -> Element {
    let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
    let attrs = tag
        .html_attributes()
        .with_checks(false)
        .flatten()
        .map(|attr| Attribute {
            name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value: String::from_utf8_lossy(&attr.value).into_owned(),
        })
        .collect();
    Element {
        name,
        attrs,
        self_closing,
    }
}

fn is_import_link(element: &Element) -> bool {
    element.is("link")
        && element
            .attr("rel")
            .is_some_and(|rel| rel.eq_ignore_ascii_case("import"))
}

/// Append text to `parent`, merging with a trailing text node.
fn push_text(doc: &mut Document, parent: NodeId, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(&last) = doc.children(parent).last()
        && let NodeKind::Text(existing) = doc.kind_mut(last)
    {
        existing.push_str(text);
        return;
    }
    let id = doc.create_text(text);
    doc.append(parent, id);
}

/// Split a doctype body (`html PUBLIC "…" "…"`) into its parts.
fn parse_doctype(body: &str) -> Doctype {
    let mut tokens = Vec::new();
    let mut rest = body.trim();
    while !rest.is_empty() {
        if let Some(quote) = rest.chars().next().filter(|c| matches!(c, '"' | '\'')) {
            let inner = &rest[1..];
            let end = inner.find(quote).unwrap_or(inner.len());
            tokens.push(inner[..end].to_owned());
            rest = inner.get(end + 1..).unwrap_or("").trim_start();
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            tokens.push(rest[..end].to_owned());
            rest = rest[end..].trim_start();
        }
    }

    let mut tokens = tokens.into_iter();
    let name = tokens.next().unwrap_or_else(|| "html".to_owned());
    let (public_id, system_id) = match tokens.next() {
        Some(kw) if kw.eq_ignore_ascii_case("PUBLIC") => (tokens.next(), tokens.next()),
        Some(kw) if kw.eq_ignore_ascii_case("SYSTEM") => (None, tokens.next()),
        _ => (None, None),
    };

    Doctype {
        name,
        public_id,
        system_id,
    }
}
