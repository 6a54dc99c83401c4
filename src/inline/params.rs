//! Fragment parameters and conditional-comment rewriting.
//!
//! A fragment declares placeholders with `<parameter name="…">`; the include
//! site supplies values the same way:
//!
//! ```html
//! <!-- include site -->
//! <link rel="import" href="button.html">
//!     <parameter name="label">Sign up</parameter>
//!     <parameter name="class">wide</parameter>
//! </link>
//!
//! <!-- button.html -->
//! <a class="btn"><parameter name="class" attr="class"/><parameter name="label"/></a>
//! ```
//!
//! Placeholders inside conditional comments (`<!--[if mso]>…<![endif]-->`)
//! are reached by parsing the comment body on its own and writing it back.

use super::context::InlinerContext;
use crate::dom::{Document, NodeId, NodeKind};
use crate::error::ErrorCategory;
use std::collections::BTreeMap;

/// Parameter name → value markup.
pub type Parameters = BTreeMap<String, String>;

const PARAMETER_TAG: &str = "parameter";

/// Collect the `<parameter>` children of an include tag.
pub fn collect(doc: &Document, include: NodeId, ctx: &mut InlinerContext) -> Parameters {
    let mut params = Parameters::new();
    for &child in doc.children(include) {
        let Some(el) = doc.element(child).filter(|el| el.is(PARAMETER_TAG)) else {
            continue;
        };
        match el.attr("name") {
            Some(name) => {
                params.insert(name.to_owned(), doc.inner_html(child));
            }
            None => ctx.warn(
                ErrorCategory::MissingAttribute,
                format!(
                    "include parameter without `name` in <link href=\"{}\">",
                    doc.element(include).and_then(|l| l.attr("href")).unwrap_or("")
                ),
            ),
        }
    }
    params
}

/// Replace every `<parameter>` below `scope` with its supplied value.
///
/// Placeholders without a value stay in place and are reported.
pub fn apply(doc: &mut Document, scope: NodeId, params: &Parameters, ctx: &mut InlinerContext) {
    for placeholder in doc.elements_by_name(scope, PARAMETER_TAG) {
        let Some(el) = doc.element(placeholder) else {
            continue;
        };
        let Some(name) = el.attr("name").map(str::to_owned) else {
            ctx.warn(
                ErrorCategory::MissingAttribute,
                "fragment parameter without `name`",
            );
            continue;
        };
        let Some(value) = params.get(&name) else {
            ctx.warn(
                ErrorCategory::UnresolvedParameter,
                format!("no value for parameter `{name}`"),
            );
            continue;
        };

        if let Some(target) = el.attr("attr").map(str::to_owned) {
            if let Some(parent) = doc.parent(placeholder)
                && let Some(parent_el) = doc.element_mut(parent)
            {
                let joined = match parent_el.attr(&target) {
                    Some(existing) => format!("{existing} {value}"),
                    None => value.clone(),
                };
                parent_el.set_attr(&target, joined);
            }
            doc.detach(placeholder);
        } else {
            let nodes = match Document::parse(value) {
                Ok(fragment) => doc.import_children(&fragment, fragment.root()),
                Err(_) => vec![doc.create_text(value.as_str())],
            };
            doc.insert_all_after(placeholder, &nodes);
            doc.detach(placeholder);
        }
    }
}

/// Apply parameters inside every conditional comment below `scope`.
pub fn rewrite_comments(
    doc: &mut Document,
    scope: NodeId,
    params: &Parameters,
    ctx: &mut InlinerContext,
) {
    for node in doc.descendants(scope) {
        let NodeKind::Comment(data) = doc.kind(node) else {
            continue;
        };
        if let Some(rewritten) = rewrite_comment(data, params, ctx) {
            *doc.kind_mut(node) = NodeKind::Comment(rewritten);
        }
    }
}

/// Split `[if mso]><td>…</td><![endif]` into opener, body and closer.
fn split_conditional(data: &str) -> Option<(&str, &str, &str)> {
    let open_end = data.find('>')? + 1;
    let close_start = data.find("<!")?;
    if close_start < open_end {
        return None;
    }
    Some((
        &data[..open_end],
        &data[open_end..close_start],
        &data[close_start..],
    ))
}

fn rewrite_comment(data: &str, params: &Parameters, ctx: &mut InlinerContext) -> Option<String> {
    let (open, body, close) = split_conditional(data)?;
    let mut fragment = Document::parse(body).ok()?;
    let root = fragment.root();
    apply(&mut fragment, root, params, ctx);
    Some(format!("{open}{}{close}", fragment.inner_html(root)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_collect_direct_children() {
        let doc = Document::parse(
            r#"<link rel="import" href="b.html"><parameter name="t"><b>x</b></parameter><parameter>y</parameter></link>"#,
        )
        .unwrap();
        let link = doc.first_element("link").unwrap();
        let mut ctx = InlinerContext::new();
        let collected = collect(&doc, link, &mut ctx);
        assert_eq!(collected.get("t").map(String::as_str), Some("<b>x</b>"));
        assert_eq!(collected.len(), 1);
        assert_eq!(ctx.warnings[0].category, ErrorCategory::MissingAttribute);
    }

    #[test]
    fn test_apply_replaces_content() {
        let mut doc = Document::parse(r#"<td><parameter name="t"/>!</td>"#).unwrap();
        let root = doc.root();
        let mut ctx = InlinerContext::new();
        apply(&mut doc, root, &params(&[("t", "<b>hi</b>")]), &mut ctx);
        assert_eq!(doc.to_html(), "<td><b>hi</b>!</td>");
        assert!(ctx.warnings.is_empty());
    }

    #[test]
    fn test_apply_appends_to_parent_attribute() {
        let mut doc = Document::parse(
            r#"<a class="btn"><parameter name="c" attr="class"/><parameter name="h" attr="href"/>go</a>"#,
        )
        .unwrap();
        let root = doc.root();
        let mut ctx = InlinerContext::new();
        apply(&mut doc, root, &params(&[("c", "wide"), ("h", "/x")]), &mut ctx);
        assert_eq!(doc.to_html(), r#"<a class="btn wide" href="/x">go</a>"#);
    }

    #[test]
    fn test_appended_attribute_value_with_quotes() {
        let mut doc =
            Document::parse(r#"<span title="A"><parameter name="a" attr="title"/></span>"#)
                .unwrap();
        let root = doc.root();
        let mut ctx = InlinerContext::new();
        apply(&mut doc, root, &params(&[("a", r#"the "best""#)]), &mut ctx);
        assert_eq!(
            crate::minify::minify(&doc),
            r#"<span title="A the &quot;best&quot;"></span>"#
        );
    }

    #[test]
    fn test_unresolved_parameter_left_in_place() {
        let source = r#"<p><parameter name="missing"/></p>"#;
        let mut doc = Document::parse(source).unwrap();
        let root = doc.root();
        let mut ctx = InlinerContext::new();
        apply(&mut doc, root, &params(&[("other", "v")]), &mut ctx);
        assert_eq!(doc.to_html(), r#"<p><parameter name="missing" /></p>"#);
        assert_eq!(ctx.warnings.len(), 1);
        assert_eq!(ctx.warnings[0].category, ErrorCategory::UnresolvedParameter);
    }

    #[test]
    fn test_conditional_comment_rewritten() {
        let mut doc = Document::parse(
            r#"<div><!--[if mso]><td><parameter name="w"/></td><![endif]--></div>"#,
        )
        .unwrap();
        let root = doc.root();
        let mut ctx = InlinerContext::new();
        rewrite_comments(&mut doc, root, &params(&[("w", "600")]), &mut ctx);
        assert_eq!(
            doc.to_html(),
            "<div><!--[if mso]><td>600</td><![endif]--></div>"
        );
    }

    #[test]
    fn test_split_conditional() {
        let (open, body, close) = split_conditional("[if mso]><b>x</b><![endif]").unwrap();
        assert_eq!(open, "[if mso]>");
        assert_eq!(body, "<b>x</b>");
        assert_eq!(close, "<![endif]");
        assert!(split_conditional(" plain note ").is_none());
    }

    #[test]
    fn test_plain_comment_untouched() {
        let mut doc = Document::parse("<!-- just a note -->").unwrap();
        let root = doc.root();
        let mut ctx = InlinerContext::new();
        rewrite_comments(&mut doc, root, &Parameters::new(), &mut ctx);
        assert_eq!(doc.to_html(), "<!-- just a note -->");
    }
}
