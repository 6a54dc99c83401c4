//! Template composition.
//!
//! A source opts into a template with a marker on its root element and fills
//! the template's insertion points by name:
//!
//! ```text
//! source.html                          layout.html
//! ┌──────────────────────────────┐     ┌───────────────────────────────┐
//! │ <html ui:template="layout">  │     │ <head>…</head>                │
//! │   <head>A</head>             │ ──► │ <ui:include section="body"/>  │
//! │   <ui:section name="body">   │     │ <ui:include section="foot"/>  │
//! │     B                        │     └───────────────────────────────┘
//! │   </ui:section>              │
//! └──────────────────────────────┘
//!
//! result: <head>A…</head> B
//! ```
//!
//! Unmatched sections are dropped. Unfilled insertion points stay. Only one
//! level of templates is followed.

use super::{
    context::{DependencyType, InlinerContext},
    links::{self, IncludeChain},
};
use crate::dom::Document;
use crate::error::{ErrorCategory, InlineError};
use crate::utils::category::normalize_path;
use std::{fs, path::Path};

const TEMPLATE_MARKER: &str = "template";
const SECTION_TAG: &str = "section";
const INCLUDE_TAG: &str = "include";

/// Merge `doc` into its declared template, if any.
///
/// Returns the document to continue with: the composed template, or `doc`
/// unchanged when it declares none or the template cannot be loaded.
pub fn composite(
    doc: Document,
    source: &Path,
    ctx: &mut InlinerContext,
    chain: &mut IncludeChain,
) -> Result<Document, InlineError> {
    let Some(reference) = doc
        .first_element("html")
        .and_then(|html| doc.element(html))
        .and_then(|el| el.marker(TEMPLATE_MARKER))
        .map(str::to_owned)
    else {
        return Ok(doc);
    };

    let base = source.parent().unwrap_or(source);
    let path = normalize_path(&base.join(&reference));
    let mut template = match load(&path) {
        Ok(template) => template,
        Err(e) => {
            ctx.warn(e.category(), e.to_string());
            return Ok(doc);
        }
    };
    ctx.add_dependency(&path, DependencyType::Template);

    merge_head(&doc, &mut template);
    fill_sections(&doc, &mut template, ctx);

    links::resolve(&mut template, base, ctx, chain)?;
    Ok(template)
}

fn load(path: &Path) -> Result<Document, InlineError> {
    let text = fs::read_to_string(path).map_err(|e| InlineError::io(path, e))?;
    Document::parse(&text).map_err(|e| InlineError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Put the source head's children in front of the template head's.
fn merge_head(doc: &Document, template: &mut Document) {
    let (Some(source_head), Some(template_head)) =
        (doc.first_element("head"), template.first_element("head"))
    else {
        return;
    };
    let nodes = template.import_children(doc, source_head);
    for node in nodes.into_iter().rev() {
        template.prepend(template_head, node);
    }
}

fn fill_sections(doc: &Document, template: &mut Document, ctx: &mut InlinerContext) {
    let includes = template.elements_by_name(template.root(), INCLUDE_TAG);

    for section in doc.elements_by_name(doc.root(), SECTION_TAG) {
        let Some(name) = doc.element(section).and_then(|el| el.attr("name")) else {
            ctx.warn(
                ErrorCategory::MissingAttribute,
                "section without `name` attribute",
            );
            continue;
        };
        let target = includes.iter().copied().find(|&include| {
            template.is_attached(include)
                && template
                    .element(include)
                    .and_then(|el| el.attr("section"))
                    .is_some_and(|s| s == name)
        });
        let Some(target) = target else {
            continue;
        };

        let nodes = template.import_children(doc, section);
        template.insert_all_after(target, &nodes);
        template.detach(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn compose(source: &str, template: &str) -> (Document, InlinerContext) {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();
        fs::write(base.join("layout.html"), template).unwrap();
        let source_path = base.join("index.html");

        let doc = Document::parse(source).unwrap();
        let mut ctx = InlinerContext::new();
        let mut chain = IncludeChain::new(&source_path);
        let doc = composite(doc, &source_path, &mut ctx, &mut chain).unwrap();
        (doc, ctx)
    }

    #[test]
    fn test_sections_fill_insertion_points() {
        let (doc, ctx) = compose(
            r#"<html ui:template="layout.html"><head><title>T</title></head><body><ui:section name="main"><p>hi</p></ui:section><ui:section name="unused">x</ui:section></body></html>"#,
            r#"<html><head><meta charset="utf-8"></head><body><ui:include section="main"/><ui:include section="foot"/></body></html>"#,
        );
        assert_eq!(
            doc.to_html(),
            r#"<html><head><title>T</title><meta charset="utf-8"></head><body><p>hi</p><ui:include section="foot" /></body></html>"#
        );
        let dep = ctx.dependencies.iter().next().unwrap();
        assert_eq!(dep.kind, DependencyType::Template);
        assert!(dep.path.ends_with("layout.html"));
    }

    #[test]
    fn test_no_template_marker_returns_source() {
        let (doc, ctx) = compose("<html><body>x</body></html>", "<html></html>");
        assert_eq!(doc.to_html(), "<html><body>x</body></html>");
        assert!(ctx.dependencies.is_empty());
    }

    #[test]
    fn test_missing_template_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("index.html");
        let doc = Document::parse(r#"<html ui:template="gone.html"><body>x</body></html>"#).unwrap();
        let mut ctx = InlinerContext::new();
        let mut chain = IncludeChain::new(&source_path);
        let doc = composite(doc, &source_path, &mut ctx, &mut chain).unwrap();
        assert!(doc.to_html().contains("<body>x</body>"));
        assert_eq!(ctx.warnings[0].category, ErrorCategory::Io);
    }

    #[test]
    fn test_template_links_resolved_after_composition() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();
        fs::write(
            base.join("layout.html"),
            r#"<html><head><link rel="stylesheet" href="site.css"></head><body><ui:include section="b"/></body></html>"#,
        )
        .unwrap();
        fs::write(base.join("site.css"), "td{}").unwrap();
        let source_path = base.join("index.html");

        let doc = Document::parse(
            r#"<html ui:template="layout.html"><body><ui:section name="b">B</ui:section></body></html>"#,
        )
        .unwrap();
        let mut ctx = InlinerContext::new();
        let mut chain = IncludeChain::new(&source_path);
        let doc = composite(doc, &source_path, &mut ctx, &mut chain).unwrap();

        assert_eq!(
            doc.to_html(),
            "<html><head><style>td{}</style></head><body>B</body></html>"
        );
        assert_eq!(ctx.dependencies.len(), 2);
    }
}
