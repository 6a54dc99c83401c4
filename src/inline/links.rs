//! Link and import resolution.
//!
//! Two kinds of `<link>` are replaced by what they point at:
//!
//! | `rel`        | Replacement                                   | Dependency              |
//! |--------------|-----------------------------------------------|-------------------------|
//! | `stylesheet` | `<style>` block with the file's text           | `StyleInline` / `Style` |
//! | `import`     | the fragment's children, parameters applied   | `Fragment`              |
//!
//! A pass replaces what it can and reports whether anything changed; the
//! caller repeats passes until nothing does. Imports that still carry nested
//! links (inside parameter values) wait for a later pass so the innermost
//! reference is always expanded first.

use super::{
    context::{DependencyType, InlinerContext},
    params,
};
use crate::dom::{Attribute, Document, Element, NodeId};
use crate::error::{ErrorCategory, InlineError};
use crate::utils::category::normalize_path;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Upper bound on resolution passes for one document.
pub const MAX_PASSES: usize = 64;

const LINK_TAG: &str = "link";
const INLINE_MARKER: &str = "inline";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkKind {
    Stylesheet,
    Import,
}

/// Fragments currently being expanded, outermost first.
#[derive(Debug, Default)]
pub struct IncludeChain(Vec<PathBuf>);

impl IncludeChain {
    pub fn new(origin: &Path) -> Self {
        Self(vec![origin.to_path_buf()])
    }

    fn enter(&mut self, path: &Path) -> Result<(), InlineError> {
        if self.0.iter().any(|p| p == path) {
            return Err(InlineError::IncludeCycle {
                path: path.to_path_buf(),
            });
        }
        self.0.push(path.to_path_buf());
        Ok(())
    }

    fn leave(&mut self) {
        self.0.pop();
    }
}

/// Resolve references until a pass makes no replacement.
pub fn resolve(
    doc: &mut Document,
    base: &Path,
    ctx: &mut InlinerContext,
    chain: &mut IncludeChain,
) -> Result<(), InlineError> {
    for _ in 0..MAX_PASSES {
        if !resolve_pass(doc, base, ctx, chain)? {
            return Ok(());
        }
    }
    Err(InlineError::PassLimit { passes: MAX_PASSES })
}

/// One scan over the document's links. Returns whether anything was replaced.
pub fn resolve_pass(
    doc: &mut Document,
    base: &Path,
    ctx: &mut InlinerContext,
    chain: &mut IncludeChain,
) -> Result<bool, InlineError> {
    let mut changed = false;

    for link in doc.elements_by_name(doc.root(), LINK_TAG) {
        if !doc.is_attached(link) {
            continue;
        }
        let Some(el) = doc.element(link) else {
            continue;
        };
        let Some(kind) = link_kind(el) else {
            continue;
        };
        let Some(href) = el.attr("href").map(str::to_owned) else {
            ctx.warn(
                ErrorCategory::MissingAttribute,
                InlineError::MissingAttribute {
                    tag: el.name.clone(),
                    attribute: "href".into(),
                }
                .to_string(),
            );
            continue;
        };
        let path = normalize_path(&base.join(&href));

        changed |= match kind {
            LinkKind::Stylesheet => inline_stylesheet(doc, link, &path, ctx),
            LinkKind::Import if has_pending_link(doc, link) => false,
            LinkKind::Import => import_fragment(doc, link, &path, ctx, chain)?,
        };
    }

    Ok(changed)
}

fn link_kind(el: &Element) -> Option<LinkKind> {
    match el.attr("rel") {
        Some(rel) if rel.eq_ignore_ascii_case("stylesheet") => Some(LinkKind::Stylesheet),
        Some(rel) if rel.eq_ignore_ascii_case("import") => Some(LinkKind::Import),
        _ => None,
    }
}

/// Whether a stylesheet or import link with an `href` still sits below `link`.
fn has_pending_link(doc: &Document, link: NodeId) -> bool {
    doc.elements_by_name(link, LINK_TAG).into_iter().any(|id| {
        doc.element(id)
            .is_some_and(|el| el.has_attr("href") && link_kind(el).is_some())
    })
}

fn inline_stylesheet(
    doc: &mut Document,
    link: NodeId,
    path: &Path,
    ctx: &mut InlinerContext,
) -> bool {
    let css = match fs::read_to_string(path) {
        Ok(css) => css,
        Err(e) => {
            ctx.warn(
                ErrorCategory::Io,
                format!("cannot read stylesheet `{}`: {e}", path.display()),
            );
            return false;
        }
    };
    let Some(el) = doc.element(link) else {
        return false;
    };

    let mut style = Element::new("style");
    style.attrs = el
        .attrs
        .iter()
        .filter(|a| !a.name.eq_ignore_ascii_case("rel") && !a.name.eq_ignore_ascii_case("href"))
        .cloned()
        .collect::<Vec<Attribute>>();
    let kind = if el.has_marker(INLINE_MARKER) {
        DependencyType::StyleInline
    } else {
        DependencyType::Style
    };

    let style = doc.create_element(style);
    let text = doc.create_text(css);
    doc.append(style, text);
    doc.insert_after(link, style);
    doc.detach(link);

    ctx.add_dependency(path, kind);
    true
}

fn import_fragment(
    doc: &mut Document,
    link: NodeId,
    path: &Path,
    ctx: &mut InlinerContext,
    chain: &mut IncludeChain,
) -> Result<bool, InlineError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            ctx.warn(
                ErrorCategory::Io,
                format!("cannot read fragment `{}`: {e}", path.display()),
            );
            return Ok(false);
        }
    };
    let mut fragment = match Document::parse(&text) {
        Ok(fragment) => fragment,
        Err(e) => {
            ctx.warn(
                ErrorCategory::Parse,
                format!("cannot parse fragment `{}`: {e}", path.display()),
            );
            return Ok(false);
        }
    };

    let parameters = params::collect(doc, link, ctx);
    let fragment_base = path.parent().unwrap_or(path);

    chain.enter(path)?;
    let resolved = resolve(&mut fragment, fragment_base, ctx, chain);
    chain.leave();
    resolved?;

    let root = fragment.root();
    params::apply(&mut fragment, root, &parameters, ctx);
    if !parameters.is_empty() {
        params::rewrite_comments(&mut fragment, root, &parameters, ctx);
    }

    let nodes = doc.import_children(&fragment, root);
    doc.insert_all_after(link, &nodes);
    doc.detach(link);

    ctx.add_dependency(path, DependencyType::Fragment);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn run(dir: &Path, source: &str) -> (Document, InlinerContext, Result<(), InlineError>) {
        let base = dir.canonicalize().unwrap();
        let mut doc = Document::parse(source).unwrap();
        let mut ctx = InlinerContext::new();
        let mut chain = IncludeChain::new(&base.join("index.html"));
        let result = resolve(&mut doc, &base, &mut ctx, &mut chain);
        (doc, ctx, result)
    }

    #[test]
    fn test_stylesheet_becomes_style_block() {
        let dir = setup(&[("a.css", "p{color:red}")]);
        let (doc, ctx, result) = run(
            dir.path(),
            r#"<head><link rel="stylesheet" href="a.css" ui:inline></head>"#,
        );
        result.unwrap();
        assert_eq!(
            doc.to_html(),
            r#"<head><style ui:inline="">p{color:red}</style></head>"#
        );
        let dep = ctx.dependencies.iter().next().unwrap();
        assert_eq!(dep.kind, DependencyType::StyleInline);
        assert!(dep.path.ends_with("a.css"));
    }

    #[test]
    fn test_plain_stylesheet_dependency() {
        let dir = setup(&[("a.css", "p{}")]);
        let (_, ctx, result) = run(dir.path(), r#"<link rel="stylesheet" href="a.css">"#);
        result.unwrap();
        assert_eq!(
            ctx.dependencies.iter().next().unwrap().kind,
            DependencyType::Style
        );
    }

    #[test]
    fn test_missing_stylesheet_left_in_place() {
        let dir = setup(&[]);
        let source = r#"<link rel="stylesheet" href="nope.css">"#;
        let (doc, ctx, result) = run(dir.path(), source);
        result.unwrap();
        assert_eq!(doc.to_html(), source);
        assert_eq!(ctx.warnings[0].category, ErrorCategory::Io);
        assert!(ctx.dependencies.is_empty());
    }

    #[test]
    fn test_missing_href_warns() {
        let dir = setup(&[]);
        let (doc, ctx, result) = run(dir.path(), r#"<link rel="import">"#);
        result.unwrap();
        assert!(doc.first_element("link").is_some());
        assert_eq!(ctx.warnings[0].category, ErrorCategory::MissingAttribute);
    }

    #[test]
    fn test_fragment_with_parameters() {
        let dir = setup(&[(
            "parts/button.html",
            r#"<a class="btn"><parameter name="cls" attr="class"/><parameter name="label"/></a>"#,
        )]);
        let (doc, ctx, result) = run(
            dir.path(),
            r#"<td><link rel="import" href="parts/button.html"><parameter name="cls">wide</parameter><parameter name="label">Go</parameter></link></td>"#,
        );
        result.unwrap();
        assert_eq!(doc.to_html(), r#"<td><a class="btn wide">Go</a></td>"#);
        assert_eq!(
            ctx.dependencies.iter().next().unwrap().kind,
            DependencyType::Fragment
        );
    }

    #[test]
    fn test_nested_fragments_resolve_relative_to_fragment() {
        let dir = setup(&[
            ("parts/b.html", r#"<b><link rel="import" href="c.html"></b>"#),
            ("parts/c.html", "<i>c</i>"),
        ]);
        let (doc, ctx, result) = run(dir.path(), r#"<link rel="import" href="parts/b.html">"#);
        result.unwrap();
        assert_eq!(doc.to_html(), "<b><i>c</i></b>");
        assert_eq!(ctx.dependencies.len(), 2);
    }

    #[test]
    fn test_import_with_nested_link_deferred() {
        let dir = setup(&[("frag.html", "<div><parameter name=\"s\"/></div>"), ("s.css", "x")]);
        let base = dir.path().canonicalize().unwrap();
        let mut doc = Document::parse(
            r#"<link rel="import" href="frag.html"><parameter name="s"><link rel="stylesheet" href="s.css"></parameter></link>"#,
        )
        .unwrap();
        let mut ctx = InlinerContext::new();
        let mut chain = IncludeChain::new(&base.join("index.html"));

        // First pass: only the inner stylesheet is expanded
        assert!(resolve_pass(&mut doc, &base, &mut ctx, &mut chain).unwrap());
        assert!(doc.first_element("link").is_some());
        assert_eq!(ctx.dependencies.len(), 1);

        // Second pass: the import, now free of nested links
        assert!(resolve_pass(&mut doc, &base, &mut ctx, &mut chain).unwrap());
        assert_eq!(doc.to_html(), "<div><style>x</style></div>");
    }

    #[test]
    fn test_import_carrying_unrelated_link_not_deferred() {
        let dir = setup(&[("frag.html", "<head><parameter name=\"i\"/></head>")]);
        let (doc, ctx, result) = run(
            dir.path(),
            r#"<link rel="import" href="frag.html"><parameter name="i"><link rel="icon" href="x.png"></parameter></link>"#,
        );
        result.unwrap();
        assert_eq!(doc.to_html(), r#"<head><link rel="icon" href="x.png"></head>"#);
        assert_eq!(ctx.dependencies.len(), 1);
        assert!(ctx.warnings.is_empty());
    }

    #[test]
    fn test_resolved_document_reaches_fixpoint() {
        let dir = setup(&[("a.css", "p{}"), ("f.html", "<p>f</p>")]);
        let base = dir.path().canonicalize().unwrap();
        let mut doc = Document::parse(
            r#"<link rel="stylesheet" href="a.css"><link rel="import" href="f.html">"#,
        )
        .unwrap();
        let mut ctx = InlinerContext::new();
        let mut chain = IncludeChain::new(&base.join("index.html"));
        resolve(&mut doc, &base, &mut ctx, &mut chain).unwrap();

        let before = doc.to_html();
        assert!(!resolve_pass(&mut doc, &base, &mut ctx, &mut chain).unwrap());
        assert_eq!(doc.to_html(), before);
    }

    #[test]
    fn test_circular_include_detected() {
        let dir = setup(&[
            ("a.html", r#"<link rel="import" href="b.html">"#),
            ("b.html", r#"<link rel="import" href="a.html">"#),
        ]);
        let (_, _, result) = run(dir.path(), r#"<link rel="import" href="a.html">"#);
        assert!(matches!(result, Err(InlineError::IncludeCycle { .. })));
    }

    #[test]
    fn test_unrelated_links_untouched() {
        let dir = setup(&[]);
        let source = r#"<link rel="icon" href="x.png">"#;
        let (doc, ctx, result) = run(dir.path(), source);
        result.unwrap();
        assert_eq!(doc.to_html(), source);
        assert!(ctx.warnings.is_empty());
    }
}
