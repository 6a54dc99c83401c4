//! Template inlining engine.
//!
//! One call to [`Inliner::process`] turns a source template into a single
//! self-contained, minified document:
//!
//! ```text
//! source.html
//!     │ parse
//!     ▼
//! resolve links ──► compose template ──► resolve template links
//!     │                                         │
//!     └─────────────────────┬───────────────────┘
//!                           ▼
//!                 inline CSS ──► meta / title ──► minify ──► file or memory
//! ```
//!
//! Everything learned on the way (dependencies, metadata, warnings) lands in
//! the returned [`InlinerContext`].

pub mod context;
pub mod css;
pub mod links;
pub mod params;
pub mod selector;
pub mod template;

pub use context::{Dependency, DependencyType, InlinerContext};

use crate::dom::{Document, NodeKind};
use crate::error::InlineError;
use crate::minify;
use links::IncludeChain;
use quick_xml::escape::unescape;
use std::{borrow::Cow, fs, path::Path};

/// Stateless entry point of the engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inliner;

impl Inliner {
    pub const fn new() -> Self {
        Self
    }

    /// Process `source`, writing the result to `destination` or keeping it in
    /// [`InlinerContext::html`] when no destination is given.
    ///
    /// Only failing to read or parse `source` itself, an include cycle, or
    /// writing the result is an error. Everything else is a warning.
    pub fn process(
        &self,
        source: &Path,
        destination: Option<&Path>,
    ) -> Result<InlinerContext, InlineError> {
        let mut ctx = InlinerContext::new();
        let text = fs::read_to_string(source).map_err(|e| InlineError::io(source, e))?;
        let mut doc = Document::parse(&text).map_err(|e| InlineError::Parse {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;

        let base = source.parent().unwrap_or(source);
        let mut chain = IncludeChain::new(source);
        links::resolve(&mut doc, base, &mut ctx, &mut chain)?;
        let mut doc = template::composite(doc, source, &mut ctx, &mut chain)?;

        css::inline_styles(&mut doc, &mut ctx)?;
        extract_meta(&doc, &mut ctx);
        ctx.title = title(&doc);

        match destination {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(|e| InlineError::io(parent, e))?;
                }
                minify::minify_to(&doc, path).map_err(|e| InlineError::io(path, e))?;
            }
            None => ctx.html = Some(minify::minify(&doc)),
        }

        Ok(ctx)
    }
}

/// Record `<meta name content>` pairs in document order.
fn extract_meta(doc: &Document, ctx: &mut InlinerContext) {
    for meta in doc.elements_by_name(doc.root(), "meta") {
        if let Some(el) = doc.element(meta)
            && let (Some(name), Some(content)) = (el.attr("name"), el.attr("content"))
        {
            ctx.meta.push((name.to_owned(), content.to_owned()));
        }
    }
}

/// Text of the first `<title>`, whitespace collapsed and entities decoded.
///
/// A word with a lone `&` is kept as written.
pub fn title(doc: &Document) -> Option<String> {
    let id = doc.first_element("title")?;
    let text: String = doc
        .children(id)
        .iter()
        .filter_map(|&c| match doc.kind(c) {
            NodeKind::Text(t) => Some(t.as_str()),
            _ => None,
        })
        .collect();
    let words: Vec<Cow<'_, str>> = text
        .split_whitespace()
        .map(|word| unescape(word).unwrap_or(Cow::Borrowed(word)))
        .collect();
    Some(words.join(" "))
}

/// Title of an already written document.
pub fn title_of(path: &Path) -> Result<Option<String>, InlineError> {
    let text = fs::read_to_string(path).map_err(|e| InlineError::io(path, e))?;
    let doc = Document::parse(&text).map_err(|e| InlineError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(title(&doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use std::fs;

    fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn test_process_full_pipeline() {
        let dir = project(&[
            (
                "welcome.html",
                r#"<html ui:template="layout/base.html">
<head><title>Welcome  aboard</title><meta name="subject" content="Hi"></head>
<body>
<ui:section name="content"><td class="cell">Hello</td></ui:section>
</body>
</html>"#,
            ),
            (
                "layout/base.html",
                r#"<!DOCTYPE html><html><head><link rel="stylesheet" href="layout/mail.css" ui:inline></head><body><table><tr><ui:include section="content"/></tr></table></body></html>"#,
            ),
            ("layout/mail.css", ".cell { color: red }"),
        ]);
        let source = dir.path().canonicalize().unwrap().join("welcome.html");

        let ctx = Inliner::new().process(&source, None).unwrap();
        let html = ctx.html.unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<td style="color:red;">Hello</td>"#));
        assert!(!html.contains("ui:"));
        assert_eq!(ctx.title.as_deref(), Some("Welcome aboard"));
        assert_eq!(ctx.meta, vec![("subject".to_owned(), "Hi".to_owned())]);
        assert_eq!(ctx.dependencies.len(), 2);
        assert!(ctx.warnings.is_empty());
    }

    #[test]
    fn test_process_writes_destination() {
        let dir = project(&[("a.html", "<p>x</p>")]);
        let out = dir.path().join("out/a.html");
        let ctx = Inliner::new()
            .process(&dir.path().join("a.html"), Some(&out))
            .unwrap();
        assert!(ctx.html.is_none());
        assert_eq!(fs::read_to_string(&out).unwrap(), "<p>x</p>");
        assert_eq!(title_of(&out).unwrap(), None);
    }

    #[test]
    fn test_title_entities_decoded() {
        let doc = Document::parse(
            "<title>Tom &amp; Jerry&nbsp;&#8212; R&D &bogus;</title>",
        )
        .unwrap();
        assert_eq!(
            title(&doc).as_deref(),
            Some("Tom & Jerry\u{a0}\u{2014} R&D &bogus;")
        );
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let dir = project(&[]);
        let err = Inliner::new()
            .process(&dir.path().join("gone.html"), None)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Io);
    }

    #[test]
    fn test_unresolved_parameter_is_not_fatal() {
        let dir = project(&[
            ("a.html", r#"<div><link rel="import" href="f.html"><parameter name="x">1</parameter></link></div>"#),
            ("f.html", r#"<span><parameter name="y"/></span>"#),
        ]);
        let ctx = Inliner::new().process(&dir.path().join("a.html"), None).unwrap();
        assert!(ctx.html.unwrap().contains(r#"<parameter name="y" />"#));
        assert_eq!(ctx.warnings[0].category, ErrorCategory::UnresolvedParameter);
    }
}
