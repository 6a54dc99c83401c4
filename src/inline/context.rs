//! Accumulator threaded through one inlining pass.

use crate::error::{ErrorCategory, Warning};
use crate::log;
use serde::Serialize;
use std::{collections::BTreeSet, path::PathBuf};

/// Why a file feeds an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyType {
    Template,
    Style,
    StyleInline,
    Fragment,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Dependency {
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: DependencyType,
}

/// Everything a pass learned about a document besides its markup.
#[derive(Debug, Default)]
pub struct InlinerContext {
    pub dependencies: BTreeSet<Dependency>,
    /// `<meta name content>` pairs in document order.
    pub meta: Vec<(String, String)>,
    pub title: Option<String>,
    /// Minified output when no destination path was given.
    pub html: Option<String>,
    pub warnings: Vec<Warning>,
}

impl InlinerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dependency(&mut self, path: impl Into<PathBuf>, kind: DependencyType) {
        self.dependencies.insert(Dependency {
            path: path.into(),
            kind,
        });
    }

    /// Record and log a non-fatal problem.
    pub fn warn(&mut self, category: ErrorCategory, message: impl Into<String>) {
        let warning = Warning::new(category, message);
        log!("warn"; "{warning}");
        self.warnings.push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_dependencies_deduplicate() {
        let mut ctx = InlinerContext::new();
        ctx.add_dependency("/a/b.css", DependencyType::Style);
        ctx.add_dependency("/a/b.css", DependencyType::Style);
        ctx.add_dependency("/a/b.css", DependencyType::StyleInline);
        assert_eq!(ctx.dependencies.len(), 2);
        assert!(ctx.dependencies.iter().all(|d| d.path == Path::new("/a/b.css")));
    }

    #[test]
    fn test_dependency_serializes_type_field() {
        let dep = Dependency {
            path: PathBuf::from("x.html"),
            kind: DependencyType::StyleInline,
        };
        let json = serde_json::to_string(&dep).unwrap();
        assert_eq!(json, r#"{"path":"x.html","type":"style-inline"}"#);
    }

    #[test]
    fn test_warn_records() {
        let mut ctx = InlinerContext::new();
        ctx.warn(ErrorCategory::UnresolvedParameter, "no value for `name`");
        assert_eq!(ctx.warnings.len(), 1);
        assert_eq!(ctx.warnings[0].category, ErrorCategory::UnresolvedParameter);
    }
}
