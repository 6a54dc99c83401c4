//! Error taxonomy.
//!
//! Two tiers, mirroring how failures are treated:
//!
//! | Tier      | Type            | Effect                                       |
//! |-----------|-----------------|----------------------------------------------|
//! | fatal     | [`InlineError`] | aborts the pass for one instance             |
//! | non-fatal | [`Warning`]     | logged, recorded, offending markup left as is |
//!
//! Both end up in an instance's error map keyed by [`ErrorCategory`].

use serde::Serialize;
use std::{fmt, path::PathBuf};
use thiserror::Error;

/// Failures that abort processing of one document.
#[derive(Debug, Error)]
pub enum InlineError {
    #[error("cannot read `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse `{path}`: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("<{tag}> without `{attribute}` attribute")]
    MissingAttribute { tag: String, attribute: String },

    #[error("circular include of `{path}`")]
    IncludeCycle { path: PathBuf },

    #[error("references still unresolved after {passes} passes")]
    PassLimit { passes: usize },

    #[error("stylesheet error: {0}")]
    Css(String),
}

impl InlineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Io { .. } => ErrorCategory::Io,
            Self::Parse { .. } | Self::Css(_) => ErrorCategory::Parse,
            Self::MissingAttribute { .. } => ErrorCategory::MissingAttribute,
            Self::IncludeCycle { .. } | Self::PassLimit { .. } => ErrorCategory::Cycle,
        }
    }
}

/// Key of an instance's error map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    Parse,
    MissingAttribute,
    UnresolvedParameter,
    Merge,
    Data,
    Io,
    AmbiguousPath,
    Cycle,
    Title,
}

impl ErrorCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::MissingAttribute => "missing-attribute",
            Self::UnresolvedParameter => "unresolved-parameter",
            Self::Merge => "merge",
            Self::Data => "data",
            Self::Io => "io",
            Self::AmbiguousPath => "ambiguous-path",
            Self::Cycle => "cycle",
            Self::Title => "title",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal, element-level problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub category: ErrorCategory,
    pub message: String,
}

impl Warning {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_inline_error_display() {
        let err = InlineError::io("a/b.css", Error::new(ErrorKind::NotFound, "gone"));
        assert!(err.to_string().contains("a/b.css"));
        assert_eq!(err.category(), ErrorCategory::Io);

        let err = InlineError::MissingAttribute {
            tag: "link".into(),
            attribute: "href".into(),
        };
        assert_eq!(err.to_string(), "<link> without `href` attribute");
    }

    #[test]
    fn test_cycle_errors_share_category() {
        let cycle = InlineError::IncludeCycle {
            path: PathBuf::from("x.html"),
        };
        let limit = InlineError::PassLimit { passes: 64 };
        assert_eq!(cycle.category(), ErrorCategory::Cycle);
        assert_eq!(limit.category(), ErrorCategory::Cycle);
    }

    #[test]
    fn test_category_serializes_kebab_case() {
        let json = serde_json::to_string(&ErrorCategory::UnresolvedParameter).unwrap();
        assert_eq!(json, "\"unresolved-parameter\"");
    }

    #[test]
    fn test_warning_display() {
        let w = Warning::new(ErrorCategory::Io, "cannot read `x.css`");
        assert_eq!(w.to_string(), "io: cannot read `x.css`");
    }
}
