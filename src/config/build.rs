//! `[build]` section configuration.

use super::defaults;
use crate::merge::MergeEngine;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in inliner.toml.
///
/// # Example
/// ```toml
/// [build]
/// source = "templates"   # Top-level templates
/// data = "data"          # <name>.html.json merge data
/// output = "out"         # Inlined and merged documents
/// merge = "placeholder"  # or "passthrough"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Directory holding the top-level `*.html` templates.
    #[serde(default = "defaults::build::source")]
    #[educe(Default = defaults::build::source())]
    pub source: PathBuf,

    /// Directory holding the JSON merge data.
    #[serde(default = "defaults::build::data")]
    #[educe(Default = defaults::build::data())]
    pub data: PathBuf,

    /// Output directory. Without one, `build` writes `<name>.out.html` next
    /// to each source.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: Option<PathBuf>,

    /// Engine used for the data merge step.
    #[serde(default = "defaults::build::merge")]
    #[educe(Default = defaults::build::merge())]
    pub merge: MergeEngine,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.source, PathBuf::from("templates"));
        assert_eq!(config.data, PathBuf::from("data"));
        assert!(config.output.is_none());
        assert_eq!(config.merge, MergeEngine::Placeholder);
    }

    #[test]
    fn test_partial_section() {
        let config: BuildConfig = toml::from_str(
            r#"
            output = "dist"
            merge = "passthrough"
            "#,
        )
        .unwrap();
        assert_eq!(config.source, PathBuf::from("templates"));
        assert_eq!(config.output, Some(PathBuf::from("dist")));
        assert_eq!(config.merge, MergeEngine::Passthrough);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(toml::from_str::<BuildConfig>("minify = true").is_err());
    }
}
