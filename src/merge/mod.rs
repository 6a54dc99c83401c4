//! Data merge step.
//!
//! After inlining, each instance's document is merged with its JSON data file
//! to produce the delivery preview. Engines are compiled in and selected by
//! [`MergeEngine`] through a [`MergerRegistry`]:
//!
//! | Engine        | Behaviour                                            |
//! |---------------|------------------------------------------------------|
//! | `placeholder` | `{{ a.b }}` escaped, `{{{ a.b }}}` raw, no helpers    |
//! | `passthrough` | document unchanged, data still has to parse          |

mod placeholder;

pub use placeholder::PlaceholderMerger;

use crate::error::ErrorCategory;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, fs, path::Path, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("no data file at `{0}`")]
    MissingData(PathBuf),

    #[error("invalid data in `{0}`")]
    Data(PathBuf, #[source] serde_json::Error),

    #[error("template error: {0}")]
    Template(String),

    #[error("no merge engine registered for `{0}`")]
    UnknownEngine(MergeEngine),
}

impl MergeError {
    /// Instance error-map key for this failure.
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingData(_) | Self::Data(..) => ErrorCategory::Data,
            Self::Template(_) | Self::UnknownEngine(_) => ErrorCategory::Merge,
        }
    }
}

/// Compiled-in merge engines.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MergeEngine {
    #[default]
    Placeholder,
    Passthrough,
}

impl MergeEngine {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Placeholder => "placeholder",
            Self::Passthrough => "passthrough",
        }
    }
}

impl fmt::Display for MergeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A structured-data templating step.
pub trait Merger: Send + Sync {
    fn engine(&self) -> MergeEngine;

    /// Render `document` against `data`.
    fn merge(&self, document: &str, data: &serde_json::Value) -> Result<String, MergeError>;
}

/// Returns the document untouched.
#[derive(Debug, Default)]
pub struct PassthroughMerger;

impl Merger for PassthroughMerger {
    fn engine(&self) -> MergeEngine {
        MergeEngine::Passthrough
    }

    fn merge(&self, document: &str, _data: &serde_json::Value) -> Result<String, MergeError> {
        Ok(document.to_owned())
    }
}

type Factory = fn() -> Box<dyn Merger>;

/// Engine → constructor map.
pub struct MergerRegistry {
    factories: BTreeMap<MergeEngine, Factory>,
}

impl MergerRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry holding every compiled-in engine.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(MergeEngine::Placeholder, placeholder);
        registry.register(MergeEngine::Passthrough, passthrough);
        registry
    }

    pub fn register(&mut self, engine: MergeEngine, factory: Factory) {
        self.factories.insert(engine, factory);
    }

    pub fn create(&self, engine: MergeEngine) -> Result<Box<dyn Merger>, MergeError> {
        self.factories
            .get(&engine)
            .map(|factory| factory())
            .ok_or(MergeError::UnknownEngine(engine))
    }
}

fn placeholder() -> Box<dyn Merger> {
    Box::new(PlaceholderMerger)
}

fn passthrough() -> Box<dyn Merger> {
    Box::new(PassthroughMerger)
}

/// Read and parse a JSON data file.
pub fn load_data(path: &Path) -> Result<serde_json::Value, MergeError> {
    let text = fs::read_to_string(path).map_err(|_| MergeError::MissingData(path.to_path_buf()))?;
    serde_json::from_str(&text).map_err(|e| MergeError::Data(path.to_path_buf(), e))
}

/// Merge the document at `inlined` with the data at `data`, writing `merged`.
///
/// On failure the inlined document is copied to `merged` unchanged and the
/// error is returned for the caller to record.
pub fn merge_file(
    merger: &dyn Merger,
    inlined: &Path,
    data: &Path,
    merged: &Path,
) -> Result<(), MergeError> {
    let result = fs::read_to_string(inlined)
        .map_err(|e| MergeError::Template(format!("cannot read `{}`: {e}", inlined.display())))
        .and_then(|document| {
            let data = load_data(data)?;
            merger.merge(&document, &data)
        });

    match result {
        Ok(output) => fs::write(merged, output)
            .map_err(|e| MergeError::Template(format!("cannot write `{}`: {e}", merged.display()))),
        Err(e) => {
            // Keep the unmerged document viewable.
            let _ = fs::copy(inlined, merged);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_creates_builtin_engines() {
        let registry = MergerRegistry::with_builtin();
        assert_eq!(
            registry.create(MergeEngine::Placeholder).unwrap().engine(),
            MergeEngine::Placeholder
        );
        assert_eq!(
            registry.create(MergeEngine::Passthrough).unwrap().engine(),
            MergeEngine::Passthrough
        );
    }

    #[test]
    fn test_empty_registry_reports_unknown_engine() {
        let registry = MergerRegistry::empty();
        assert!(matches!(
            registry.create(MergeEngine::Placeholder),
            Err(MergeError::UnknownEngine(MergeEngine::Placeholder))
        ));
    }

    #[test]
    fn test_engine_serde_names() {
        let engine: MergeEngine = serde_json::from_value(json!("passthrough")).unwrap();
        assert_eq!(engine, MergeEngine::Passthrough);
        assert_eq!(MergeEngine::default().to_string(), "placeholder");
    }

    #[test]
    fn test_merge_file_success() {
        let dir = tempfile::tempdir().unwrap();
        let inlined = dir.path().join("a.html");
        let data = dir.path().join("a.html.json");
        let merged = dir.path().join("a.merged.html");
        fs::write(&inlined, "<p>{{ name }}</p>").unwrap();
        fs::write(&data, r#"{"name":"Ada"}"#).unwrap();

        merge_file(&PlaceholderMerger, &inlined, &data, &merged).unwrap();
        assert_eq!(fs::read_to_string(&merged).unwrap(), "<p>Ada</p>");
    }

    #[test]
    fn test_merge_file_missing_data_copies_inlined() {
        let dir = tempfile::tempdir().unwrap();
        let inlined = dir.path().join("a.html");
        let merged = dir.path().join("a.merged.html");
        fs::write(&inlined, "<p>{{ name }}</p>").unwrap();

        let err = merge_file(
            &PlaceholderMerger,
            &inlined,
            &dir.path().join("missing.json"),
            &merged,
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::MissingData(_)));
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(fs::read_to_string(&merged).unwrap(), "<p>{{ name }}</p>");
    }

    #[test]
    fn test_merge_file_malformed_data() {
        let dir = tempfile::tempdir().unwrap();
        let inlined = dir.path().join("a.html");
        let data = dir.path().join("a.html.json");
        let merged = dir.path().join("a.merged.html");
        fs::write(&inlined, "<p>x</p>").unwrap();
        fs::write(&data, "{ not json").unwrap();

        let err = merge_file(&PassthroughMerger, &inlined, &data, &merged).unwrap_err();
        assert!(matches!(err, MergeError::Data(..)));
        assert_eq!(fs::read_to_string(&merged).unwrap(), "<p>x</p>");
    }
}
