//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use crate::merge::MergeEngine;
    use std::path::PathBuf;

    pub fn source() -> PathBuf {
        "templates".into()
    }

    pub fn data() -> PathBuf {
        "data".into()
    }

    pub fn output() -> Option<PathBuf> {
        None
    }

    /// Output directory used by `watch` when `[build] output` is unset.
    pub fn watch_output() -> PathBuf {
        "out".into()
    }

    pub fn merge() -> MergeEngine {
        MergeEngine::Placeholder
    }
}
