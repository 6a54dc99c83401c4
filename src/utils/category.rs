//! Changed-path classification for the rebuild pipeline.
//!
//! # File Categories
//!
//! | Category     | Location                  | Effect of a change                   |
//! |--------------|---------------------------|--------------------------------------|
//! | `Source`     | directly in source dir    | create / rebuild / remove an instance |
//! | `Data`       | directly in data dir      | rebuild the owning instance          |
//! | `Dependency` | anywhere else             | rebuild every owner from the index   |

use std::{
    env,
    path::{Component, Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    /// Top-level template in the source directory.
    Source,
    /// JSON data file.
    Data,
    /// Template, fragment or stylesheet pulled in by a source.
    Dependency,
}

/// Categorize a normalized path against the source and data directories.
pub fn categorize_path(path: &Path, source_dir: &Path, data_dir: &Path) -> FileCategory {
    match path.parent() {
        Some(parent) if parent == source_dir => FileCategory::Source,
        Some(parent) if parent == data_dir => FileCategory::Data,
        _ => FileCategory::Dependency,
    }
}

/// Whether `path` names a top-level template (`*.html`).
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
}

/// Normalize a path to absolute form for reliable comparison.
///
/// Existing paths are canonicalized. Paths that no longer exist (a deleted
/// file) are made absolute and cleaned lexically so they still compare equal
/// to what was registered while they existed.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        };
        clean(&absolute)
    })
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_path() {
        let src = Path::new("/p/src");
        let data = Path::new("/p/data");
        assert_eq!(
            categorize_path(Path::new("/p/src/a.html"), src, data),
            FileCategory::Source
        );
        assert_eq!(
            categorize_path(Path::new("/p/data/a.html.json"), src, data),
            FileCategory::Data
        );
        assert_eq!(
            categorize_path(Path::new("/p/src/partials/b.html"), src, data),
            FileCategory::Dependency
        );
    }

    #[test]
    fn test_is_source_file() {
        assert!(is_source_file(Path::new("a.html")));
        assert!(is_source_file(Path::new("A.HTML")));
        assert!(!is_source_file(Path::new("a.css")));
        assert!(!is_source_file(Path::new("html")));
    }

    #[test]
    fn test_clean() {
        assert_eq!(
            clean(Path::new("/p/src/../shared/./b.html")),
            PathBuf::from("/p/shared/b.html")
        );
        assert_eq!(clean(Path::new("/a/b")), PathBuf::from("/a/b"));
    }

    #[test]
    fn test_normalize_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let missing = root.join("sub/../gone.html");
        assert_eq!(normalize_path(&missing), root.join("gone.html"));
    }

    #[test]
    fn test_normalize_path_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.html");
        std::fs::write(&file, "x").unwrap();
        let normalized = normalize_path(&file);
        assert!(normalized.is_absolute());
        assert_eq!(normalized, file.canonicalize().unwrap());
    }
}
