//! Top-level template instances.
//!
//! One [`Instance`] exists per `*.html` file directly inside the source
//! directory. Its derived files follow a fixed layout:
//!
//! | File    | Path                          |
//! |---------|-------------------------------|
//! | data    | `<data>/<name>.html.json`     |
//! | inlined | `<output>/<name>.html`        |
//! | merged  | `<output>/<name>.merged.html` |

use crate::error::{ErrorCategory, Warning};
use crate::inline::{Dependency, InlinerContext};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt, fs,
    path::{Path, PathBuf},
};

/// Length of the hex identifier.
const ID_LEN: usize = 16;

/// Stable identifier derived from the normalized source path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn from_path(path: &Path) -> Self {
        let hash = blake3::hash(path.to_string_lossy().as_bytes());
        let mut hex = hex::encode(hash.as_bytes());
        hex.truncate(ID_LEN);
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub id: InstanceId,
    pub name: String,
    pub source: PathBuf,
    pub data: PathBuf,
    pub inlined: PathBuf,
    pub merged: PathBuf,
    pub title: String,
    pub meta: Vec<(String, String)>,
    pub dependencies: BTreeSet<Dependency>,
    pub errors: BTreeMap<ErrorCategory, String>,
    pub size: u64,
    pub created: Option<DateTime<Local>>,
    pub modified: Option<DateTime<Local>>,
}

impl Instance {
    /// Create an instance for a normalized source path.
    pub fn new(source: &Path, data_dir: &Path, output_dir: &Path) -> Self {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = source
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut instance = Self {
            id: InstanceId::from_path(source),
            source: source.to_path_buf(),
            data: data_dir.join(format!("{name}.json")),
            inlined: output_dir.join(&name),
            merged: output_dir.join(format!("{stem}.merged.html")),
            name,
            title: String::new(),
            meta: Vec::new(),
            dependencies: BTreeSet::new(),
            errors: BTreeMap::new(),
            size: 0,
            created: None,
            modified: None,
        };
        instance.refresh_metadata();
        instance
    }

    /// Start a rebuild: forget everything the previous one recorded.
    pub fn reset(&mut self) {
        self.errors.clear();
        self.dependencies.clear();
        self.meta.clear();
        self.title.clear();
    }

    /// Take over the results of a successful inlining pass.
    pub fn update(&mut self, ctx: InlinerContext) {
        self.dependencies = ctx.dependencies;
        self.meta = ctx.meta;
        self.title = ctx.title.unwrap_or_default();
        for warning in &ctx.warnings {
            self.record_warning(warning);
        }
        self.refresh_metadata();
    }

    /// Set the error for `category`, replacing any earlier one.
    pub fn log_error(&mut self, category: ErrorCategory, message: impl Into<String>) {
        self.errors.insert(category, message.into());
    }

    /// Warnings of one category are joined line by line.
    fn record_warning(&mut self, warning: &Warning) {
        self.errors
            .entry(warning.category)
            .and_modify(|existing| {
                existing.push('\n');
                existing.push_str(&warning.message);
            })
            .or_insert_with(|| warning.message.clone());
    }

    fn refresh_metadata(&mut self) {
        let Ok(metadata) = fs::metadata(&self.source) else {
            return;
        };
        self.size = metadata.len();
        self.created = metadata.created().ok().map(DateTime::<Local>::from);
        self.modified = metadata.modified().ok().map(DateTime::<Local>::from);
    }

    pub fn view_path(&self) -> String {
        format!("/api/files/{}", self.id)
    }

    pub fn summary(&self) -> InstanceSummary {
        InstanceSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            view_path: self.view_path(),
            title: self.title.clone(),
            meta: self.meta.clone(),
            dependencies: self.dependencies.iter().cloned().collect(),
            errors: self.errors.clone(),
            size: self.size,
            created: self.created.map(|t| t.to_rfc3339()),
            modified: self.modified.map(|t| t.to_rfc3339()),
        }
    }
}

/// What live viewers are told about an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSummary {
    pub id: InstanceId,
    pub name: String,
    pub view_path: String,
    pub title: String,
    pub meta: Vec<(String, String)>,
    pub dependencies: Vec<Dependency>,
    pub errors: BTreeMap<ErrorCategory, String>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}
