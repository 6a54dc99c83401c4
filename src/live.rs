//! Live update push.
//!
//! The pipeline announces every refreshed or removed instance through a
//! [`SummarySink`]. The transport that forwards these to connected viewers
//! lives outside this crate; [`LogSink`] prints them as JSON lines.

use crate::instance::{InstanceId, InstanceSummary};
use crate::log;
use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "instance", rename_all = "lowercase")]
pub enum InstanceUpdate {
    Refreshed(InstanceSummary),
    Removed(InstanceId),
}

pub trait SummarySink: Send + Sync {
    fn push(&self, update: InstanceUpdate);
}

/// Writes each update as one JSON line under the `live` prefix.
#[derive(Debug, Default)]
pub struct LogSink;

impl SummarySink for LogSink {
    fn push(&self, update: InstanceUpdate) {
        match serde_json::to_string(&update) {
            Ok(json) => log!("live"; "{json}"),
            Err(e) => log!("error"; "cannot encode update: {e}"),
        }
    }
}

/// Drops every update.
#[derive(Debug, Default)]
pub struct NullSink;

impl SummarySink for NullSink {
    fn push(&self, _update: InstanceUpdate) {}
}

/// Keeps every update in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<InstanceUpdate>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything recorded so far.
    pub fn drain(&self) -> Vec<InstanceUpdate> {
        self.updates
            .lock()
            .map(|mut updates| std::mem::take(&mut *updates))
            .unwrap_or_default()
    }
}

impl SummarySink for RecordingSink {
    fn push(&self, update: InstanceUpdate) {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_recording_sink_drains() {
        let sink = RecordingSink::new();
        let id = InstanceId::from_path(Path::new("/a.html"));
        sink.push(InstanceUpdate::Removed(id.clone()));
        assert_eq!(sink.drain(), vec![InstanceUpdate::Removed(id)]);
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn test_update_encoding() {
        let id = InstanceId::from_path(Path::new("/a.html"));
        let json = serde_json::to_value(InstanceUpdate::Removed(id.clone())).unwrap();
        assert_eq!(json["event"], "removed");
        assert_eq!(json["instance"], id.as_str());
    }
}
