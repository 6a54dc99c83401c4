//! Application context.
//!
//! Everything the pipeline needs from the outside world, built once in
//! `main` and handed to [`Pipeline::new`](crate::pipeline::Pipeline::new).

use crate::config::InlinerConfig;
use crate::live::SummarySink;
use crate::merge::{MergeError, Merger, MergerRegistry};
use std::sync::Arc;

pub struct AppContext {
    pub config: InlinerConfig,
    pub merger: Box<dyn Merger>,
    pub sink: Arc<dyn SummarySink>,
}

impl AppContext {
    /// Pick the configured merge engine from `registry`.
    pub fn new(
        config: InlinerConfig,
        registry: &MergerRegistry,
        sink: Arc<dyn SummarySink>,
    ) -> Result<Self, MergeError> {
        let merger = registry.create(config.build.merge)?;
        Ok(Self {
            config,
            merger,
            sink,
        })
    }
}
