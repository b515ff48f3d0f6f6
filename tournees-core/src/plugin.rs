//! Registry for all configured record sources.

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{SourceId, SourceMeta};
use crate::ports::{PortError, RecordPort};

/// A record source and its metadata.
pub struct SourcePlugin {
    /// Static metadata describing the source.
    pub meta: SourceMeta,
    /// Implementation for fetching records.
    pub record_port: Arc<dyn RecordPort>,
}

/// Registry that resolves plugins by source identifier.
pub struct SourceRegistry {
    plugins: HashMap<SourceId, SourcePlugin>,
    order: Vec<SourceId>,
}

impl SourceRegistry {
    /// Build a registry from the provided plugin list.
    ///
    /// Sources keep the order they were given in; a later plugin with an
    /// already registered id replaces the earlier one.
    #[must_use]
    pub fn new(plugins: Vec<SourcePlugin>) -> Self {
        let mut order = Vec::with_capacity(plugins.len());
        let mut plugins_map = HashMap::with_capacity(plugins.len());
        for plugin in plugins {
            let id = plugin.meta.id.clone();
            if plugins_map.insert(id.clone(), plugin).is_none() {
                order.push(id);
            }
        }
        Self {
            plugins: plugins_map,
            order,
        }
    }

    /// Return metadata for all registered sources, in registration order.
    #[must_use]
    pub fn sources(&self) -> Vec<SourceMeta> {
        self.sources_iter().cloned().collect()
    }

    /// Iterator over source metadata, in registration order.
    pub fn sources_iter(&self) -> impl Iterator<Item = &SourceMeta> {
        self.order
            .iter()
            .filter_map(|id| self.plugins.get(id))
            .map(|plugin| &plugin.meta)
    }

    /// Look up a plugin for the given source.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::UnknownSource`] when no plugin is registered.
    pub fn plugin(&self, source: &SourceId) -> Result<&SourcePlugin, PortError> {
        self.plugins.get(source).ok_or(PortError::UnknownSource)
    }
}
