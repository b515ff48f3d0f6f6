//! High-level service facade combining all sources.

use std::sync::Arc;

use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::model::SourceId;
use crate::plugin::SourceRegistry;
use crate::ports::{PortError, SourceBatch};

/// Public entry point for listing sources and loading their tours.
pub struct DashboardService {
    registry: Arc<SourceRegistry>,
}

impl DashboardService {
    /// Create a new service bound to the provided registry.
    #[must_use]
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self { registry }
    }

    /// List all sources and their display names.
    #[must_use]
    pub fn sources(&self) -> Vec<(SourceId, String)> {
        self.registry
            .sources()
            .into_iter()
            .map(|meta| (meta.id, meta.name))
            .collect()
    }

    /// Fetch the source once and flatten what it returns.
    ///
    /// Nothing is cached: call again to pick up new records.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] if the source is unknown or cannot be read.
    pub async fn refresh(&self, source: &SourceId) -> Result<Dataset, PortError> {
        let plugin = self.registry.plugin(source)?;

        let batch = plugin.record_port.fetch().await.inspect_err(|err| {
            warn!(source = %source, error = %err, "failed to fetch records");
        })?;

        let dataset = match batch {
            SourceBatch::Records(records) => Dataset::from_records(&records),
            SourceBatch::Metrics(metrics) => Dataset::from_metrics(metrics),
        };

        info!(
            source = %source,
            records = dataset.record_count,
            tours = dataset.metrics.len(),
            paths = dataset.paths.len(),
            points = dataset.points.len(),
            skipped = dataset.skipped.len(),
            "refreshed dashboard data"
        );
        Ok(dataset)
    }
}
