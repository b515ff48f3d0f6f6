//! Core types and service wiring for the tournees delivery-tour dashboard.

/// Dataset produced by a refresh and its derived views.
pub mod dataset;
/// Producer/day/vehicle filters.
pub mod filter;
/// Flattening of producer records into rows and map geometry.
pub mod flatten;
/// Aggregate indicators.
pub mod kpi;
mod lenient;
/// Domain models and identifiers shared by all sources.
pub mod model;
/// Registry for plugging record sources into the service.
pub mod plugin;
/// Traits describing the source interfaces.
pub mod ports;
/// High-level service facade used by clients.
pub mod service;

pub use dataset::*;
pub use filter::*;
pub use flatten::*;
pub use kpi::*;
pub use model::*;
pub use plugin::*;
pub use ports::*;
pub use service::*;
