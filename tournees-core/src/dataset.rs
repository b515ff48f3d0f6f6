//! Result of one dashboard refresh and the views derived from it.

use serde::Serialize;

use crate::filter::{FacetChoices, TourFilter};
use crate::flatten::{Flattened, flatten};
use crate::kpi::Kpis;
use crate::model::{LonLat, MapPath, MapPoint, ProducerRecord, SkippedRecord, TourMetric};

/// Tour rows and map layers loaded from a source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    /// Number of raw records (or CSV tours) the source returned.
    pub record_count: usize,
    /// Per-tour rows.
    pub metrics: Vec<TourMetric>,
    /// Depot and delivery markers.
    pub points: Vec<MapPoint>,
    /// Tour routes.
    pub paths: Vec<MapPath>,
    /// Records that yielded no tour, shown when nothing else can be.
    pub skipped: Vec<SkippedRecord>,
}

/// Rectangle enclosing map geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    /// South-west corner.
    pub min: LonLat,
    /// North-east corner.
    pub max: LonLat,
}

impl Bounds {
    fn around(point: LonLat) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    fn extend(mut self, point: LonLat) -> Self {
        self.min.lon = self.min.lon.min(point.lon);
        self.min.lat = self.min.lat.min(point.lat);
        self.max.lon = self.max.lon.max(point.lon);
        self.max.lat = self.max.lat.max(point.lat);
        self
    }

    /// Grow each side by `ratio` of the span, at least `min_margin` degrees.
    #[must_use]
    pub fn padded(self, ratio: f64, min_margin: f64) -> Self {
        let lon_margin = ((self.max.lon - self.min.lon) * ratio).max(min_margin);
        let lat_margin = ((self.max.lat - self.min.lat) * ratio).max(min_margin);
        Self {
            min: LonLat::new(self.min.lon - lon_margin, self.min.lat - lat_margin),
            max: LonLat::new(self.max.lon + lon_margin, self.max.lat + lat_margin),
        }
    }
}

impl Dataset {
    /// Flatten raw producer records.
    #[must_use]
    pub fn from_records(records: &[ProducerRecord]) -> Self {
        let Flattened {
            metrics,
            points,
            paths,
            skipped,
        } = flatten(records);
        Self {
            record_count: records.len(),
            metrics,
            points,
            paths,
            skipped,
        }
    }

    /// Wrap rows that arrive already tabular; they carry no geometry.
    #[must_use]
    pub fn from_metrics(metrics: Vec<TourMetric>) -> Self {
        Self {
            record_count: metrics.len(),
            metrics,
            points: Vec::new(),
            paths: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Whether no tour could be extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Rows, markers and routes passing `filter`.
    #[must_use]
    pub fn filtered(&self, filter: &TourFilter) -> Self {
        Self {
            record_count: self.record_count,
            metrics: filter.apply(&self.metrics),
            points: filter.apply(&self.points),
            paths: filter.apply(&self.paths),
            skipped: self.skipped.clone(),
        }
    }

    /// Totals over the rows.
    #[must_use]
    pub fn kpis(&self) -> Kpis {
        Kpis::from_metrics(&self.metrics)
    }

    /// Filter choices available in the rows.
    #[must_use]
    pub fn facets(&self) -> FacetChoices {
        FacetChoices::from_metrics(&self.metrics)
    }

    /// First marker position, or `fallback` when there is nothing to show.
    #[must_use]
    pub fn map_center(&self, fallback: LonLat) -> LonLat {
        self.points
            .first()
            .map_or(fallback, |point| point.coordinates)
    }

    /// Box around every marker and route vertex.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        let mut coordinates = self
            .points
            .iter()
            .map(|point| point.coordinates)
            .chain(self.paths.iter().flat_map(|path| path.vertices.iter().copied()));

        let first = coordinates.next()?;
        Some(coordinates.fold(Bounds::around(first), Bounds::extend))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use serde_json::json;

    use super::*;
    use crate::filter::Selection;

    fn dataset() -> Dataset {
        let records: Vec<ProducerRecord> = serde_json::from_value(json!([
            {
                "nom_producteur": "Ferme A",
                "data_json": {
                    "depot": { "pData": { "lat": 45.0, "lon": 6.0 } },
                    "tours": [
                        { "day": "Lundi", "stops": [{ "lat": 45.5, "lon": 6.5, "vol": 10 }] },
                        { "day": "Mardi", "stops": [{ "lat": 44.5, "lon": 5.5, "vol": 20 }] }
                    ]
                }
            },
            {
                "nom_producteur": "Ferme B",
                "data_json": "{\"tours\": [{\"day\": \"Lundi\"}]}"
            },
            { "nom_producteur": "Ferme C", "data_json": "not json" }
        ]))
        .expect("records should deserialize");
        Dataset::from_records(&records)
    }

    #[test]
    fn counts_records_and_tours() {
        let data = dataset();
        assert_eq!(data.record_count, 3);
        assert_eq!(data.metrics.len(), 3);
        assert_eq!(data.paths.len(), 2);
        assert_eq!(data.points.len(), 4);
        assert_eq!(data.skipped.len(), 1);
        assert!(
            data.skipped
                .iter()
                .all(|skipped| skipped.producer == "Ferme C")
        );
    }

    #[test]
    fn filter_applies_to_every_layer() {
        let filter = TourFilter {
            days: Selection::Only(BTreeSet::from(["Lundi".to_owned()])),
            ..TourFilter::default()
        };

        let data = dataset().filtered(&filter);
        assert_eq!(data.metrics.len(), 2);
        assert_eq!(data.paths.len(), 1);
        assert_eq!(data.points.len(), 2);
        assert!(data.points.iter().all(|point| point.day == "Lundi"));
    }

    #[test]
    fn center_falls_back_without_points() {
        let fallback = LonLat::new(7.26, 43.7);
        assert_eq!(dataset().map_center(fallback), LonLat::new(6.0, 45.0));
        assert_eq!(Dataset::default().map_center(fallback), fallback);
    }

    #[test]
    fn bounds_cover_all_geometry() {
        let bounds = dataset().bounds().expect("geometry present");
        assert_eq!(bounds.min, LonLat::new(5.5, 44.5));
        assert_eq!(bounds.max, LonLat::new(6.5, 45.5));
        assert!(Dataset::default().bounds().is_none());

        let padded = bounds.padded(0.1, 0.01);
        assert!((padded.min.lon - 5.4).abs() < 1e-9);
        assert!((padded.max.lat - 45.6).abs() < 1e-9);
    }
}
