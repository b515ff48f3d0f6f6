//! Aggregate indicators shown above the tour table.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::TourMetric;

/// Totals over a set of tours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Kpis {
    /// Distinct producers.
    pub active_producers: usize,
    /// Number of tours.
    pub tour_count: usize,
    /// Stops served across all tours.
    pub stop_count: usize,
    /// Delivered weight in kg.
    pub total_volume_kg: f64,
    /// Distance driven in km.
    pub total_distance_km: f64,
    /// Cost in euros.
    pub total_cost: f64,
    /// Revenue in euros.
    pub total_revenue: f64,
}

impl Kpis {
    /// Compute the totals for `metrics`.
    #[must_use]
    pub fn from_metrics(metrics: &[TourMetric]) -> Self {
        let producers: BTreeSet<&str> = metrics
            .iter()
            .map(|metric| metric.producer.as_str())
            .collect();

        metrics.iter().fold(
            Self {
                active_producers: producers.len(),
                tour_count: metrics.len(),
                ..Self::default()
            },
            |mut kpis, metric| {
                kpis.stop_count += metric.stop_count;
                kpis.total_volume_kg += metric.total_volume_kg;
                kpis.total_distance_km += metric.distance;
                kpis.total_cost += metric.cost;
                kpis.total_revenue += metric.revenue;
                kpis
            },
        )
    }

    /// Kilometres driven per stop, 0 without stops.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "stop counts stay far below 2^52"
    )]
    pub fn km_per_stop(&self) -> f64 {
        if self.stop_count == 0 {
            0.0
        } else {
            self.total_distance_km / self.stop_count as f64
        }
    }

    /// Cost per delivered kg, 0 without volume.
    #[must_use]
    pub fn cost_per_kg(&self) -> f64 {
        if self.total_volume_kg > 0.0 {
            self.total_cost / self.total_volume_kg
        } else {
            0.0
        }
    }
}

/// Summed cost per producer, ordered by producer name.
#[must_use]
pub fn cost_by_producer(metrics: &[TourMetric]) -> Vec<(String, f64)> {
    sum_by(metrics, |metric| &metric.producer, |metric| metric.cost)
}

/// Summed distance per tour name, ordered by tour name.
#[must_use]
pub fn distance_by_tour(metrics: &[TourMetric]) -> Vec<(String, f64)> {
    sum_by(metrics, |metric| &metric.tour_name, |metric| metric.distance)
}

fn sum_by<K, V>(metrics: &[TourMetric], key: K, value: V) -> Vec<(String, f64)>
where
    K: Fn(&TourMetric) -> &String,
    V: Fn(&TourMetric) -> f64,
{
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for metric in metrics {
        *sums.entry(key(metric).as_str()).or_default() += value(metric);
    }
    sums.into_iter()
        .map(|(name, total)| (name.to_owned(), total))
        .collect()
}
