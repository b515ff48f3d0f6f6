//! Flattening of producer records into tour metrics and map geometry.

use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{
    LonLat, MapPath, MapPoint, PointKind, ProducerRecord, RawStop, Rgba, SkippedRecord, TourMetric,
};

const DEPOT_COLOR: Rgba = Rgba::new(30, 30, 30, 255);
const DEPOT_RADIUS: u32 = 250;
const DELIVERY_RADIUS: u32 = 120;

const CHANNEL_MIN: u64 = 50;
const CHANNEL_SPAN: u64 = 151;
const PRODUCER_ALPHA: u8 = 200;

const EXCERPT_CHARS: usize = 120;

/// Output of [`flatten`]: table rows and map layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Flattened {
    /// One row per tour.
    pub metrics: Vec<TourMetric>,
    /// Depot and delivery markers.
    pub points: Vec<MapPoint>,
    /// One closed route per tour with a located depot.
    pub paths: Vec<MapPath>,
    /// Records that yielded no tour.
    pub skipped: Vec<SkippedRecord>,
}

/// Turn raw producer records into per-tour rows and map geometry.
///
/// Never fails: malformed payloads contribute no tours, missing fields take
/// their defaults. Stops without a position are counted in the metrics but
/// left off the map. Routes and depot markers need a located depot.
#[must_use]
pub fn flatten(records: &[ProducerRecord]) -> Flattened {
    let mut flattened = Flattened::default();
    for record in records {
        flatten_record(record, &mut flattened);
    }
    flattened
}

fn flatten_record(record: &ProducerRecord, out: &mut Flattened) {
    let producer = record.producer_name();
    let sent_on = record.sent_on();
    let content = match record.content() {
        Ok(content) => content,
        Err(err) => {
            warn!(producer, error = %err, "ignoring undecodable payload");
            skip(record, err.to_string(), out);
            return;
        }
    };
    if content.tours().is_empty() {
        skip(record, "no tours".to_owned(), out);
        return;
    }

    let vehicle_type = content.vehicle_type();
    let depot = content.depot_coordinate();
    let color = producer_color(producer);

    debug!(
        producer,
        tours = content.tours().len(),
        located_depot = depot.is_some(),
        "flattening producer record"
    );

    for tour in content.tours() {
        let day = tour.day();
        let stops = tour.stops();

        out.metrics.push(TourMetric {
            producer: producer.to_owned(),
            sent_on,
            day: day.to_owned(),
            tour_name: tour.name().to_owned(),
            vehicle_type: vehicle_type.to_owned(),
            cost: tour.cost(),
            revenue: tour.revenue(),
            distance: tour.distance(),
            total_volume_kg: stops.iter().map(RawStop::volume_kg).sum(),
            stop_count: stops.len(),
        });

        let Some(depot) = depot else {
            continue;
        };

        let mut vertices = Vec::with_capacity(stops.len() + 2);
        vertices.push(depot);
        out.points.push(MapPoint {
            label: format!("DEPOT: {producer}"),
            coordinates: depot,
            color: DEPOT_COLOR,
            radius: DEPOT_RADIUS,
            kind: PointKind::Depot,
            producer: producer.to_owned(),
            day: day.to_owned(),
            vehicle_type: vehicle_type.to_owned(),
        });

        for stop in stops {
            let Some(coordinates) = stop.coordinate() else {
                continue;
            };
            vertices.push(coordinates);
            out.points.push(MapPoint {
                label: format!("{} ({producer})", stop.client()),
                coordinates,
                color,
                radius: DELIVERY_RADIUS,
                kind: PointKind::Delivery,
                producer: producer.to_owned(),
                day: day.to_owned(),
                vehicle_type: vehicle_type.to_owned(),
            });
        }

        vertices.push(depot);
        out.paths.push(MapPath {
            vertices,
            color,
            label: format!("{producer} ({day})"),
            producer: producer.to_owned(),
            day: day.to_owned(),
            vehicle_type: vehicle_type.to_owned(),
        });
    }
}

fn skip(record: &ProducerRecord, reason: String, out: &mut Flattened) {
    let skipped = SkippedRecord {
        producer: record.producer_name().to_owned(),
        created_at: record.created_at.clone(),
        reason,
        excerpt: record.payload_excerpt(EXCERPT_CHARS),
    };
    debug!(
        producer = %skipped.producer,
        reason = %skipped.reason,
        payload = %skipped.excerpt,
        "record yields no tour"
    );
    out.skipped.push(skipped);
}

/// Deterministic color for a producer name.
///
/// Channels fall in `50..=200` so markers stay readable on light and dark
/// backgrounds. The mapping is stable across runs and platforms; distinct
/// names may share a color.
#[must_use]
pub fn producer_color(name: &str) -> Rgba {
    let mut state = fnv1a(name.as_bytes());
    let mut channel = || {
        let offset = splitmix64(&mut state) % CHANNEL_SPAN;
        u8::try_from(CHANNEL_MIN + offset).unwrap_or(u8::MAX)
    };
    let red = channel();
    let green = channel();
    let blue = channel();
    Rgba::new(red, green, blue, PRODUCER_ALPHA)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    bytes.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut mixed = *state;
    mixed = (mixed ^ (mixed >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    mixed = (mixed ^ (mixed >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    mixed ^ (mixed >> 31)
}
