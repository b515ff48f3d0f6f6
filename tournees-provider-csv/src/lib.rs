//! Source reading per-stop CSV exports produced by the route planner.
//!
//! Each CSV row is one stop. Rows sharing a `Tournée ID` are folded into a
//! single tour row; the export carries no coordinates, so no map geometry is
//! produced from it.

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use tracing::{debug, info};

use tournees_core::{
    filter::weekday_label,
    model::{
        SourceMeta, TourMetric, UNDEFINED_DAY, UNKNOWN_PRODUCER, UNNAMED_TOUR,
        UNSPECIFIED_VEHICLE,
    },
    plugin::SourcePlugin,
    ports::{PortError, RecordPort, SourceBatch},
};

const DATE_COLUMN: &str = "P_Date";
const TOUR_COLUMN: &str = "Tournée ID";
const PRODUCER_COLUMN: &str = "Producteur";
const WEIGHT_COLUMN: &str = "Poids (kg)";
const AMOUNT_COLUMN: &str = "Montant (€)";

/// Columns without which an export cannot be folded into tours.
const REQUIRED_COLUMNS: [&str; 3] = [TOUR_COLUMN, PRODUCER_COLUMN, WEIGHT_COLUMN];

/// Dates are written as `YYYYMMDD` integers.
const DATE_FORMAT: &str = "%Y%m%d";

/// One stop of the export.
///
/// The export also carries `Ordre d'Arrêt`, `Type Arrêt`,
/// `Client / Point de Livraison` and `Temps d'arrêt (min)`, which do not feed
/// tour rows and are skipped.
#[derive(Debug, Deserialize)]
struct StopRow {
    #[serde(rename = "P_Date", default)]
    date: Option<String>,
    #[serde(rename = "Tournée ID", default)]
    tour_id: Option<String>,
    #[serde(rename = "Producteur", default)]
    producer: Option<String>,
    #[serde(rename = "Poids (kg)", default)]
    weight_kg: Option<String>,
    #[serde(rename = "Montant (€)", default)]
    amount_eur: Option<String>,
}

/// Record source reading a CSV export from disk on every fetch.
pub struct CsvRecordPort {
    path: PathBuf,
    meta: SourceMeta,
}

impl CsvRecordPort {
    /// Create a port reading the export at `path`.
    #[must_use]
    pub fn new(meta: SourceMeta, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            meta,
        }
    }
}

#[async_trait]
impl RecordPort for CsvRecordPort {
    fn source(&self) -> &SourceMeta {
        &self.meta
    }

    async fn fetch(&self) -> Result<SourceBatch, PortError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let metrics = parse_tours(bytes.as_slice())?;
        info!(
            path = %self.path.display(),
            tours = metrics.len(),
            "loaded CSV export"
        );
        Ok(SourceBatch::Metrics(metrics))
    }
}

/// Build the plugin bundle for a CSV export.
#[must_use]
pub fn plugin(meta: SourceMeta, path: impl Into<PathBuf>) -> SourcePlugin {
    SourcePlugin {
        meta: meta.clone(),
        record_port: Arc::new(CsvRecordPort::new(meta, path)),
    }
}

/// Fold a per-stop export into one row per tour, in order of first appearance.
///
/// Comma and semicolon separated files are both accepted. Unreadable numbers
/// count as 0.
///
/// # Errors
///
/// Returns [`PortError::Csv`] when the file is not valid CSV and
/// [`PortError::Internal`] when a required column is missing.
pub fn parse_tours<R: Read>(mut reader: R) -> Result<Vec<TourMetric>, PortError> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .delimiter(detect_delimiter(&raw))
        .from_reader(raw.as_slice());

    let headers = csv_reader.headers()?.clone();
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|header| header == **column))
    {
        return Err(PortError::Internal(format!(
            "CSV export lacks the \"{missing}\" column"
        )));
    }
    if !headers.iter().any(|header| header == DATE_COLUMN) {
        debug!("CSV export has no {DATE_COLUMN} column, days stay undefined");
    }
    if !headers.iter().any(|header| header == AMOUNT_COLUMN) {
        debug!("CSV export has no {AMOUNT_COLUMN} column, revenue stays 0");
    }

    let mut tours: Vec<TourMetric> = Vec::new();
    let mut index_by_id: HashMap<String, usize> = HashMap::new();

    for row in csv_reader.deserialize::<StopRow>() {
        let row = row?;
        let tour_id = row
            .tour_id
            .clone()
            .unwrap_or_else(|| UNNAMED_TOUR.to_owned());

        let position = *index_by_id.entry(tour_id.clone()).or_insert_with(|| {
            tours.push(new_tour(&row, tour_id));
            tours.len() - 1
        });

        if let Some(tour) = tours.get_mut(position) {
            tour.stop_count += 1;
            tour.total_volume_kg += parse_amount(row.weight_kg.as_deref());
            tour.revenue += parse_amount(row.amount_eur.as_deref());
        }
    }

    Ok(tours)
}

fn new_tour(row: &StopRow, tour_name: String) -> TourMetric {
    let date = row.date.as_deref().map(str::trim);
    let sent_on = date.and_then(|raw| NaiveDate::parse_from_str(raw, DATE_FORMAT).ok());
    let day = match (sent_on, date) {
        (Some(parsed), _) => weekday_label(parsed).to_owned(),
        (None, Some(raw)) if !raw.is_empty() => raw.to_owned(),
        _ => UNDEFINED_DAY.to_owned(),
    };

    TourMetric {
        producer: row
            .producer
            .clone()
            .unwrap_or_else(|| UNKNOWN_PRODUCER.to_owned()),
        sent_on,
        day,
        tour_name,
        vehicle_type: UNSPECIFIED_VEHICLE.to_owned(),
        cost: 0.0,
        revenue: 0.0,
        distance: 0.0,
        total_volume_kg: 0.0,
        stop_count: 0,
    }
}

// French spreadsheets write decimals with a comma.
fn parse_amount(raw: Option<&str>) -> f64 {
    raw.map(|text| text.trim().replace(',', "."))
        .and_then(|text| text.parse::<f64>().ok())
        .filter(|amount| amount.is_finite())
        .unwrap_or(0.0)
}

fn detect_delimiter(raw: &[u8]) -> u8 {
    let header = raw.split(|byte| *byte == b'\n').next().unwrap_or_default();
    let commas = header.iter().filter(|byte| **byte == b',').count();
    let semicolons = header.iter().filter(|byte| **byte == b';').count();
    if semicolons > commas { b';' } else { b',' }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tournees_core::model::SourceId;

    use super::*;

    const EXPORT: &str = "\
P_Date,Tournée ID,Producteur,Ordre d'Arrêt,Type Arrêt,Client / Point de Livraison,Poids (kg),Montant (€),Temps d'arrêt (min)
20260111,Ferme du Val_2026011101,Ferme du Val,1,Livraison,Restaurant A,120,250,15
20260111,BioJardin_2026011102,BioJardin,1,Collecte,Cantine B,30,80,15
20260111,Ferme du Val_2026011101,Ferme du Val,2,Livraison,Epicerie C,45.5,120,15
";

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn rows_fold_into_tours() {
        let tours = parse_tours(EXPORT.as_bytes()).expect("valid export");
        assert_eq!(tours.len(), 2);

        let first = tours.first().expect("first tour");
        assert_eq!(first.tour_name, "Ferme du Val_2026011101");
        assert_eq!(first.producer, "Ferme du Val");
        assert_eq!(first.day, "Dimanche");
        assert_eq!(first.sent_on, NaiveDate::from_ymd_opt(2026, 1, 11));
        assert_eq!(first.vehicle_type, UNSPECIFIED_VEHICLE);
        assert_eq!(first.stop_count, 2);
        assert_close(first.total_volume_kg, 165.5);
        assert_close(first.revenue, 370.0);
        assert_close(first.cost, 0.0);

        let second = tours.get(1).expect("second tour");
        assert_eq!(second.producer, "BioJardin");
        assert_eq!(second.stop_count, 1);
    }

    #[test]
    fn semicolons_and_decimal_commas() {
        let export = "\
P_Date;Tournée ID;Producteur;Poids (kg);Montant (€)
lundi;T1;Ferme;12,5;oops
;T1;Ferme;;10
";
        let tours = parse_tours(export.as_bytes()).expect("valid export");
        let tour = tours.first().expect("one tour");
        assert_eq!(tours.len(), 1);
        assert_eq!(tour.day, "lundi");
        assert!(tour.sent_on.is_none());
        assert_eq!(tour.stop_count, 2);
        assert_close(tour.total_volume_kg, 12.5);
        assert_close(tour.revenue, 10.0);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let export = "P_Date,Producteur,Poids (kg)\n20260111,Ferme,10\n";
        let err = parse_tours(export.as_bytes()).expect_err("no tour column");
        assert!(matches!(err, PortError::Internal(_)));
    }

    #[test]
    fn header_only_export_is_empty() {
        let export = "Tournée ID,Producteur,Poids (kg)\n";
        assert!(parse_tours(export.as_bytes()).expect("valid export").is_empty());
    }

    #[tokio::test]
    async fn port_reads_file_on_fetch() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(EXPORT.as_bytes()).expect("write export");

        let meta = SourceMeta {
            id: SourceId("upload".to_owned()),
            name: "Upload".to_owned(),
        };
        let port = CsvRecordPort::new(meta, file.path());

        let batch = port.fetch().await.expect("file is readable");
        let SourceBatch::Metrics(metrics) = batch else {
            panic!("CSV exports are already tabular");
        };
        assert_eq!(metrics.len(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let meta = SourceMeta {
            id: SourceId("upload".to_owned()),
            name: "Upload".to_owned(),
        };
        let port = CsvRecordPort::new(meta, "/nonexistent/tournees.csv");
        assert!(matches!(port.fetch().await, Err(PortError::Io(_))));
    }
}
