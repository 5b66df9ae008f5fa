//! Carrier performance dataset.
//!
//! Loads the historical carrier CSV snapshot once at startup. The resulting
//! `CarrierDataset` is immutable and shared by reference for the lifetime of
//! the process.

use std::io::Read;
use std::path::Path;

use freightlead_model::CarrierRecord;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Errors from loading the carrier dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed CSV at record {record}: {source}")]
    Csv {
        record: usize,
        #[source]
        source: csv::Error,
    },
}

/// One CSV row, as exported from the operations spreadsheet.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Carrier Name", default)]
    carrier_name: String,
    #[serde(rename = "Pickup City", default)]
    pickup_city: String,
    #[serde(rename = "Destination City", default)]
    destination_city: String,
    #[serde(rename = "Pickup Province", default)]
    pickup_province: String,
    #[serde(rename = "Destination Province", default)]
    destination_province: String,
    #[serde(rename = "Pickup Country", default)]
    pickup_country: String,
    #[serde(rename = "Destination Country", default)]
    destination_country: String,
    #[serde(rename = "Avg. Delivery Day", default, deserialize_with = "lenient_number")]
    avg_delivery_days: Option<f64>,
    #[serde(rename = "On-time", default, deserialize_with = "lenient_number")]
    on_time: Option<f64>,
    #[serde(rename = "Late Delivery", default, deserialize_with = "lenient_number")]
    late_deliveries: Option<f64>,
    #[serde(rename = "Estimated Amount", default, deserialize_with = "lenient_number")]
    estimated_amount: Option<f64>,
    #[serde(rename = "Avg. Cost Per Km", default, deserialize_with = "lenient_number")]
    avg_cost_per_km: Option<f64>,
    #[serde(rename = "Transport Requests", default, deserialize_with = "lenient_number")]
    transport_requests: Option<f64>,
    #[serde(rename = "CountRequest", default, deserialize_with = "lenient_number")]
    request_count: Option<f64>,
}

impl From<CsvRow> for CarrierRecord {
    fn from(row: CsvRow) -> Self {
        Self {
            carrier_name: row.carrier_name.trim().to_string(),
            pickup_city: row.pickup_city,
            destination_city: row.destination_city,
            pickup_province: row.pickup_province,
            destination_province: row.destination_province,
            pickup_country: row.pickup_country,
            destination_country: row.destination_country,
            avg_delivery_days: row.avg_delivery_days,
            on_time: row.on_time,
            late_deliveries: row.late_deliveries,
            estimated_amount: row.estimated_amount,
            avg_cost_per_km: row.avg_cost_per_km,
            transport_requests: row.transport_requests,
            request_count: row
                .request_count
                .filter(|c| c.is_finite() && *c > 0.0)
                .map(|c| c.round() as u32)
                .unwrap_or(0),
        }
    }
}

/// Empty cells and spreadsheet placeholders ("NA", "NaN", "-") read as missing.
/// Anything else that fails to parse is also missing rather than an error.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| parse_number(&s)))
}

fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || matches!(trimmed.to_ascii_lowercase().as_str(), "na" | "nan" | "n/a" | "-") {
        return None;
    }
    trimmed.replace(',', "").parse().ok()
}

/// Immutable table of historical carrier performance.
#[derive(Debug, Clone, Default)]
pub struct CarrierDataset {
    records: Vec<CarrierRecord>,
}

impl CarrierDataset {
    pub fn new(records: Vec<CarrierRecord>) -> Self {
        Self { records }
    }

    /// Load the dataset from a CSV file.
    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let mut file = std::fs::File::open(path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let dataset = Self::from_csv(&decode(bytes))?;
        tracing::info!(path = %path.display(), rows = dataset.len(), "Loaded carrier dataset");
        Ok(dataset)
    }

    /// Load the dataset from any reader producing CSV bytes.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, DatasetError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_csv(&decode(bytes))
    }

    fn from_csv(content: &str) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(content.as_bytes());

        let mut records = Vec::new();
        for (idx, result) in reader.deserialize::<CsvRow>().enumerate() {
            let row = result.map_err(|source| DatasetError::Csv { record: idx + 1, source })?;
            if row.carrier_name.trim().is_empty() {
                tracing::warn!(record = idx + 1, "Skipping row without a carrier name");
                continue;
            }
            records.push(CarrierRecord::from(row));
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[CarrierRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Decode as UTF-8, falling back to Windows-1252 for spreadsheet exports.
fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Carrier Name,Pickup City,Destination City,Pickup Province,Destination Province,Avg. Delivery Day,On-time,Late Delivery,Estimated Amount,CountRequest,Notes
Acme,Toronto,Vancouver,ON,BC,3,8,2,500,15,regular
Northern Haul,Montreal,Calgary,QC,AB,NA,,1,\"1,250.50\",4,
,Toronto,Ottawa,ON,ON,1,1,0,100,1,
";

    #[test]
    fn test_parse_rows() {
        let dataset = CarrierDataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(dataset.len(), 2);

        let acme = &dataset.records()[0];
        assert_eq!(acme.carrier_name, "Acme");
        assert_eq!(acme.destination_province, "BC");
        assert_eq!(acme.avg_delivery_days, Some(3.0));
        assert_eq!(acme.on_time, Some(8.0));
        assert_eq!(acme.request_count, 15);
        assert!(acme.pickup_country.is_empty());
    }

    #[test]
    fn test_missing_values() {
        let dataset = CarrierDataset::from_reader(SAMPLE.as_bytes()).unwrap();
        let northern = &dataset.records()[1];
        assert_eq!(northern.avg_delivery_days, None);
        assert_eq!(northern.on_time, None);
        assert_eq!(northern.late_deliveries, Some(1.0));
        assert_eq!(northern.estimated_amount, Some(1250.5));
        assert_eq!(northern.transport_requests, None);
    }

    #[test]
    fn test_windows_1252_fallback() {
        // "Montréal" encoded as Windows-1252
        let mut bytes = b"Carrier Name,Pickup City,Destination City\nAcme,Montr".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"al,Quebec\n");

        let dataset = CarrierDataset::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(dataset.records()[0].pickup_city, "Montréal");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 12.5 "), Some(12.5));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("abc"), None);
    }
}
