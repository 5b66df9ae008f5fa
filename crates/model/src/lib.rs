//! Core domain model for freightlead carrier recommendation.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `CarrierRecord`: One row of historical carrier performance
//! - `MatchTier`: How a carrier matched the requested route
//! - `ScoredCarrier`: A recommended carrier with its sub-scores
//! - `LeadTemperature`: Percentile bucket summarizing desirability
//! - `Quote`: A persisted transport quotation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Historical performance of a carrier on one pickup/destination pair.
///
/// Numeric fields are optional: a missing value carries no signal and is
/// scored as zero rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarrierRecord {
    /// Carrier name (not unique across rows)
    pub carrier_name: String,

    #[serde(default)]
    pub pickup_city: String,

    #[serde(default)]
    pub destination_city: String,

    #[serde(default)]
    pub pickup_province: String,

    #[serde(default)]
    pub destination_province: String,

    #[serde(default)]
    pub pickup_country: String,

    #[serde(default)]
    pub destination_country: String,

    /// Average delivery time in days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_delivery_days: Option<f64>,

    /// On-time deliveries (averaged when aggregated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_time: Option<f64>,

    /// Late deliveries (averaged when aggregated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub late_deliveries: Option<f64>,

    /// Estimated cost of the move
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_cost_per_km: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_requests: Option<f64>,

    /// Historical sample size ("CountRequest")
    #[serde(default)]
    pub request_count: u32,
}

impl CarrierRecord {
    /// Create a minimal record on a city pair, for testing and fixtures.
    pub fn new(
        carrier_name: impl Into<String>,
        pickup_city: impl Into<String>,
        destination_city: impl Into<String>,
    ) -> Self {
        Self {
            carrier_name: carrier_name.into(),
            pickup_city: pickup_city.into(),
            destination_city: destination_city.into(),
            ..Default::default()
        }
    }

    pub fn with_provinces(
        mut self,
        pickup_province: impl Into<String>,
        destination_province: impl Into<String>,
    ) -> Self {
        self.pickup_province = pickup_province.into();
        self.destination_province = destination_province.into();
        self
    }

    pub fn with_delivery_days(mut self, days: f64) -> Self {
        self.avg_delivery_days = Some(days);
        self
    }

    pub fn with_deliveries(mut self, on_time: f64, late: f64) -> Self {
        self.on_time = Some(on_time);
        self.late_deliveries = Some(late);
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.estimated_amount = Some(amount);
        self
    }

    pub fn with_request_count(mut self, count: u32) -> Self {
        self.request_count = count;
        self
    }
}

/// How a carrier matched the requested route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Pickup and destination cities both match
    CityMatch,
    /// Only pickup and destination provinces match
    StateMatch,
}

impl MatchTier {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CityMatch => "City Match",
            Self::StateMatch => "Province Match",
        }
    }
}

/// Qualitative percentile bucket for a recommended carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LeadTemperature {
    Cold,
    Moderate,
    Warm,
    Hot,
    VeryHot,
}

impl LeadTemperature {
    /// Label as shown to sales staff and pushed to the CRM.
    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryHot => "Very Hot",
            Self::Hot => "Hot",
            Self::Warm => "Warm",
            Self::Moderate => "Moderate",
            Self::Cold => "Cold",
        }
    }
}

impl std::fmt::Display for LeadTemperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The route a shipper is asking carriers for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationQuery {
    pub pickup_city: String,
    pub destination_city: String,
    #[serde(default)]
    pub pickup_province: String,
    #[serde(default)]
    pub destination_province: String,
}

impl LocationQuery {
    pub fn new(pickup_city: impl Into<String>, destination_city: impl Into<String>) -> Self {
        Self {
            pickup_city: pickup_city.into(),
            destination_city: destination_city.into(),
            ..Default::default()
        }
    }

    pub fn with_provinces(
        mut self,
        pickup_province: impl Into<String>,
        destination_province: impl Into<String>,
    ) -> Self {
        self.pickup_province = pickup_province.into();
        self.destination_province = destination_province.into();
        self
    }
}

/// A carrier recommended for a route, with its score breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCarrier {
    /// The matched row (aggregated per carrier for province matches)
    pub record: CarrierRecord,

    pub match_tier: MatchTier,

    /// Delivery speed score (0.0 - 5.0)
    pub transport_score: f64,

    /// On-time ratio score (0.0 - 5.0)
    pub reliability_score: f64,

    /// Cheapness score (0.0 - 10.0)
    pub cost_score: f64,

    /// Sub-scores plus the match tier bonus
    pub composite_score: f64,

    /// Unset when bucketing was skipped for this carrier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<LeadTemperature>,
}

impl ScoredCarrier {
    pub fn carrier_name(&self) -> &str {
        &self.record.carrier_name
    }
}

/// Lifecycle status of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuoteStatus {
    Active,
    Inactive,
}

impl Default for QuoteStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// A transport quotation from a carrier for a city pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Store-assigned identifier
    #[serde(default)]
    pub id: u64,

    /// CRM vendor id of the carrier
    pub carrier_id: String,

    pub carrier_name: String,

    #[serde(default)]
    pub pickup_location: String,

    #[serde(default)]
    pub dropoff_location: String,

    pub pickup_city: String,

    pub destination_city: String,

    #[serde(default)]
    pub estimated_pickup_time: String,

    #[serde(default)]
    pub estimated_dropoff_time: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_amount: Option<f64>,

    /// Additional charges, as entered
    #[serde(default = "zero_charge")]
    pub additional: String,

    #[serde(default = "zero_charge")]
    pub surcharge: String,

    /// Tax rate in percent
    #[serde(default)]
    pub tax_rate: f64,

    #[serde(default)]
    pub tax_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_price_excl_tax: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,

    #[serde(default)]
    pub status: QuoteStatus,

    /// Number of times customers accepted this quote
    #[serde(default)]
    pub rating: u32,

    pub created_at: DateTime<Utc>,
}

impl Quote {
    pub fn is_active(&self) -> bool {
        self.status == QuoteStatus::Active
    }
}

fn zero_charge() -> String {
    "0".to_string()
}

/// Sales tax for a province.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRate {
    pub province: String,
    /// Percent, e.g. 13.0 for HST
    pub tax_rate: f64,
    pub tax_name: String,
}

/// A carrier known to the CRM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    /// Standardized carrier name
    pub name: String,
    pub crm_record_id: String,
}
