//! CRM and chat notification collaborators.
//!
//! Provides the `CrmClient` and `Notifier` traits with their HTTP
//! implementations, plus the payload builders that turn recommendations and
//! quotes into CRM records. Keeping these behind traits lets the lead
//! workflow run against fakes in tests.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use freightlead_features::standardize_carrier_name;
use freightlead_model::{Quote, ScoredCarrier, Vendor};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

pub const POTENTIAL_CARRIER_MODULE: &str = "Potential_Carrier";
pub const TRANSPORT_OFFERS_MODULE: &str = "Transport_Offers";
pub const DEALS_MODULE: &str = "Deals";

/// Errors from CRM or notification calls.
#[derive(Debug, Error)]
pub enum CrmError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Client setup failed: {0}")]
    Setup(String),

    #[error("CRM not available")]
    Unavailable,
}

/// Trait for CRM backends.
pub trait CrmClient {
    /// Create records in a module, returning the CRM's response body.
    fn create_records(
        &self,
        module: &str,
        records: Vec<Value>,
    ) -> impl Future<Output = Result<Value, CrmError>> + Send;

    /// Update a single record.
    fn update_record(
        &self,
        module: &str,
        id: &str,
        record: Value,
    ) -> impl Future<Output = Result<Value, CrmError>> + Send;

    /// Check if the CRM is reachable.
    fn health_check(&self) -> impl Future<Output = Result<(), CrmError>> + Send;

    /// Get the backend name for logging.
    fn name(&self) -> &'static str;
}

/// Trait for chat notification channels.
pub trait Notifier {
    fn notify(&self, text: &str) -> impl Future<Output = Result<(), CrmError>> + Send;
}

/// HTTP CRM configuration.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    /// Base URL of the CRM REST API
    pub base_url: String,
    /// OAuth access token
    pub access_token: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.zohoapis.ca/crm/v2".to_string(),
            access_token: String::new(),
            timeout_secs: 30,
        }
    }
}

/// CRM client speaking the Zoho-style REST API.
pub struct HttpCrmClient {
    config: CrmConfig,
    client: reqwest::Client,
}

impl HttpCrmClient {
    pub fn new(config: CrmConfig) -> Result<Self, CrmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CrmError::Setup(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn module_url(&self, module: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), module)
    }

    fn auth_header(&self) -> String {
        format!("Zoho-oauthtoken {}", self.config.access_token)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, CrmError> {
        let response = request
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| CrmError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CrmError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CrmError::ParseError(e.to_string()))
    }
}

impl CrmClient for HttpCrmClient {
    async fn create_records(&self, module: &str, records: Vec<Value>) -> Result<Value, CrmError> {
        tracing::debug!(module, count = records.len(), "Creating CRM records");
        let request = self
            .client
            .post(self.module_url(module))
            .json(&json!({ "data": records }));
        self.send(request).await
    }

    async fn update_record(&self, module: &str, id: &str, record: Value) -> Result<Value, CrmError> {
        tracing::debug!(module, id, "Updating CRM record");
        let request = self
            .client
            .put(format!("{}/{}", self.module_url(module), id))
            .json(&json!({ "data": [record] }));
        self.send(request).await
    }

    async fn health_check(&self) -> Result<(), CrmError> {
        let response = self
            .client
            .get(self.module_url("settings/modules"))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| CrmError::Connection(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CrmError::Unavailable)
        }
    }

    fn name(&self) -> &'static str {
        "zoho"
    }
}

/// Slack-style chat notifier.
pub struct SlackNotifier {
    base_url: String,
    token: String,
    channel: String,
    client: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            channel: channel.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl Notifier for SlackNotifier {
    async fn notify(&self, text: &str) -> Result<(), CrmError> {
        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.token)
            .json(&json!({ "channel": self.channel, "text": text }))
            .send()
            .await
            .map_err(|e| CrmError::Connection(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(CrmError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

/// Notifier used when no chat channel is configured.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    async fn notify(&self, text: &str) -> Result<(), CrmError> {
        tracing::debug!(text, "Notification dropped, no channel configured");
        Ok(())
    }
}

/// A `Potential_Carrier` record for a deal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PotentialCarrier {
    #[serde(rename = "VendorID")]
    pub vendor_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Carrier_Score")]
    pub carrier_score: Option<String>,
    #[serde(rename = "DealID")]
    pub deal_id: String,
    #[serde(rename = "Progress_Status")]
    pub progress_status: String,
}

/// Build potential-carrier records for the recommended leads.
///
/// Carriers without a CRM vendor are skipped.
pub fn potential_carrier_records(
    leads: &[ScoredCarrier],
    vendors: &[Vendor],
    deal_id: &str,
) -> Vec<PotentialCarrier> {
    let vendor_ids: HashMap<String, &str> = vendors
        .iter()
        .map(|v| (standardize_carrier_name(&v.name), v.crm_record_id.as_str()))
        .collect();

    leads
        .iter()
        .filter_map(|lead| {
            let name = standardize_carrier_name(lead.carrier_name());
            let Some(vendor_id) = vendor_ids.get(&name) else {
                tracing::warn!(carrier = %name, "No CRM vendor for recommended carrier");
                return None;
            };
            Some(PotentialCarrier {
                vendor_id: vendor_id.to_string(),
                name,
                carrier_score: lead.temperature.map(|t| t.label().to_string()),
                deal_id: deal_id.to_string(),
                progress_status: "To Be Contacted".to_string(),
            })
        })
        .collect()
}

/// Lead details copied onto every transport offer.
#[derive(Debug, Clone, Default)]
pub struct OfferContext {
    pub order_id: String,
    pub deal_id: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub pickup_city: String,
    pub destination_city: String,
}

/// Build `Transport_Offers` records from existing quotes on the lead's route.
pub fn transport_offer_records(quotes: &[Quote], context: &OfferContext) -> Vec<Value> {
    quotes
        .iter()
        .map(|quote| {
            json!({
                "Name": format!("{}-{}", context.order_id, quote.carrier_name),
                "VendorID": quote.carrier_id,
                "Pickup_Location": context.pickup_location,
                "Dropoff_Location": context.dropoff_location,
                "DealID": context.deal_id,
                "Estimated_Amount": quote.estimated_amount,
                "pickup_date_range": quote.estimated_pickup_time,
                "Delivery_Date_Range": quote.estimated_dropoff_time,
                "CreateDate": quote.created_at.format("%Y-%m-%d").to_string(),
                "Approval_Status": "Not sent",
                "Pickup_City": context.pickup_city,
                "Drop_off_City": context.destination_city,
                "Customer_Price_Excl_Tax": quote.customer_price_excl_tax,
            })
        })
        .collect()
}

/// Deal update marking quotes as ready for the customer.
pub fn deal_quote_ready() -> Value {
    json!({
        "Stage": "Send Quote to Customer",
        "Order_Status": "Quote Ready",
    })
}

/// Route fields pushed back onto the originating quotation request.
pub fn quotation_request_route(quote: &Quote) -> Value {
    json!({
        "Pickup_City": quote.pickup_city,
        "Drop_off_City": quote.destination_city,
    })
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

/// Chat message announcing a stored quote.
pub fn quote_added_message(quote: &Quote) -> String {
    let amount = quote
        .estimated_amount
        .map(|a| format!("{:.2}", a))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "New Quote Added in Database!\n*Details*\n\
         - Carrier Name: `{}`\n\
         - Pickup City: `{}`\n\
         - Destination City: `{}`\n\
         - Est. Amount: `{}`\n\
         - Est. Pickup Time: `{}`\n\
         - Est. Dropoff Time: `{}`",
        quote.carrier_name,
        quote.pickup_city,
        quote.destination_city,
        amount,
        or_dash(&quote.estimated_pickup_time),
        or_dash(&quote.estimated_dropoff_time),
    )
}

/// Chat message reporting a quote that could not be stored.
pub fn quote_failed_message(carrier: &str, pickup_city: &str, destination_city: &str, error: &str) -> String {
    format!(
        "*Details*\n\
         - Carrier Name: `{}`\n\
         - Pickup City: `{}`\n\
         - Destination City: `{}`\n\
         Error adding quote: {}",
        carrier, pickup_city, destination_city, error
    )
}
