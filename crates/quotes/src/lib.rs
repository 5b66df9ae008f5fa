//! Transport quotation ledger.
//!
//! Provides the `QuoteStore` trait, a JSON-snapshot backed implementation,
//! and `QuoteLedger`, which applies the quoting rules: a new quote from a
//! carrier supersedes that carrier's active quote on the same route, accepted
//! quotes gain rating, and retrieval prefers the least-used active quote.

use std::future::Future;
use std::path::Path;

use chrono::Utc;
use freightlead_model::{Quote, QuoteStatus, TaxRate, Vendor};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from the underlying quote store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("No tax rate configured for province '{0}'")]
    TaxNotFound(String),

    #[error("Quote already exists")]
    AlreadyExists,

    #[error("Invalid quote update: no active quote for {carrier} from {pickup_city} to {destination_city}")]
    InvalidUpdate {
        carrier: String,
        pickup_city: String,
        destination_city: String,
    },

    #[error("Quote is not available")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A numeric field that callers send either as a number or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Request to record a carrier's quote for a route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewQuote {
    #[serde(default, alias = "CarrierID")]
    pub carrier_id: Option<String>,
    #[serde(default, alias = "CarrierName")]
    pub carrier_name: Option<String>,
    #[serde(default, alias = "Pickup_City")]
    pub pickup_city: String,
    #[serde(default, alias = "Dropoff_City")]
    pub destination_city: String,
    #[serde(default, alias = "PickupLocation")]
    pub pickup_location: Option<String>,
    #[serde(default, alias = "DropoffLocation")]
    pub dropoff_location: Option<String>,
    #[serde(default, alias = "EstimatedPickupTime")]
    pub estimated_pickup_time: Option<String>,
    #[serde(default, alias = "EstimatedDropoffTime")]
    pub estimated_dropoff_time: Option<String>,
    #[serde(default, alias = "Estimated_Amount")]
    pub estimated_amount: Option<NumberOrText>,
    #[serde(default, alias = "Additional")]
    pub additional: Option<String>,
    #[serde(default, alias = "Surcharge")]
    pub surcharge: Option<String>,
    #[serde(default, alias = "Tax_Province")]
    pub tax_province: String,
    /// CRM record of the quotation request this answers
    #[serde(default, alias = "QuotationRequestID")]
    pub quotation_request_id: Option<String>,
}

/// Request to price or accept an active quote.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteUpdate {
    #[serde(alias = "CarrierName")]
    pub carrier_name: String,
    #[serde(alias = "PickupCity")]
    pub pickup_city: String,
    #[serde(alias = "DestinationCity")]
    pub destination_city: String,
    #[serde(default, alias = "Customer_Price")]
    pub customer_price: Option<NumberOrText>,
    #[serde(default, alias = "Approval_status")]
    pub approval_status: Option<String>,
}

const UNSET: &str = "-";

/// Selects quotes by route, carrier and status.
#[derive(Debug, Clone, Default)]
pub struct QuoteFilter {
    pub pickup_city: Option<String>,
    pub destination_city: Option<String>,
    pub carrier_name: Option<String>,
    pub status: Option<QuoteStatus>,
    /// Match cities by case-insensitive substring instead of equality
    pub partial_cities: bool,
}

impl QuoteFilter {
    /// Active quotes on an exact route.
    pub fn active_route(pickup_city: &str, destination_city: &str) -> Self {
        Self {
            pickup_city: Some(pickup_city.to_string()),
            destination_city: Some(destination_city.to_string()),
            status: Some(QuoteStatus::Active),
            ..Default::default()
        }
    }

    pub fn with_carrier(mut self, carrier_name: &str) -> Self {
        self.carrier_name = Some(carrier_name.to_string());
        self
    }

    pub fn partial(mut self) -> Self {
        self.partial_cities = true;
        self
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        let city_ok = |wanted: &Option<String>, actual: &str| match wanted {
            None => true,
            Some(w) if self.partial_cities => actual.to_lowercase().contains(&w.to_lowercase()),
            Some(w) => actual == w,
        };

        city_ok(&self.pickup_city, &quote.pickup_city)
            && city_ok(&self.destination_city, &quote.destination_city)
            && self.carrier_name.as_ref().map_or(true, |c| &quote.carrier_name == c)
            && self.status.map_or(true, |s| quote.status == s)
    }
}

/// Trait for quote persistence backends.
pub trait QuoteStore {
    /// Tax rate for a province, if configured.
    fn tax_rate(
        &self,
        province: &str,
    ) -> impl Future<Output = Result<Option<TaxRate>, StoreError>> + Send;

    /// All quotes matching a filter, oldest first.
    fn find(
        &self,
        filter: &QuoteFilter,
    ) -> impl Future<Output = Result<Vec<Quote>, StoreError>> + Send;

    /// Insert a quote, returning it with its assigned id.
    fn insert(&self, quote: Quote) -> impl Future<Output = Result<Quote, StoreError>> + Send;

    /// Overwrite a previously inserted quote.
    fn save(&self, quote: &Quote) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Mark every matching quote inactive, returning how many changed.
    fn deactivate(
        &self,
        filter: &QuoteFilter,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Carriers registered in the CRM.
    fn vendors(&self) -> impl Future<Output = Result<Vec<Vendor>, StoreError>> + Send;
}

/// Serialized form of the quote store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub taxes: Vec<TaxRate>,
    #[serde(default)]
    pub vendors: Vec<Vendor>,
    #[serde(default)]
    pub quotes: Vec<Quote>,
}

/// In-memory quote store, loadable from and persistable to a JSON snapshot.
#[derive(Debug, Default)]
pub struct MemoryQuoteStore {
    inner: RwLock<Snapshot>,
}

impl MemoryQuoteStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    /// Load a snapshot file; a missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Quote snapshot not found, starting empty");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&contents)?;
        tracing::debug!(
            path = %path.display(),
            quotes = snapshot.quotes.len(),
            taxes = snapshot.taxes.len(),
            "Loaded quote snapshot"
        );
        Ok(Self::new(snapshot))
    }

    /// Write the current state back to a snapshot file.
    pub async fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let json = {
            let snapshot = self.inner.read().await;
            serde_json::to_string_pretty(&*snapshot)?
        };
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.read().await.clone()
    }
}

impl QuoteStore for MemoryQuoteStore {
    async fn tax_rate(&self, province: &str) -> Result<Option<TaxRate>, StoreError> {
        let snapshot = self.inner.read().await;
        Ok(snapshot
            .taxes
            .iter()
            .find(|t| t.province == province)
            .cloned())
    }

    async fn find(&self, filter: &QuoteFilter) -> Result<Vec<Quote>, StoreError> {
        let snapshot = self.inner.read().await;
        Ok(snapshot
            .quotes
            .iter()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect())
    }

    async fn insert(&self, mut quote: Quote) -> Result<Quote, StoreError> {
        let mut snapshot = self.inner.write().await;
        quote.id = snapshot.quotes.iter().map(|q| q.id).max().unwrap_or(0) + 1;
        snapshot.quotes.push(quote.clone());
        Ok(quote)
    }

    async fn save(&self, quote: &Quote) -> Result<(), StoreError> {
        let mut snapshot = self.inner.write().await;
        match snapshot.quotes.iter_mut().find(|q| q.id == quote.id) {
            Some(existing) => *existing = quote.clone(),
            None => snapshot.quotes.push(quote.clone()),
        }
        Ok(())
    }

    async fn deactivate(&self, filter: &QuoteFilter) -> Result<usize, StoreError> {
        let mut snapshot = self.inner.write().await;
        let mut changed = 0;
        for quote in snapshot.quotes.iter_mut().filter(|q| filter.matches(q)) {
            quote.status = QuoteStatus::Inactive;
            changed += 1;
        }
        Ok(changed)
    }

    async fn vendors(&self) -> Result<Vec<Vendor>, StoreError> {
        Ok(self.inner.read().await.vendors.clone())
    }
}

/// Quoting rules on top of a `QuoteStore`.
pub struct QuoteLedger<S> {
    store: S,
}

impl<S: QuoteStore> QuoteLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record a new active quote, superseding the carrier's current one.
    pub async fn store_quote(&self, request: NewQuote) -> Result<Quote, QuoteError> {
        let tax = self
            .store
            .tax_rate(&request.tax_province)
            .await?
            .ok_or_else(|| QuoteError::TaxNotFound(request.tax_province.clone()))?;

        let carrier_name = request.carrier_name.clone().unwrap_or_else(|| UNSET.to_string());
        let estimated_amount = request.estimated_amount.as_ref().and_then(NumberOrText::as_f64);
        let additional = request.additional.clone().unwrap_or_else(|| "0".to_string());
        let surcharge = request.surcharge.clone().unwrap_or_else(|| "0".to_string());

        let route = QuoteFilter::active_route(&request.pickup_city, &request.destination_city)
            .with_carrier(&carrier_name);

        let duplicate = self.store.find(&route).await?.into_iter().any(|q| {
            q.estimated_amount == estimated_amount
                && q.additional == additional
                && q.surcharge == surcharge
        });
        if duplicate {
            return Err(QuoteError::AlreadyExists);
        }

        match self.store.deactivate(&route).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(carrier = %carrier_name, superseded = n, "Deactivated previous quotes"),
            Err(e) => tracing::warn!(carrier = %carrier_name, error = %e, "Failed to deactivate previous quotes"),
        }

        let quote = Quote {
            id: 0,
            carrier_id: request.carrier_id.unwrap_or_else(|| UNSET.to_string()),
            carrier_name,
            pickup_location: request.pickup_location.unwrap_or_else(|| UNSET.to_string()),
            dropoff_location: request.dropoff_location.unwrap_or_else(|| UNSET.to_string()),
            pickup_city: request.pickup_city,
            destination_city: request.destination_city,
            estimated_pickup_time: request.estimated_pickup_time.unwrap_or_else(|| UNSET.to_string()),
            estimated_dropoff_time: request.estimated_dropoff_time.unwrap_or_else(|| UNSET.to_string()),
            estimated_amount,
            additional,
            surcharge,
            tax_rate: tax.tax_rate,
            tax_name: tax.tax_name,
            customer_price_excl_tax: None,
            tax_amount: None,
            total_amount: None,
            status: QuoteStatus::Active,
            rating: 0,
            created_at: Utc::now(),
        };

        let quote = self.store.insert(quote).await?;
        tracing::info!(
            id = quote.id,
            carrier = %quote.carrier_name,
            pickup = %quote.pickup_city,
            destination = %quote.destination_city,
            "Stored quote"
        );
        Ok(quote)
    }

    /// Price an active quote for the customer and record acceptance.
    pub async fn update_quote(&self, update: QuoteUpdate) -> Result<Quote, QuoteError> {
        let route = QuoteFilter::active_route(&update.pickup_city, &update.destination_city)
            .with_carrier(&update.carrier_name);

        let mut quote = self
            .store
            .find(&route)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QuoteError::InvalidUpdate {
                carrier: update.carrier_name.clone(),
                pickup_city: update.pickup_city.clone(),
                destination_city: update.destination_city.clone(),
            })?;

        match update.customer_price.as_ref().map(|p| (p, p.as_f64())) {
            Some((_, Some(price))) => {
                let tax_amount = price * (quote.tax_rate / 100.0);
                quote.customer_price_excl_tax = Some(price);
                quote.tax_amount = Some(tax_amount);
                quote.total_amount = Some(price + tax_amount);
            }
            Some((raw, None)) => {
                tracing::warn!(price = ?raw, "Customer price is not a number, leaving pricing unchanged");
            }
            None => {}
        }

        if update.approval_status.as_deref() == Some("Accepted") {
            quote.rating += 1;
        }

        self.store.save(&quote).await?;
        tracing::info!(id = quote.id, rating = quote.rating, "Updated quote");
        Ok(quote)
    }

    /// The least-rated active quote on an exact route.
    pub async fn get_quote(
        &self,
        pickup_city: &str,
        destination_city: &str,
    ) -> Result<Quote, QuoteError> {
        let quotes = self
            .store
            .find(&QuoteFilter::active_route(pickup_city, destination_city))
            .await?;

        // min_by_key keeps the earliest quote among equal ratings
        quotes
            .into_iter()
            .min_by_key(|q| q.rating)
            .ok_or(QuoteError::NotFound)
    }

    /// Active quotes whose cities contain the requested ones.
    pub async fn matching_quotes(
        &self,
        pickup_city: &str,
        destination_city: &str,
    ) -> Result<Vec<Quote>, QuoteError> {
        let filter = QuoteFilter::active_route(pickup_city, destination_city).partial();
        let quotes = self.store.find(&filter).await?;
        tracing::debug!(count = quotes.len(), "Matching active quotes");
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ledger() -> QuoteLedger<MemoryQuoteStore> {
        QuoteLedger::new(MemoryQuoteStore::new(Snapshot {
            taxes: vec![TaxRate {
                province: "ON".to_string(),
                tax_rate: 13.0,
                tax_name: "HST".to_string(),
            }],
            ..Default::default()
        }))
    }

    fn new_quote(carrier: &str, amount: f64) -> NewQuote {
        NewQuote {
            carrier_id: Some("V-1".to_string()),
            carrier_name: Some(carrier.to_string()),
            pickup_city: "Toronto".to_string(),
            destination_city: "Vancouver".to_string(),
            estimated_amount: Some(NumberOrText::Number(amount)),
            tax_province: "ON".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_store_quote_applies_tax() {
        let ledger = ledger();
        let quote = ledger.store_quote(new_quote("Acme", 500.0)).await.unwrap();

        assert_eq!(quote.id, 1);
        assert_eq!(quote.status, QuoteStatus::Active);
        assert_eq!(quote.tax_name, "HST");
        assert_eq!(quote.tax_rate, 13.0);
        assert_eq!(quote.additional, "0");
        assert_eq!(quote.pickup_location, "-");
    }

    #[tokio::test]
    async fn test_unknown_tax_province() {
        let ledger = ledger();
        let mut request = new_quote("Acme", 500.0);
        request.tax_province = "YT".to_string();
        let err = ledger.store_quote(request).await.unwrap_err();
        assert!(matches!(err, QuoteError::TaxNotFound(p) if p == "YT"));
    }

    #[tokio::test]
    async fn test_duplicate_quote_rejected() {
        let ledger = ledger();
        ledger.store_quote(new_quote("Acme", 500.0)).await.unwrap();
        let err = ledger.store_quote(new_quote("Acme", 500.0)).await.unwrap_err();
        assert!(matches!(err, QuoteError::AlreadyExists));
    }

    #[tokio::test]
    async fn test_new_quote_supersedes_previous() {
        let ledger = ledger();
        let first = ledger.store_quote(new_quote("Acme", 500.0)).await.unwrap();
        let second = ledger.store_quote(new_quote("Acme", 450.0)).await.unwrap();
        ledger.store_quote(new_quote("Beta", 600.0)).await.unwrap();

        let snapshot = ledger.store().snapshot().await;
        let status = |id: u64| snapshot.quotes.iter().find(|q| q.id == id).unwrap().status;
        assert_eq!(status(first.id), QuoteStatus::Inactive);
        assert_eq!(status(second.id), QuoteStatus::Active);

        let active = snapshot.quotes.iter().filter(|q| q.is_active()).count();
        assert_eq!(active, 2);
    }

    #[tokio::test]
    async fn test_update_prices_and_rates_quote() {
        let ledger = ledger();
        ledger.store_quote(new_quote("Acme", 500.0)).await.unwrap();

        let update = QuoteUpdate {
            carrier_name: "Acme".to_string(),
            pickup_city: "Toronto".to_string(),
            destination_city: "Vancouver".to_string(),
            customer_price: Some(NumberOrText::Text("1000".to_string())),
            approval_status: Some("Accepted".to_string()),
        };
        let quote = ledger.update_quote(update).await.unwrap();

        assert_eq!(quote.customer_price_excl_tax, Some(1000.0));
        assert!((quote.tax_amount.unwrap() - 130.0).abs() < 1e-9);
        assert!((quote.total_amount.unwrap() - 1130.0).abs() < 1e-9);
        assert_eq!(quote.rating, 1);
    }

    #[tokio::test]
    async fn test_update_with_bad_price_still_rates() {
        let ledger = ledger();
        ledger.store_quote(new_quote("Acme", 500.0)).await.unwrap();

        let update = QuoteUpdate {
            carrier_name: "Acme".to_string(),
            pickup_city: "Toronto".to_string(),
            destination_city: "Vancouver".to_string(),
            customer_price: Some(NumberOrText::Text("call me".to_string())),
            approval_status: Some("Accepted".to_string()),
        };
        let quote = ledger.update_quote(update).await.unwrap();
        assert_eq!(quote.customer_price_excl_tax, None);
        assert_eq!(quote.rating, 1);
    }

    #[tokio::test]
    async fn test_update_missing_quote() {
        let ledger = ledger();
        let update = QuoteUpdate {
            carrier_name: "Ghost".to_string(),
            pickup_city: "Toronto".to_string(),
            destination_city: "Vancouver".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ledger.update_quote(update).await,
            Err(QuoteError::InvalidUpdate { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_quote_prefers_lowest_rating() {
        let ledger = ledger();
        ledger.store_quote(new_quote("Acme", 500.0)).await.unwrap();
        ledger.store_quote(new_quote("Beta", 650.0)).await.unwrap();

        let accept_acme = QuoteUpdate {
            carrier_name: "Acme".to_string(),
            pickup_city: "Toronto".to_string(),
            destination_city: "Vancouver".to_string(),
            approval_status: Some("Accepted".to_string()),
            ..Default::default()
        };
        ledger.update_quote(accept_acme).await.unwrap();

        let quote = ledger.get_quote("Toronto", "Vancouver").await.unwrap();
        assert_eq!(quote.carrier_name, "Beta");

        assert!(matches!(
            ledger.get_quote("Toronto", "Calgary").await,
            Err(QuoteError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_matching_quotes_by_substring() {
        let ledger = ledger();
        let mut request = new_quote("Acme", 500.0);
        request.pickup_city = "Greater Toronto Area".to_string();
        ledger.store_quote(request).await.unwrap();

        let quotes = ledger.matching_quotes("toronto", "Vancouver").await.unwrap();
        assert_eq!(quotes.len(), 1);
    }

    #[test]
    fn test_new_quote_accepts_crm_field_names() {
        let json = r#"{
            "CarrierName": "TestCarrier",
            "Pickup_City": "Toronto",
            "Dropoff_City": "Vancouver",
            "Estimated_Amount": "500",
            "Tax_Province": "ON"
        }"#;
        let request: NewQuote = serde_json::from_str(json).unwrap();
        assert_eq!(request.carrier_name.as_deref(), Some("TestCarrier"));
        assert_eq!(request.estimated_amount.and_then(|a| a.as_f64()), Some(500.0));
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("freightlead-quotes-{}.json", std::process::id()));
        let ledger = ledger();
        ledger.store_quote(new_quote("Acme", 500.0)).await.unwrap();
        ledger.store().persist(&path).await.unwrap();

        let reloaded = QuoteLedger::new(MemoryQuoteStore::load(&path).unwrap());
        let quote = reloaded.get_quote("Toronto", "Vancouver").await.unwrap();
        assert_eq!(quote.carrier_name, "Acme");

        std::fs::remove_file(&path).unwrap();
    }
}
