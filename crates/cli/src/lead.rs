//! Lead workflow: recommend carriers for a deal and push them to the CRM.

use freightlead_crm::{
    deal_quote_ready, potential_carrier_records, transport_offer_records, CrmClient,
    OfferContext, DEALS_MODULE, POTENTIAL_CARRIER_MODULE, TRANSPORT_OFFERS_MODULE,
};
use freightlead_dataset::CarrierDataset;
use freightlead_model::LocationQuery;
use freightlead_quotes::{QuoteLedger, QuoteStore};
use freightlead_recommend::{recommend, RecommendConfig};
use serde::Serialize;

/// A shipping lead as received from the CRM.
#[derive(Debug, Clone, Default)]
pub struct Lead {
    pub deal_id: String,
    pub order_id: String,
    pub route: LocationQuery,
    pub pickup_location: String,
    pub dropoff_location: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub status: &'static str,
    pub message: String,
}

impl StepOutcome {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            status: "failed",
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadOutcome {
    pub potential_carriers: StepOutcome,
    pub quotations: StepOutcome,
}

/// Attach recommended carriers and matching quotes to a deal.
///
/// Each step reports its own outcome; a failed recommendation does not stop
/// existing quotes from being offered.
pub async fn process_lead<C, S>(
    lead: &Lead,
    dataset: &CarrierDataset,
    config: &RecommendConfig,
    ledger: &QuoteLedger<S>,
    crm: &C,
) -> LeadOutcome
where
    C: CrmClient,
    S: QuoteStore,
{
    tracing::info!(deal_id = %lead.deal_id, "Adding potential carriers");

    let potential_carriers = attach_carriers(lead, dataset, config, ledger, crm).await;
    let quotations = attach_quotes(lead, ledger, crm).await;

    LeadOutcome {
        potential_carriers,
        quotations,
    }
}

async fn attach_carriers<C: CrmClient, S: QuoteStore>(
    lead: &Lead,
    dataset: &CarrierDataset,
    config: &RecommendConfig,
    ledger: &QuoteLedger<S>,
    crm: &C,
) -> StepOutcome {
    let leads = match recommend(dataset, &lead.route, config) {
        Ok(leads) => leads,
        Err(e) => {
            tracing::warn!(error = %e, "Error while generating recommendations");
            return StepOutcome::failed("No Potential Carrier Found");
        }
    };

    let vendors = match ledger.store().vendors().await {
        Ok(vendors) => vendors,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load CRM vendors");
            return StepOutcome::failed(e.to_string());
        }
    };

    let records: Vec<serde_json::Value> = potential_carrier_records(&leads, &vendors, &lead.deal_id)
        .iter()
        .filter_map(|r| serde_json::to_value(r).ok())
        .collect();
    if records.is_empty() {
        return StepOutcome::failed("No recommended carrier is registered in the CRM");
    }

    match crm.create_records(POTENTIAL_CARRIER_MODULE, records).await {
        Ok(_) => StepOutcome::success("Leads added successfully"),
        Err(e) => {
            tracing::error!(error = %e, crm = crm.name(), "Failed to add potential carriers");
            StepOutcome::failed(e.to_string())
        }
    }
}

async fn attach_quotes<C: CrmClient, S: QuoteStore>(
    lead: &Lead,
    ledger: &QuoteLedger<S>,
    crm: &C,
) -> StepOutcome {
    let quotes = match ledger
        .matching_quotes(&lead.route.pickup_city, &lead.route.destination_city)
        .await
    {
        Ok(quotes) if quotes.is_empty() => {
            tracing::info!("No matching quotes found");
            return StepOutcome::failed("No matching quotes found.");
        }
        Ok(quotes) => quotes,
        Err(e) => return StepOutcome::failed(e.to_string()),
    };

    let context = OfferContext {
        order_id: lead.order_id.clone(),
        deal_id: lead.deal_id.clone(),
        pickup_location: lead.pickup_location.clone(),
        dropoff_location: lead.dropoff_location.clone(),
        pickup_city: lead.route.pickup_city.clone(),
        destination_city: lead.route.destination_city.clone(),
    };

    let offers = transport_offer_records(&quotes, &context);
    if let Err(e) = crm.create_records(TRANSPORT_OFFERS_MODULE, offers).await {
        tracing::error!(error = %e, "Failed to create transport offers");
        return StepOutcome::failed(e.to_string());
    }
    if let Err(e) = crm
        .update_record(DEALS_MODULE, &lead.deal_id, deal_quote_ready())
        .await
    {
        tracing::error!(error = %e, deal_id = %lead.deal_id, "Failed to mark deal quote-ready");
        return StepOutcome::failed(e.to_string());
    }

    StepOutcome::success("Quotes created successfully")
}
