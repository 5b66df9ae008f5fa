//! Command-line front end for carrier recommendation and quoting.
//!
//! Usage:
//!     freightlead recommend --pickup-city Toronto --dropoff-city Vancouver --pickup-province ON --dropoff-province BC
//!     freightlead lead --deal-id D123 --order-id O456 --pickup-city Toronto --dropoff-city Vancouver
//!     freightlead store-quote --input quote.json
//!     freightlead get-quote --pickup-city Toronto --dropoff-city Vancouver
//!     freightlead health

mod config;
mod lead;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use freightlead_crm::{
    quote_added_message, quote_failed_message, quotation_request_route, CrmClient, CrmConfig,
    HttpCrmClient, Notifier, NullNotifier, SlackNotifier, TRANSPORT_OFFERS_MODULE,
};
use freightlead_dataset::CarrierDataset;
use freightlead_explain::{explain_carrier, summarize_lead};
use freightlead_model::LocationQuery;
use freightlead_quotes::{MemoryQuoteStore, NewQuote, QuoteLedger, QuoteUpdate};
use freightlead_recommend::recommend;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, Secrets};
use crate::lead::{process_lead, Lead};

#[derive(Parser)]
#[command(name = "freightlead")]
#[command(about = "Recommend freight carriers and manage transport quotes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./freightlead.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Carrier dataset CSV, overriding the config
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Quote snapshot JSON, overriding the config
    #[arg(long, global = true)]
    quotes: Option<PathBuf>,
}

#[derive(Args)]
struct RouteArgs {
    #[arg(long, default_value = "")]
    pickup_city: String,

    #[arg(long, default_value = "")]
    dropoff_city: String,

    #[arg(long, default_value = "")]
    pickup_province: String,

    #[arg(long, default_value = "")]
    dropoff_province: String,
}

impl RouteArgs {
    fn query(&self) -> LocationQuery {
        LocationQuery::new(self.pickup_city.trim(), self.dropoff_city.trim())
            .with_provinces(self.pickup_province.trim(), self.dropoff_province.trim())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend carriers for a route
    Recommend {
        #[command(flatten)]
        route: RouteArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Show the score breakdown of each carrier
        #[arg(long)]
        explain: bool,
    },

    /// Attach recommended carriers and matching quotes to a CRM deal
    Lead {
        #[arg(long)]
        deal_id: String,

        #[arg(long, default_value = "")]
        order_id: String,

        #[command(flatten)]
        route: RouteArgs,

        #[arg(long, default_value = "")]
        pickup_loc: String,

        #[arg(long, default_value = "")]
        dropoff_loc: String,
    },

    /// Store a new quote from a JSON request file
    StoreQuote {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Price or accept an active quote from a JSON request file
    UpdateQuote {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show the preferred active quote for a route
    GetQuote {
        #[arg(long)]
        pickup_city: String,

        #[arg(long)]
        dropoff_city: String,
    },

    /// Check CRM health
    Health,
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut config, secrets) = AppConfig::load(cli.config.as_deref())?;
    if let Some(dataset) = cli.dataset {
        config.data.dataset_path = dataset;
    }
    if let Some(quotes) = cli.quotes {
        config.data.quotes_path = quotes;
    }

    init_logging(&config.logging.level)?;

    match cli.command {
        Commands::Recommend {
            route,
            format,
            explain,
        } => {
            run_recommend(&config, &route.query(), &format, explain)?;
        }
        Commands::Lead {
            deal_id,
            order_id,
            route,
            pickup_loc,
            dropoff_loc,
        } => {
            let lead = Lead {
                deal_id,
                order_id,
                route: route.query(),
                pickup_location: pickup_loc,
                dropoff_location: dropoff_loc,
            };
            run_lead(&config, &secrets, &lead).await?;
        }
        Commands::StoreQuote { input } => {
            run_store_quote(&config, &secrets, &input).await?;
        }
        Commands::UpdateQuote { input } => {
            run_update_quote(&config, &input).await?;
        }
        Commands::GetQuote {
            pickup_city,
            dropoff_city,
        } => {
            run_get_quote(&config, &pickup_city, &dropoff_city).await?;
        }
        Commands::Health => {
            run_health(&config, &secrets).await?;
        }
    }

    Ok(())
}

fn load_dataset(config: &AppConfig) -> Result<CarrierDataset> {
    let path = &config.data.dataset_path;
    CarrierDataset::from_path(path)
        .with_context(|| format!("Failed to load carrier dataset: {}", path.display()))
}

fn load_ledger(config: &AppConfig) -> Result<QuoteLedger<MemoryQuoteStore>> {
    let path = &config.data.quotes_path;
    let store = MemoryQuoteStore::load(path)
        .with_context(|| format!("Failed to load quote snapshot: {}", path.display()))?;
    Ok(QuoteLedger::new(store))
}

fn crm_client(config: &AppConfig, secrets: &Secrets) -> Result<HttpCrmClient> {
    let access_token = secrets
        .crm_access_token
        .clone()
        .context("CRM_ACCESS_TOKEN is not set")?;
    let client = HttpCrmClient::new(CrmConfig {
        base_url: config.crm.base_url.clone(),
        access_token,
        timeout_secs: config.crm.timeout_secs,
    })?;
    Ok(client)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn run_recommend(config: &AppConfig, query: &LocationQuery, format: &str, explain: bool) -> Result<()> {
    let dataset = load_dataset(config)?;
    let carriers = recommend(&dataset, query, &config.scoring)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&carriers)?);
        return Ok(());
    }

    println!(
        "Carriers for {} -> {} ({} -> {})",
        query.pickup_city, query.destination_city, query.pickup_province, query.destination_province
    );
    println!("---");

    for (i, carrier) in carriers.iter().enumerate() {
        println!("\n{}. {}", i + 1, carrier.carrier_name());
        println!("   {}", summarize_lead(carrier));
        println!(
            "   Transport: {:.2} | Reliability: {:.2} | Cost: {:.2}",
            carrier.transport_score, carrier.reliability_score, carrier.cost_score
        );

        if explain {
            for explanation in explain_carrier(carrier) {
                println!(
                    "   - {} ({:+.2} of {:.0}): {}",
                    explanation.summary, explanation.points, explanation.max_points, explanation.detail
                );
            }
        }
    }

    println!("\n---");
    println!("Total: {} carriers", carriers.len());

    Ok(())
}

async fn run_lead(config: &AppConfig, secrets: &Secrets, lead: &Lead) -> Result<()> {
    let dataset = load_dataset(config)?;
    let ledger = load_ledger(config)?;
    let crm = crm_client(config, secrets)?;

    let outcome = process_lead(lead, &dataset, &config.scoring, &ledger, &crm).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn run_store_quote(config: &AppConfig, secrets: &Secrets, input: &Path) -> Result<()> {
    let request: NewQuote = read_json(input)?;
    let ledger = load_ledger(config)?;

    match secrets.slack_bot_token.as_deref() {
        Some(token) if !config.notify.channel.is_empty() => {
            let notifier = SlackNotifier::new(&config.notify.base_url, token, &config.notify.channel);
            store_and_notify(config, secrets, &ledger, request, &notifier).await
        }
        _ => store_and_notify(config, secrets, &ledger, request, &NullNotifier).await,
    }
}

async fn store_and_notify<N: Notifier>(
    config: &AppConfig,
    secrets: &Secrets,
    ledger: &QuoteLedger<MemoryQuoteStore>,
    request: NewQuote,
    notifier: &N,
) -> Result<()> {
    let carrier = request.carrier_name.clone().unwrap_or_default();
    let quotation_request_id = request.quotation_request_id.clone();
    let pickup_city = request.pickup_city.clone();
    let destination_city = request.destination_city.clone();

    let quote = match ledger.store_quote(request).await {
        Ok(quote) => quote,
        Err(e) => {
            tracing::error!(carrier = %carrier, pickup = %pickup_city, destination = %destination_city, error = %e, "Quote creation failed");
            let message = quote_failed_message(&carrier, &pickup_city, &destination_city, &e.to_string());
            if let Err(notify_err) = notifier.notify(&message).await {
                tracing::warn!(error = %notify_err, "Failed to send failure notification");
            }
            return Err(e.into());
        }
    };

    ledger
        .store()
        .persist(&config.data.quotes_path)
        .await
        .context("Failed to save quote snapshot")?;

    if let (Some(id), Ok(crm)) = (quotation_request_id, crm_client(config, secrets)) {
        if let Err(e) = crm
            .update_record(TRANSPORT_OFFERS_MODULE, &id, quotation_request_route(&quote))
            .await
        {
            tracing::warn!(error = %e, id = %id, "Failed to update quotation request");
        }
    }

    if let Err(e) = notifier.notify(&quote_added_message(&quote)).await {
        tracing::warn!(error = %e, "Failed to send quote notification");
    }

    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}

async fn run_update_quote(config: &AppConfig, input: &Path) -> Result<()> {
    let update: QuoteUpdate = read_json(input)?;
    let ledger = load_ledger(config)?;

    let quote = ledger.update_quote(update).await?;
    ledger
        .store()
        .persist(&config.data.quotes_path)
        .await
        .context("Failed to save quote snapshot")?;

    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}

async fn run_get_quote(config: &AppConfig, pickup_city: &str, dropoff_city: &str) -> Result<()> {
    let ledger = load_ledger(config)?;
    let quote = ledger.get_quote(pickup_city, dropoff_city).await?;
    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}

async fn run_health(config: &AppConfig, secrets: &Secrets) -> Result<()> {
    let crm = crm_client(config, secrets)?;
    print!("Checking {} CRM... ", crm.name());

    match crm.health_check().await {
        Ok(()) => {
            println!("OK");
            Ok(())
        }
        Err(e) => {
            println!("FAILED: {}", e);
            std::process::exit(1);
        }
    }
}
