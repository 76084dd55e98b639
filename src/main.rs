mod analyzer;
mod config;
mod gateway;
mod model;
mod normalizer;
mod storage;

use analyzer::{FareAggregator, SearchSettings};
use chrono::{NaiveDate, Utc};
use config::{load_config, AppConfig, RouteConfig, StoreConfig};
use futures::future::join_all;
use gateway::AmadeusGateway;
use model::{ListEntry, StorageError};
use std::sync::Arc;
use storage::{CsvFareLog, FareStore, SqliteFareStore};
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    // Credentials may come from a local .env file.
    dotenv::dotenv().ok();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config: Arc<AppConfig> = match load_config(&config_path) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error ({}): {}", config_path, e);
            return;
        }
    };

    let gateway = match AmadeusGateway::new(&config.provider) {
        Ok(g) => Arc::new(g),
        Err(e) => {
            error!("Failed to initialize search gateway: {}", e);
            return;
        }
    };

    let store = match open_store(&config.store) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            return;
        }
    };

    let aggregator = FareAggregator::new(
        gateway,
        store,
        SearchSettings {
            currency: config.currency.clone(),
            max_results: config.max_results,
        },
    );

    info!(
        "🚀 FareSniper started: {} routes, {:?} host, prices in {}",
        config.routes.len(),
        config.provider.hostname,
        config.currency
    );
    if config.routes.is_empty() {
        warn!("No routes configured, nothing to track.");
        return;
    }

    loop {
        let today = Utc::now().date_naive();
        let tasks: Vec<_> = config
            .routes
            .iter()
            .map(|route| process_route(route, &aggregator, today))
            .collect();
        join_all(tasks).await;

        if config.check_interval_seconds == 0 {
            info!("Single pass finished.");
            break;
        }
        info!("Waiting {}s for the next check...", config.check_interval_seconds);
        sleep(Duration::from_secs(config.check_interval_seconds)).await;
    }
}

fn open_store(store: &StoreConfig) -> Result<Arc<dyn FareStore>, StorageError> {
    match store {
        StoreConfig::Csv { data_dir } => {
            info!("Writing fare logs to {}", data_dir.display());
            Ok(Arc::new(CsvFareLog::new(data_dir.clone())?))
        }
        StoreConfig::Sqlite { path } => {
            info!("Writing fare logs to SQLite database {}", path.display());
            Ok(Arc::new(SqliteFareStore::new(path)?))
        }
    }
}

/// Runs list mode (when enabled) and lowest-fare mode for one route.
async fn process_route(route: &RouteConfig, aggregator: &FareAggregator, today: NaiveDate) {
    let query = match route.to_query(today) {
        Ok(q) => q,
        Err(e) => {
            warn!("Skipping route {}: {}", route.label(), e);
            return;
        }
    };
    info!("✈️ Checking {} on {}", route.label(), query.travel_date);

    if route.list_offers {
        for (idx, entry) in aggregator.search(&query).await.iter().enumerate() {
            match entry {
                ListEntry::Offer(o) => info!(
                    "[{}] {}→{}  {} → {}  {}  {}  {}  {} {}{}",
                    idx + 1,
                    o.dep,
                    o.arr,
                    o.dep_time,
                    o.arr_time,
                    if o.stops == 0 { "nonstop".to_string() } else { format!("{} stop(s)", o.stops) },
                    o.duration,
                    o.flight_no,
                    o.price,
                    o.currency,
                    o.baggage.as_deref().map(|b| format!("  | {}", b)).unwrap_or_default()
                ),
                ListEntry::Error { message } => warn!("Flight offers search error: {}", message),
            }
        }
    }

    let fares = aggregator.search_lowest(&query).await;
    info!("Finished {}: {} airlines priced", route.label(), fares.len());
}
