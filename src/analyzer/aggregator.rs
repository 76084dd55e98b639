use crate::analyzer::lowest_fare::lowest_per_carrier;
use crate::gateway::{RawOffer, SearchGateway};
use crate::model::{FareQuery, ListEntry, NormalizedFare, OfferQuery};
use crate::normalizer::{carrier_code, normalize_fare, parse_offer, summarize_offer};
use crate::storage::{FareStore, LogKey};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Provider settings shared by every query.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Settlement currency, so prices in one response are comparable.
    pub currency: String,
    pub max_results: u32,
}

pub struct FareAggregator {
    gateway: Arc<dyn SearchGateway>,
    store: Arc<dyn FareStore>,
    settings: SearchSettings,
}

impl FareAggregator {
    pub fn new(gateway: Arc<dyn SearchGateway>, store: Arc<dyn FareStore>, settings: SearchSettings) -> Self {
        Self {
            gateway,
            store,
            settings,
        }
    }

    pub fn offer_query(&self, query: &FareQuery) -> OfferQuery {
        OfferQuery {
            origin: query.origin.clone(),
            destination: query.destination.clone(),
            departure_date: query.travel_date,
            adults: query.adults,
            currency: self.settings.currency.clone(),
            max: self.settings.max_results,
            included_airline: query.airline.clone(),
        }
    }

    /// List mode: every offer in provider order, nothing persisted. A provider
    /// failure comes back as a single error entry.
    pub async fn search(&self, query: &FareQuery) -> Vec<ListEntry> {
        let values = match self.gateway.search_offers(&self.offer_query(query)).await {
            Ok(values) => values,
            Err(e) => {
                warn!("❌ Offer search failed for {}-{}: {}", query.origin, query.destination, e);
                return vec![ListEntry::Error { message: e.to_string() }];
            }
        };
        info!("📦 [offers] {} offers for {}-{}", values.len(), query.origin, query.destination);

        parse_batch(&values)
            .iter()
            .filter_map(|offer| match summarize_offer(offer) {
                Ok(summary) => Some(ListEntry::Offer(summary)),
                Err(e) => {
                    warn!("Skipping offer: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Lowest-fare mode: cheapest offer per airline, sorted by airline code and
    /// appended to the store. Provider failures yield an empty list.
    pub async fn search_lowest(&self, query: &FareQuery) -> Vec<NormalizedFare> {
        let values = match self.gateway.search_offers(&self.offer_query(query)).await {
            Ok(values) => values,
            Err(e) => {
                warn!("❌ Lowest-fare search failed for {}-{}: {}", query.origin, query.destination, e);
                return Vec::new();
            }
        };
        if values.is_empty() {
            info!("ℹ️ [lowest] No offers for {}-{} on {}", query.origin, query.destination, query.travel_date);
            return Vec::new();
        }

        let collected_at = Utc::now();
        let offers = parse_batch(&values);
        let fares = offers
            .iter()
            .filter(|offer| matches_airline(offer, query.airline.as_deref()))
            .filter_map(|offer| match normalize_fare(offer, query, collected_at) {
                Ok(fare) => Some(fare),
                Err(e) => {
                    warn!("Skipping offer: {}", e);
                    None
                }
            });
        let lowest = lowest_per_carrier(fares);

        for fare in &lowest {
            if let Err(e) = self.store.append(&LogKey::of(fare), fare) {
                warn!("❌ [lowest] Failed to store {} fare: {}", fare.airline, e);
            } else {
                info!("💰 [lowest] {}: {:.0} {} saved", fare.airline, fare.price, fare.currency);
            }
        }

        lowest
    }
}

fn parse_batch(values: &[Value]) -> Vec<RawOffer> {
    values
        .iter()
        .filter_map(|value| match parse_offer(value) {
            Ok(offer) => Some(offer),
            Err(e) => {
                warn!("Skipping offer: {}", e);
                None
            }
        })
        .collect()
}

/// The provider may ignore an unsupported airline filter, so it is enforced here too.
/// The filter is a comma-separated list of carrier codes, as the provider accepts.
fn matches_airline(offer: &RawOffer, airline: Option<&str>) -> bool {
    let Some(filter) = airline else {
        return true;
    };
    let Ok(carrier) = carrier_code(offer) else {
        return false;
    };
    filter
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .any(|code| carrier.eq_ignore_ascii_case(code))
}
