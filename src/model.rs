// Core structs: FareQuery, NormalizedFare, OfferSummary, ListEntry and error types
use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// One user search: route, date, passengers and an optional carrier filter.
#[derive(Debug, Clone)]
pub struct FareQuery {
    pub origin: String,
    pub destination: String,
    pub travel_date: NaiveDate,
    pub adults: u32,
    pub airline: Option<String>,
}

/// Parameters sent to the search provider for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferQuery {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub adults: u32,
    pub currency: String,
    pub max: u32,
    pub included_airline: Option<String>,
}

/// Cheapest offer of one carrier, flattened for persistence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedFare {
    pub collected_at: DateTime<Utc>,
    pub travel_date: NaiveDate,
    pub origin: String,
    pub destination: String,
    pub airline: String,
    pub flight_no: String,
    /// Provider timestamps, passed through as sent.
    pub dep_time: String,
    pub arr_time: String,
    pub stops: u32,
    pub duration: String,
    pub price: f64,
    pub currency: String,
}

/// Display row for list mode. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferSummary {
    pub price: f64,
    pub currency: String,
    pub dep: String,
    pub arr: String,
    pub dep_time: String,
    pub arr_time: String,
    pub airline: String,
    pub flight_no: String,
    pub stops: u32,
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baggage: Option<String>,
}

pub const SEARCH_ERROR_KEY: &str = "Flight offers Search error";

/// One list-mode result: an offer or the provider failure rendered inline.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEntry {
    Offer(OfferSummary),
    Error { message: String },
}

impl Serialize for ListEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ListEntry::Offer(summary) => summary.serialize(serializer),
            ListEntry::Error { message } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(SEARCH_ERROR_KEY, message)?;
                map.end()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{message}")]
    Provider { status: u16, message: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("unexpected provider response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("malformed offer: {0}")]
    MalformedOffer(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_entry_serializes_with_provider_key() {
        let entry = ListEntry::Error {
            message: "Invalid IATA code".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "Flight offers Search error": "Invalid IATA code" })
        );
    }

    #[test]
    fn provider_error_displays_bare_message() {
        let err = GatewayError::Provider {
            status: 400,
            message: "Invalid IATA code".into(),
        };
        assert_eq!(err.to_string(), "Invalid IATA code");
    }
}
