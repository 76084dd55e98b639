pub mod csv_log;
pub mod sqlite;

pub use csv_log::CsvFareLog;
pub use sqlite::SqliteFareStore;

use crate::model::{NormalizedFare, StorageError};

/// Identifies one append-only fare log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogKey {
    pub origin: String,
    pub destination: String,
    pub airline: String,
}

impl LogKey {
    pub fn of(fare: &NormalizedFare) -> Self {
        Self {
            origin: fare.origin.clone(),
            destination: fare.destination.clone(),
            airline: fare.airline.clone(),
        }
    }
}

/// Append-only sink for aggregated fares. Implementations never rewrite,
/// deduplicate or delete rows already written.
pub trait FareStore: Send + Sync {
    fn append(&self, key: &LogKey, fare: &NormalizedFare) -> Result<(), StorageError>;
}

/// Column order shared by every backend.
pub const COLUMNS: [&str; 12] = [
    "collected_at_utc",
    "travel_date",
    "origin",
    "dest",
    "airline",
    "flight_no",
    "dep_time",
    "arr_time",
    "stops",
    "duration",
    "price",
    "currency",
];

pub(crate) fn format_collected_at(fare: &NormalizedFare) -> String {
    fare.collected_at
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, false)
}

/// Whole amounts keep one decimal (`120000.0`) so rows line up with logs
/// written by earlier tools; other amounts use the shortest exact form.
pub(crate) fn format_price(price: f64) -> String {
    if price.fract() == 0.0 && price.abs() < 1e15 {
        format!("{:.1}", price)
    } else {
        price.to_string()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::model::NormalizedFare;
    use chrono::{NaiveDate, TimeZone, Utc};

    pub fn fare(airline: &str, price: f64) -> NormalizedFare {
        NormalizedFare {
            collected_at: Utc.with_ymd_and_hms(2026, 10, 16, 3, 0, 0).unwrap(),
            travel_date: NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
            origin: "ICN".into(),
            destination: "NRT".into(),
            airline: airline.into(),
            flight_no: format!("{}101", airline),
            dep_time: "2026-11-03T09:00:00".into(),
            arr_time: "2026-11-03T11:20:00".into(),
            stops: 0,
            duration: "PT2H20M".into(),
            price,
            currency: "KRW".into(),
        }
    }
}
