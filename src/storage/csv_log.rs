use crate::model::{NormalizedFare, StorageError};
use crate::storage::{format_collected_at, format_price, FareStore, LogKey, COLUMNS};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// One CSV file per (origin, destination, airline) under `data_dir`.
pub struct CsvFareLog {
    data_dir: PathBuf,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl CsvFareLog {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn path_for(&self, key: &LogKey) -> PathBuf {
        self.data_dir.join(format!(
            "prices_{}-{}_{}.csv",
            key.origin.to_lowercase(),
            key.destination.to_lowercase(),
            key.airline.to_lowercase()
        ))
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(path.to_path_buf()).or_default().clone()
    }
}

impl FareStore for CsvFareLog {
    fn append(&self, key: &LogKey, fare: &NormalizedFare) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let lock = self.lock_for(&path);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        // An empty file (new, or left behind by a failed write) still needs its header.
        let mut content = String::new();
        if file.metadata()?.len() == 0 {
            content.push_str(&format_line(COLUMNS.iter().copied()));
            info!("📁 Starting fare log {}", path.display());
        }
        content.push_str(&format_row(fare));
        file.write_all(content.as_bytes())?;

        debug!("Appended {} {:.0} {} to {}", fare.airline, fare.price, fare.currency, path.display());
        Ok(())
    }
}

fn format_row(fare: &NormalizedFare) -> String {
    let fields = [
        format_collected_at(fare),
        fare.travel_date.format("%Y-%m-%d").to_string(),
        fare.origin.clone(),
        fare.destination.clone(),
        fare.airline.clone(),
        fare.flight_no.clone(),
        fare.dep_time.clone(),
        fare.arr_time.clone(),
        fare.stops.to_string(),
        fare.duration.clone(),
        format_price(fare.price),
        fare.currency.clone(),
    ];
    format_line(fields.iter().map(String::as_str))
}

fn format_line<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    let mut line = fields.map(escape_field).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
