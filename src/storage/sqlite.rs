use crate::model::{NormalizedFare, StorageError};
use crate::storage::{format_collected_at, FareStore, LogKey};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// All fare logs in one table; the (origin, dest, airline) columns pick the log.
pub struct SqliteFareStore {
    conn: Mutex<Connection>,
}

impl SqliteFareStore {
    /// Opens the database and creates the log table if needed.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open(db_path)?)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS fare_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collected_at_utc TEXT NOT NULL,
                travel_date TEXT NOT NULL,
                origin TEXT NOT NULL,
                dest TEXT NOT NULL,
                airline TEXT NOT NULL,
                flight_no TEXT NOT NULL,
                dep_time TEXT NOT NULL,
                arr_time TEXT NOT NULL,
                stops INTEGER NOT NULL,
                duration TEXT NOT NULL DEFAULT '',
                price REAL NOT NULL,
                currency TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_fare_log_key ON fare_log (origin, dest, airline);
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl FareStore for SqliteFareStore {
    /// Plain INSERT: rows for a key only ever accumulate.
    fn append(&self, key: &LogKey, fare: &NormalizedFare) -> Result<(), StorageError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT INTO fare_log (
                collected_at_utc, travel_date, origin, dest, airline, flight_no,
                dep_time, arr_time, stops, duration, price, currency
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                format_collected_at(fare),
                fare.travel_date.format("%Y-%m-%d").to_string(),
                &key.origin,
                &key.destination,
                &key.airline,
                &fare.flight_no,
                &fare.dep_time,
                &fare.arr_time,
                fare.stops,
                &fare.duration,
                fare.price,
                &fare.currency,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fixtures::fare;

    fn prices_for(store: &SqliteFareStore, key: &LogKey) -> Vec<f64> {
        let conn = store.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT price FROM fare_log WHERE origin = ?1 AND dest = ?2 AND airline = ?3 ORDER BY id")
            .unwrap();
        let prices = stmt
            .query_map(params![key.origin, key.destination, key.airline], |row| row.get::<_, f64>(0))
            .unwrap()
            .collect::<Result<Vec<f64>, _>>()
            .unwrap();
        prices
    }

    #[test]
    fn appends_never_replace_existing_rows() {
        let store = SqliteFareStore::in_memory().unwrap();
        let first = fare("KE", 150000.0);
        let key = LogKey::of(&first);

        store.append(&key, &first).unwrap();
        store.append(&key, &fare("KE", 120000.0)).unwrap();
        store.append(&key, &first).unwrap();

        assert_eq!(prices_for(&store, &key), vec![150000.0, 120000.0, 150000.0]);
    }

    #[test]
    fn keys_are_kept_apart() {
        let store = SqliteFareStore::in_memory().unwrap();
        let ke = fare("KE", 1.0);
        let oz = fare("OZ", 2.0);
        store.append(&LogKey::of(&ke), &ke).unwrap();
        store.append(&LogKey::of(&oz), &oz).unwrap();

        assert_eq!(prices_for(&store, &LogKey::of(&ke)), vec![1.0]);
        assert_eq!(prices_for(&store, &LogKey::of(&oz)), vec![2.0]);
    }

    #[test]
    fn reopening_keeps_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fares.db");
        let f = fare("KE", 1.0);
        let key = LogKey::of(&f);

        SqliteFareStore::new(&path).unwrap().append(&key, &f).unwrap();
        let reopened = SqliteFareStore::new(&path).unwrap();
        reopened.append(&key, &f).unwrap();

        assert_eq!(prices_for(&reopened, &key).len(), 2);
    }
}
