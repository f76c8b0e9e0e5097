use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::Event;

/// Persistence-backed short-TTL cache for aggregated search results,
/// keyed by (city, category). Sits in front of the aggregator; it never
/// holds the seed corpus and freshness is enforced on read.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open_default() -> rusqlite::Result<Self> {
        let path = database_path();
        if let Some(parent) = path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                tracing::warn!(path = ?parent, error = %err, "failed to create cache dir");
            }
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS search_cache(
                city TEXT NOT NULL,
                category TEXT NOT NULL,
                payload TEXT NOT NULL,
                cached_at_utc TEXT NOT NULL,
                PRIMARY KEY (city, category)
            );",
        )?;
        Ok(())
    }

    /// Return the cached result set for (city, category) if it is younger
    /// than `max_age`; stale or missing entries read as `None`.
    pub fn get_fresh(
        &self,
        city: &str,
        category: &str,
        max_age: Duration,
    ) -> rusqlite::Result<Option<Vec<Event>>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT payload, cached_at_utc FROM search_cache
                 WHERE city = ?1 AND category = ?2",
                params![city, category],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (payload, cached_at) = match row {
            Some(found) => found,
            None => return Ok(None),
        };

        let cached_at = match DateTime::parse_from_rfc3339(&cached_at) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(_) => return Ok(None),
        };
        if Utc::now() - cached_at > max_age {
            return Ok(None);
        }

        let events: Vec<Event> = serde_json::from_str(&payload).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                payload.len(),
                rusqlite::types::Type::Text,
                Box::new(err),
            )
        })?;
        Ok(Some(events))
    }

    pub fn put(&self, city: &str, category: &str, events: &[Event]) -> rusqlite::Result<()> {
        let now = Utc::now().to_rfc3339();
        let payload = serde_json::to_string(events).expect("event serialization");
        self.conn.execute(
            "INSERT INTO search_cache (city, category, payload, cached_at_utc)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(city, category) DO UPDATE SET
               payload = excluded.payload,
               cached_at_utc = excluded.cached_at_utc",
            params![city, category, payload, now],
        )?;
        Ok(())
    }

    /// Drop entries older than `max_age`. Returns the number removed.
    pub fn purge_stale(&self, max_age: Duration) -> rusqlite::Result<usize> {
        let cutoff = (Utc::now() - max_age).to_rfc3339();
        self.conn.execute(
            "DELETE FROM search_cache WHERE cached_at_utc < ?1",
            params![cutoff],
        )
    }
}

fn database_path() -> PathBuf {
    let base = dirs::data_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    base.join("eventfan").join("eventfan.sqlite")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    #[test]
    fn fresh_entries_round_trip() {
        let store = Store::open_in_memory().expect("open store");
        let events = seed::all().to_vec();
        store.put("London", "Concerts", &events).expect("put");

        let cached = store
            .get_fresh("London", "Concerts", Duration::minutes(15))
            .expect("get")
            .expect("fresh hit");
        assert_eq!(cached.len(), events.len());
        assert_eq!(cached[0].id, events[0].id);
    }

    #[test]
    fn missing_key_reads_as_none() {
        let store = Store::open_in_memory().expect("open store");
        let cached = store
            .get_fresh("Berlin", "Sports", Duration::minutes(15))
            .expect("get");
        assert!(cached.is_none());
    }

    #[test]
    fn stale_entries_read_as_none() {
        let store = Store::open_in_memory().expect("open store");
        let stale_at = (Utc::now() - Duration::minutes(30)).to_rfc3339();
        store
            .conn
            .execute(
                "INSERT INTO search_cache (city, category, payload, cached_at_utc)
                 VALUES ('London', 'Concerts', '[]', ?1)",
                params![stale_at],
            )
            .expect("insert stale row");

        let cached = store
            .get_fresh("London", "Concerts", Duration::minutes(15))
            .expect("get");
        assert!(cached.is_none());

        assert_eq!(store.purge_stale(Duration::minutes(15)).expect("purge"), 1);
    }

    #[test]
    fn put_overwrites_the_existing_entry() {
        let store = Store::open_in_memory().expect("open store");
        let events = seed::all().to_vec();
        store.put("London", "", &events).expect("first put");
        store.put("London", "", &events[..2]).expect("second put");

        let cached = store
            .get_fresh("London", "", Duration::minutes(15))
            .expect("get")
            .expect("hit");
        assert_eq!(cached.len(), 2);
    }
}
