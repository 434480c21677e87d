use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Persistent key/value store (the L2 tier).
///
/// A single sqlite table of JSON payloads with per-row expiry. Survives
/// restarts so a warm container does not hammer the providers on boot.
/// Every failure is non-fatal: reads come back `None`, writes are skipped,
/// both at debug log level — a broken disk cache degrades to L1-only.
pub struct DiskCache {
    conn: Mutex<Connection>,
    max_entries: usize,
}

const DEFAULT_MAX_ENTRIES: usize = 10_000;

impl DiskCache {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                 key        TEXT PRIMARY KEY,
                 value      TEXT NOT NULL,
                 expires_at INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS kv_expires_at ON kv (expires_at);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            max_entries: DEFAULT_MAX_ENTRIES,
        })
    }

    /// In-memory variant for tests and cache-less deployments.
    pub fn open_ephemeral() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                 key        TEXT PRIMARY KEY,
                 value      TEXT NOT NULL,
                 expires_at INTEGER NOT NULL
             );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            max_entries: DEFAULT_MAX_ENTRIES,
        })
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = chrono::Utc::now().timestamp();
        let conn = self.conn.lock();

        let row: Result<(String, i64), _> = conn.query_row(
            "SELECT value, expires_at FROM kv WHERE key = ?1",
            params![key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        );

        match row {
            Ok((payload, expires_at)) => {
                if expires_at < now {
                    let _ = conn.execute("DELETE FROM kv WHERE key = ?1", params![key]);
                    return None;
                }
                match serde_json::from_str(&payload) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::debug!("disk cache payload for {key} unreadable: {e}");
                        None
                    }
                }
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                tracing::debug!("disk cache read failed for {key}: {e}");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!("disk cache serialize failed for {key}: {e}");
                return;
            }
        };
        let now = chrono::Utc::now().timestamp();
        let expires_at = now + ttl.as_secs() as i64;

        let conn = self.conn.lock();
        if let Err(e) = conn.execute(
            "INSERT OR REPLACE INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)",
            params![key, payload, expires_at],
        ) {
            tracing::debug!("disk cache write failed for {key}: {e}");
            return;
        }

        // Keep the store bounded: drop expired rows, then the soonest-to-
        // expire overflow.
        let _ = conn.execute("DELETE FROM kv WHERE expires_at < ?1", params![now]);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))
            .unwrap_or(0);
        if count as usize > self.max_entries {
            let overflow = count as usize - self.max_entries;
            let _ = conn.execute(
                "DELETE FROM kv WHERE key IN (
                     SELECT key FROM kv ORDER BY expires_at ASC LIMIT ?1
                 )",
                params![overflow as i64],
            );
        }
    }

    pub fn remove(&self, key: &str) {
        let conn = self.conn.lock();
        let _ = conn.execute("DELETE FROM kv WHERE key = ?1", params![key]);
    }

    pub fn clear(&self) {
        let conn = self.conn.lock();
        if let Err(e) = conn.execute("DELETE FROM kv", []) {
            tracing::debug!("disk cache clear failed: {e}");
        }
    }

    pub fn len(&self) -> usize {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        ticker: String,
        value: f64,
    }

    fn payload(v: f64) -> Payload {
        Payload {
            ticker: "AAPL".to_string(),
            value: v,
        }
    }

    #[test]
    fn set_then_get_round_trips() {
        let cache = DiskCache::open_ephemeral().unwrap();
        cache.set("signals:AAPL", &payload(1.5), Duration::from_secs(60));
        assert_eq!(cache.get::<Payload>("signals:AAPL"), Some(payload(1.5)));
        assert_eq!(cache.get::<Payload>("signals:MSFT"), None);
    }

    #[test]
    fn survives_reopen_on_the_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        {
            let cache = DiskCache::open(&path).unwrap();
            cache.set("signals:AAPL", &payload(2.0), Duration::from_secs(60));
        }
        let cache = DiskCache::open(&path).unwrap();
        assert_eq!(cache.get::<Payload>("signals:AAPL"), Some(payload(2.0)));
    }

    #[test]
    fn expired_rows_read_as_missing() {
        let cache = DiskCache::open_ephemeral().unwrap();
        cache.set("signals:AAPL", &payload(1.0), Duration::from_secs(0));
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(cache.get::<Payload>("signals:AAPL"), None);
    }

    #[test]
    fn clear_removes_everything() {
        let cache = DiskCache::open_ephemeral().unwrap();
        cache.set("a", &payload(1.0), Duration::from_secs(60));
        cache.set("b", &payload(2.0), Duration::from_secs(60));
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn mismatched_payload_reads_as_missing() {
        let cache = DiskCache::open_ephemeral().unwrap();
        cache.set("k", &"just a string", Duration::from_secs(60));
        assert_eq!(cache.get::<Payload>("k"), None);
    }
}
