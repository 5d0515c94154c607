//! Three-tier response cache keyed by the exact query text.

use std::{collections::HashMap, hash::Hasher, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::{Mutex, RwLock};
use twox_hash::XxHash64;

use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CacheTier {
    /// Lives for one question resolution.
    Ephemeral,
    /// Lives until the base play area changes.
    Zone,
    /// Boundaries and coastlines; survives restarts when backed by a file.
    Permanent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub body: String,
    /// False when the body is an error message from a failed lookup.
    pub ok: bool,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn success(body: String) -> Self {
        CacheEntry {
            body,
            ok: true,
            stored_at: Utc::now(),
        }
    }

    pub fn failure(message: String) -> Self {
        CacheEntry {
            body: message,
            ok: false,
            stored_at: Utc::now(),
        }
    }
}

type MemoryTier = RwLock<HashMap<String, CacheEntry>>;

enum PermanentStore {
    Memory(MemoryTier),
    Sqlite(Mutex<Connection>),
}

fn key_hash(key: &str) -> i64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(key.as_bytes());
    hasher.finish() as i64
}

impl PermanentStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, GatewayError> {
        match self {
            PermanentStore::Memory(map) => Ok(map.read().await.get(key).cloned()),
            PermanentStore::Sqlite(conn) => {
                let conn = conn.lock().await;
                let row = conn
                    .query_row(
                        "SELECT body, ok, stored_at FROM responses WHERE key_hash = ?1 AND key = ?2",
                        params![key_hash(key), key],
                        |row| {
                            Ok(CacheEntry {
                                body: row.get(0)?,
                                ok: row.get(1)?,
                                stored_at: row.get(2)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(row)
            }
        }
    }

    async fn put(&self, key: &str, entry: CacheEntry) -> Result<(), GatewayError> {
        match self {
            PermanentStore::Memory(map) => {
                map.write().await.insert(key.to_string(), entry);
            }
            PermanentStore::Sqlite(conn) => {
                conn.lock().await.execute(
                    "INSERT OR REPLACE INTO responses (key_hash, key, body, ok, stored_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![key_hash(key), key, entry.body, entry.ok, entry.stored_at],
                )?;
            }
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), GatewayError> {
        match self {
            PermanentStore::Memory(map) => {
                map.write().await.remove(key);
            }
            PermanentStore::Sqlite(conn) => {
                conn.lock().await.execute(
                    "DELETE FROM responses WHERE key_hash = ?1 AND key = ?2",
                    params![key_hash(key), key],
                )?;
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), GatewayError> {
        match self {
            PermanentStore::Memory(map) => map.write().await.clear(),
            PermanentStore::Sqlite(conn) => {
                conn.lock().await.execute("DELETE FROM responses", [])?;
            }
        }
        Ok(())
    }
}

pub struct TieredCache {
    ephemeral: MemoryTier,
    zone: MemoryTier,
    permanent: PermanentStore,
}

impl Default for TieredCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl TieredCache {
    pub fn in_memory() -> Self {
        TieredCache {
            ephemeral: RwLock::default(),
            zone: RwLock::default(),
            permanent: PermanentStore::Memory(RwLock::default()),
        }
    }

    /// Back the permanent tier with an SQLite file, creating it if needed.
    pub fn with_permanent_file(path: &Path) -> Result<Self, GatewayError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS responses (
                key_hash  INTEGER NOT NULL,
                key       TEXT NOT NULL,
                body      TEXT NOT NULL,
                ok        INTEGER NOT NULL,
                stored_at TEXT NOT NULL,
                PRIMARY KEY (key_hash, key)
            );",
        )?;
        tracing::info!(path = %path.display(), "opened permanent response cache");

        Ok(TieredCache {
            ephemeral: RwLock::default(),
            zone: RwLock::default(),
            permanent: PermanentStore::Sqlite(Mutex::new(conn)),
        })
    }

    fn memory(&self, tier: CacheTier) -> Option<&MemoryTier> {
        match tier {
            CacheTier::Ephemeral => Some(&self.ephemeral),
            CacheTier::Zone => Some(&self.zone),
            CacheTier::Permanent => match &self.permanent {
                PermanentStore::Memory(map) => Some(map),
                PermanentStore::Sqlite(_) => None,
            },
        }
    }

    /// A usable entry, if any. Failed entries are evicted and read as a miss.
    pub async fn get(&self, tier: CacheTier, key: &str) -> Result<Option<CacheEntry>, GatewayError> {
        let entry = match self.memory(tier) {
            Some(map) => map.read().await.get(key).cloned(),
            None => self.permanent.get(key).await?,
        };

        match entry {
            Some(entry) if !entry.ok => {
                tracing::debug!(%tier, "evicting failed cache entry");
                self.remove(tier, key).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    pub async fn put(&self, tier: CacheTier, key: &str, entry: CacheEntry) -> Result<(), GatewayError> {
        match self.memory(tier) {
            Some(map) => {
                map.write().await.insert(key.to_string(), entry);
                Ok(())
            }
            None => self.permanent.put(key, entry).await,
        }
    }

    pub async fn remove(&self, tier: CacheTier, key: &str) -> Result<(), GatewayError> {
        match self.memory(tier) {
            Some(map) => {
                map.write().await.remove(key);
                Ok(())
            }
            None => self.permanent.remove(key).await,
        }
    }

    pub async fn invalidate(&self, tier: CacheTier) -> Result<(), GatewayError> {
        tracing::debug!(%tier, "invalidating cache tier");
        match self.memory(tier) {
            Some(map) => {
                map.write().await.clear();
                Ok(())
            }
            None => self.permanent.clear().await,
        }
    }

    /// The play area changed; zone-scoped responses no longer apply.
    pub async fn on_boundary_changed(&self) -> Result<(), GatewayError> {
        self.invalidate(CacheTier::Zone).await
    }

    pub async fn len(&self, tier: CacheTier) -> usize {
        match self.memory(tier) {
            Some(map) => map.read().await.len(),
            None => match &self.permanent {
                PermanentStore::Sqlite(conn) => conn
                    .lock()
                    .await
                    .query_row("SELECT COUNT(*) FROM responses", [], |row| row.get::<_, i64>(0))
                    .map(|n| n as usize)
                    .unwrap_or(0),
                PermanentStore::Memory(_) => 0,
            },
        }
    }
}
