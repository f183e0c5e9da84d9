// Durable insight storage: object-store semantics over pluggable backends

mod memory;
mod rocks;

pub use memory::MemoryInsightStore;
pub use rocks::RocksInsightStore;

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::insight::InsightRecord;
use crate::Result;

/// Root prefix all insight objects live under.
pub const INSIGHT_PREFIX: &str = "insights/";

/// One listing entry: object key plus last write time (epoch millis).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    pub key: String,
    pub last_modified_ms: i64,
}

/// Stored envelope: the record plus its write time, so listings can report
/// last-modified without a second lookup per key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredInsight {
    pub written_at_ms: i64,
    pub record: InsightRecord,
}

/// Append-only object store for insight records.
///
/// Writes go to fresh keys only; the pipeline never updates or deletes.
/// Concurrent writers need no coordination because every key is generated
/// collision-free.
#[async_trait]
pub trait InsightStore: Send + Sync {
    /// Write `record` under a fresh key scoped to `entity_id` and return
    /// that key. Never overwrites an existing key.
    async fn put(&self, entity_id: &str, record: &InsightRecord) -> Result<String>;

    /// Fetch one record. `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<InsightRecord>>;

    /// List all keys under `prefix` with their last write times, in no
    /// particular order. An empty listing is a normal result, not an
    /// error.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<KeyEntry>>;
}

static KEY_SEQ: AtomicU64 = AtomicU64::new(0);

/// Fresh object key for one entity:
/// `insights/{entity}-{millis}-{seq}.json`.
///
/// The process-wide sequence keeps keys collision-free within one
/// millisecond; lexical order of the token tracks write order.
pub(crate) fn insight_key(entity_id: &str, written_at_ms: i64) -> String {
    let seq = KEY_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{INSIGHT_PREFIX}{entity_id}-{written_at_ms}-{seq:06}.json")
}

/// Listing prefix covering one entity's insight objects. The trailing
/// dash keeps `FARM_1` from matching `FARM_10`.
pub fn entity_prefix(entity_id: &str) -> String {
    format!("{INSIGHT_PREFIX}{entity_id}-")
}
