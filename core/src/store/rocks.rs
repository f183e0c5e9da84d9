// RocksDB-backed insight store

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{Options, DB};
use tracing::{debug, info};

use super::{insight_key, InsightStore, KeyEntry, StoredInsight};
use crate::insight::InsightRecord;
use crate::{AgriMindError, Result};

/// Durable insight store on RocksDB. Values are JSON-encoded
/// [`StoredInsight`] envelopes keyed by the full object key.
pub struct RocksInsightStore {
    db: DB,
}

impl RocksInsightStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path).map_err(|e| AgriMindError::StoreError(e.to_string()))?;

        info!(target: "store", "insight store opened");
        Ok(Self { db })
    }
}

#[async_trait]
impl InsightStore for RocksInsightStore {
    async fn put(&self, entity_id: &str, record: &InsightRecord) -> Result<String> {
        let written_at_ms = Utc::now().timestamp_millis();
        let key = insight_key(entity_id, written_at_ms);
        let stored = StoredInsight {
            written_at_ms,
            record: record.clone(),
        };
        let serialized = serde_json::to_vec(&stored)?;
        self.db
            .put(key.as_bytes(), serialized)
            .map_err(|e| AgriMindError::StoreError(e.to_string()))?;
        debug!(target: "store", %key, "wrote insight record");
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Option<InsightRecord>> {
        match self.db.get(key.as_bytes()) {
            Ok(Some(data)) => {
                let stored: StoredInsight = serde_json::from_slice(&data)?;
                Ok(Some(stored.record))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(AgriMindError::StoreError(e.to_string())),
        }
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<KeyEntry>> {
        let mut entries = Vec::new();
        for item in self.db.prefix_iterator(prefix.as_bytes()) {
            let (key, value) = item.map_err(|e| AgriMindError::StoreError(e.to_string()))?;
            // prefix_iterator seeks to the prefix but runs to the end of
            // the keyspace without an extractor configured
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let stored: StoredInsight = serde_json::from_slice(&value)?;
            entries.push(KeyEntry {
                key: String::from_utf8_lossy(&key).into_owned(),
                last_modified_ms: stored.written_at_ms,
            });
        }
        Ok(entries)
    }
}
