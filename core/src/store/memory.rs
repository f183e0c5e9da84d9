// In-memory insight store

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use super::{insight_key, InsightStore, KeyEntry, StoredInsight};
use crate::insight::InsightRecord;
use crate::Result;

/// In-memory insight store for tests and demos.
///
/// Iteration order over entries is arbitrary, which is exactly the
/// no-ordering guarantee the listing contract gives callers.
#[derive(Default)]
pub struct MemoryInsightStore {
    objects: DashMap<String, StoredInsight>,
}

impl MemoryInsightStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl InsightStore for MemoryInsightStore {
    async fn put(&self, entity_id: &str, record: &InsightRecord) -> Result<String> {
        let written_at_ms = Utc::now().timestamp_millis();
        let key = insight_key(entity_id, written_at_ms);
        self.objects.insert(
            key.clone(),
            StoredInsight {
                written_at_ms,
                record: record.clone(),
            },
        );
        debug!(target: "store", %key, "wrote insight record");
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Option<InsightRecord>> {
        Ok(self.objects.get(key).map(|entry| entry.record.clone()))
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<KeyEntry>> {
        Ok(self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| KeyEntry {
                key: entry.key().clone(),
                last_modified_ms: entry.written_at_ms,
            })
            .collect())
    }
}
