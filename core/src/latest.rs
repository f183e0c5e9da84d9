// Latest-insight selection

use tracing::debug;

use crate::insight::InsightRecord;
use crate::store::{entity_prefix, InsightStore};
use crate::Result;

/// Resolve the most recently written insight record for one entity, or
/// `None` when the entity has no records yet.
///
/// Full prefix scan: lists every key for the entity and takes the maximum
/// write time, independent of listing order. Ties break on the key so the
/// pick is stable. Fine at prototype scale; a high-volume deployment
/// would want a latest-pointer object instead of the scan.
pub async fn latest_insight(
    store: &dyn InsightStore,
    entity_id: &str,
) -> Result<Option<InsightRecord>> {
    let prefix = entity_prefix(entity_id);
    let entries = store.list_keys(&prefix).await?;

    let Some(newest) = entries.into_iter().max_by(|a, b| {
        (a.last_modified_ms, a.key.as_str()).cmp(&(b.last_modified_ms, b.key.as_str()))
    }) else {
        debug!(target: "store", entity = %entity_id, "no insight records for entity");
        return Ok(None);
    };

    store.get(&newest.key).await
}
