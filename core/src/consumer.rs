// Enrichment consumer: per-record pipeline over delivery batches

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::insight::{parse_insight, Insight, InsightRecord, FAILURE_SENTINEL};
use crate::prompt::build_agent_prompt;
use crate::reasoning::{enrichment_session, ReasoningClient};
use crate::record::SensorRecord;
use crate::store::InsightStore;
use crate::stream::{StreamEvent, StreamSource};

/// Consumer tuning knobs, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Records of one batch in flight at once (1 = sequential).
    pub concurrency: usize,
    /// Wall-clock bound for one whole batch; records still unprocessed at
    /// the deadline are reported as skipped.
    pub batch_deadline_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            concurrency: std::env::var("CONSUMER_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(4),
            batch_deadline_ms: std::env::var("BATCH_DEADLINE_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60_000),
        }
    }
}

/// Outcome of one record of a batch.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub entity_id: String,
    /// Store key when persistence succeeded; `None` when the write failed
    /// or the record was skipped.
    pub stored: Option<String>,
    pub insight: Insight,
    /// True when the batch deadline expired before this record finished.
    pub skipped: bool,
}

/// Outcome of one delivery batch. The batch as a whole succeeded iff
/// iteration over every record completed; individual failures are folded
/// into their own outcome, never surfaced as a batch error.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Per-record results, in delivery order.
    pub results: Vec<RecordOutcome>,
}

impl BatchOutcome {
    pub fn processed(&self) -> usize {
        self.results.iter().filter(|r| !r.skipped).count()
    }

    pub fn stored(&self) -> usize {
        self.results.iter().filter(|r| r.stored.is_some()).count()
    }
}

/// Orchestrates the per-record enrichment pipeline:
/// decode → prompt → invoke → degrade → parse → persist → report.
///
/// Records are independent; one record failing at any step never aborts
/// its siblings.
pub struct EnrichmentConsumer {
    reasoning: Arc<ReasoningClient>,
    store: Arc<dyn InsightStore>,
    cfg: ConsumerConfig,
}

impl EnrichmentConsumer {
    pub fn new(
        reasoning: Arc<ReasoningClient>,
        store: Arc<dyn InsightStore>,
        cfg: ConsumerConfig,
    ) -> Self {
        Self {
            reasoning,
            store,
            cfg,
        }
    }

    /// Poll the stream source until it closes, processing each batch.
    pub async fn run<S: StreamSource>(&self, mut source: S) -> crate::Result<()> {
        info!(target: "consumer", "enrichment consumer started");
        while let Some(batch) = source.next_batch().await? {
            let outcome = self.process_batch(batch).await;
            info!(
                target: "consumer",
                total = outcome.results.len(),
                processed = outcome.processed(),
                stored = outcome.stored(),
                "batch complete"
            );
        }
        info!(target: "consumer", "stream source closed; consumer stopping");
        Ok(())
    }

    /// Process one delivery batch, returning per-record outcomes in
    /// delivery order regardless of completion order.
    pub async fn process_batch(&self, batch: StreamEvent) -> BatchOutcome {
        let total = batch.records.len();
        info!(target: "consumer", records = total, "processing delivery batch");

        // Decode up front: cheap and synchronous, and the deadline path
        // needs entity ids even for records it never got to enrich.
        let readings: Vec<SensorRecord> = batch.records.iter().map(|r| r.decode()).collect();

        let limit = Arc::new(Semaphore::new(self.cfg.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for (idx, reading) in readings.iter().cloned().enumerate() {
            let limit = Arc::clone(&limit);
            let reasoning = Arc::clone(&self.reasoning);
            let store = Arc::clone(&self.store);
            tasks.spawn(async move {
                let _permit = match limit.acquire_owned().await {
                    Ok(permit) => permit,
                    // The semaphore is never closed while tasks run
                    Err(_) => return (idx, skipped_outcome(&reading)),
                };
                (idx, enrich_record(reading, &reasoning, store.as_ref()).await)
            });
        }

        let mut slots: Vec<Option<RecordOutcome>> = (0..total).map(|_| None).collect();
        let deadline = Duration::from_millis(self.cfg.batch_deadline_ms);
        let drain = async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((idx, outcome)) => slots[idx] = Some(outcome),
                    Err(e) => warn!(target: "consumer", error = %e, "enrichment task aborted"),
                }
            }
        };
        if tokio::time::timeout(deadline, drain).await.is_err() {
            warn!(
                target: "consumer",
                deadline_ms = self.cfg.batch_deadline_ms,
                "batch deadline expired; skipping unprocessed records"
            );
            tasks.abort_all();
        }

        let results = slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| slot.unwrap_or_else(|| skipped_outcome(&readings[idx])))
            .collect();
        BatchOutcome { results }
    }
}

/// The full per-record path after decoding. Every failure mode degrades
/// into the outcome instead of propagating.
async fn enrich_record(
    reading: SensorRecord,
    reasoning: &ReasoningClient,
    store: &dyn InsightStore,
) -> RecordOutcome {
    let entity_id = reading.entity_id().to_string();
    let prompt = build_agent_prompt(&reading);
    let session = enrichment_session(&entity_id);

    let agent_raw = match reasoning.invoke(&prompt, &session).await {
        Ok(text) if !text.is_empty() => text,
        Ok(_) => {
            warn!(target: "consumer", entity = %entity_id, "agent returned empty completion");
            FAILURE_SENTINEL.to_string()
        }
        Err(failure) => {
            warn!(target: "consumer", entity = %entity_id, error = %failure, "agent invocation failed");
            FAILURE_SENTINEL.to_string()
        }
    };

    let insight = parse_insight(&agent_raw);
    let record = InsightRecord {
        sensor: reading,
        insight: insight.clone(),
        agent_raw,
    };

    let stored = match store.put(&entity_id, &record).await {
        Ok(key) => Some(key),
        Err(e) => {
            warn!(
                target: "consumer",
                entity = %entity_id,
                error = %e,
                "insight write failed; record not persisted"
            );
            None
        }
    };

    RecordOutcome {
        entity_id,
        stored,
        insight,
        skipped: false,
    }
}

fn skipped_outcome(reading: &SensorRecord) -> RecordOutcome {
    RecordOutcome {
        entity_id: reading.entity_id().to_string(),
        stored: None,
        insight: parse_insight(FAILURE_SENTINEL),
        skipped: true,
    }
}
