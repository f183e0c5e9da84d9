// AgriMind Core Library
// Streaming farm-sensor enrichment pipeline runtime

pub mod consumer;
pub mod insight;
pub mod latest;
pub mod prompt;
pub mod query;
pub mod reasoning;
pub mod record;
pub mod store;
pub mod stream;

// Export core types
pub use consumer::{BatchOutcome, ConsumerConfig, EnrichmentConsumer, RecordOutcome};
pub use insight::{parse_insight, Insight, InsightRecord, FAILURE_SENTINEL};
pub use latest::latest_insight;
pub use reasoning::{InvokeFailure, ReasoningClient, ReasoningConfig};
pub use record::SensorRecord;
pub use store::{InsightStore, KeyEntry, MemoryInsightStore, RocksInsightStore};
pub use stream::{ChannelSource, StreamEvent, StreamRecord, StreamSource};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgriMindError {
    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Reasoning error: {0}")]
    ReasoningError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, AgriMindError>;
