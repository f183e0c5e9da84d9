// Stream transport boundary
//
// Batches of opaque records arrive from an ordered, partitioned,
// at-least-once delivery channel. Depending on the delivery path a record
// wraps its payload in one of two envelope shapes: a nested `kinesis.data`
// field carrying base64-encoded JSON, or a flat `body` field carrying a
// JSON string. That distinction is resolved here and never leaks further.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::record::SensorRecord;
use crate::{AgriMindError, Result};

/// One delivery batch from the stream transport.
///
/// Ordering across records is delivery order within this batch only; no
/// global order across shards is assumed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(default, rename = "Records")]
    pub records: Vec<StreamRecord>,
}

/// One record as delivered by the stream transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Nested envelope shape: base64-encoded JSON under `kinesis.data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinesis: Option<KinesisPayload>,

    /// Flat envelope shape: the reading as a JSON string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KinesisPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl StreamRecord {
    /// Wrap a reading in the nested envelope shape, the one the transport
    /// normally delivers. Used by producers and tests.
    pub fn wrap(reading: &SensorRecord) -> Result<Self> {
        let raw = serde_json::to_vec(reading)?;
        Ok(Self {
            kinesis: Some(KinesisPayload {
                data: Some(BASE64.encode(raw)),
            }),
            body: None,
        })
    }

    /// Wrap a reading in the flat `body` envelope shape.
    pub fn wrap_flat(reading: &SensorRecord) -> Result<Self> {
        Ok(Self {
            kinesis: None,
            body: Some(serde_json::to_string(reading)?),
        })
    }

    /// Decode the embedded sensor reading.
    ///
    /// Tries the nested base64 shape first, then the flat body shape; a
    /// record that decodes under neither degrades to the empty reading
    /// rather than failing the batch.
    pub fn decode(&self) -> SensorRecord {
        if let Some(data) = self.kinesis.as_ref().and_then(|k| k.data.as_deref()) {
            if let Some(reading) = decode_nested(data) {
                return reading;
            }
            debug!(target: "stream", "nested payload did not decode; trying flat body");
        }
        if let Some(body) = self.body.as_deref() {
            if let Ok(reading) = serde_json::from_str(body) {
                return reading;
            }
            debug!(target: "stream", "flat body payload was not a JSON object");
        }
        SensorRecord::default()
    }
}

fn decode_nested(data: &str) -> Option<SensorRecord> {
    let raw = BASE64.decode(data).ok()?;
    serde_json::from_slice(&raw).ok()
}

/// Pull contract against the stream transport.
///
/// `Ok(None)` means the stream closed and no further batches will arrive.
#[async_trait]
pub trait StreamSource: Send {
    async fn next_batch(&mut self) -> Result<Option<StreamEvent>>;
}

/// Channel-backed stream source for demos and tests.
pub struct ChannelSource {
    rx: mpsc::Receiver<StreamEvent>,
}

/// Producer handle feeding a [`ChannelSource`].
#[derive(Clone)]
pub struct StreamHandle {
    tx: mpsc::Sender<StreamEvent>,
}

impl ChannelSource {
    /// Bounded channel pair: the source for the consumer, the handle for
    /// the producer. The bound applies backpressure to the producer.
    pub fn with_capacity(capacity: usize) -> (Self, StreamHandle) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { rx }, StreamHandle { tx })
    }
}

impl StreamHandle {
    pub async fn send(&self, event: StreamEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| AgriMindError::StreamError("stream consumer went away".to_string()))
    }
}

#[async_trait]
impl StreamSource for ChannelSource {
    async fn next_batch(&mut self) -> Result<Option<StreamEvent>> {
        Ok(self.rx.recv().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_envelope_round_trips() {
        let reading = SensorRecord {
            farm_id: Some("FARM_1".to_string()),
            soil_moisture: Some(22.5),
            ..Default::default()
        };
        let record = StreamRecord::wrap(&reading).unwrap();
        assert_eq!(record.decode(), reading);
    }

    #[test]
    fn flat_envelope_round_trips() {
        let reading = SensorRecord {
            farm_id: Some("FARM_2".to_string()),
            ph: Some(6.8),
            ..Default::default()
        };
        let record = StreamRecord::wrap_flat(&reading).unwrap();
        assert_eq!(record.decode(), reading);
    }

    #[test]
    fn corrupt_nested_payload_falls_through_to_body() {
        let record = StreamRecord {
            kinesis: Some(KinesisPayload {
                data: Some("!!not-base64!!".to_string()),
            }),
            body: Some(r#"{"farm_id":"FARM_3"}"#.to_string()),
        };
        assert_eq!(record.decode().entity_id(), "FARM_3");
    }

    #[test]
    fn undecodable_record_degrades_to_empty_reading() {
        let record = StreamRecord {
            kinesis: Some(KinesisPayload {
                data: Some(BASE64.encode(b"not json")),
            }),
            body: Some("also not json".to_string()),
        };
        assert_eq!(record.decode(), SensorRecord::default());
        assert_eq!(record.decode().entity_id(), "unknown");
    }

    #[test]
    fn batch_deserializes_from_transport_shape() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"Records":[{"kinesis":{"data":"e30="}},{"body":"{}"}]}"#,
        )
        .unwrap();
        assert_eq!(event.records.len(), 2);
    }
}
