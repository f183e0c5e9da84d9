// Transport seam in front of the external agent runtime

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use super::client::{InvokeFailure, ReasoningConfig};
use crate::{AgriMindError, Result};

/// One fragment of a streamed agent completion.
///
/// `bytes` may be absent: the runtime interleaves metadata frames that
/// carry no completion text.
#[derive(Debug, Clone, Default)]
pub struct AgentChunk {
    pub bytes: Option<Vec<u8>>,
}

/// Finite, non-restartable sequence of completion fragments, in delivery
/// order.
pub type ChunkStream = Pin<Box<dyn Stream<Item = AgentChunk> + Send>>;

/// Invocation forwarded to the agent runtime.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationRequest {
    pub agent_id: String,
    pub agent_alias_id: String,
    pub session_id: String,
    pub input_text: String,
}

/// Seam between the reasoning client and the agent runtime, so tests and
/// alternate runtimes can swap the wire protocol without touching the
/// reassembly logic.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// Start one invocation and return its completion chunk stream.
    async fn begin_invocation(
        &self,
        request: &InvocationRequest,
    ) -> std::result::Result<ChunkStream, InvokeFailure>;
}

/// HTTP transport against a hosted agent runtime.
pub struct HttpAgentTransport {
    http: reqwest::Client,
    cfg: ReasoningConfig,
}

impl HttpAgentTransport {
    pub fn new(cfg: ReasoningConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| {
                AgriMindError::ReasoningError(format!("Failed to build HTTP client: {e}"))
            })?;
        Ok(Self { http, cfg })
    }
}

#[async_trait]
impl AgentTransport for HttpAgentTransport {
    async fn begin_invocation(
        &self,
        request: &InvocationRequest,
    ) -> std::result::Result<ChunkStream, InvokeFailure> {
        let url = format!(
            "{}/agents/{}/aliases/{}/invoke",
            self.cfg.base_url.trim_end_matches('/'),
            request.agent_id,
            request.agent_alias_id,
        );
        debug!(target: "reasoning", %url, session = %request.session_id, "POST agent invocation");

        let mut req = self
            .http
            .post(&url)
            .header("content-type", "application/json");
        if let Some(key) = &self.cfg.api_key {
            req = req.bearer_auth(key);
        }
        let body = json!({
            "session_id": request.session_id,
            "input_text": request.input_text,
        });

        let resp = req
            .json(&body)
            .send()
            .await
            .map_err(|e| InvokeFailure::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(target: "reasoning", %status, body = %body, "agent runtime rejected invocation");
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    InvokeFailure::Auth(status.to_string())
                }
                StatusCode::TOO_MANY_REQUESTS => InvokeFailure::Throttled,
                StatusCode::NOT_FOUND => InvokeFailure::AgentNotFound,
                _ => InvokeFailure::Service {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        // Each body frame becomes one completion chunk. A frame the
        // transport failed to deliver degrades to an empty chunk so the
        // rest of the stream is still consumed.
        let chunks = resp.bytes_stream().map(|frame| match frame {
            Ok(bytes) => AgentChunk {
                bytes: Some(bytes.to_vec()),
            },
            Err(e) => {
                warn!(target: "reasoning", error = %e, "dropped undeliverable completion frame");
                AgentChunk { bytes: None }
            }
        });
        Ok(Box::pin(chunks))
    }
}
