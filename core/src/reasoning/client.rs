// Reasoning client: invokes the agent runtime and reassembles chunked
// completions into one text

use std::sync::Arc;

use thiserror::Error;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use super::transport::{AgentTransport, HttpAgentTransport, InvocationRequest};

/// Session scope used for open-ended Q&A from the query API.
const ASK_SESSION: &str = "web-session";

/// Recoverable invocation failure. Callers degrade on these; they are
/// never fatal to the pipeline.
#[derive(Debug, Error)]
pub enum InvokeFailure {
    #[error("agent authentication rejected: {0}")]
    Auth(String),

    #[error("agent invocation throttled")]
    Throttled,

    #[error("agent or alias not found")]
    AgentNotFound,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("agent runtime error: status={status} body={body}")]
    Service { status: u16, body: String },
}

/// Configuration for the reasoning client, loaded from environment
/// variables. The agent itself (model, instructions) is pre-configured in
/// the runtime; only its identity is referenced here.
#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    pub base_url: String,
    pub agent_id: String,
    pub agent_alias_id: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("AGENT_RUNTIME_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "http://localhost:8800".to_string()),
            agent_id: std::env::var("AGENT_ID")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "replace-with-agent-id".to_string()),
            agent_alias_id: std::env::var("AGENT_ALIAS_ID")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "replace-with-alias-id".to_string()),
            api_key: std::env::var("AGENT_API_KEY").ok().filter(|s| !s.is_empty()),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30_000),
        }
    }
}

/// Client for the external reasoning service.
///
/// Contract:
/// - Input: prompt text + session id
/// - Output: the reassembled completion text, whitespace-trimmed
/// - Error: typed [`InvokeFailure`] the caller can degrade on
///
/// The runtime streams its answer as a finite sequence of byte fragments;
/// fragments that fail to decode are skipped so partial output is still
/// returned.
pub struct ReasoningClient {
    transport: Arc<dyn AgentTransport>,
    cfg: ReasoningConfig,
}

impl ReasoningClient {
    pub fn new(transport: Arc<dyn AgentTransport>, cfg: ReasoningConfig) -> Self {
        Self { transport, cfg }
    }

    pub fn from_env() -> crate::Result<Self> {
        let cfg = ReasoningConfig::default();
        let transport = HttpAgentTransport::new(cfg.clone())?;
        Ok(Self::new(Arc::new(transport), cfg))
    }

    /// Invoke the agent and reassemble its chunked reply into one text.
    pub async fn invoke(
        &self,
        prompt: &str,
        session_id: &str,
    ) -> Result<String, InvokeFailure> {
        let request = InvocationRequest {
            agent_id: self.cfg.agent_id.clone(),
            agent_alias_id: self.cfg.agent_alias_id.clone(),
            session_id: session_id.to_string(),
            input_text: prompt.to_string(),
        };
        let mut chunks = self.transport.begin_invocation(&request).await?;

        let mut text = String::new();
        let mut skipped = 0usize;
        while let Some(chunk) = chunks.next().await {
            let Some(bytes) = chunk.bytes else { continue };
            match std::str::from_utf8(&bytes) {
                Ok(fragment) => text.push_str(fragment),
                // Keep whatever did decode; a lost fragment is not fatal
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(
                target: "reasoning",
                skipped,
                session = %session_id,
                "skipped undecodable completion fragments"
            );
        }
        debug!(target: "reasoning", session = %session_id, chars = text.len(), "completion reassembled");
        Ok(text.trim().to_string())
    }

    /// Open-ended Q&A shape used by the query service: no sensor context,
    /// fixed session scope, reply returned verbatim.
    pub async fn ask(&self, question: &str) -> Result<String, InvokeFailure> {
        self.invoke(question, ASK_SESSION).await
    }
}

/// Deterministic session id for enrichment invocations, so repeated
/// readings from one entity correlate at the agent runtime.
pub fn enrichment_session(entity_id: &str) -> String {
    format!("session-{entity_id}")
}
