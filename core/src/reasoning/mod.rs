// Reasoning-service client: invocation, chunked-response reassembly

mod client;
mod transport;

pub use client::{enrichment_session, InvokeFailure, ReasoningClient, ReasoningConfig};
pub use transport::{AgentChunk, AgentTransport, ChunkStream, HttpAgentTransport, InvocationRequest};
