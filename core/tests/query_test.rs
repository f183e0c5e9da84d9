use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agrimind_core::insight::{Insight, InsightRecord};
use agrimind_core::query::{QueryConfig, QueryServer};
use agrimind_core::reasoning::{
    AgentChunk, AgentTransport, ChunkStream, InvocationRequest, InvokeFailure, ReasoningClient,
    ReasoningConfig,
};
use agrimind_core::record::SensorRecord;
use agrimind_core::store::{InsightStore, MemoryInsightStore};
use async_trait::async_trait;
use serde_json::Value;

/// Agent stub with a fixed reply; records the questions it was asked.
struct StubAgent {
    reply: Option<&'static str>,
    questions: Mutex<Vec<String>>,
}

impl StubAgent {
    fn answering(reply: &'static str) -> Self {
        Self {
            reply: Some(reply),
            questions: Mutex::new(Vec::new()),
        }
    }

    fn unavailable() -> Self {
        Self {
            reply: None,
            questions: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AgentTransport for StubAgent {
    async fn begin_invocation(
        &self,
        request: &InvocationRequest,
    ) -> Result<ChunkStream, InvokeFailure> {
        self.questions
            .lock()
            .unwrap()
            .push(request.input_text.clone());
        match self.reply {
            Some(reply) => Ok(Box::pin(tokio_stream::iter(vec![AgentChunk {
                bytes: Some(reply.as_bytes().to_vec()),
            }]))),
            None => Err(InvokeFailure::Throttled),
        }
    }
}

fn record(entity: &str, advice: &str) -> InsightRecord {
    InsightRecord {
        sensor: SensorRecord {
            farm_id: Some(entity.to_string()),
            ..Default::default()
        },
        insight: Insight {
            advice: advice.to_string(),
            confidence: Some(75.0),
            reason: "test".to_string(),
        },
        agent_raw: advice.to_string(),
    }
}

/// Serve the query router on an ephemeral port and return its address.
async fn serve(store: Arc<MemoryInsightStore>, agent: Arc<StubAgent>) -> SocketAddr {
    let reasoning = Arc::new(ReasoningClient::new(
        agent as Arc<dyn AgentTransport>,
        ReasoningConfig {
            base_url: "http://localhost:8800".to_string(),
            agent_id: "agent-test".to_string(),
            agent_alias_id: "alias-test".to_string(),
            api_key: None,
            request_timeout_ms: 5_000,
        },
    ));
    let server = QueryServer::new(
        QueryConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        store as Arc<dyn InsightStore>,
        reasoning,
    );

    let app = server.router();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn get_latest_serves_the_newest_record() {
    let store = Arc::new(MemoryInsightStore::new());
    store.put("FARM_1", &record("FARM_1", "older")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    store.put("FARM_1", &record("FARM_1", "newer")).await.unwrap();

    let addr = serve(store, Arc::new(StubAgent::answering("unused"))).await;
    let resp = reqwest::get(format!("http://{addr}/insights?sensor_id=FARM_1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["insight"]["advice"], "newer");
    assert_eq!(body["sensor"]["farm_id"], "FARM_1");
    assert_eq!(body["agent_raw"], "newer");
}

#[tokio::test]
async fn get_latest_unknown_farm_is_a_well_formed_404() {
    let addr = serve(
        Arc::new(MemoryInsightStore::new()),
        Arc::new(StubAgent::answering("unused")),
    )
    .await;

    let resp = reqwest::get(format!("http://{addr}/insights?sensor_id=no-such-farm"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "no insight");
}

#[tokio::test]
async fn get_latest_defaults_the_sensor_id() {
    let store = Arc::new(MemoryInsightStore::new());
    store.put("FARM_1", &record("FARM_1", "default farm")).await.unwrap();

    let addr = serve(store, Arc::new(StubAgent::answering("unused"))).await;
    let resp = reqwest::get(format!("http://{addr}/insights")).await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["insight"]["advice"], "default farm");
}

#[tokio::test]
async fn post_question_returns_the_agent_reply_verbatim() {
    let agent = Arc::new(StubAgent::answering("Rotate your crops."));
    let addr = serve(Arc::new(MemoryInsightStore::new()), agent.clone()).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/insights"))
        .json(&serde_json::json!({"question": "What should I do this week?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["response"], "Rotate your crops.");
    assert_eq!(
        *agent.questions.lock().unwrap(),
        vec!["What should I do this week?"]
    );
}

#[tokio::test]
async fn post_without_question_asks_the_default() {
    let agent = Arc::new(StubAgent::answering("General answer."));
    let addr = serve(Arc::new(MemoryInsightStore::new()), agent.clone()).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/insights"))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        *agent.questions.lock().unwrap(),
        vec!["Provide general farm advice"]
    );
}

#[tokio::test]
async fn post_malformed_body_is_a_well_formed_400() {
    let addr = serve(
        Arc::new(MemoryInsightStore::new()),
        Arc::new(StubAgent::answering("unused")),
    )
    .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/insights"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "malformed request");
}

#[tokio::test]
async fn agent_failure_surfaces_as_bad_gateway_not_a_crash() {
    let addr = serve(
        Arc::new(MemoryInsightStore::new()),
        Arc::new(StubAgent::unavailable()),
    )
    .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/insights"))
        .json(&serde_json::json!({"question": "anyone there?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "agent unavailable");
}
