// Query HTTP API
//
// Serves the latest stored insight per entity and free-form questions
// forwarded to the reasoning agent.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::latest::latest_insight;
use crate::reasoning::ReasoningClient;
use crate::store::InsightStore;
use crate::{AgriMindError, Result};

/// Question used when a POST arrives without one.
const DEFAULT_QUESTION: &str = "Provide general farm advice";

/// Entity used for GET lookups without a `sensor_id`.
const DEFAULT_SENSOR: &str = "FARM_1";

/// Query server bind configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub host: String,
    pub port: u16,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("QUERY_HOST")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port: std::env::var("QUERY_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
        }
    }
}

/// Shared handler state
#[derive(Clone)]
struct QueryState {
    store: Arc<dyn InsightStore>,
    reasoning: Arc<ReasoningClient>,
}

/// Query HTTP server. Both operations are stateless and safely concurrent
/// with each other and with the enrichment consumer.
pub struct QueryServer {
    config: QueryConfig,
    store: Arc<dyn InsightStore>,
    reasoning: Arc<ReasoningClient>,
}

impl QueryServer {
    pub fn new(
        config: QueryConfig,
        store: Arc<dyn InsightStore>,
        reasoning: Arc<ReasoningClient>,
    ) -> Self {
        Self {
            config,
            store,
            reasoning,
        }
    }

    /// Build the router; separate from [`Self::serve`] so tests can drive
    /// it on an ephemeral listener.
    pub fn router(&self) -> Router {
        let state = QueryState {
            store: Arc::clone(&self.store),
            reasoning: Arc::clone(&self.reasoning),
        };

        Router::new()
            .route("/insights", get(latest_handler).post(ask_handler))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(state)
    }

    /// Start the query server
    pub async fn serve(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!(target: "query", addr = %addr, "starting query server");

        let app = self.router();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AgriMindError::QueryError(format!("bind {addr}: {e}")))?;
        info!(
            target: "query",
            url = %format!("http://{addr}/insights"),
            "query server ready"
        );

        axum::serve(listener, app).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatestParams {
    sensor_id: Option<String>,
}

/// POST /insights: forward a free-form question to the agent.
///
/// Deliberately unstructured: the reply text is returned verbatim, unlike
/// the enrichment path which always parses into an insight.
async fn ask_handler(
    State(state): State<QueryState>,
    body: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Ok(Json(req)) = body else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "malformed request"})),
        )
            .into_response();
    };

    let question = req
        .question
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_QUESTION.to_string());

    match state.reasoning.ask(&question).await {
        Ok(text) => (StatusCode::OK, Json(json!({"response": text}))).into_response(),
        Err(failure) => {
            warn!(target: "query", error = %failure, "ask invocation failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": "agent unavailable"})),
            )
                .into_response()
        }
    }
}

/// GET /insights?sensor_id={id}: the latest stored insight record for
/// the entity, or a well-formed "no insight" body when there is none yet.
async fn latest_handler(
    State(state): State<QueryState>,
    Query(params): Query<LatestParams>,
) -> impl IntoResponse {
    let sensor_id = params
        .sensor_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SENSOR.to_string());

    match latest_insight(state.store.as_ref(), &sensor_id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            // Read faults surface as "no insight", not as a crash
            warn!(target: "query", entity = %sensor_id, error = %e, "latest lookup failed");
            not_found()
        }
    }
}

fn not_found() -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "no insight"})),
    )
        .into_response()
}
