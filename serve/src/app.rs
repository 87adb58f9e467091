//! Axum app: state, router, handlers and middleware.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, Request, State},
    http::{header::HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use shopmind::{
    agent::{AgentContext, Deps},
    orchestrator::Orchestrator,
    session::SessionMemory,
    GeneralAgent, Intent, IntentClassifier, IntentResult, PolicyAgent, PriceAgent,
    RecommendationAgent, ReviewAgent,
};

const SERVICE_NAME: &str = "shopmind";

const MESSAGE_MIN_CHARS: usize = 3;
const MESSAGE_MAX_CHARS: usize = 1000;
const MAX_RESULTS_RANGE: std::ops::RangeInclusive<usize> = 1..=20;

/// Shared state for the HTTP app.
pub struct AppState {
    pub deps: Arc<Deps>,
    pub orchestrator: Orchestrator,
    pub sessions: Arc<SessionMemory>,
    /// Wall-clock bound for one turn; timeout cancels the whole pipeline.
    pub turn_timeout: Duration,
    /// Allowed CORS origins; empty disables the CORS header entirely.
    pub cors_origins: Vec<String>,
}

impl AppState {
    /// Wires the full agent registry over `deps` and `sessions`.
    pub fn new(deps: Arc<Deps>, sessions: Arc<SessionMemory>) -> Self {
        let orchestrator = build_orchestrator(&deps);
        let turn_timeout = Duration::from_secs(deps.settings.agent_timeout_seconds);
        let cors_origins = deps.settings.cors_origins.clone();
        Self {
            deps,
            orchestrator,
            sessions,
            turn_timeout,
            cors_origins,
        }
    }
}

/// The standard registry: every intent wired, general as fallback.
pub fn build_orchestrator(deps: &Arc<Deps>) -> Orchestrator {
    Orchestrator::new(IntentClassifier::new(deps.llm.clone()))
        .with_agent(Intent::Recommendation, Arc::new(RecommendationAgent::new()))
        .with_agent(Intent::Review, Arc::new(ReviewAgent::new()))
        .with_agent(Intent::Price, Arc::new(PriceAgent::new()))
        .with_agent(Intent::Policy, Arc::new(PolicyAgent::new()))
        .with_agent(Intent::General, Arc::new(GeneralAgent::new()))
}

/// Request body for `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

/// Entities extracted by the classifier, echoed to the client.
#[derive(Debug, Default, Serialize)]
pub struct Entities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
}

impl From<&IntentResult> for Entities {
    fn from(intent: &IntentResult) -> Self {
        Self {
            product_name: intent.product_name.clone(),
            category: intent.category.clone(),
            max_price: intent.max_price,
            min_price: intent.min_price,
        }
    }
}

/// Response body for `POST /chat`.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub intent: Intent,
    pub confidence: f32,
    pub entities: Entities,
    pub agent_used: String,
    pub response: Map<String, Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub session_id: String,
}

fn unprocessable(detail: impl Into<String>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({"detail": detail.into()})),
    )
        .into_response()
}

fn internal_error(detail: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"detail": detail.into()})),
    )
        .into_response()
}

/// Validates the chat body; `Err` is a ready-to-send 422.
fn validate(body: &ChatRequest) -> Result<usize, Response> {
    let chars = body.message.chars().count();
    if chars < MESSAGE_MIN_CHARS {
        return Err(unprocessable(format!(
            "message must be at least {} characters",
            MESSAGE_MIN_CHARS
        )));
    }
    if chars > MESSAGE_MAX_CHARS {
        return Err(unprocessable(format!(
            "message must be at most {} characters",
            MESSAGE_MAX_CHARS
        )));
    }
    let max_results = body.max_results.unwrap_or(5);
    if !MAX_RESULTS_RANGE.contains(&max_results) {
        return Err(unprocessable("max_results must be between 1 and 20"));
    }
    Ok(max_results)
}

async fn chat(State(state): State<Arc<AppState>>, Json(body): Json<ChatRequest>) -> Response {
    let max_results = match validate(&body) {
        Ok(max_results) => max_results,
        Err(response) => return response,
    };

    let session_id = match &body.session_id {
        Some(id) => id.clone(),
        None => state.sessions.create_session().await,
    };

    let history = state.sessions.get_history(&session_id).await;
    let enriched = SessionMemory::build_enriched_query(&body.message, &history);

    let mut ctx = AgentContext::with_deps(state.deps.clone());
    ctx.session_id = Some(session_id.clone());
    ctx.max_results = max_results;

    let turn = tokio::time::timeout(
        state.turn_timeout,
        state.orchestrator.handle(&enriched, &mut ctx),
    )
    .await;

    let (response, intent_result) = match turn {
        Ok(pair) => pair,
        Err(_) => {
            warn!(session_id, "turn timed out");
            return internal_error(format!(
                "turn timed out after {}s",
                state.turn_timeout.as_secs()
            ));
        }
    };

    if !response.success {
        let detail = response
            .error
            .unwrap_or_else(|| "agent failed without detail".to_string());
        return internal_error(detail);
    }

    state
        .sessions
        .append_turn(&session_id, &body.message, &response.answer_text())
        .await;

    let agent_used = response
        .metadata
        .get("agent_used")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    Json(ChatResponse {
        message: body.message,
        intent: intent_result.intent,
        confidence: intent_result.confidence,
        entities: Entities::from(&intent_result),
        agent_used,
        response: response.data,
        success: true,
        error: None,
        session_id,
    })
    .into_response()
}

/// Idempotent session clear: 204 whether or not the session existed.
async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> StatusCode {
    let existed = state.sessions.clear(&session_id).await;
    info!(session_id, existed, "session cleared");
    StatusCode::NO_CONTENT
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Stamps `X-Process-Time-Ms` with the full-turn latency.
async fn process_time(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let mut response = next.run(request).await;
    let elapsed_ms = started.elapsed().as_millis().to_string();
    if let Ok(value) = HeaderValue::from_str(&elapsed_ms) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-process-time-ms"), value);
    }
    response
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = Arc::new(state.cors_origins.clone());
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/session/:session_id", delete(clear_session))
        .route("/health", get(health))
        .layer(middleware::from_fn(process_time))
        .layer(middleware::from_fn(move |request: Request, next: Next| {
            let origins = Arc::clone(&cors_origins);
            async move {
                let origin = request.headers().get("origin").cloned();
                let mut response = next.run(request).await;
                if let Some(origin) = origin {
                    let allowed = origins.iter().any(|allowed| {
                        allowed == "*" || origin.to_str().map(|o| o == allowed).unwrap_or(false)
                    });
                    if allowed {
                        response
                            .headers_mut()
                            .insert(HeaderName::from_static("access-control-allow-origin"), origin);
                    }
                }
                response
            }
        }))
        .with_state(state)
}
