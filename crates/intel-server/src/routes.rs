//! HTTP handlers (§6), one per endpoint in the original `backend.main`.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::StreamExt;

use intel_completion::CompletionResult;
use intel_events::EventBus;
use intel_knowledge::KnowledgeRecord;
use intel_orchestrator::{Depth, GatherResult};

use crate::depth::parse_depth;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "intel-server" }))
}

#[derive(Deserialize)]
pub struct EventsParams {
    session_id: String,
}

/// `GET /api/events?session_id=...`: session-scoped SSE stream (§4.4).
/// `intel_streaming::subscribe` already yields fully framed SSE text, so the
/// body here is a raw byte stream rather than axum's `Sse` wrapper, which
/// would re-frame each item itself.
pub async fn sse_events(State(_state): State<AppState>, Query(params): Query<EventsParams>) -> Response {
    let stream = intel_streaming::subscribe(EventBus::global(), params.session_id);
    let body = Body::from_stream(stream.map(|frame| Ok::<_, std::io::Error>(frame)));

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("x-accel-buffering", "no")
        .body(body)
        .expect("static headers always build a valid response")
}

#[derive(Deserialize)]
pub struct IntelRequest {
    query: String,
    depth: Option<String>,
}

#[derive(Serialize)]
pub struct IntelResponse {
    result: GatherResult,
    cost: f64,
}

/// `POST /api/intel/query` (§4.7 `gather_intel`).
pub async fn query_intel(State(state): State<AppState>, Json(request): Json<IntelRequest>) -> Result<Json<IntelResponse>, ApiError> {
    let depth = request.depth.as_deref().and_then(parse_depth).unwrap_or(Depth::Standard);
    let result = state.orchestrator.gather_intel(request.query, depth).await?;
    Ok(Json(IntelResponse {
        cost: result.total_cost_usd,
        result,
    }))
}

#[derive(Deserialize)]
pub struct DepthRequest {
    query: String,
}

#[derive(Serialize)]
pub struct DepthResponse {
    depth: String,
    reason: String,
}

/// `POST /api/recommend-depth` (heuristic, not an LLM call; see [`crate::depth`]).
pub async fn recommend_depth(State(state): State<AppState>, Json(request): Json<DepthRequest>) -> Json<DepthResponse> {
    let (depth, reason) = state.depth_recommender.recommend(&request.query);
    Json(DepthResponse {
        depth: depth.as_str().to_string(),
        reason,
    })
}

#[derive(Deserialize)]
pub struct CompletionRequest {
    prompt: String,
    #[serde(default = "default_task_type")]
    task_type: String,
}

fn default_task_type() -> String {
    "general".to_string()
}

/// `POST /api/completion` (§4.10 `complete`): rotates across the model fleet
/// on behalf of a caller that wants a raw completion rather than gathered
/// intel, e.g. council summarization.
pub async fn complete(State(state): State<AppState>, Json(request): Json<CompletionRequest>) -> Result<Json<CompletionResult>, ApiError> {
    let result = state.completion.complete(&request.prompt, &request.task_type).await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
pub struct CouncilExportRequest {
    intel_result: GatherResult,
    tags: Option<Vec<String>>,
    metadata: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct CouncilExportResponse {
    record_id: String,
    query_id: String,
}

/// `POST /api/council/export` (§4.9 `export`).
pub async fn export_council(
    State(state): State<AppState>,
    Json(request): Json<CouncilExportRequest>,
) -> Result<Json<CouncilExportResponse>, ApiError> {
    let result = request.intel_result;
    let source_names = result.sources.iter().map(|s| s.source_name.clone()).collect();

    let record = state
        .knowledge
        .export_with_depth(
            result.query_id.clone(),
            result.correlation_id,
            &result.merged_text,
            source_names,
            result.depth_used.as_str(),
            result.total_cost_usd,
            request.tags,
            request.metadata,
        )
        .await?;

    Ok(Json(CouncilExportResponse {
        record_id: record.id,
        query_id: result.query_id,
    }))
}

#[derive(Deserialize)]
pub struct CouncilQuery {
    #[serde(default = "default_query")]
    q: String,
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default = "default_mode")]
    mode: String,
    tags: Option<String>,
}

fn default_query() -> String {
    "*".to_string()
}

fn default_limit() -> u32 {
    10
}

fn default_mode() -> String {
    "keyword".to_string()
}

#[derive(Serialize)]
pub struct CouncilSearchResponse {
    total: usize,
    docs: Vec<KnowledgeRecord>,
}

/// `GET /api/council?q=&limit=&mode=` (§4.9 `search_keyword`/`search_semantic`).
/// Mirrors the original's "search failure degrades to an empty result, not a
/// 500" behavior — both underlying calls already swallow their own errors.
pub async fn search_council(State(state): State<AppState>, Query(params): Query<CouncilQuery>) -> Json<CouncilSearchResponse> {
    let tags: Option<Vec<String>> = params.tags.map(|raw| raw.split(',').map(str::trim).map(str::to_string).collect());

    let docs = if params.mode == "semantic" {
        state.knowledge.search_semantic(&params.q, params.limit).await
    } else {
        state.knowledge.search_keyword(&params.q, params.limit, tags.as_deref()).await
    };

    Json(CouncilSearchResponse { total: docs.len(), docs })
}
