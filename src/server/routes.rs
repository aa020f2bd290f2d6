//! HTTP route handlers for the RAG and index management APIs.

use crate::error::{EngineError, ErrorKind};
use crate::manager::IndexInfo;
use crate::metrics::MetricsSnapshot;
use crate::rag::{AddDocumentResponse, CreateIndexResponse, SearchResponse, DEFAULT_TOP_K};
use crate::schema::{IndexBackend, IndexConfig};
use crate::server::AppState;
use crate::storage::{QueryResult, VectorRecord};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, Request, State,
    },
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::warn;

// --- Request/Response types ---

#[derive(Debug, Deserialize)]
pub struct AddDocumentParams {
    pub text: String,
    pub doc_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub question: String,
    #[serde(default = "default_top_k")]
    pub top_k: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateIndexRequest {
    pub name: String,
    pub dimension: i64,
    #[serde(default = "default_space_type")]
    pub space_type: String,
    #[serde(default = "default_precision")]
    pub precision: String,
    #[serde(default)]
    pub backend: IndexBackend,
}

#[derive(Debug, Deserialize)]
pub struct UpsertRequest {
    pub records: Vec<VectorRecord>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub vector: Vec<f32>,
    #[serde(default = "default_top_k")]
    pub top_k: i64,
}

fn default_top_k() -> i64 {
    DEFAULT_TOP_K
}

fn default_space_type() -> String {
    "cosine".to_string()
}

fn default_precision() -> String {
    "float32".to_string()
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub status: &'static str,
    pub upserted: usize,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub results: Vec<QueryResult>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub indexes: usize,
    pub vector_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub status: &'static str,
    pub records: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}

/// An engine error on its way to the client as `{status: "failed", error}`.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::InvalidArgument | ErrorKind::DimensionMismatch => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::AlreadyExists => StatusCode::CONFLICT,
            ErrorKind::Embedding => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(EngineError::invalid(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(EngineError::invalid(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!(error = %self.0, "request failed");
        }
        let body = ErrorResponse {
            status: "failed".to_string(),
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// --- Router ---

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/create_index", post(create_default_index))
        .route("/add_document", post(add_document))
        .route("/search", post(search))
        .route("/indexes", get(list_indexes).post(create_index))
        .route("/indexes/:name", get(get_index).delete(delete_index))
        .route("/indexes/:name/vectors", post(upsert_vectors))
        .route("/indexes/:name/vectors/:id", get(get_vector).delete(delete_vector))
        .route("/indexes/:name/query", post(query_index))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/snapshot", post(save_snapshot))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), count_failures))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn count_failures(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.status().is_client_error() || response.status().is_server_error() {
        state.metrics.record_failure();
    }
    response
}

// --- RAG handlers ---

async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "RAG API is running",
        status: "ok",
    })
}

async fn create_default_index(State(state): State<Arc<AppState>>) -> ApiResult<Json<CreateIndexResponse>> {
    Ok(Json(state.rag.create_index()?))
}

async fn add_document(
    State(state): State<Arc<AppState>>,
    params: Result<Query<AddDocumentParams>, QueryRejection>,
) -> ApiResult<Json<AddDocumentResponse>> {
    let Query(params) = params?;
    let added = state
        .rag
        .add_document(&params.text, params.doc_id.as_deref())
        .await?;
    state.metrics.record_upsert(1);
    Ok(Json(added))
}

async fn search(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Json<SearchResponse>> {
    let Json(req) = payload?;
    let start = Instant::now();
    let found = state.rag.search(&req.question, req.top_k).await?;
    state.metrics.record_query(start.elapsed());
    Ok(Json(found))
}

// --- Index management handlers ---

async fn list_indexes(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<IndexInfo>>> {
    let mut infos = Vec::new();
    for name in state.manager.list_indexes()? {
        // an index dropped between listing and lookup is skipped
        if let Ok(index) = state.manager.get_index(&name) {
            infos.push(index.info()?);
        }
    }
    Ok(Json(infos))
}

async fn create_index(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateIndexRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<IndexInfo>)> {
    let Json(req) = payload?;
    let config = IndexConfig::parse(req.dimension, &req.space_type, &req.precision)?.with_backend(req.backend);
    let index = state.manager.create_index(&req.name, config)?;
    Ok((StatusCode::CREATED, Json(index.info()?)))
}

async fn get_index(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> ApiResult<Json<IndexInfo>> {
    Ok(Json(state.manager.get_index(&name)?.info()?))
}

async fn delete_index(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.manager.delete_index(&name)?;
    Ok(Json(serde_json::json!({"name": name, "status": "deleted"})))
}

async fn upsert_vectors(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    payload: Result<Json<UpsertRequest>, JsonRejection>,
) -> ApiResult<Json<UpsertResponse>> {
    let Json(req) = payload?;
    let upserted = state.manager.get_index(&name)?.upsert(req.records)?;
    state.metrics.record_upsert(upserted);
    Ok(Json(UpsertResponse {
        status: "upserted",
        upserted,
    }))
}

async fn get_vector(
    State(state): State<Arc<AppState>>,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<Json<VectorRecord>> {
    Ok(Json(state.manager.get_index(&name)?.get(&id)?))
}

async fn delete_vector(
    State(state): State<Arc<AppState>>,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    state.manager.get_index(&name)?.delete(&id)?;
    state.metrics.record_delete();
    Ok(Json(serde_json::json!({"id": id, "status": "deleted"})))
}

async fn query_index(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<Json<QueryResponse>> {
    let Json(req) = payload?;
    let top_k = usize::try_from(req.top_k)
        .map_err(|_| EngineError::invalid(format!("top_k must be positive, got {}", req.top_k)))?;

    let start = Instant::now();
    let results = state.manager.get_index(&name)?.query(&req.vector, top_k)?;
    state.metrics.record_query(start.elapsed());
    Ok(Json(QueryResponse { results }))
}

// --- Operational handlers ---

async fn health(State(state): State<Arc<AppState>>) -> ApiResult<Json<HealthResponse>> {
    let names = state.manager.list_indexes()?;
    let mut vector_count = 0;
    for name in &names {
        if let Ok(index) = state.manager.get_index(name) {
            vector_count += index.len()?;
        }
    }
    Ok(Json(HealthResponse {
        status: "ok",
        indexes: names.len(),
        vector_count,
    }))
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

async fn save_snapshot(State(state): State<Arc<AppState>>) -> ApiResult<Json<SnapshotResponse>> {
    let snapshot_state = Arc::clone(&state);
    let records = tokio::task::spawn_blocking(move || snapshot_state.save_snapshot())
        .await
        .map_err(|e| EngineError::Internal(format!("snapshot task failed: {}", e)))??;
    Ok(Json(SnapshotResponse {
        status: "saved",
        records,
    }))
}
