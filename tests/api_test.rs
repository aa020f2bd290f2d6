//! HTTP API tests driven through the router with `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use ragdb::embedding::TrigramEmbedder;
use ragdb::server::{create_router, AppState};
use ragdb::{IndexManager, RagService, SnapshotManager};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn app_state() -> Arc<AppState> {
    let manager = Arc::new(IndexManager::new());
    let rag = RagService::new(Arc::clone(&manager), Arc::new(TrigramEmbedder::new(128)), "test_index");
    Arc::new(AppState::new(manager, rag))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_root() {
    let app = create_router(app_state());
    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "RAG API is running", "status": "ok"}));
}

#[tokio::test]
async fn test_rag_flow() {
    let app = create_router(app_state());

    let (status, body) = send(&app, Method::POST, "/create_index", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "created", "index_name": "test_index", "message": "Index created successfully"})
    );

    let (status, body) = send(&app, Method::POST, "/create_index", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "failed");

    let (status, body) = send(
        &app,
        Method::POST,
        "/add_document?text=The%20Taj%20Mahal%20is%20located%20in%20Agra.&doc_id=doc3",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "added", "doc_id": "doc3", "message": "Document added successfully"})
    );

    let (_, body) = send(
        &app,
        Method::POST,
        "/add_document?text=The%20capital%20of%20India%20is%20New%20Delhi.",
        None,
    )
    .await;
    assert_eq!(body["doc_id"], "The capital of India");

    let (status, body) = send(
        &app,
        Method::POST,
        "/search",
        Some(json!({"question": "Where is the Taj Mahal?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["question"], "Where is the Taj Mahal?");
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["id"], "doc3");
    assert_eq!(results[0]["metadata"]["text"], "The Taj Mahal is located in Agra.");
    assert!(results[0]["score"].is_number());
}

#[tokio::test]
async fn test_rag_failures_use_envelope() {
    let app = create_router(app_state());

    let (status, body) = send(&app, Method::POST, "/search", Some(json!({"question": "hi"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "failed");
    assert!(body["error"].as_str().unwrap().contains("test_index"));

    send(&app, Method::POST, "/create_index", None).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/search",
        Some(json!({"question": "hi", "top_k": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "failed");

    // missing required query parameter
    let (status, body) = send(&app, Method::POST, "/add_document", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "failed");

    // malformed body
    let (status, body) = send(&app, Method::POST, "/search", Some(json!({"top_k": 2}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn test_index_management_routes() {
    let app = create_router(app_state());

    let (status, body) = send(
        &app,
        Method::POST,
        "/indexes",
        Some(json!({"name": "vecs", "dimension": 2, "space_type": "cosine", "precision": "float32"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "vecs");
    assert_eq!(body["dimension"], 2);
    assert_eq!(body["space_type"], "cosine");
    assert_eq!(body["count"], 0);

    let (status, _) = send(
        &app,
        Method::POST,
        "/indexes",
        Some(json!({"name": "bad", "dimension": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/indexes/vecs/vectors",
        Some(json!({"records": [
            {"id": "1", "vector": [1.0, 0.0]},
            {"id": "2", "vector": [0.0, 1.0]},
            {"id": "3", "vector": [0.9, 0.1], "metadata": {"tag": "near"}}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upserted"], 3);

    let (status, body) = send(
        &app,
        Method::POST,
        "/indexes/vecs/query",
        Some(json!({"vector": [1.0, 0.0], "top_k": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "3"]);

    let (status, body) = send(
        &app,
        Method::POST,
        "/indexes/vecs/query",
        Some(json!({"vector": [1.0, 0.0, 0.0], "top_k": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "failed");

    let (status, body) = send(&app, Method::GET, "/indexes/vecs/vectors/3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["tag"], "near");

    let (status, _) = send(&app, Method::DELETE, "/indexes/vecs/vectors/3", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::DELETE, "/indexes/vecs/vectors/3", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, "/indexes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "vecs");
    assert_eq!(body[0]["count"], 2);

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vector_count"], 2);

    let (status, _) = send(&app, Method::DELETE, "/indexes/vecs", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, "/indexes/vecs", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_count_operations() {
    let app = create_router(app_state());
    send(&app, Method::POST, "/create_index", None).await;
    send(&app, Method::POST, "/add_document?text=hello%20world&doc_id=a", None).await;
    send(&app, Method::POST, "/search", Some(json!({"question": "hello"}))).await;
    send(&app, Method::GET, "/indexes/missing", None).await;

    let (status, body) = send(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_upserts"], 1);
    assert_eq!(body["total_queries"], 1);
    assert_eq!(body["total_failures"], 1);
}

#[tokio::test]
async fn test_snapshot_route() {
    let app = create_router(app_state());
    let (status, body) = send(&app, Method::POST, "/snapshot", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "failed");

    let dir = TempDir::new().unwrap();
    let manager = Arc::new(IndexManager::new());
    let rag = RagService::new(Arc::clone(&manager), Arc::new(TrigramEmbedder::new(128)), "test_index");
    let state = Arc::new(
        AppState::new(Arc::clone(&manager), rag).with_snapshots(SnapshotManager::new(dir.path()).unwrap()),
    );
    let app = create_router(state);

    send(&app, Method::POST, "/create_index", None).await;
    send(&app, Method::POST, "/add_document?text=persist%20me&doc_id=p", None).await;
    let (status, body) = send(&app, Method::POST, "/snapshot", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"], 1);

    let loaded = SnapshotManager::new(dir.path()).unwrap().load().unwrap().unwrap();
    assert_eq!(loaded.record_count(), 1);
}
