//! Router tests driven through `tower::ServiceExt::oneshot`

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use catalyst_api::{app, AppState};
use catalyst_core::{EntityKind, EntityRef};
use catalyst_embedding::{EmbeddingMetadata, EmbeddingRecord, EmbeddingStore};
use catalyst_recommend::{RecommendationService, RecommenderConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

fn router() -> Router {
    let store = EmbeddingStore::new_in_memory().unwrap();
    for (id, vector, fund) in [
        ("a", vec![1.0, 0.0], "Fund 11"),
        ("b", vec![0.0, 1.0], "Fund 11"),
        ("c", vec![-1.0, 0.0], "Fund 12"),
        ("d", vec![0.9, 0.1], "Fund 12"),
        ("e", vec![0.7, 0.7], "Fund 11"),
    ] {
        let record = EmbeddingRecord::new(EntityRef::proposal(id), "combined", vector).with_metadata(
            EmbeddingMetadata {
                fund_label: Some(fund.to_string()),
                ..Default::default()
            },
        );
        store.upsert(&record).unwrap();
    }
    store
        .upsert(&EmbeddingRecord::new(
            EntityRef::new(EntityKind::Community, "builders"),
            "combined",
            vec![1.0, 0.05],
        ))
        .unwrap();

    let service = RecommendationService::new(Arc::new(store), RecommenderConfig::default());
    app(AppState::new(service))
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(router(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["embeddings"]["total"], 6);

    let response = router().oneshot(get("/health/live")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_recommendations() {
    let (status, body) = send(
        router(),
        post(
            "/api/recommendations",
            json!({ "liked_ids": ["a", "b"], "disliked_ids": ["c"], "limit": 1 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["entity_id"], "d");
    assert_eq!(body["sample_size"]["liked"], 2);
    assert_eq!(body["sample_size"]["disliked"], 1);
}

#[tokio::test]
async fn test_recommendations_with_filter_and_candidates() {
    let (status, body) = send(
        router(),
        post(
            "/api/recommendations",
            json!({
                "liked_ids": ["a"],
                "candidate_ids": ["d", "e", "ghost"],
                "filter": { "all": [{ "field": "fund_label", "any_of": ["Fund 11"] }] }
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["entity_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["e"]);
    assert_eq!(body["missing"], json!(["ghost"]));
}

#[tokio::test]
async fn test_overlapping_feedback_is_bad_request() {
    let (status, body) = send(
        router(),
        post(
            "/api/recommendations",
            json!({ "liked_ids": ["a"], "disliked_ids": ["a"] }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("overlap"));
}

#[tokio::test]
async fn test_zero_limit_is_bad_request() {
    let (status, _) = send(
        router(),
        post("/api/recommendations", json!({ "liked_ids": ["a"], "limit": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_enhance() {
    let (status, body) = send(
        router(),
        post(
            "/api/search/enhance",
            json!({
                "results": [
                    { "id": "b", "ranking_total": 60.0, "title": "Tooling" },
                    { "id": "d", "ranking_total": 50.0, "title": "Education" },
                    { "id": "zzz", "ranking_total": 55.0 }
                ],
                "liked_ids": ["a"]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["id"], "d");
    assert_eq!(results[0]["title"], "Education");
    assert_eq!(results[0]["ranking_total"], 50.0);
    assert_eq!(results[1]["id"], "b");
    assert_eq!(results[2]["id"], "zzz");
    assert_eq!(results[2]["ai_score"], 0.0);
}

#[tokio::test]
async fn test_similar_to_vector() {
    let (status, body) = send(
        router(),
        post(
            "/api/embeddings/similar",
            json!({ "vector": [1.0, 0.0], "threshold": 0.9, "limit": 10 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body["matches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["a", "builders", "d"]);
    assert!(body["matches"][0].get("vector").is_none());
}

#[tokio::test]
async fn test_similar_to_vector_dimension_mismatch() {
    let (status, body) = send(
        router(),
        post("/api/embeddings/similar", json!({ "vector": [1.0, 0.0, 0.0] })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Dimension mismatch"));
}

#[tokio::test]
async fn test_similar_to_entity() {
    let (status, body) = send(
        router(),
        get("/api/embeddings/proposal/a/similar?limit=2&threshold=0.0"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let ids: Vec<_> = body["matches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["builders", "d"]);

    let (status, _) = send(router(), get("/api/embeddings/fund/a/similar")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats() {
    let (status, body) = send(router(), get("/api/embeddings/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 6);
    assert_eq!(body["by_field"]["combined"], 6);
}
