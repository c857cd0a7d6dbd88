//! HTTP embedder against a mock OpenAI-compatible server.

use mockito::{Matcher, Server};
use semantic_store::embeddings::{Embedder, HttpEmbedder};
use semantic_store::facade::prelude::*;
use semantic_store::store::LocalVectorStore;
use serde_json::json;
use std::sync::Arc;

fn response(vectors: &[(usize, [f32; 2])]) -> String {
    let data: Vec<_> = vectors
        .iter()
        .map(|(i, v)| json!({"object": "embedding", "index": i, "embedding": v}))
        .collect();
    json!({
        "object": "list",
        "data": data,
        "model": "all-MiniLM-L6-v2",
        "usage": {"prompt_tokens": 3, "total_tokens": 3}
    })
    .to_string()
}

#[tokio::test]
async fn test_encode_sends_model_and_bearer_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/embeddings")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "all-MiniLM-L6-v2",
            "input": ["hello", "world"]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(response(&[(1, [0.0, 1.0]), (0, [1.0, 0.0])]))
        .create_async()
        .await;

    let embedder = HttpEmbedder::builder()
        .model("all-MiniLM-L6-v2")
        .base_url(server.url())
        .api_key("test-key")
        .build()
        .unwrap();
    let vectors = embedder
        .encode(&["hello".to_string(), "world".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_large_input_is_split_into_requests() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(response(&[(0, [1.0, 1.0]), (1, [2.0, 2.0])]))
        .expect(2)
        .create_async()
        .await;

    let embedder = HttpEmbedder::builder()
        .model("m")
        .base_url(server.url())
        .max_batch_size(2)
        .build()
        .unwrap();
    let texts: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
    let vectors = embedder.encode(&texts).await.unwrap();
    assert_eq!(vectors.len(), 4);
    assert_eq!(vectors[2], vec![1.0, 1.0]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_is_embedder_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/embeddings")
        .with_status(503)
        .with_body(r#"{"error": "model loading"}"#)
        .create_async()
        .await;

    let embedder = HttpEmbedder::builder()
        .model("m")
        .base_url(server.url())
        .build()
        .unwrap();
    let err = embedder.encode_one("hello").await.unwrap_err();
    assert!(matches!(err, Error::Embedder { .. }));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_short_response_is_embedder_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/embeddings")
        .with_status(200)
        .with_body(response(&[(0, [1.0, 0.0])]))
        .create_async()
        .await;

    let embedder = HttpEmbedder::builder()
        .model("m")
        .base_url(server.url())
        .build()
        .unwrap();
    let err = embedder
        .encode(&["a".to_string(), "b".to_string()])
        .await
        .unwrap_err();
    assert!(err.is_collaborator());
}

#[tokio::test]
async fn test_embedder_failure_propagates_through_insert() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/embeddings")
        .with_status(500)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let embedder = HttpEmbedder::builder()
        .model("m")
        .base_url(server.url())
        .build()
        .unwrap();
    let store = LocalVectorStore::open(dir.path(), Default::default())
        .await
        .unwrap();
    let facade = SemanticStore::from_parts(Arc::new(embedder), Arc::new(store));
    let c = facade.set_active_collection("remote").await.unwrap();
    let err = c.insert("hello", None, None).await.unwrap_err();
    assert!(matches!(err, Error::Embedder { .. }));
    assert_eq!(c.count().await.unwrap(), 0);
}
