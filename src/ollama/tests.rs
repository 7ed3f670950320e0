use super::*;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

fn client_for(server: &MockServer) -> OllamaClient {
    let uri = Url::parse(&server.uri()).expect("mock server uri should parse");
    let config = OllamaConfig {
        host: uri.host_str().expect("mock server has a host").to_string(),
        port: uri.port().expect("mock server has a port"),
        embedding_model: "test-embed".to_string(),
        batch_size: 2,
        ..OllamaConfig::default()
    };
    OllamaClient::new(&config)
        .expect("Failed to create client")
        .with_backoff(Duration::from_millis(1))
}

fn options() -> GenerationOptions {
    GenerationOptions {
        model: "test-llm".to_string(),
        max_output_tokens: 500,
        temperature: 0.5,
    }
}

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        embedding_model: "test-model".to_string(),
        batch_size: 128,
        timeout_seconds: 10,
        retry_attempts: 4,
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.embedding_model, "test-model");
    assert_eq!(client.model_id(), "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, 4);
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(0)
        .with_backoff(Duration::from_millis(5));

    assert_eq!(client.retry_attempts, 1);
    assert_eq!(client.backoff, Duration::from_millis(5));

    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_retry_attempts(u32::MAX);
    assert_eq!(client.retry_attempts, 10);
}

#[tokio::test]
async fn embeddings_are_batched() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "model": "test-embed", "input": ["a", "b"] })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "embeddings": [[1.0, 0.0], [0.0, 1.0]] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "input": ["c"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[0.5, 0.5]] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let vectors = tokio::task::spawn_blocking(move || client.embed_documents(&texts))
        .await
        .expect("blocking task should finish")
        .expect("embedding should succeed");

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]);
}

#[tokio::test]
async fn query_embedding_returns_single_vector() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "input": ["who is bilbo"] })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[0.1, 0.2, 0.3]] })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let vector = tokio::task::spawn_blocking(move || client.embed_query("who is bilbo"))
        .await
        .expect("blocking task should finish")
        .expect("embedding should succeed");

    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn embedding_count_mismatch_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[1.0]] })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let texts = vec!["a".to_string(), "b".to_string()];
    let result = tokio::task::spawn_blocking(move || client.embed_documents(&texts))
        .await
        .expect("blocking task should finish");

    let message = format!("{:#}", result.expect_err("mismatch should fail"));
    assert!(message.contains("Mismatch"), "unexpected error: {}", message);
}

#[tokio::test]
async fn generate_sends_sampling_options() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "test-llm",
            "prompt": "Speak, friend",
            "stream": false,
            "options": { "num_predict": 500, "temperature": 0.5 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "test-llm",
            "response": "Mellon.",
            "done": true,
            "done_reason": "stop"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let answer = tokio::task::spawn_blocking(move || client.generate("Speak, friend", &options()))
        .await
        .expect("blocking task should finish")
        .expect("generation should succeed");

    assert_eq!(answer, "Mellon.");
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "response": "second time lucky" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).with_retry_attempts(3);
    let answer = tokio::task::spawn_blocking(move || client.generate("prompt", &options()))
        .await
        .expect("blocking task should finish")
        .expect("retry should recover");

    assert_eq!(answer, "second time lucky");
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).with_retry_attempts(3);
    let result = tokio::task::spawn_blocking(move || client.generate("prompt", &options()))
        .await
        .expect("blocking task should finish");

    let message = format!("{:#}", result.expect_err("404 should fail"));
    assert!(message.contains("404"), "unexpected error: {}", message);
}

#[tokio::test]
async fn health_check_reports_missing_model() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "test-embed", "size": 1024, "digest": "abc" }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ok_client = client.clone();
    let ok = tokio::task::spawn_blocking(move || ok_client.health_check(&["test-embed"]))
        .await
        .expect("blocking task should finish");
    assert!(ok.is_ok(), "health check failed: {:?}", ok);

    let missing = tokio::task::spawn_blocking(move || client.health_check(&["test-embed", "gone"]))
        .await
        .expect("blocking task should finish");
    let message = missing.expect_err("missing model should fail").to_string();
    assert!(message.contains("gone"), "unexpected error: {}", message);
}
