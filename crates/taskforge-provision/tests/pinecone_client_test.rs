//! Wire-level tests for the Pinecone index client.

use serde_json::json;
use taskforge_core::{IndexMetric, IndexSpec, SearchIndexProvisioner, ShadowRecord, VectorStore};
use taskforge_provision::{PineconeClient, PineconeConfig};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> PineconeClient {
    PineconeClient::new(PineconeConfig {
        api_key: "pc-key".to_string(),
        base_url: server.uri(),
        cloud: "aws".to_string(),
        region: "us-east-1".to_string(),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_create_index_sends_serverless_spec() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/indexes"))
        .and(header("Api-Key", "pc-key"))
        .and(body_json(json!({
            "name": "project-1-abcdef",
            "dimension": 768,
            "metric": "cosine",
            "spec": {"serverless": {"cloud": "aws", "region": "us-east-1"}}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"name": "project-1-abcdef"})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .create_index(
            "project-1-abcdef",
            IndexSpec {
                dimension: 768,
                metric: IndexMetric::Cosine,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_index_failure_is_external_error() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/indexes/project-9"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server).delete_index("project-9").await.unwrap_err();
    assert!(err.to_string().starts_with("Pinecone error: 500"));
}

#[tokio::test]
async fn test_upsert_describes_host_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/indexes/project-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "project-1",
            "host": server.uri(),
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(body_json(json!({
            "vectors": [{
                "id": "task-1",
                "values": [0.5, 0.25],
                "metadata": {"title": "Ship it"}
            }],
            "namespace": "group-1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut metadata = serde_json::Map::new();
    metadata.insert("title".to_string(), json!("Ship it"));
    let record = ShadowRecord {
        id: "task-1".to_string(),
        values: vec![0.5, 0.25],
        metadata,
    };

    client
        .upsert("project-1", "group-1", vec![record.clone()])
        .await
        .unwrap();
    client
        .upsert("project-1", "group-1", vec![record])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_many_targets_namespace() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/indexes/project-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"host": server.uri()})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/vectors/delete"))
        .and(body_json(json!({"ids": ["task-7"], "namespace": "group-3"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .delete_many("project-2", "group-3", &["task-7".to_string()])
        .await
        .unwrap();
}
