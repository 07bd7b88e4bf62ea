//! Wire-level tests for the Neon database provisioner.

use serde_json::json;
use taskforge_core::{DatabaseProvisioner, Error};
use taskforge_provision::{NeonConfig, NeonProvisioner};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provisioner(server: &MockServer) -> NeonProvisioner {
    NeonProvisioner::new(NeonConfig {
        api_key: "neon-key".to_string(),
        base_url: server.uri(),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_allocate_returns_id_and_connection_string() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/projects"))
        .and(header("Authorization", "Bearer neon-key"))
        .and(body_json(json!({"project": {"name": "Acme"}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "project": {"id": "proj-123", "name": "Acme"},
            "connection_uris": [
                {"connection_uri": "postgresql://o:pw@ep-a-1.us-east-2.aws.neon.tech/neondb"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let db = provisioner(&server).allocate("Acme").await.unwrap();
    assert_eq!(db.external_id, "proj-123");
    assert_eq!(
        db.connection_string,
        "postgresql://o:pw@ep-a-1.us-east-2.aws.neon.tech/neondb"
    );
}

#[tokio::test]
async fn test_allocate_without_connection_uri_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/projects"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"project": {"id": "proj-1"}})),
        )
        .mount(&server)
        .await;

    let err = provisioner(&server).allocate("Acme").await.unwrap_err();
    assert!(matches!(err, Error::ExternalService { .. }));
}

#[tokio::test]
async fn test_rename_patches_project() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/projects/proj-123"))
        .and(body_json(json!({"project": {"name": "Acme Corp"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "project": {"id": "proj-123", "name": "Acme Corp"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    provisioner(&server)
        .rename("proj-123", "Acme Corp")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_deallocate_error_carries_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/projects/proj-404"))
        .respond_with(ResponseTemplate::new(404).set_body_string("project not found"))
        .mount(&server)
        .await;

    let err = provisioner(&server).deallocate("proj-404").await.unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Neon error: 404"), "{}", message);
    assert!(message.contains("project not found"), "{}", message);
}
