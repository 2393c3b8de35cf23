//! Appwrite account client tests against a mocked identity service

use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use odialingua::auth::{
    AppwriteAuth, AuthGate, AuthProvider, GateDecision, MemorySecretStore, SecretStore,
};
use odialingua::config::AppwriteConfig;

const PROJECT: &str = "odialingua-test";

fn appwrite_config(server: &MockServer) -> AppwriteConfig {
    AppwriteConfig {
        endpoint: format!("{}/v1", server.uri()),
        project_id: PROJECT.to_string(),
        ..Default::default()
    }
}

async fn mount_account(server: &MockServer, secret: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/account"))
        .and(header("X-Appwrite-Project", PROJECT))
        .and(header("X-Appwrite-Session", secret))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "$id": "u1",
            "name": "Asha",
            "email": "asha@example.com",
            "status": true
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_get_user_with_valid_secret() {
    let server = MockServer::start().await;
    mount_account(&server, "good").await;

    let store = Arc::new(MemorySecretStore::with_secret(PROJECT, "good"));
    let auth = AppwriteAuth::new(&appwrite_config(&server), store).unwrap();

    let user = auth.get_user().await.unwrap().unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(user.email, "asha@example.com");
    assert!(matches!(AuthGate::check(&auth).await, GateDecision::Allow(_)));
}

#[tokio::test]
async fn test_rejected_secret_redirects_to_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/account"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "User (role: guests) missing scope (account)",
            "code": 401
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySecretStore::with_secret(PROJECT, "stale"));
    let auth = AppwriteAuth::new(&appwrite_config(&server), store).unwrap();

    assert!(auth.get_user().await.unwrap().is_none());
    assert_eq!(AuthGate::check(&auth).await, GateDecision::RedirectToLogin);
}

#[tokio::test]
async fn test_complete_login_stores_verified_secret() {
    let server = MockServer::start().await;
    mount_account(&server, "fresh").await;

    let store = Arc::new(MemorySecretStore::new());
    let auth = AppwriteAuth::new(&appwrite_config(&server), store.clone()).unwrap();

    let user = auth.complete_login(" fresh ").await.unwrap();
    assert_eq!(user.name, "Asha");
    assert_eq!(store.load(PROJECT).unwrap().unwrap().secret, "fresh");
}

#[tokio::test]
async fn test_complete_login_discards_rejected_secret() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/account"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySecretStore::new());
    let auth = AppwriteAuth::new(&appwrite_config(&server), store.clone()).unwrap();

    let err = tokio_test::assert_err!(auth.complete_login("bogus").await);
    assert!(err.to_string().contains("rejected"));
    assert!(store.load(PROJECT).unwrap().is_none());
}

#[tokio::test]
async fn test_check_session_reads_current_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/account/sessions/current"))
        .and(header("X-Appwrite-Session", "good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"$id": "sess"})))
        .mount(&server)
        .await;

    let auth = AppwriteAuth::new(
        &appwrite_config(&server),
        Arc::new(MemorySecretStore::with_secret(PROJECT, "good")),
    )
    .unwrap();
    assert!(auth.check_session().await);

    let anonymous =
        AppwriteAuth::new(&appwrite_config(&server), Arc::new(MemorySecretStore::new())).unwrap();
    assert!(!anonymous.check_session().await);
}

#[tokio::test]
async fn test_logout_deletes_remote_and_local_session() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/account/sessions/current"))
        .and(header("X-Appwrite-Session", "good"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySecretStore::with_secret(PROJECT, "good"));
    let auth = AppwriteAuth::new(&appwrite_config(&server), store.clone()).unwrap();

    tokio_test::assert_ok!(auth.logout_user().await);
    assert!(store.load(PROJECT).unwrap().is_none());
}

#[tokio::test]
async fn test_logout_forgets_secret_even_when_remote_fails() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/account/sessions/current"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySecretStore::with_secret(PROJECT, "good"));
    let auth = AppwriteAuth::new(&appwrite_config(&server), store.clone()).unwrap();

    auth.logout_user().await.unwrap();
    assert!(store.load(PROJECT).unwrap().is_none());
}
