//! Transport tests against a mock HTTP server.
//!
//! The blocking `reqwest` client runs on its own runtime, so every call is
//! made from `spawn_blocking`.

use appconf_client::{BearerTokenAuthorizer, ClientConfig, Transport};
use appconf_core::{AppConfigError, AppConfigResult, ContentType, Label, Payload};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn with_transport<T, F>(server: &MockServer, call: F) -> AppConfigResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Transport) -> AppConfigResult<T> + Send + 'static,
{
    let endpoint = server.uri();
    tokio::task::spawn_blocking(move || {
        let transport = Transport::connect(
            endpoint,
            Arc::new(BearerTokenAuthorizer::new("t0k")),
            ClientConfig::new().with_user_agent("appconf-tests"),
        )?;
        call(&transport)
    })
    .await
    .unwrap()
}

fn stored(key: &str, label: &str, value: &str, content_type: &str) -> serde_json::Value {
    json!({
        "key": key,
        "label": label,
        "value": value,
        "content_type": content_type,
        "last_modified": "2024-01-01T00:00:01+00:00",
        "tags": {}
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn get_sends_label_version_and_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/kv/k1"))
        .and(query_param("label", "prod"))
        .and(query_param("api-version", "1.0"))
        .and(header("Authorization", "Bearer t0k"))
        .and(header("User-Agent", "appconf-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored(
            "k1",
            "prod",
            "v1",
            "application/vnd.microsoft.appconfig.kv+json",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let entry = with_transport(&server, |t| t.get(&Label::new("prod"), "k1"))
        .await
        .unwrap();

    assert_eq!(entry.key, "k1");
    assert_eq!(entry.value, "v1");
    assert_eq!(entry.label, Label::new("prod"));
    assert_eq!(entry.content_type, ContentType::KeyValue);
}

#[tokio::test(flavor = "multi_thread")]
async fn unlabelled_get_sends_empty_label() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/kv/k1"))
        .and(query_param("label", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": "k1",
            "label": null,
            "value": "v1",
            "content_type": "application/vnd.microsoft.appconfig.kv+json"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entry = with_transport(&server, |t| t.get(&Label::new("%00"), "k1"))
        .await
        .unwrap();
    assert_eq!(entry.label, Label::None);
    assert!(entry.tags.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn get_404_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/kv/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = with_transport(&server, |t| t.get(&Label::None, "missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppConfigError::NotFound { ref key } if key == "missing"));
}

#[tokio::test(flavor = "multi_thread")]
async fn put_sends_exact_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/kv/k1"))
        .and(header(
            "Content-Type",
            "application/vnd.microsoft.appconfig.kv+json",
        ))
        .and(body_json(json!({
            "Value": "v1",
            "content_type": "application/vnd.microsoft.appconfig.kv+json"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored(
            "k1",
            "",
            "v1",
            "application/vnd.microsoft.appconfig.kv+json",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let entry = with_transport(&server, |t| {
        t.set(&Label::None, "k1", "v1", &ContentType::KeyValue)
    })
    .await
    .unwrap();
    assert_eq!(entry.value, "v1");
}

#[tokio::test(flavor = "multi_thread")]
async fn secret_reference_is_wrapped() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/kv/db-password"))
        .and(body_json(json!({
            "Value": "{\"uri\":\"https://vault.example.io/secrets/db\"}",
            "content_type": "application/vnd.microsoft.appconfig.keyvaultref+json;charset=utf-8"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored(
            "db-password",
            "",
            "{\"uri\":\"https://vault.example.io/secrets/db\"}",
            "application/vnd.microsoft.appconfig.keyvaultref+json;charset=utf-8",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let entry = with_transport(&server, |t| {
        let payload = Payload::secret_reference("https://vault.example.io/secrets/db/v7", true)?;
        t.set_payload(&Label::None, "db-password", &payload)
    })
    .await
    .unwrap();
    assert_eq!(entry.content_type, ContentType::KeyVaultReference);
}

#[tokio::test(flavor = "multi_thread")]
async fn keys_are_percent_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/kv/app%20name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored(
            "app name",
            "",
            "x",
            "application/vnd.microsoft.appconfig.kv+json",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let removed = with_transport(&server, |t| t.delete(&Label::None, "app name"))
        .await
        .unwrap();
    assert!(removed);
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_204_means_nothing_removed() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/kv/k1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let removed = with_transport(&server, |t| t.delete(&Label::None, "k1"))
        .await
        .unwrap();
    assert!(!removed);
}

#[tokio::test(flavor = "multi_thread")]
async fn error_statuses_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/kv/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/kv/throttled"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/kv/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = with_transport(&server, |t| {
        t.set(&Label::None, "forbidden", "v", &ContentType::KeyValue)
    })
    .await
    .unwrap_err();
    assert!(matches!(err, AppConfigError::Forbidden));

    let err = with_transport(&server, |t| t.get(&Label::None, "throttled"))
        .await
        .unwrap_err();
    assert!(err.is_throttled());

    let err = with_transport(&server, |t| t.get(&Label::None, "broken"))
        .await
        .unwrap_err();
    match err {
        AppConfigError::UnexpectedStatus { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn connection_failure_is_unexpected() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = tokio::task::spawn_blocking(move || {
        let transport = Transport::connect(
            endpoint,
            Arc::new(BearerTokenAuthorizer::new("t0k")),
            ClientConfig::default(),
        )?;
        transport.get(&Label::None, "k1")
    })
    .await
    .unwrap()
    .unwrap_err();

    assert!(
        matches!(err, AppConfigError::Unexpected { .. }),
        "got {err:?}"
    );
}
