use axum::http::StatusCode;
use consent_bridge::error::BackendError;
use consent_bridge::hydra::{AcceptConsent, AuthorizationBackend, HydraAdminClient, RejectConsent};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HydraAdminClient {
    HydraAdminClient::new(&server.uri(), Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn fetches_consent_request_by_challenge() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/oauth2/auth/requests/consent"))
        .and(query_param("consent_challenge", "chal1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "challenge": "chal1",
            "subject": "sub1",
            "requested_scope": ["openid", "profile"],
            "requested_access_token_audience": ["https://api.example.org"],
            "skip": false,
            "client": {"client_id": "client-1", "client_name": "Example App"},
            "request_url": "https://auth.example.org/oauth2/auth?client_id=client-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = client(&server).get_consent_request("chal1").await.unwrap();
    assert_eq!(request.subject, "sub1");
    assert_eq!(request.requested_scope, vec!["openid", "profile"]);
    assert_eq!(request.client_display_name(), "Example App");
    assert!(!request.skip);
}

#[tokio::test]
async fn accept_sends_grant_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/admin/oauth2/auth/requests/consent/accept"))
        .and(query_param("consent_challenge", "chal1"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "grant_scope": ["openid"],
            "grant_access_token_audience": [],
            "remember": true,
            "remember_for": 3600
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"redirect_to": "https://auth.example.org/done"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let grant = AcceptConsent {
        grant_scope: vec!["openid".into()],
        grant_access_token_audience: vec![],
        remember: true,
        remember_for: 3600,
    };
    let completed = client(&server)
        .accept_consent_request("chal1", &grant)
        .await
        .unwrap();
    assert_eq!(completed.redirect_to, "https://auth.example.org/done");
}

#[tokio::test]
async fn reject_sends_rejected_by_user() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/admin/oauth2/auth/requests/consent/reject"))
        .and(query_param("consent_challenge", "chal1"))
        .and(body_json(json!({
            "error": "rejected_by_user",
            "error_description": "The resource owner rejected the request"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"redirect_to": "https://client.example.org/cb?error=access_denied"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let completed = client(&server)
        .reject_consent_request("chal1", &RejectConsent::by_user())
        .await
        .unwrap();
    assert_eq!(
        completed.redirect_to,
        "https://client.example.org/cb?error=access_denied"
    );
}

#[tokio::test]
async fn introspection_posts_form_encoded_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/oauth2/introspect"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("token=abc%2B123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"active": true, "sub": "sub1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let introspection = client(&server).introspect_token("abc+123").await.unwrap();
    assert!(introspection.active);
    assert_eq!(introspection.sub.as_deref(), Some("sub1"));
}

#[tokio::test]
async fn inactive_introspection_has_no_subject() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/oauth2/introspect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"active": false})))
        .mount(&server)
        .await;

    let introspection = client(&server).introspect_token("abc").await.unwrap();
    assert!(!introspection.active);
    assert_eq!(introspection.sub, None);
}

#[tokio::test]
async fn non_success_status_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/oauth2/auth/requests/consent"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "Not Found",
            "error_description": "Unable to locate the resource"
        })))
        .mount(&server)
        .await;

    let err = client(&server).get_consent_request("gone").await.unwrap_err();
    match err {
        BackendError::Http { status, context } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert!(context.contains("Unable to locate the resource"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn error_context_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/oauth2/introspect"))
        .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(4096)))
        .mount(&server)
        .await;

    match client(&server).introspect_token("abc").await.unwrap_err() {
        BackendError::Http { context, .. } => assert_eq!(context.len(), 512),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_json_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/admin/oauth2/auth/requests/consent/reject"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .reject_consent_request("chal1", &RejectConsent::by_user())
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Json(_)));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"challenge": "chal1"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = HydraAdminClient::new(&server.uri(), Duration::from_millis(200)).unwrap();
    let err = client.get_consent_request("chal1").await.unwrap_err();
    assert!(matches!(err, BackendError::Timeout(_)));
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    let client =
        HydraAdminClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let err = client.introspect_token("abc").await.unwrap_err();
    assert!(matches!(err, BackendError::Network(_)));
}
