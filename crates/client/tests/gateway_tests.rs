// Wire-level tests for the authorized request gateway: credential
// attachment and normalization, 401-triggered invalidation, and the
// failure taxonomy.

mod common;

use common::{TestContext, can_bind_localhost};
use httpmock::Method::GET;
use httpmock::MockServer;
use labrec_client::{Error, ReferenceRangeRegistry, SessionManager, fetch_summary};
use labrec_core::ReferenceRange;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_bearer_scheme_is_prepended_to_raw_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/dashboard/summary")
            .header("authorization", "Bearer secret-token");
        then.status(200).json_body(json!({
            "patientCount": 1, "testCount": 2, "abnormalCount": 0
        }));
    });

    let ctx = TestContext::new(&server.base_url());
    ctx.store.set(Some("secret-token".to_string()));

    let summary = fetch_summary(&ctx.gateway).await.unwrap();
    assert_eq!(summary.test_count, 2);
    mock.assert();
}

#[tokio::test]
async fn test_prefixed_token_is_used_verbatim() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/dashboard/summary")
            .header("authorization", "Bearer already-prefixed");
        then.status(200).json_body(json!({
            "patientCount": 0, "testCount": 0, "abnormalCount": 0
        }));
    });

    let ctx = TestContext::new(&server.base_url());
    ctx.store.set(Some("Bearer already-prefixed".to_string()));

    fetch_summary(&ctx.gateway).await.unwrap();
    mock.assert();
}

#[tokio::test]
async fn test_absent_credential_omits_authorization_header() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/dashboard/summary")
            .matches(|req| {
                req.headers.as_ref().map_or(true, |headers| {
                    headers
                        .iter()
                        .all(|(name, _)| !name.eq_ignore_ascii_case("authorization"))
                })
            });
        then.status(200).json_body(json!({
            "patientCount": 0, "testCount": 0, "abnormalCount": 0
        }));
    });

    let ctx = TestContext::new(&server.base_url());
    assert_eq!(ctx.store.get(), None);

    fetch_summary(&ctx.gateway).await.unwrap();
    mock.assert();
}

#[tokio::test]
async fn test_401_clears_credentials_even_from_unrelated_component() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/reference_ranges/");
        then.status(401).json_body(json!({ "msg": "Token has expired" }));
    });

    let ctx = TestContext::new(&server.base_url());
    ctx.store.set(Some("stale-token".to_string()));

    let session = SessionManager::new(Arc::clone(&ctx.gateway), Arc::clone(&ctx.store));
    assert!(session.session().authenticated);

    // The registry, not the session manager, issues the rejected call.
    let mut registry = ReferenceRangeRegistry::new();
    registry.refresh(&ctx.gateway).await;

    assert!(registry.error().unwrap().contains("authorization failed"));
    assert_eq!(ctx.store.get(), None);
    assert!(!session.session().authenticated);
}

#[tokio::test]
async fn test_401_surfaces_an_authorization_error_to_the_caller() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/reference_ranges/");
        then.status(401).json_body(json!({ "msg": "Token has expired" }));
    });

    let ctx = TestContext::new(&server.base_url());
    ctx.store.set(Some("stale-token".to_string()));

    let err = ctx
        .gateway
        .get_page::<ReferenceRange>("/api/reference_ranges/", &[])
        .await
        .unwrap_err();

    assert!(err.is_authorization(), "got {err:?}");
    assert!(err.to_string().contains("Token has expired"));
    assert_eq!(ctx.store.get(), None);
}

#[tokio::test]
async fn test_4xx_with_details_is_a_validation_failure() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/reference_ranges/");
        then.status(422).json_body(json!({
            "error": "normal_max must be greater than normal_min.",
            "details": { "normal_max": "must be greater than normal_min" }
        }));
    });

    let ctx = TestContext::new(&server.base_url());
    let err = ctx
        .gateway
        .get_page::<ReferenceRange>("/api/reference_ranges/", &[])
        .await
        .unwrap_err();

    match err {
        Error::Validation { message, details } => {
            assert_eq!(message, "normal_max must be greater than normal_min.");
            assert_eq!(
                details.get("normal_max").map(String::as_str),
                Some("must be greater than normal_min")
            );
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_5xx_is_a_server_failure() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/dashboard/summary");
        then.status(500)
            .json_body(json!({ "error": "Failed to fetch dashboard data" }));
    });

    let ctx = TestContext::new(&server.base_url());
    let err = fetch_summary(&ctx.gateway).await.unwrap_err();
    assert!(matches!(err, Error::Server(_)), "got {err:?}");
    assert!(err.to_string().contains("Failed to fetch dashboard data"));
}

#[tokio::test]
async fn test_success_body_with_wrong_shape_fails_loudly() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    // A bare array instead of the {data, pagination} envelope.
    server.mock(|when, then| {
        when.method(GET).path("/api/reference_ranges/");
        then.status(200).json_body(json!([
            { "id": 1, "parameter": "Hemoglobin", "normal_min": 13.0, "normal_max": 17.0, "units": "g/dL" }
        ]));
    });

    let ctx = TestContext::new(&server.base_url());
    let err = ctx
        .gateway
        .get_page::<ReferenceRange>("/api/reference_ranges/", &[])
        .await
        .unwrap_err();

    match err {
        Error::Server(message) => assert!(message.contains("malformed response body")),
        other => panic!("expected server failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_is_a_network_failure_not_authorization() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/dashboard/summary");
        then.status(200)
            .delay(std::time::Duration::from_millis(1500))
            .json_body(json!({ "patientCount": 0, "testCount": 0, "abnormalCount": 0 }));
    });

    let ctx = TestContext::with_timeout(&server.base_url(), 1);
    ctx.store.set(Some("secret-token".to_string()));

    let err = fetch_summary(&ctx.gateway).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)), "got {err:?}");
    // A timeout is not an authorization failure: the credential survives.
    assert_eq!(ctx.store.get().as_deref(), Some("secret-token"));
}
