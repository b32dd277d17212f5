//! API integration tests.
//!
//! These tests drive the complete router with axum's test utilities. The
//! session runs on the scripted engine so no interpreter is needed.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use playground_runtime::api::create_router;
use playground_runtime::session::{SessionConfig, SessionManager};
use playground_runtime::testing::{ScriptedHost, ScriptedLoader};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Helper to create a JSON request.
fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Helper to extract body as string.
async fn response_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&body).to_string()
}

/// Helper to extract JSON from response.
async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

fn session(loader: ScriptedLoader) -> Arc<SessionManager> {
    Arc::new(SessionManager::new(
        SessionConfig::without_prewarm(),
        loader,
        ScriptedHost::new(),
    ))
}

async fn ready_app(loader: ScriptedLoader) -> Router {
    let session = session(loader);
    session.initialize().await.unwrap();
    create_router(session)
}

// ============================================================================
// Health & Info Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(session(ScriptedLoader::new()));

    let response = app
        .oneshot(json_request(Method::GET, "/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_text(response).await, "OK");
}

#[tokio::test]
async fn test_api_info_endpoint() {
    let app = create_router(session(ScriptedLoader::new()));

    let response = app
        .oneshot(json_request(Method::GET, "/api/v1/", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["name"], "playground-runtime");
    assert_eq!(json["status"], "initializing");
}

// ============================================================================
// Session Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_session_status_before_initialize() {
    let app = create_router(session(ScriptedLoader::new()));

    let response = app
        .oneshot(json_request(Method::GET, "/api/v1/session", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["status"], "initializing");
    assert_eq!(json["executions"], 0);
}

#[tokio::test]
async fn test_initialize_endpoint() {
    let loader = ScriptedLoader::new();
    let app = create_router(session(loader.clone()));

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/v1/session/initialize", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["status"], "ready");
    }

    assert_eq!(loader.load_count(), 1);
}

#[tokio::test]
async fn test_initialize_failure_is_internal_error() {
    let app = create_router(session(ScriptedLoader::new().failing("python3 not found")));

    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/v1/session/initialize", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = app
        .oneshot(json_request(Method::GET, "/api/v1/session", None))
        .await
        .unwrap();
    assert_eq!(response_json(response).await["status"], "failed");
}

// ============================================================================
// Execution Tests
// ============================================================================

#[tokio::test]
async fn test_execute_not_ready() {
    let app = create_router(session(ScriptedLoader::new()));

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/execute",
            Some(json!({ "source": "print('a')" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response_json(response).await["code"], "NOT_READY");
}

#[tokio::test]
async fn test_execute_success() {
    let app = ready_app(ScriptedLoader::new()).await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/execute",
            Some(json!({ "source": "print('a'); print('b'); x = 7; x" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["stdout"], "a\nb\n");
    assert_eq!(json["value"], "7");
    assert_eq!(json["language"], "python");
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_execute_user_error_is_inline() {
    let app = ready_app(ScriptedLoader::new()).await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/execute",
            Some(json!({ "source": "print('before'); 1/0" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["stdout"], "before\n");
    assert_eq!(json["error"]["kind"], "evaluation");
    assert!(json["error"]["description"]
        .as_str()
        .unwrap()
        .contains("ZeroDivisionError"));
}

#[tokio::test]
async fn test_execute_recovers_missing_module() {
    let app = ready_app(ScriptedLoader::new().installable(["pandas"])).await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/execute",
            Some(json!({ "source": "import pandas; print('ok')" })),
        ))
        .await
        .unwrap();

    let json = response_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["installed"], json!(["pandas"]));
    assert_eq!(
        json["stdout"],
        "Installing missing module 'pandas'...\nok\n"
    );
}

#[tokio::test]
async fn test_execute_javascript() {
    let app = create_router(session(ScriptedLoader::new()));

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/execute",
            Some(json!({ "source": "log hello; 3", "language": "javascript" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["stdout"], "hello\n");
    assert_eq!(json["value"], "3");
    assert_eq!(json["language"], "javascript");
}

#[tokio::test]
async fn test_execute_timeout() {
    let app = ready_app(ScriptedLoader::new()).await;

    // One second is the smallest deadline the API accepts.
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/execute",
            Some(json!({ "source": "hang", "timeout_secs": 1 })),
        ))
        .await
        .unwrap();

    let json = response_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["kind"], "timeout");
}

#[tokio::test]
async fn test_execute_busy() {
    let session = session(ScriptedLoader::new());
    session.initialize().await.unwrap();
    let app = create_router(Arc::clone(&session));

    let running = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.execute("sleep 200").await }
    });
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/execute",
            Some(json!({ "source": "print('second')" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(response_json(response).await["code"], "BUSY");
    assert!(running.await.unwrap().unwrap().is_success());
}

#[tokio::test]
async fn test_execute_source_too_long() {
    let session = Arc::new(SessionManager::new(
        SessionConfig {
            max_source_length: 4,
            ..SessionConfig::without_prewarm()
        },
        ScriptedLoader::new(),
        ScriptedHost::new(),
    ));
    session.initialize().await.unwrap();
    let app = create_router(session);

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/execute",
            Some(json!({ "source": "print('hello')" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_execute_malformed_body() {
    let app = ready_app(ScriptedLoader::new()).await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/execute",
            Some(json!({ "code": "print(1)" })),
        ))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

// ============================================================================
// Package Tests
// ============================================================================

#[tokio::test]
async fn test_install_and_list_packages() {
    let loader = ScriptedLoader::new().installable(["foo"]);
    let app = ready_app(loader.clone()).await;

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/packages",
            Some(json!({ "name": "foo" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(json_request(Method::GET, "/api/v1/packages", None))
        .await
        .unwrap();
    let json = response_json(response).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["packages"], json!(["foo"]));
    assert_eq!(loader.probe().install_calls(), vec!["foo".to_string()]);
}

#[tokio::test]
async fn test_install_failure_is_bad_gateway() {
    let app = ready_app(ScriptedLoader::new()).await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/packages",
            Some(json!({ "name": "does-not-exist" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = response_json(response).await;
    assert_eq!(json["code"], "INSTALLATION_FAILED");
    assert!(json["details"]
        .as_str()
        .unwrap()
        .contains("no matching distribution"));
}

#[tokio::test]
async fn test_install_invalid_name() {
    let app = ready_app(ScriptedLoader::new()).await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/packages",
            Some(json!({ "name": "numpy; rm -rf /" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Real Interpreter Tests (require python3 - ignored by default)
// ============================================================================

#[tokio::test]
#[ignore = "Requires python3 on PATH"]
async fn test_execute_with_python() {
    use playground_runtime::engine::{NodeScriptHost, PythonLoader};

    let session = Arc::new(SessionManager::new(
        SessionConfig::without_prewarm(),
        PythonLoader::default(),
        NodeScriptHost::default(),
    ));
    session.initialize().await.unwrap();
    let app = create_router(session);

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/execute",
            Some(json!({ "source": "print('a')\nprint('b')\n1 + 1" })),
        ))
        .await
        .unwrap();

    let json = response_json(response).await;
    assert_eq!(json["stdout"], "a\nb\n");
    assert_eq!(json["value"], "2");
}
