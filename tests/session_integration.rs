//! Session integration tests.
//!
//! The first group runs against the scripted engine through the public
//! API. The second needs real `python3` / `node` binaries and is ignored
//! by default.

use std::sync::Arc;
use std::time::Duration;

use playground_runtime::engine::{NodeScriptHost, PythonLoader};
use playground_runtime::execution::{ExecutionRequest, FailureKind, Language};
use playground_runtime::testing::{ScriptedHost, ScriptedLoader};
use playground_runtime::{PlaygroundError, SessionConfig, SessionManager, SessionStatus};

fn scripted(loader: ScriptedLoader) -> SessionManager {
    SessionManager::new(SessionConfig::without_prewarm(), loader, ScriptedHost::new())
}

// ============================================================================
// Scripted Engine
// ============================================================================

#[tokio::test]
async fn test_background_initialize_then_execute() {
    let session = Arc::new(scripted(
        ScriptedLoader::new().delay(Duration::from_millis(50)),
    ));

    let init = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.initialize().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Still loading: rejected, status untouched.
    assert!(matches!(
        session.execute("print('early')").await,
        Err(PlaygroundError::NotReady(SessionStatus::Initializing))
    ));
    assert_eq!(session.status(), SessionStatus::Initializing);

    init.await.unwrap().unwrap();
    let result = session.execute("print('late')").await.unwrap();
    assert_eq!(result.stdout, "late\n");
}

#[tokio::test]
async fn test_recovery_status_line_precedes_retry_output() {
    let session = scripted(ScriptedLoader::new().installable(["statsmodels"]));
    session.initialize().await.unwrap();

    let result = session
        .execute("print('loading'); import statsmodels.api; print('fitted')")
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(
        result.stdout,
        "loading\nInstalling missing module 'statsmodels'...\nloading\nfitted\n"
    );
    assert_eq!(session.installed_modules(), vec!["statsmodels"]);
}

#[tokio::test]
async fn test_recovered_module_is_not_reinstalled() {
    let loader = ScriptedLoader::new().installable(["numpy"]);
    let session = scripted(loader.clone());
    session.initialize().await.unwrap();

    session.execute("import numpy").await.unwrap();
    session.install_package("numpy").await.unwrap();
    let again = session.execute("import numpy").await.unwrap();

    assert!(again.installed.is_empty());
    assert_eq!(loader.probe().install_calls(), vec!["numpy".to_string()]);
}

#[tokio::test]
async fn test_cancel_token_stops_execution() {
    let loader = ScriptedLoader::new();
    let session = scripted(loader.clone());
    session.initialize().await.unwrap();

    let request = ExecutionRequest::new("print('spinning'); hang");
    let token = request.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let result = session.execute_request(request).await.unwrap();
    assert_eq!(result.failure_kind(), Some(FailureKind::Cancelled));
    assert_eq!(result.stdout, "spinning\n");
    assert_eq!(loader.probe().interrupt_count(), 1);
    assert_eq!(session.status(), SessionStatus::Ready);
}

#[tokio::test]
async fn test_cancel_during_recovery_releases_session() {
    let loader = ScriptedLoader::new()
        .installable(["statsmodels"])
        .install_delay(Duration::from_secs(30));
    let session = Arc::new(scripted(loader.clone()));
    session.initialize().await.unwrap();

    let request = ExecutionRequest::new("import statsmodels");
    let token = request.cancel.clone();
    let running = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.execute_request(request).await }
    });
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert!(matches!(
        session.execute("print('waiting')").await,
        Err(PlaygroundError::Busy)
    ));

    token.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("cancelled install should return promptly")
        .unwrap()
        .unwrap();
    assert_eq!(result.failure_kind(), Some(FailureKind::Cancelled));
    assert!(session.installed_modules().is_empty());

    let next = session.execute("print('free')").await.unwrap();
    assert_eq!(next.stdout, "free\n");
}

#[tokio::test]
async fn test_output_limit() {
    let config = SessionConfig {
        executor: playground_runtime::execution::ExecutorConfig {
            max_output_size: 8,
            ..Default::default()
        },
        ..SessionConfig::without_prewarm()
    };
    let session = SessionManager::new(config, ScriptedLoader::new(), ScriptedHost::new());
    session.initialize().await.unwrap();

    let result = session
        .execute("print('0123456789'); print('more')")
        .await
        .unwrap();
    assert!(result.stdout.starts_with("01234567"));
    assert!(result.stdout.ends_with("[output truncated]\n"));
    assert_eq!(result.stdout.matches("[output truncated]").count(), 1);
}

// ============================================================================
// Real Interpreters (ignored by default)
// ============================================================================

async fn python_session() -> SessionManager {
    let session = SessionManager::new(
        SessionConfig::without_prewarm(),
        PythonLoader::default(),
        NodeScriptHost::default(),
    );
    session.initialize().await.unwrap();
    session
}

#[tokio::test]
#[ignore = "Requires python3 on PATH"]
async fn test_python_isolation_between_executions() {
    let session = python_session().await;

    session.execute("secret = 1").await.unwrap();
    let result = session.execute("'secret' in globals()").await.unwrap();
    assert_eq!(result.value.as_deref(), Some("False"));
}

#[tokio::test]
#[ignore = "Requires python3 on PATH"]
async fn test_python_failure_then_success() {
    let session = python_session().await;

    let failed = session.execute("print('x')\n1/0").await.unwrap();
    assert_eq!(failed.stdout, "x\n");
    assert!(failed.error_description().unwrap().contains("ZeroDivisionError"));
    assert_eq!(session.status(), SessionStatus::Ready);

    let ok = session.execute("print('ok')").await.unwrap();
    assert_eq!(ok.stdout, "ok\n");
}

#[tokio::test]
#[ignore = "Requires python3 on PATH"]
async fn test_python_timeout_recovers_engine() {
    let session = python_session().await;

    let request = ExecutionRequest::new("while True: pass").timeout(Duration::from_millis(300));
    let result = session.execute_request(request).await.unwrap();
    assert_eq!(result.failure_kind(), Some(FailureKind::Timeout));

    let next = session.execute("6 * 7").await.unwrap();
    assert_eq!(next.value.as_deref(), Some("42"));
}

#[tokio::test]
#[ignore = "Requires python3 on PATH"]
async fn test_python_timeout_keeps_partial_output() {
    let session = python_session().await;

    let request = ExecutionRequest::new("print('tick')\nimport time\ntime.sleep(5)")
        .timeout(Duration::from_millis(500));
    let result = session.execute_request(request).await.unwrap();

    assert_eq!(result.failure_kind(), Some(FailureKind::Timeout));
    assert_eq!(result.stdout, "tick\n");
}

#[tokio::test]
#[ignore = "Requires python3 on PATH"]
async fn test_python_builtins_do_not_leak() {
    let session = python_session().await;

    session
        .execute("import builtins\nbuiltins.leak = 41")
        .await
        .unwrap();
    let result = session.execute("leak + 1").await.unwrap();

    assert!(result.value.is_none());
    assert!(result.error_description().unwrap().contains("NameError"));
}

#[tokio::test]
#[ignore = "Requires python3 on PATH"]
async fn test_python_input_does_not_block() {
    let session = python_session().await;
    let result = session.execute("input()").await.unwrap();
    assert!(result.error_description().unwrap().contains("EOFError"));
}

#[tokio::test]
#[ignore = "Requires node on PATH"]
async fn test_node_alternate_language() {
    let session = python_session().await;
    let result = session
        .execute_request(
            ExecutionRequest::new("console.log('hi'); undefinedFn()").language(Language::JavaScript),
        )
        .await
        .unwrap();

    assert_eq!(result.stdout, "hi\n");
    assert!(result.error_description().unwrap().starts_with("ReferenceError"));
}
