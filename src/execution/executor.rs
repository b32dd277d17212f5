//! Execution engine: one call from capture to result.

use std::future::Future;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::request::ExecutionRequest;
use super::result::{ExecutionFailure, ExecutionResult};
use crate::engine::{missing_module, EngineError, InterpreterEngine, ScriptHost};
use crate::output::{OutputSink, DEFAULT_MAX_OUTPUT};
use crate::session::SessionContext;
use crate::Result;

/// Names kept across namespace resets by default.
pub const DEFAULT_PRESERVE: &[&str] = &[
    "__builtins__",
    "__name__",
    "__doc__",
    "__loader__",
    "__spec__",
    "__package__",
];

/// Executor settings.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Names that survive a namespace reset.
    pub preserve: Vec<String>,
    /// Whether a missing module triggers the install-and-retry cycle.
    pub auto_install: bool,
    /// Captured output limit in bytes.
    pub max_output_size: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            preserve: DEFAULT_PRESERVE.iter().map(|s| s.to_string()).collect(),
            auto_install: true,
            max_output_size: DEFAULT_MAX_OUTPUT,
        }
    }
}

/// How a single evaluation attempt ended.
enum Attempt {
    Value(Option<String>),
    Raised(EngineError),
    TimedOut(Duration),
    Cancelled,
}

impl Attempt {
    fn into_outcome(self) -> std::result::Result<Option<String>, ExecutionFailure> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Raised(err) => Err(ExecutionFailure::from_engine(&err)),
            Self::TimedOut(after) => Err(ExecutionFailure::timeout(after)),
            Self::Cancelled => Err(ExecutionFailure::cancelled()),
        }
    }
}

/// Slow engine work raced against the request's deadline and cancel token.
enum Guarded<T> {
    Done(T),
    TimedOut(Duration),
    Cancelled,
}

async fn guarded<F: Future>(
    request: &ExecutionRequest,
    deadline: Option<Instant>,
    work: F,
) -> Guarded<F::Output> {
    let expiry = async {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = request.cancel.cancelled() => Guarded::Cancelled,
        _ = expiry => Guarded::TimedOut(request.timeout.unwrap_or_default()),
        output = work => Guarded::Done(output),
    }
}

/// Runs requests against an engine.
///
/// Recovery from a missing module is bounded to a single cycle per call:
/// install once, retry once, and report whatever the retry produced. A
/// second missing module on the retry is terminal.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    /// Create an executor.
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Executor settings.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run a request on the interpreter engine.
    ///
    /// Output is captured for the duration of the call and the engine's
    /// real output is restored on every path out. Errors from user code
    /// are inline in the result; `Err` means the engine itself failed.
    pub async fn run(
        &self,
        engine: &mut dyn InterpreterEngine,
        context: &RwLock<SessionContext>,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult> {
        let start = Instant::now();
        let deadline = request.timeout.map(|d| start + d);
        let sink = OutputSink::with_limit(self.config.max_output_size);

        let captured = match engine.redirect_output(sink.clone()).await {
            Ok(()) => {
                self.run_captured(engine, context, request, deadline, &sink)
                    .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = engine.restore_output().await {
            warn!(engine = engine.name(), "failed to restore output: {}", e);
        }

        let (outcome, installed) = captured?;
        let duration = start.elapsed();
        let stdout = sink.take();

        let result = match outcome {
            Ok(value) => ExecutionResult::success(request.language, stdout, value, duration),
            Err(failure) => {
                ExecutionResult::failure(request.language, stdout, failure, duration)
            }
        }
        .with_installed(installed);

        context
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .record_execution(result.is_success());

        debug!(
            engine = engine.name(),
            duration_ms = duration.as_millis() as u64,
            success = result.is_success(),
            "execution finished"
        );
        Ok(result)
    }

    async fn run_captured(
        &self,
        engine: &mut dyn InterpreterEngine,
        context: &RwLock<SessionContext>,
        request: &ExecutionRequest,
        deadline: Option<Instant>,
        sink: &OutputSink,
    ) -> std::result::Result<
        (std::result::Result<Option<String>, ExecutionFailure>, Vec<String>),
        EngineError,
    > {
        let mut installed = Vec::new();

        let err = match self.attempt(engine, request, deadline).await? {
            Attempt::Raised(err) => err,
            other => return Ok((other.into_outcome(), installed)),
        };

        let module = match missing_module(&err) {
            Some(module) if self.config.auto_install => module,
            _ => return Ok((Err(ExecutionFailure::from_engine(&err)), installed)),
        };

        info!(module = %module, "missing module, starting recovery cycle");
        sink.write_line(&format!("Installing missing module '{}'...", module));

        let guard = guarded(request, deadline, self.install(engine, context, &module)).await;
        let install = match guard {
            Guarded::Done(install) => install,
            Guarded::TimedOut(after) => {
                info!(module = %module, "recovery install timed out, interrupting engine");
                engine.interrupt().await?;
                return Ok((Err(ExecutionFailure::timeout(after)), installed));
            }
            Guarded::Cancelled => {
                info!(module = %module, "recovery install cancelled, interrupting engine");
                engine.interrupt().await?;
                return Ok((Err(ExecutionFailure::cancelled()), installed));
            }
        };

        match install {
            Ok(true) => installed.push(module.clone()),
            Ok(false) => debug!(module = %module, "module already installed, retrying as is"),
            Err(install_err) => {
                warn!(module = %module, "recovery install failed: {}", install_err);
                return Ok((Err(ExecutionFailure::from_engine(&install_err)), installed));
            }
        }

        context
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .record_recovery();

        // Exactly one retry. Whatever it produces is final.
        let retry = self.attempt(engine, request, deadline).await?;
        Ok((retry.into_outcome(), installed))
    }

    /// Reset the namespace and evaluate once, honoring deadline and cancel.
    async fn attempt(
        &self,
        engine: &mut dyn InterpreterEngine,
        request: &ExecutionRequest,
        deadline: Option<Instant>,
    ) -> std::result::Result<Attempt, EngineError> {
        engine.reset_namespace(&self.config.preserve).await?;

        let guard = guarded(request, deadline, engine.evaluate(&request.source)).await;
        let attempt = match guard {
            Guarded::Done(Ok(value)) => Attempt::Value(value),
            Guarded::Done(Err(err)) => Attempt::Raised(err),
            Guarded::TimedOut(after) => Attempt::TimedOut(after),
            Guarded::Cancelled => Attempt::Cancelled,
        };

        if matches!(attempt, Attempt::TimedOut(_) | Attempt::Cancelled) {
            info!(engine = engine.name(), "evaluation abandoned, interrupting engine");
            engine.interrupt().await?;
        }

        Ok(attempt)
    }

    /// Install `name` unless the session already has it.
    ///
    /// Returns `true` if the engine's installer actually ran.
    pub async fn install(
        &self,
        engine: &mut dyn InterpreterEngine,
        context: &RwLock<SessionContext>,
        name: &str,
    ) -> std::result::Result<bool, EngineError> {
        let cached = context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_installed(name);
        if cached {
            debug!(module = name, "module already installed");
            return Ok(false);
        }

        engine.install_module(name).await?;
        context
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .mark_installed(name);
        info!(module = name, "module installed");
        Ok(true)
    }

    /// Run a request on a script host (the non-interpreter path).
    ///
    /// Script errors are inline in the result, the same as on the
    /// interpreter path.
    pub async fn run_script(
        &self,
        host: &dyn ScriptHost,
        context: &RwLock<SessionContext>,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult> {
        let start = Instant::now();
        let expiry = async {
            match request.timeout {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = request.cancel.cancelled() => Err(ExecutionFailure::cancelled()),
            _ = expiry => Err(ExecutionFailure::timeout(request.timeout.unwrap_or_default())),
            outcome = host.run(&request.source) => Ok(outcome?),
        };

        let sink = OutputSink::with_limit(self.config.max_output_size);
        let result = match outcome {
            Ok(script) => {
                for line in &script.logs {
                    sink.write_line(line);
                }
                match script.error {
                    Some(error) => ExecutionResult::failure(
                        request.language,
                        sink.take(),
                        ExecutionFailure::new(super::FailureKind::Evaluation, error),
                        start.elapsed(),
                    ),
                    None => ExecutionResult::success(
                        request.language,
                        sink.take(),
                        script.value,
                        start.elapsed(),
                    ),
                }
            }
            Err(failure) => {
                ExecutionResult::failure(request.language, String::new(), failure, start.elapsed())
            }
        };

        context
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .record_execution(result.is_success());

        debug!(
            host = host.name(),
            duration_ms = result.duration.as_millis() as u64,
            success = result.is_success(),
            "script finished"
        );
        Ok(result)
    }
}
