//! The session manager: one interpreter, one execution at a time.

use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::validation::{preview, validate_module_name, validate_source};
use super::{SessionContext, SessionStatus};
use crate::engine::{EngineLoader, InterpreterEngine, ScriptHost};
use crate::error::PlaygroundError;
use crate::execution::{ExecutionRequest, ExecutionResult, Executor, ExecutorConfig, Language};
use crate::Result;

/// Default limit on source text length in bytes.
pub const DEFAULT_MAX_SOURCE_LENGTH: usize = 64 * 1024;

/// Modules installed during `initialize` by default.
pub const DEFAULT_PREWARM: &[&str] = &["numpy", "pandas", "scipy", "statsmodels", "matplotlib"];

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Modules installed while initializing. Failures are logged only.
    pub prewarm: Vec<String>,
    /// Executor settings (preserved names, auto-install, output limit).
    pub executor: ExecutorConfig,
    /// Deadline applied when a request carries none.
    pub default_timeout: Option<Duration>,
    /// Longest accepted source text in bytes.
    pub max_source_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prewarm: DEFAULT_PREWARM.iter().map(|s| s.to_string()).collect(),
            executor: ExecutorConfig::default(),
            default_timeout: None,
            max_source_length: DEFAULT_MAX_SOURCE_LENGTH,
        }
    }
}

impl SessionConfig {
    /// Config that skips pre-warming.
    pub fn without_prewarm() -> Self {
        Self {
            prewarm: Vec::new(),
            ..Default::default()
        }
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Installed modules, sorted.
    pub installed_modules: Vec<String>,
    /// Completed executions.
    pub executions: u64,
    /// Executions that ended with a failure.
    pub failures: u64,
    /// Recovery cycles that reached the retry.
    pub recoveries: u64,
    /// Seconds since the manager was created.
    pub uptime_secs: u64,
}

/// Owns one interpreter engine and mediates every execution against it.
///
/// At most one execution or installation holds the engine at a time. A
/// second caller is rejected with [`PlaygroundError::Busy`] rather than
/// queued, so two calls can never share the output capture.
pub struct SessionManager {
    config: SessionConfig,
    executor: Executor,
    loader: Box<dyn EngineLoader>,
    host: Box<dyn ScriptHost>,
    status: RwLock<SessionStatus>,
    engine: Mutex<Option<Box<dyn InterpreterEngine>>>,
    init_lock: Mutex<()>,
    context: RwLock<SessionContext>,
    created_at: Instant,
}

impl SessionManager {
    /// Create a manager. Nothing is loaded until [`initialize`](Self::initialize).
    pub fn new<L, H>(config: SessionConfig, loader: L, host: H) -> Self
    where
        L: EngineLoader + 'static,
        H: ScriptHost + 'static,
    {
        Self {
            executor: Executor::new(config.executor.clone()),
            config,
            loader: Box::new(loader),
            host: Box::new(host),
            status: RwLock::new(SessionStatus::Initializing),
            engine: Mutex::new(None),
            init_lock: Mutex::new(()),
            context: RwLock::new(SessionContext::new()),
            created_at: Instant::now(),
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current lifecycle status.
    pub fn status(&self) -> SessionStatus {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Installed modules, sorted.
    pub fn installed_modules(&self) -> Vec<String> {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .installed_modules()
    }

    /// Status plus counters.
    pub fn snapshot(&self) -> SessionSnapshot {
        let status = self.status();
        let ctx = self.context.read().unwrap_or_else(PoisonError::into_inner);
        SessionSnapshot {
            status,
            installed_modules: ctx.installed_modules(),
            executions: ctx.execution_count(),
            failures: ctx.failure_count(),
            recoveries: ctx.recovery_count(),
            uptime_secs: self.created_at.elapsed().as_secs(),
        }
    }

    fn transition(&self, target: SessionStatus) -> Result<()> {
        let mut status = self
            .status
            .write()
            .map_err(|_| PlaygroundError::LockPoisoned)?;
        let from = *status;
        status.transition_to(target)?;
        info!(from = ?from, to = ?target, "session status changed");
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.status() {
            SessionStatus::Ready => Ok(()),
            other => Err(PlaygroundError::NotReady(other)),
        }
    }

    /// Acquire the interpreter engine and pre-warm modules.
    ///
    /// Idempotent: a no-op once Ready. Concurrent callers are serialized,
    /// so only one acquisition ever runs; the others wait and then see
    /// Ready. Calling again after a failure retries the acquisition.
    pub async fn initialize(&self) -> Result<()> {
        let _init = self.init_lock.lock().await;

        match self.status() {
            SessionStatus::Ready => {
                debug!("session already initialized");
                return Ok(());
            }
            SessionStatus::Failed => self.transition(SessionStatus::Initializing)?,
            SessionStatus::Initializing => {}
        }

        info!("initializing session");
        let start = Instant::now();

        let mut engine = match self.loader.load().await {
            Ok(engine) => engine,
            Err(e) => {
                error!("failed to load interpreter engine: {}", e);
                self.transition(SessionStatus::Failed)?;
                return Err(e.into());
            }
        };

        self.prewarm(engine.as_mut()).await;

        *self.engine.lock().await = Some(engine);
        self.transition(SessionStatus::Ready)?;
        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            modules = self.installed_modules().len(),
            "session ready"
        );
        Ok(())
    }

    async fn prewarm(&self, engine: &mut dyn InterpreterEngine) {
        for module in &self.config.prewarm {
            if let Err(e) = validate_module_name(module) {
                warn!(module = %module, "skipping pre-warm: {}", e);
                continue;
            }
            match self.executor.install(engine, &self.context, module).await {
                Ok(_) => debug!(module = %module, "pre-warmed"),
                Err(e) => warn!(module = %module, "pre-warm failed: {}", e),
            }
        }
    }

    /// Run Python source with the session's default deadline.
    pub async fn execute(&self, source: &str) -> Result<ExecutionResult> {
        let request = ExecutionRequest::new(source).maybe_timeout(self.config.default_timeout);
        self.execute_request(request).await
    }

    /// Run a request.
    ///
    /// Python requests need a Ready session and the engine to be free.
    /// JavaScript requests go to the script host.
    pub async fn execute_request(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        if !request.language.uses_interpreter() {
            return self.run_on_host(request).await;
        }

        self.ensure_ready()?;
        validate_source(&request.source, self.config.max_source_length)?;

        let request = if request.timeout.is_none() {
            request.maybe_timeout(self.config.default_timeout)
        } else {
            request
        };

        let mut guard = self.engine.try_lock().map_err(|_| {
            debug!("rejecting execution: engine busy");
            PlaygroundError::Busy
        })?;
        let engine = guard
            .as_mut()
            .ok_or_else(|| PlaygroundError::NotReady(self.status()))?;

        debug!(source = %preview(&request.source), "executing");
        self.executor
            .run(engine.as_mut(), &self.context, &request)
            .await
    }

    /// Install a module into the interpreter.
    ///
    /// Already-installed modules return immediately without touching the
    /// installer. Installer failures are raised verbatim and not retried.
    pub async fn install_package(&self, name: &str) -> Result<()> {
        validate_module_name(name)?;
        self.ensure_ready()?;

        let cached = self
            .context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_installed(name);
        if cached {
            debug!(module = name, "module already installed");
            return Ok(());
        }

        let mut guard = self.engine.try_lock().map_err(|_| PlaygroundError::Busy)?;
        let engine = guard
            .as_mut()
            .ok_or_else(|| PlaygroundError::NotReady(self.status()))?;

        self.executor
            .install(engine.as_mut(), &self.context, name)
            .await?;
        Ok(())
    }

    /// Run JavaScript source on the script host.
    ///
    /// Script errors come back inline, exactly like interpreter failures.
    pub async fn execute_alternate_language(&self, source: &str) -> Result<ExecutionResult> {
        let request = ExecutionRequest::new(source)
            .language(Language::JavaScript)
            .maybe_timeout(self.config.default_timeout);
        self.run_on_host(request).await
    }

    async fn run_on_host(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        validate_source(&request.source, self.config.max_source_length)?;
        let request = if request.timeout.is_none() {
            request.maybe_timeout(self.config.default_timeout)
        } else {
            request
        };

        debug!(host = self.host.name(), source = %preview(&request.source), "executing script");
        self.executor
            .run_script(self.host.as_ref(), &self.context, &request)
            .await
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("status", &self.status())
            .field("host", &self.host.name())
            .field("config", &self.config)
            .finish()
    }
}
