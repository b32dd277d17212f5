//! Python engine backed by a persistent interpreter process.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, trace, warn};

use super::protocol::{DriverRequest, DriverResponse, INSTALL_ERROR_KIND};
use super::{EngineError, EngineLoader, InterpreterEngine};
use crate::output::OutputSink;

/// Driver program run inside the child interpreter.
const DRIVER: &str = include_str!("driver.py");

/// How long the child gets to send its handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for spawning the Python child.
#[derive(Debug, Clone)]
pub struct PythonEngineConfig {
    /// Interpreter executable.
    pub executable: String,
    /// Working directory for the child.
    pub working_dir: Option<PathBuf>,
    /// Import name to distribution name, e.g. `sklearn` -> `scikit-learn`.
    pub package_aliases: HashMap<String, String>,
}

impl PythonEngineConfig {
    /// Create a config for the given interpreter executable.
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            working_dir: None,
            package_aliases: HashMap::new(),
        }
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add package aliases.
    pub fn aliases<I, K, V>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in aliases {
            self.package_aliases.insert(k.into(), v.into());
        }
        self
    }

    /// Distribution name to install for an import name.
    pub fn package_for<'a>(&'a self, module: &'a str) -> &'a str {
        self.package_aliases
            .get(module)
            .map(String::as_str)
            .unwrap_or(module)
    }
}

impl Default for PythonEngineConfig {
    fn default() -> Self {
        Self::new("python3")
    }
}

/// A running driver process.
struct DriverProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    version: String,
}

impl DriverProcess {
    async fn spawn(config: &PythonEngineConfig) -> Result<Self, EngineError> {
        let mut cmd = Command::new(&config.executable);
        cmd.arg("-u")
            .arg("-c")
            .arg(DRIVER)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(EngineError::Spawn)?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Protocol("driver stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Protocol("driver stdout unavailable".into()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "playground_runtime::python", "{}", line);
                }
            });
        }

        let mut stdout = BufReader::new(stdout).lines();
        let handshake = tokio::time::timeout(HANDSHAKE_TIMEOUT, stdout.next_line())
            .await
            .map_err(|_| EngineError::Protocol("timed out waiting for driver handshake".into()))??;

        let version = match handshake.as_deref().map(DriverResponse::from_line) {
            Some(Ok(DriverResponse::Ready { version })) => version,
            Some(Ok(other)) => {
                return Err(EngineError::Protocol(format!(
                    "unexpected handshake: {:?}",
                    other
                )))
            }
            Some(Err(e)) => return Err(EngineError::Protocol(e.to_string())),
            None => return Err(EngineError::Exited),
        };

        info!(
            executable = %config.executable,
            pid = child.id().unwrap_or_default(),
            version = %version,
            "Python driver started"
        );

        Ok(Self {
            child,
            stdin,
            stdout,
            version,
        })
    }

    /// Send one request and wait for the reply that ends it.
    ///
    /// Output frames that arrive first go straight to `sink`, so whatever
    /// was printed survives even if the caller stops waiting.
    async fn roundtrip(
        &mut self,
        request: &DriverRequest,
        sink: Option<&OutputSink>,
    ) -> Result<DriverResponse, EngineError> {
        let line = request
            .to_line()
            .map_err(|e| EngineError::Protocol(e.to_string()))?;
        trace!(op = request.op(), "-> driver");

        if let Err(e) = self.send(&line).await {
            return Err(match e.kind() {
                std::io::ErrorKind::BrokenPipe => EngineError::Exited,
                _ => EngineError::Io(e),
            });
        }

        loop {
            let Some(line) = self.stdout.next_line().await? else {
                return Err(EngineError::Exited);
            };
            let response =
                DriverResponse::from_line(&line).map_err(|e| EngineError::Protocol(e.to_string()))?;

            match response {
                DriverResponse::Output { text } => match sink {
                    Some(sink) => sink.write(&text),
                    None => debug!(target: "playground_runtime::python", "{}", text.trim_end()),
                },
                response => {
                    trace!(op = request.op(), "<- driver");
                    return Ok(response);
                }
            }
        }
    }

    async fn send(&mut self, line: &str) -> std::io::Result<()> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await
    }

    async fn kill(mut self) {
        if let Err(e) = self.child.kill().await {
            warn!("failed to kill Python driver: {}", e);
        }
    }
}

/// [`InterpreterEngine`] that drives a `python3` child process.
///
/// The child is respawned transparently if it dies between requests. An
/// active output redirection is re-established on the new child.
pub struct PythonProcessEngine {
    config: PythonEngineConfig,
    process: Option<DriverProcess>,
    sink: Option<OutputSink>,
}

impl PythonProcessEngine {
    /// Spawn the child and wait for its handshake.
    pub async fn start(config: PythonEngineConfig) -> Result<Self, EngineError> {
        let process = DriverProcess::spawn(&config).await?;
        Ok(Self {
            config,
            process: Some(process),
            sink: None,
        })
    }

    /// Interpreter version reported by the running child.
    pub fn version(&self) -> Option<&str> {
        self.process.as_ref().map(|p| p.version.as_str())
    }

    /// Process ID of the running child.
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.child.id())
    }

    async fn request(&mut self, request: DriverRequest) -> Result<DriverResponse, EngineError> {
        if self.process.is_none() {
            let mut process = DriverProcess::spawn(&self.config).await?;
            if self.sink.is_some() {
                expect_ok(process.roundtrip(&DriverRequest::Redirect, None).await?)?;
            }
            self.process = Some(process);
        }

        let result = match self.process.as_mut() {
            Some(process) => process.roundtrip(&request, self.sink.as_ref()).await,
            None => Err(EngineError::Exited),
        };

        if matches!(result, Err(EngineError::Exited)) {
            warn!(op = request.op(), "Python driver exited; it will be respawned");
            if let Some(process) = self.process.take() {
                process.kill().await;
            }
        }
        result
    }
}

fn expect_ok(response: DriverResponse) -> Result<Option<String>, EngineError> {
    match response {
        DriverResponse::Ok { value, .. } => Ok(value),
        DriverResponse::Error { kind, message, .. } => Err(EngineError::Protocol(format!(
            "driver rejected request: {}: {}",
            kind, message
        ))),
        DriverResponse::Ready { .. } | DriverResponse::Output { .. } => {
            Err(EngineError::Protocol("unexpected frame".into()))
        }
    }
}

#[async_trait]
impl InterpreterEngine for PythonProcessEngine {
    fn name(&self) -> &str {
        "python"
    }

    async fn redirect_output(&mut self, sink: OutputSink) -> Result<(), EngineError> {
        self.sink = Some(sink);
        let response = self.request(DriverRequest::Redirect).await?;
        expect_ok(response).map(|_| ())
    }

    async fn restore_output(&mut self) -> Result<(), EngineError> {
        if self.process.is_none() {
            // A fresh child starts with its real stdout.
            self.sink = None;
            return Ok(());
        }
        // The driver flushes a trailing partial line before it replies.
        let response = self.request(DriverRequest::Restore).await;
        self.sink = None;
        expect_ok(response?).map(|_| ())
    }

    async fn reset_namespace(&mut self, preserve: &[String]) -> Result<(), EngineError> {
        let response = self
            .request(DriverRequest::Reset {
                preserve: preserve.to_vec(),
            })
            .await?;
        expect_ok(response).map(|_| ())
    }

    async fn evaluate(&mut self, source: &str) -> Result<Option<String>, EngineError> {
        let response = self
            .request(DriverRequest::Eval {
                source: source.to_string(),
            })
            .await?;

        match response {
            DriverResponse::Ok { value } => Ok(value),
            DriverResponse::Error {
                kind,
                message,
                module,
                traceback,
            } => Err(EngineError::Raised {
                kind,
                message,
                module,
                traceback,
            }),
            DriverResponse::Ready { .. } | DriverResponse::Output { .. } => {
                Err(EngineError::Protocol("unexpected frame".into()))
            }
        }
    }

    async fn install_module(&mut self, name: &str) -> Result<(), EngineError> {
        let package = self.config.package_for(name).to_string();
        debug!(module = name, package = %package, "installing module");

        let response = self
            .request(DriverRequest::Install {
                module: name.to_string(),
                package,
            })
            .await?;

        match response {
            DriverResponse::Ok { .. } => Ok(()),
            DriverResponse::Error { kind, message, .. } if kind == INSTALL_ERROR_KIND => {
                Err(EngineError::Install {
                    module: name.to_string(),
                    message,
                })
            }
            DriverResponse::Error { kind, message, .. } => Err(EngineError::Install {
                module: name.to_string(),
                message: format!("{}: {}", kind, message),
            }),
            DriverResponse::Ready { .. } | DriverResponse::Output { .. } => {
                Err(EngineError::Protocol("unexpected frame".into()))
            }
        }
    }

    async fn interrupt(&mut self) -> Result<(), EngineError> {
        if let Some(process) = self.process.take() {
            info!("interrupting Python driver");
            process.kill().await;
        }
        Ok(())
    }
}

/// [`EngineLoader`] that starts a [`PythonProcessEngine`].
#[derive(Debug, Clone, Default)]
pub struct PythonLoader {
    config: PythonEngineConfig,
}

impl PythonLoader {
    /// Create a loader with the given engine settings.
    pub fn new(config: PythonEngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineLoader for PythonLoader {
    async fn load(&self) -> Result<Box<dyn InterpreterEngine>, EngineError> {
        let engine = PythonProcessEngine::start(self.config.clone()).await?;
        Ok(Box::new(engine))
    }
}
