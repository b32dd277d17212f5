//! JavaScript path: one `node` process per snippet.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{EngineError, ScriptHost, ScriptOutcome};

const DRIVER: &str = include_str!("driver.js");

/// Prefix of the line carrying the outcome in the driver's stdout.
const RESULT_MARKER: &str = "__PLAYGROUND_RESULT__";

#[derive(Debug, Deserialize)]
struct WireOutcome {
    #[serde(default)]
    logs: Vec<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// [`ScriptHost`] that evaluates JavaScript with Node.js.
///
/// `console.log` is swapped for a capturing function while the snippet
/// runs and put back afterwards, whether or not the snippet threw.
#[derive(Debug, Clone)]
pub struct NodeScriptHost {
    executable: String,
}

impl NodeScriptHost {
    /// Create a host using the given `node` executable.
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Executable this host runs.
    pub fn executable(&self) -> &str {
        &self.executable
    }
}

impl Default for NodeScriptHost {
    fn default() -> Self {
        Self::new("node")
    }
}

/// Pull the outcome out of the driver's raw stdout.
fn parse_outcome(stdout: &str) -> Result<ScriptOutcome, EngineError> {
    let line = stdout
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(RESULT_MARKER))
        .ok_or_else(|| EngineError::Protocol("node driver produced no result".into()))?;

    let wire: WireOutcome =
        serde_json::from_str(line).map_err(|e| EngineError::Protocol(e.to_string()))?;

    Ok(ScriptOutcome {
        logs: wire.logs,
        value: wire.value,
        error: wire.error,
    })
}

#[async_trait]
impl ScriptHost for NodeScriptHost {
    fn name(&self) -> &str {
        "node"
    }

    async fn run(&self, source: &str) -> Result<ScriptOutcome, EngineError> {
        let mut child = Command::new(&self.executable)
            .arg("-e")
            .arg(DRIVER)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes()).await?;
            // Dropping closes the pipe, which starts evaluation.
        }

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(target: "playground_runtime::node", "{}", stderr.trim_end());
        }

        parse_outcome(&stdout).map_err(|e| {
            if output.status.success() {
                e
            } else {
                EngineError::Protocol(format!("node exited with {}: {}", output.status, stderr.trim()))
            }
        })
    }
}
