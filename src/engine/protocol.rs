//! JSON-lines protocol between the host and the Python driver.
//!
//! One request per line on the driver's stdin, responses one per line on a
//! private descriptor the driver duplicates from its original stdout. While
//! output is redirected, a request may produce any number of `output`
//! frames before the reply that ends it.

use serde::{Deserialize, Serialize};

/// Host to driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DriverRequest {
    /// Begin capturing `sys.stdout`.
    Redirect,
    /// Put `sys.stdout` back.
    Restore,
    /// Swap in a fresh namespace, keeping the listed names.
    Reset { preserve: Vec<String> },
    /// Run source in the current namespace.
    Eval { source: String },
    /// Make `module` importable, installing `package` if needed.
    Install { module: String, package: String },
}

/// Driver to host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DriverResponse {
    /// Handshake, sent once at start-up.
    Ready { version: String },
    /// Captured output, sent while a request is still running.
    Output { text: String },
    /// Request succeeded.
    Ok {
        #[serde(default)]
        value: Option<String>,
    },
    /// Request raised.
    Error {
        kind: String,
        message: String,
        #[serde(default)]
        module: Option<String>,
        #[serde(default)]
        traceback: Option<String>,
    },
}

/// Exception kind the driver uses for installer failures.
pub const INSTALL_ERROR_KIND: &str = "InstallError";

impl DriverRequest {
    /// Encode as a single protocol line, newline included.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Short name for logs.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Redirect => "redirect",
            Self::Restore => "restore",
            Self::Reset { .. } => "reset",
            Self::Eval { .. } => "eval",
            Self::Install { .. } => "install",
        }
    }
}

impl DriverResponse {
    /// Whether this frame ends the current request.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Output { .. })
    }

    /// Decode one protocol line.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim_end())
    }
}
