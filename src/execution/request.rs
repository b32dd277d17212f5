//! Execution requests.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Language a snippet is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Runs on the session's interpreter engine.
    #[default]
    Python,
    /// Runs on the script host.
    JavaScript,
}

impl Language {
    /// Guess the language from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "py" => Some(Self::Python),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            _ => None,
        }
    }

    /// Whether snippets in this language run on the interpreter engine.
    pub fn uses_interpreter(&self) -> bool {
        matches!(self, Self::Python)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Python => write!(f, "python"),
            Self::JavaScript => write!(f, "javascript"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Self::Python),
            "javascript" | "js" => Ok(Self::JavaScript),
            other => Err(format!("unknown language: {}", other)),
        }
    }
}

/// A snippet to run plus how to run it.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Source text, treated as opaque.
    pub source: String,
    /// Language selector.
    pub language: Language,
    /// Deadline for the evaluation. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Cancels the evaluation when triggered.
    pub cancel: CancellationToken,
}

impl ExecutionRequest {
    /// Create a Python request with no deadline.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            language: Language::Python,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the language.
    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Set the deadline.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Set the deadline if one is given.
    pub fn maybe_timeout(mut self, duration: Option<Duration>) -> Self {
        if duration.is_some() {
            self.timeout = duration;
        }
        self
    }

    /// Use an existing cancellation token.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

impl Default for ExecutionRequest {
    fn default() -> Self {
        Self::new("")
    }
}
