//! Configuration management for playground-runtime.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::ServerConfig;
use crate::cli::Args;
use crate::engine::PythonEngineConfig;
use crate::execution::{ExecutorConfig, DEFAULT_PRESERVE};
use crate::output::DEFAULT_MAX_OUTPUT;
use crate::session::{SessionConfig, DEFAULT_MAX_SOURCE_LENGTH, DEFAULT_PREWARM};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Session and interpreter configuration.
    pub session: SessionSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable graceful shutdown.
    pub graceful_shutdown: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
            graceful_shutdown: true,
        }
    }
}

/// Session configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Python interpreter executable.
    pub python: String,
    /// Node.js executable for JavaScript snippets.
    pub node: String,
    /// Modules installed during initialization.
    pub prewarm: Vec<String>,
    /// Names kept across namespace resets.
    pub preserve: Vec<String>,
    /// Install missing modules and retry once.
    pub auto_install: bool,
    /// Import name to distribution name.
    pub package_aliases: BTreeMap<String, String>,
    /// Default per-execution deadline in seconds.
    pub timeout_secs: Option<u64>,
    /// Longest accepted source in bytes.
    pub max_source_length: usize,
    /// Captured output limit in bytes.
    pub max_output_size: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        let aliases = [
            ("sklearn", "scikit-learn"),
            ("PIL", "pillow"),
            ("cv2", "opencv-python"),
            ("yaml", "pyyaml"),
            ("bs4", "beautifulsoup4"),
        ];
        Self {
            python: "python3".to_string(),
            node: "node".to_string(),
            prewarm: DEFAULT_PREWARM.iter().map(|s| s.to_string()).collect(),
            preserve: DEFAULT_PRESERVE.iter().map(|s| s.to_string()).collect(),
            auto_install: true,
            package_aliases: aliases
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            timeout_secs: None,
            max_source_length: DEFAULT_MAX_SOURCE_LENGTH,
            max_output_size: DEFAULT_MAX_OUTPUT,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_with<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("PLAYGROUND_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("PLAYGROUND_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Some(python) = var("PLAYGROUND_PYTHON").filter(|s| !s.is_empty()) {
            self.session.python = python;
        }

        if let Some(node) = var("PLAYGROUND_NODE").filter(|s| !s.is_empty()) {
            self.session.node = node;
        }

        if let Some(level) = var("PLAYGROUND_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(ref python) = args.python {
            self.session.python = python.clone();
        }
        if let Some(ref node) = args.node {
            self.session.node = node.clone();
        }

        if args.no_prewarm {
            self.session.prewarm.clear();
        }

        if args.no_auto_install {
            self.session.auto_install = false;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Config::default();

        // Load from config file if specified
        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        // Apply environment variable overrides
        config.apply_env();

        // Apply CLI argument overrides (highest priority)
        config.apply_args(args);

        Ok(config)
    }

    /// Convert to ServerConfig for the API server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        let mut server_config = ServerConfig::new(host.to_string(), self.server.port);
        if !self.server.graceful_shutdown {
            server_config = server_config.without_graceful_shutdown();
        }

        Ok(server_config)
    }

    /// Convert to the session manager's settings.
    pub fn to_session_config(&self) -> SessionConfig {
        let session = &self.session;
        SessionConfig {
            prewarm: session.prewarm.clone(),
            executor: ExecutorConfig {
                preserve: session.preserve.clone(),
                auto_install: session.auto_install,
                max_output_size: session.max_output_size,
            },
            default_timeout: session.timeout_secs.map(Duration::from_secs),
            max_source_length: session.max_source_length,
        }
    }

    /// Convert to the Python engine's spawn settings.
    pub fn to_engine_config(&self) -> PythonEngineConfig {
        PythonEngineConfig::new(&self.session.python).aliases(
            self.session
                .package_aliases
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        )
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid host address.
    InvalidHost(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
        }
    }
}

impl std::error::Error for ConfigError {}
