//! # playground-runtime
//!
//! Code-execution session manager for a browser code playground.
//!
//! A [`SessionManager`] owns one interpreter engine and runs snippets
//! against it one at a time. Every execution gets a fresh namespace and
//! its own output capture, and an import of a missing module triggers a
//! single install-and-retry cycle.
//!
//! ## Features
//!
//! - **Isolated executions**: the namespace is reset before every run
//! - **Output capture**: standard output is captured per call and always restored
//! - **Auto-install**: one bounded recovery cycle for missing modules
//! - **Two languages**: Python on a persistent interpreter, JavaScript on Node.js
//! - **HTTP API**: axum endpoints for a browser UI
//!
//! ## Quick Start
//!
//! ```no_run
//! use playground_runtime::engine::{NodeScriptHost, PythonLoader};
//! use playground_runtime::{SessionConfig, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> playground_runtime::Result<()> {
//!     // Initialize logging
//!     playground_runtime::logging::try_init().ok();
//!
//!     let session = SessionManager::new(
//!         SessionConfig::default(),
//!         PythonLoader::default(),
//!         NodeScriptHost::default(),
//!     );
//!     session.initialize().await?;
//!
//!     let result = session.execute("print('hello')\n6 * 7").await?;
//!     println!("{}{:?}", result.stdout, result.value);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod logging;
pub mod output;
pub mod session;
pub mod testing;

// Re-export commonly used types
pub use engine::{EngineError, EngineLoader, InterpreterEngine, ScriptHost, ScriptOutcome};
pub use error::{PlaygroundError, Result};
pub use execution::{ExecutionFailure, ExecutionRequest, ExecutionResult, FailureKind, Language};
pub use output::OutputSink;
pub use session::{SessionConfig, SessionContext, SessionManager, SessionSnapshot, SessionStatus};
