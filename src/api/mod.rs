//! API layer for playground-runtime.
//!
//! This module exposes the session manager over HTTP for the browser UI.
//!
//! ## Endpoints
//!
//! ### Health & Info
//! - `GET /health` - Health check
//! - `GET /api/v1/` - API information and session status
//!
//! ### Session
//! - `GET /api/v1/session` - Status and counters
//! - `POST /api/v1/session/initialize` - Acquire the interpreter (idempotent)
//!
//! ### Execution
//! - `POST /api/v1/execute` - Run a Python or JavaScript snippet
//!
//! ### Packages
//! - `GET /api/v1/packages` - List installed modules
//! - `POST /api/v1/packages` - Install a module
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use playground_runtime::api::{serve, ServerConfig};
//! use playground_runtime::engine::{NodeScriptHost, PythonLoader};
//! use playground_runtime::session::{SessionConfig, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> playground_runtime::Result<()> {
//!     let session = Arc::new(SessionManager::new(
//!         SessionConfig::default(),
//!         PythonLoader::default(),
//!         NodeScriptHost::default(),
//!     ));
//!     serve(ServerConfig::new("127.0.0.1", 8765), session).await
//! }
//! ```

pub mod handlers;
pub mod router;
pub mod types;

// Re-export commonly used types
pub use handlers::{error_response, AppState};
pub use router::{create_router, create_router_with_state, serve, serve_with_state, ServerConfig};
pub use types::{
    ErrorResponse, ExecuteError, ExecuteRequest, ExecuteResponse, InstallRequest,
    PackagesResponse,
};
