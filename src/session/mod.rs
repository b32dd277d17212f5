//! Session management module.
//!
//! This module provides the session manager that owns the interpreter
//! engine, its lifecycle status, and the registry of installed modules.

mod context;
mod manager;
mod state;
pub mod validation;

pub use context::SessionContext;
pub use manager::{
    SessionConfig, SessionManager, SessionSnapshot, DEFAULT_MAX_SOURCE_LENGTH, DEFAULT_PREWARM,
};
pub use state::SessionStatus;
