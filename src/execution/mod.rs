//! Code execution.
//!
//! This module turns an [`ExecutionRequest`] into an [`ExecutionResult`]:
//! - Output capture scoped to one call
//! - Namespace reset before every attempt
//! - Deadline and cancellation
//! - One bounded install-and-retry cycle for missing modules
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use playground_runtime::execution::{ExecutionRequest, Language};
//!
//! let request = ExecutionRequest::new("print('hello')")
//!     .language(Language::Python)
//!     .timeout(Duration::from_secs(30));
//! ```

mod executor;
mod request;
mod result;

pub use executor::{Executor, ExecutorConfig, DEFAULT_PRESERVE};
pub use request::{ExecutionRequest, Language};
pub use result::{ExecutionFailure, ExecutionResult, FailureKind};
