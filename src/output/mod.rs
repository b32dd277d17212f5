//! Output capture.
//!
//! Everything user code prints during one execution lands in an
//! [`OutputSink`] handed to the engine for the duration of that call.
//!
//! # Example
//!
//! ```
//! use playground_runtime::output::OutputSink;
//!
//! let sink = OutputSink::with_limit(1024);
//! sink.write("a\n");
//! sink.write_line("b");
//! assert_eq!(sink.contents(), "a\nb\n");
//! ```

mod sink;

pub use sink::{OutputSink, DEFAULT_MAX_OUTPUT, TRUNCATION_MARKER};
