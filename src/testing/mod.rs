//! In-memory engines for tests.
//!
//! These stand in for a real interpreter so session behavior can be
//! exercised without `python3` or `node` on the machine.
//!
//! ```
//! use playground_runtime::testing::ScriptedEngine;
//!
//! let engine = ScriptedEngine::new().installable(["numpy"]);
//! let probe = engine.probe();
//! assert_eq!(probe.evaluate_count(), 0);
//! ```

mod scripted;

pub use scripted::{EngineProbe, ScriptedEngine, ScriptedHost, ScriptedLoader};
