//! Scripted in-memory engines.
//!
//! [`ScriptedEngine`] understands a tiny statement language, one statement
//! per `;` or newline:
//!
//! | Statement | Effect |
//! |---|---|
//! | `print('text')` / `print(name)` | write a line to the captured output |
//! | `name = value` | bind `name` in the namespace |
//! | `name` / `42` | expression; its value is returned if it is last |
//! | `import mod` | fails with `ModuleNotFoundError` unless `mod` is installed |
//! | `1/0` | fails with `ZeroDivisionError` |
//! | `raise Kind: message` | fails with `Kind` |
//! | `sleep 25` | suspends for 25 ms |
//! | `hang` | never completes |
//!
//! [`ScriptedHost`] is the same idea for the alternate language path:
//! `log text`, `throw message`, `sleep 25`, `hang`, `crash`, and a final
//! expression statement becomes the value.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::engine::{EngineError, EngineLoader, InterpreterEngine, ScriptHost, ScriptOutcome};
use crate::output::OutputSink;

#[derive(Debug, Default)]
struct ProbeState {
    capturing: bool,
    redirect_count: usize,
    restore_count: usize,
    reset_count: usize,
    evaluate_count: usize,
    interrupt_count: usize,
    install_calls: Vec<String>,
    namespace: Vec<String>,
}

/// Shared view into a [`ScriptedEngine`] for assertions.
#[derive(Debug, Clone, Default)]
pub struct EngineProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl EngineProbe {
    fn with<R>(&self, f: impl FnOnce(&mut ProbeState) -> R) -> R {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Whether output is currently redirected.
    pub fn capturing(&self) -> bool {
        self.with(|s| s.capturing)
    }

    /// Number of `redirect_output` calls.
    pub fn redirect_count(&self) -> usize {
        self.with(|s| s.redirect_count)
    }

    /// Number of `restore_output` calls.
    pub fn restore_count(&self) -> usize {
        self.with(|s| s.restore_count)
    }

    /// Number of `reset_namespace` calls.
    pub fn reset_count(&self) -> usize {
        self.with(|s| s.reset_count)
    }

    /// Number of `evaluate` calls.
    pub fn evaluate_count(&self) -> usize {
        self.with(|s| s.evaluate_count)
    }

    /// Number of `interrupt` calls.
    pub fn interrupt_count(&self) -> usize {
        self.with(|s| s.interrupt_count)
    }

    /// Every module name passed to the installer, in call order.
    pub fn install_calls(&self) -> Vec<String> {
        self.with(|s| s.install_calls.clone())
    }

    /// User-visible names bound when the last evaluation started.
    pub fn namespace_at_last_evaluate(&self) -> Vec<String> {
        self.with(|s| s.namespace.clone())
    }
}

/// Deterministic [`InterpreterEngine`] for tests and demos.
#[derive(Debug)]
pub struct ScriptedEngine {
    probe: EngineProbe,
    sink: Option<OutputSink>,
    namespace: BTreeMap<String, String>,
    installed: HashSet<String>,
    installable: HashSet<String>,
    install_delay: Option<Duration>,
}

impl ScriptedEngine {
    /// Engine with nothing installed and nothing installable.
    pub fn new() -> Self {
        Self::with_probe(EngineProbe::default())
    }

    fn with_probe(probe: EngineProbe) -> Self {
        Self {
            probe,
            sink: None,
            namespace: base_namespace(),
            installed: HashSet::new(),
            installable: HashSet::new(),
            install_delay: None,
        }
    }

    /// Modules that are importable from the start.
    pub fn installed<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.installed.extend(modules.into_iter().map(Into::into));
        self
    }

    /// Modules the installer can fetch.
    pub fn installable<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.installable.extend(modules.into_iter().map(Into::into));
        self
    }

    /// Make every install take this long.
    pub fn install_delay(mut self, delay: Duration) -> Self {
        self.install_delay = Some(delay);
        self
    }

    /// Probe handle for assertions.
    pub fn probe(&self) -> EngineProbe {
        self.probe.clone()
    }

    fn write(&self, text: &str) {
        if let Some(sink) = &self.sink {
            sink.write_line(text);
        }
    }

    fn lookup(&self, name: &str) -> Result<String, EngineError> {
        self.namespace.get(name).cloned().ok_or_else(|| {
            EngineError::raised("NameError", format!("name '{}' is not defined", name))
        })
    }

    /// Evaluate an expression statement.
    fn expression(&self, stmt: &str) -> Result<Option<String>, EngineError> {
        if stmt == "1/0" {
            return Err(EngineError::raised("ZeroDivisionError", "division by zero"));
        }
        if stmt.parse::<f64>().is_ok() {
            return Ok(Some(stmt.to_string()));
        }
        if let Some(text) = unquote(stmt) {
            return Ok(Some(format!("'{}'", text)));
        }
        if is_identifier(stmt) {
            return self.lookup(stmt).map(Some);
        }
        Err(EngineError::raised(
            "SyntaxError",
            format!("invalid syntax: {}", stmt),
        ))
    }

    async fn statement(&mut self, stmt: &str) -> Result<Option<String>, EngineError> {
        if stmt == "hang" {
            std::future::pending::<()>().await;
        }
        if let Some(ms) = stmt.strip_prefix("sleep ") {
            let ms = ms.trim().parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            return Ok(None);
        }
        if let Some(arg) = stmt
            .strip_prefix("print(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let arg = arg.trim();
            let text = match unquote(arg) {
                Some(text) => text.to_string(),
                None => self.expression(arg)?.unwrap_or_default(),
            };
            self.write(&text);
            return Ok(None);
        }
        if let Some(module) = stmt.strip_prefix("import ") {
            let module = module.trim();
            let top = module.split('.').next().unwrap_or(module);
            if !self.installed.contains(top) {
                return Err(EngineError::Raised {
                    kind: "ModuleNotFoundError".into(),
                    message: format!("No module named '{}'", top),
                    module: Some(top.to_string()),
                    traceback: None,
                });
            }
            self.namespace.insert(top.to_string(), format!("<module '{}'>", top));
            return Ok(None);
        }
        if let Some(rest) = stmt.strip_prefix("raise ") {
            let (kind, message) = rest.split_once(':').unwrap_or((rest, ""));
            return Err(EngineError::raised(kind.trim(), message.trim()));
        }
        if let Some((lhs, rhs)) = stmt.split_once('=') {
            let lhs = lhs.trim();
            if is_identifier(lhs) && !rhs.starts_with('=') {
                let value = self.expression(rhs.trim())?.unwrap_or_default();
                self.namespace.insert(lhs.to_string(), value);
                return Ok(None);
            }
        }
        self.expression(stmt)
    }
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn base_namespace() -> BTreeMap<String, String> {
    let mut ns = BTreeMap::new();
    ns.insert("__builtins__".to_string(), "<module 'builtins'>".to_string());
    ns.insert("__name__".to_string(), "'__main__'".to_string());
    ns
}

fn statements(source: &str) -> impl Iterator<Item = &str> {
    source
        .split(|c| c == ';' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn unquote(text: &str) -> Option<&str> {
    let text = text.trim();
    ['\'', '"'].iter().find_map(|q| {
        text.strip_prefix(*q)
            .and_then(|rest| rest.strip_suffix(*q))
    })
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[async_trait]
impl InterpreterEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn redirect_output(&mut self, sink: OutputSink) -> Result<(), EngineError> {
        self.sink = Some(sink);
        self.probe.with(|s| {
            s.capturing = true;
            s.redirect_count += 1;
        });
        Ok(())
    }

    async fn restore_output(&mut self) -> Result<(), EngineError> {
        self.sink = None;
        self.probe.with(|s| {
            s.capturing = false;
            s.restore_count += 1;
        });
        Ok(())
    }

    async fn reset_namespace(&mut self, preserve: &[String]) -> Result<(), EngineError> {
        self.namespace.retain(|name, _| preserve.contains(name));
        self.probe.with(|s| s.reset_count += 1);
        Ok(())
    }

    async fn evaluate(&mut self, source: &str) -> Result<Option<String>, EngineError> {
        let visible: Vec<String> = self
            .namespace
            .keys()
            .filter(|name| !name.starts_with("__"))
            .cloned()
            .collect();
        self.probe.with(|s| {
            s.evaluate_count += 1;
            s.namespace = visible;
        });

        let mut last = None;
        for stmt in statements(source) {
            last = self.statement(stmt).await?;
        }
        Ok(last)
    }

    async fn install_module(&mut self, name: &str) -> Result<(), EngineError> {
        self.probe.with(|s| s.install_calls.push(name.to_string()));
        if let Some(delay) = self.install_delay {
            tokio::time::sleep(delay).await;
        }
        if self.installable.contains(name) {
            self.installed.insert(name.to_string());
            Ok(())
        } else {
            Err(EngineError::Install {
                module: name.to_string(),
                message: format!("no matching distribution found for {}", name),
            })
        }
    }

    async fn interrupt(&mut self) -> Result<(), EngineError> {
        self.probe.with(|s| s.interrupt_count += 1);
        Ok(())
    }
}

/// [`EngineLoader`] handing out [`ScriptedEngine`]s that share one probe.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLoader {
    probe: EngineProbe,
    installed: Vec<String>,
    installable: Vec<String>,
    delay: Option<Duration>,
    install_delay: Option<Duration>,
    failure: Option<String>,
    loads: Arc<AtomicUsize>,
}

impl ScriptedLoader {
    /// Loader whose engines have nothing installed or installable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Modules importable from the start.
    pub fn installed<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.installed.extend(modules.into_iter().map(Into::into));
        self
    }

    /// Modules the installer can fetch.
    pub fn installable<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.installable.extend(modules.into_iter().map(Into::into));
        self
    }

    /// Make every load take this long.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every install on the loaded engines take this long.
    pub fn install_delay(mut self, delay: Duration) -> Self {
        self.install_delay = Some(delay);
        self
    }

    /// Make every load fail with this message.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Probe shared by every engine this loader creates.
    pub fn probe(&self) -> EngineProbe {
        self.probe.clone()
    }

    /// Number of `load` calls so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineLoader for ScriptedLoader {
    async fn load(&self) -> Result<Box<dyn InterpreterEngine>, EngineError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(EngineError::Protocol(message.clone()));
        }
        let mut engine = ScriptedEngine::with_probe(self.probe.clone())
            .installed(self.installed.iter().cloned())
            .installable(self.installable.iter().cloned());
        engine.install_delay = self.install_delay;
        Ok(Box::new(engine))
    }
}

/// Deterministic [`ScriptHost`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedHost;

impl ScriptedHost {
    /// Create a host.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScriptHost for ScriptedHost {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(&self, source: &str) -> Result<ScriptOutcome, EngineError> {
        let mut outcome = ScriptOutcome::default();
        for stmt in statements(source) {
            outcome.value = None;
            if stmt == "hang" {
                std::future::pending::<()>().await;
            } else if stmt == "crash" {
                return Err(EngineError::Exited);
            } else if let Some(ms) = stmt.strip_prefix("sleep ") {
                let ms = ms.trim().parse().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(ms)).await;
            } else if let Some(text) = stmt.strip_prefix("log ") {
                outcome.logs.push(text.to_string());
            } else if let Some(message) = stmt.strip_prefix("throw ") {
                outcome.error = Some(message.to_string());
                break;
            } else {
                outcome.value = Some(stmt.to_string());
            }
        }
        Ok(outcome)
    }
}
