//! Recognizing "module not found" failures.

use super::EngineError;

/// Name of the missing top-level module if `err` is a module-not-found
/// failure.
///
/// Structured information from the engine wins; otherwise the message is
/// inspected. Dotted names resolve to their top-level package since that
/// is what gets installed.
pub fn missing_module(err: &EngineError) -> Option<String> {
    match err {
        EngineError::Raised {
            module: Some(module),
            ..
        } => top_level(module),
        EngineError::Raised { message, .. } => parse_missing_module(message),
        _ => None,
    }
}

/// Extract the missing module from an error message.
///
/// Understands CPython's `No module named 'x'` and Pyodide's
/// `The module 'x' is included in the Pyodide distribution, but it is not
/// installed.`
pub fn parse_missing_module(message: &str) -> Option<String> {
    const CPYTHON: &str = "No module named ";
    const PYODIDE_PREFIX: &str = "The module ";
    const PYODIDE_SUFFIX: &str = " is included in the Pyodide distribution";

    if let Some(pos) = message.find(CPYTHON) {
        return quoted(&message[pos + CPYTHON.len()..]).and_then(top_level);
    }

    if let Some(pos) = message.find(PYODIDE_PREFIX) {
        let rest = &message[pos + PYODIDE_PREFIX.len()..];
        if rest.contains(PYODIDE_SUFFIX) {
            return quoted(rest).and_then(top_level);
        }
    }

    None
}

/// Leading quoted token (`'x'` or `"x"`).
fn quoted(text: &str) -> Option<&str> {
    let mut chars = text.chars();
    let quote = chars.next().filter(|c| *c == '\'' || *c == '"')?;
    let body = &text[quote.len_utf8()..];
    body.find(quote).map(|end| &body[..end])
}

fn top_level(name: &str) -> Option<String> {
    let head = name.split('.').next()?.trim();
    let valid = !head.is_empty()
        && head
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
    valid.then(|| head.to_string())
}
