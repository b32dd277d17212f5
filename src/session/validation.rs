//! Input validation for session operations.

use crate::error::PlaygroundError;
use crate::Result;

/// Longest accepted module name, matching PyPI's project name limit.
pub const MAX_MODULE_NAME_LENGTH: usize = 214;

/// Validate a module identifier passed to `install_package`.
///
/// Accepts `[A-Za-z0-9_.-]`, starting with a letter, digit or underscore.
pub fn validate_module_name(name: &str) -> Result<()> {
    let invalid = || PlaygroundError::InvalidModuleName(name.to_string());

    if name.is_empty() || name.len() > MAX_MODULE_NAME_LENGTH {
        return Err(invalid());
    }

    let mut chars = name.chars();
    if !matches!(chars.next(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid());
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')) {
        return Err(invalid());
    }

    Ok(())
}

/// Validate source text before it reaches an engine.
pub fn validate_source(source: &str, max_length: usize) -> Result<()> {
    if source.len() > max_length {
        return Err(PlaygroundError::SourceTooLong {
            length: source.len(),
            max: max_length,
        });
    }

    // Python refuses to compile source containing null bytes.
    if source.contains('\0') {
        return Err(PlaygroundError::InvalidCharacter('\0'));
    }

    Ok(())
}

/// Shorten source text for log lines.
pub fn preview(source: &str) -> String {
    let first = source.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut out: String = first
        .chars()
        .filter(|c| !c.is_control() || *c == '\t')
        .take(60)
        .collect();
    if out.len() < first.len() || source.lines().filter(|l| !l.trim().is_empty()).count() > 1 {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name_ok() {
        assert!(validate_module_name("numpy").is_ok());
        assert!(validate_module_name("scikit-learn").is_ok());
        assert!(validate_module_name("zope.interface").is_ok());
        assert!(validate_module_name("_private").is_ok());
        assert!(validate_module_name("py3").is_ok());
    }

    #[test]
    fn test_module_name_empty() {
        assert!(matches!(
            validate_module_name(""),
            Err(PlaygroundError::InvalidModuleName(_))
        ));
    }

    #[test]
    fn test_module_name_rejects_specifiers_and_paths() {
        for bad in ["numpy==1.0", "-e .", "../evil", "a b", "pkg;rm", ".hidden"] {
            assert!(validate_module_name(bad).is_err(), "{} accepted", bad);
        }
    }

    #[test]
    fn test_module_name_too_long() {
        let name = "a".repeat(MAX_MODULE_NAME_LENGTH + 1);
        assert!(validate_module_name(&name).is_err());
        assert!(validate_module_name(&name[1..]).is_ok());
    }

    #[test]
    fn test_source_too_long() {
        assert!(validate_source("print(1)", 100).is_ok());
        assert!(matches!(
            validate_source("print(1)", 4),
            Err(PlaygroundError::SourceTooLong { length: 8, max: 4 })
        ));
    }

    #[test]
    fn test_source_null_byte() {
        assert!(matches!(
            validate_source("x = 1\0", 100),
            Err(PlaygroundError::InvalidCharacter('\0'))
        ));
    }

    #[test]
    fn test_empty_source_is_allowed() {
        assert!(validate_source("", 100).is_ok());
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("print('a')"), "print('a')");
        assert_eq!(preview("\nx = 1\ny = 2"), "x = 1...");
        assert_eq!(preview(&"a".repeat(100)).len(), 63);
    }
}
