//! Class and method globs.
//!
//! Class patterns match JVM binary names (`java.lang.ClassLoader`,
//! `com.example.Outer$Inner`). Patterns written with `/` separators are
//! normalised to dots.

use std::fmt;

use serde::{Serialize, Serializer};
use smol_str::SmolStr;
use thiserror::Error;

use crate::names::binary_name;

/// A glob that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid pattern '{pattern}': {reason}")]
pub struct PatternError {
    /// Pattern text as written.
    pub pattern: SmolStr,
    /// Why the glob was rejected.
    pub reason: SmolStr,
}

fn compile(text: &str) -> Result<glob::Pattern, PatternError> {
    if text.trim().is_empty() {
        return Err(PatternError {
            pattern: text.into(),
            reason: "empty pattern".into(),
        });
    }
    glob::Pattern::new(text).map_err(|err| PatternError {
        pattern: text.into(),
        reason: SmolStr::new(err.msg),
    })
}

/// Glob over class binary names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassPattern {
    text: SmolStr,
    glob: glob::Pattern,
}

impl ClassPattern {
    /// Compile a class glob.
    pub fn new(text: &str) -> Result<Self, PatternError> {
        let normalized = binary_name(text.trim());
        let glob = compile(&normalized)?;
        Ok(Self {
            text: normalized.into(),
            glob,
        })
    }

    /// Pattern matching exactly one internal class name.
    pub fn exact(internal: &str) -> Result<Self, PatternError> {
        Self::new(&glob::Pattern::escape(&binary_name(internal)))
    }

    /// Pattern text after normalisation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Match a binary name (`a.b.C$D`).
    #[must_use]
    pub fn matches(&self, binary: &str) -> bool {
        self.glob.matches(binary)
    }

    /// Match an internal name (`a/b/C$D`).
    #[must_use]
    pub fn matches_internal(&self, internal: &str) -> bool {
        self.glob.matches(&binary_name(internal))
    }
}

impl fmt::Display for ClassPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for ClassPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

/// Glob over method names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodPattern {
    text: SmolStr,
    glob: glob::Pattern,
}

impl MethodPattern {
    /// Compile a method-name glob.
    pub fn new(text: &str) -> Result<Self, PatternError> {
        let text = text.trim();
        let glob = compile(text)?;
        Ok(Self {
            text: text.into(),
            glob,
        })
    }

    /// Pattern matching exactly one method name.
    pub fn exact(name: &str) -> Result<Self, PatternError> {
        Self::new(&glob::Pattern::escape(name))
    }

    /// Pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Match a method name.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.glob.matches(name)
    }
}

impl fmt::Display for MethodPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for MethodPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_globs_span_packages() {
        let pattern = ClassPattern::new("java/lang/*").unwrap();
        assert_eq!(pattern.as_str(), "java.lang.*");
        assert!(pattern.matches("java.lang.ClassLoader"));
        assert!(pattern.matches_internal("java/lang/invoke/MethodHandle"));
        assert!(!pattern.matches("javax.swing.JFrame"));
    }

    #[test]
    fn exact_patterns_escape_metacharacters() {
        let pattern = ClassPattern::exact("a/Weird[1]").unwrap();
        assert!(pattern.matches("a.Weird[1]"));
        assert!(!pattern.matches("a.Weird1"));
        let method = MethodPattern::exact("<init>").unwrap();
        assert!(method.matches("<init>"));
    }

    #[test]
    fn nested_class_dollar_is_literal() {
        let pattern = ClassPattern::new("*ClassLoader$*").unwrap();
        assert!(pattern.matches("sun.misc.Launcher$AppClassLoader$1"));
        assert!(!pattern.matches("java.lang.ClassLoader"));
    }

    #[test]
    fn malformed_globs_are_rejected() {
        assert!(ClassPattern::new("a.[b").is_err());
        assert!(MethodPattern::new("  ").is_err());
    }
}
