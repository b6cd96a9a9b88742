//! Severity-tagged diagnostics reported to the host.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Remark,
    /// Something was skipped or approximated; loading continued.
    Warning,
    /// Something could not be read at all; loading continued.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Remark => "remark",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// What a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Header carried the external-reference marker.
    UnsupportedReference,
    /// A polygon's surface could not be built; a wireframe was kept instead.
    GeometryConstructionFailure,
    /// A collection's modifier names no known material.
    MissingModifier,
    /// A record had unparseable arguments.
    InvalidRecord,
    /// An input file could not be read.
    UnreadableSource,
}

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Severity.
    pub severity: Severity,
    /// Category.
    pub kind: DiagnosticKind,
    /// Human-readable text.
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic.
    pub fn new(severity: Severity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
        }
    }

    /// Create a warning.
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, kind, message)
    }

    /// Create an error.
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Ordered diagnostics, deduplicated by severity and message.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    seen: HashSet<(Severity, String)>,
}

impl Diagnostics {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic. Returns false if an identical one was already present.
    pub fn push(&mut self, diagnostic: Diagnostic) -> bool {
        let key = (diagnostic.severity, diagnostic.message.clone());
        if !self.seen.insert(key) {
            return false;
        }
        self.items.push(diagnostic);
        true
    }

    /// Iterate in first-seen order.
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// Number of unique diagnostics.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if there are no diagnostics.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of diagnostics with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|d| d.severity == severity).count()
    }

    /// Consume into a plain vector.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        for d in iter {
            self.push(d);
        }
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_order() {
        let mut diags = Diagnostics::new();
        assert!(diags.push(Diagnostic::warning(DiagnosticKind::MissingModifier, "b")));
        assert!(diags.push(Diagnostic::warning(DiagnosticKind::MissingModifier, "a")));
        assert!(!diags.push(Diagnostic::warning(DiagnosticKind::MissingModifier, "b")));
        let messages: Vec<&str> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["b", "a"]);
    }

    #[test]
    fn test_same_message_different_severity() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning(DiagnosticKind::InvalidRecord, "x"));
        diags.push(Diagnostic::error(DiagnosticKind::InvalidRecord, "x"));
        assert_eq!(diags.len(), 2);
        assert_eq!(diags.count(Severity::Warning), 1);
        assert_eq!(diags.count(Severity::Error), 1);
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::warning(DiagnosticKind::MissingModifier, "missing modifier 'm'");
        assert_eq!(d.to_string(), "[warning] missing modifier 'm'");
    }
}
