use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;

use tracing::{error, warn};

/// Category of a non-fatal pipeline problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A volume sits under a non-linear parent transform; the transform
    /// stage was skipped.
    NonLinearTransform,
    /// Input data the stage cannot handle (e.g. multi-component labels).
    UnsupportedData,
    /// Layer images with mismatching shapes reached the blend stage.
    ShapeMismatch,
}

impl DiagnosticKind {
    /// Kinds that are reported once per sink and suppressed afterwards.
    pub fn report_once(self) -> bool {
        matches!(self, Self::NonLinearTransform)
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonLinearTransform => write!(f, "non-linear transform"),
            Self::UnsupportedData => write!(f, "unsupported data"),
            Self::ShapeMismatch => write!(f, "shape mismatch"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Component that raised it, e.g. `"Red/Label"`.
    pub source: String,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(kind: DiagnosticKind, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            source: source.into(),
            message: message.into(),
        }
    }

    pub fn error(kind: DiagnosticKind, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            source: source.into(),
            message: message.into(),
        }
    }
}

/// Receiver for problems the pipeline tolerates instead of failing.
///
/// Passed into the compositor by the caller, which also owns any
/// de-duplication state. All methods have default no-op implementations.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, _diagnostic: Diagnostic) {}
}

/// Sink that drops everything.
pub struct NoOpSink;
impl DiagnosticSink for NoOpSink {}

/// Sink that forwards every diagnostic to `tracing`.
pub struct TracingSink;

impl TracingSink {
    /// A tracing sink that logs report-once kinds a single time.
    pub fn deduplicated() -> DedupSink<TracingSink> {
        DedupSink::new(TracingSink)
    }
}

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => warn!(
                kind = %diagnostic.kind,
                source = %diagnostic.source,
                "{}",
                diagnostic.message
            ),
            Severity::Error => error!(
                kind = %diagnostic.kind,
                source = %diagnostic.source,
                "{}",
                diagnostic.message
            ),
        }
    }
}

/// Wraps another sink and drops repeats of report-once kinds.
///
/// The seen-set lives in this value, so each owner gets its own "once".
pub struct DedupSink<S> {
    inner: S,
    reported: Mutex<HashSet<DiagnosticKind>>,
}

impl<S: DiagnosticSink> DedupSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reported: Mutex::new(HashSet::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: DiagnosticSink> DiagnosticSink for DedupSink<S> {
    fn report(&self, diagnostic: Diagnostic) {
        if diagnostic.kind.report_once() {
            let mut reported = self.reported.lock().unwrap_or_else(|e| e.into_inner());
            if !reported.insert(diagnostic.kind) {
                return;
            }
        }
        self.inner.report(diagnostic);
    }
}

/// Sink that keeps every diagnostic it receives.
#[derive(Default)]
pub struct RecordingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|d| d.kind == kind)
            .count()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KINDS: [DiagnosticKind; 3] = [
        DiagnosticKind::NonLinearTransform,
        DiagnosticKind::UnsupportedData,
        DiagnosticKind::ShapeMismatch,
    ];

    #[test]
    fn test_only_non_linear_is_reported_once() {
        let sink = DedupSink::new(RecordingSink::new());
        for _ in 0..3 {
            for kind in KINDS {
                sink.report(Diagnostic::warning(kind, "Red/Background", "x"));
            }
        }
        let names: Vec<String> = KINDS.iter().map(|k| k.to_string()).collect();
        assert_eq!(names, ["non-linear transform", "unsupported data", "shape mismatch"]);
        assert_eq!(sink.inner().count(DiagnosticKind::NonLinearTransform), 1);
        assert_eq!(sink.inner().count(DiagnosticKind::UnsupportedData), 3);
        assert_eq!(sink.inner().count(DiagnosticKind::ShapeMismatch), 3);
    }
}
