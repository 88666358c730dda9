//! Collects the diagnostics of a placement run.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Thread-safe diagnostic accumulator.
///
/// Counts per severity are kept outside the lock, so `has_errors` never
/// waits on an emitter.
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    counts: [AtomicUsize; 3],
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
            counts: Default::default(),
        }
    }

    /// Records a diagnostic.
    pub fn emit(&self, diag: Diagnostic) {
        self.counts[diag.severity.index()].fetch_add(1, Ordering::Relaxed);
        self.diagnostics.lock().unwrap().push(diag);
    }

    /// Number of diagnostics emitted with `severity`, drained ones included.
    pub fn count(&self, severity: Severity) -> usize {
        self.counts[severity.index()].load(Ordering::Relaxed)
    }

    /// Returns `true` once any error has been emitted.
    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Number of errors emitted so far.
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Takes every diagnostic, leaving the sink empty. Counts are kept.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock().unwrap())
    }

    /// Copy of the diagnostics emitted so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().unwrap().clone()
    }

    /// Copy of the diagnostics whose code renders as `code`, e.g. `"W034"`.
    pub fn with_code(&self, code: &str) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.code.to_string() == code)
            .cloned()
            .collect()
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};

    fn outside_core() -> Diagnostic {
        Diagnostic::error(DiagnosticCode::new(Category::Error, 15), "cell outside of core")
    }

    fn unplaced() -> Diagnostic {
        Diagnostic::warning(DiagnosticCode::new(Category::Warning, 34), "placement failed")
            .with_instance("u1")
    }

    #[test]
    fn empty_sink() {
        let sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        assert!(sink.take_all().is_empty());
        assert!(Severity::ALL.iter().all(|&s| sink.count(s) == 0));
    }

    #[test]
    fn warnings_are_not_errors() {
        let sink = DiagnosticSink::new();
        sink.emit(unplaced());
        assert!(!sink.has_errors());
        assert_eq!(sink.count(Severity::Warning), 1);
        sink.emit(outside_core());
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn lookup_by_code() {
        let sink = DiagnosticSink::new();
        sink.emit(outside_core());
        sink.emit(unplaced());
        sink.emit(unplaced());
        assert_eq!(sink.with_code("W034").len(), 2);
        assert_eq!(sink.with_code("E015")[0].message, "cell outside of core");
        assert!(sink.with_code("N306").is_empty());
    }

    #[test]
    fn counts_survive_draining() {
        let sink = DiagnosticSink::new();
        sink.emit(outside_core());
        sink.emit(unplaced());
        assert_eq!(sink.take_all().len(), 2);
        assert!(sink.diagnostics().is_empty());
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn shared_between_threads() {
        use std::sync::Arc;
        use std::thread;

        let sink = Arc::new(DiagnosticSink::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for _ in 0..25 {
                        sink.emit(unplaced());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sink.count(Severity::Warning), 100);
        assert_eq!(sink.diagnostics().len(), 100);
    }
}
