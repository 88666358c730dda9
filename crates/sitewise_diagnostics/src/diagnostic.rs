//! Structured diagnostic messages with severity, codes, and the offending instance.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// A structured diagnostic message emitted during a placement run.
///
/// Each diagnostic carries a severity level and code, a primary message, the
/// name of the instance it concerns (if any), and optional notes and help text.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The unique code identifying the type of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// The design instance this diagnostic refers to.
    pub instance: Option<String>,
    /// Explanatory footnotes (e.g., "note: ...").
    pub notes: Vec<String>,
    /// Actionable suggestions (e.g., "help: ...").
    pub help: Vec<String>,
}

impl Diagnostic {
    fn with_severity(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            instance: None,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Creates a diagnostic whose severity follows the code's category.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(code.category.into(), code, message)
    }

    /// Creates a new error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message)
    }

    /// Creates a new warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message)
    }

    /// Creates a new informational note.
    pub fn note(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Note, code, message)
    }

    /// Attaches the name of the instance this diagnostic concerns.
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;

    #[test]
    fn create_error() {
        let code = DiagnosticCode::new(Category::Error, 15);
        let diag = Diagnostic::error(code, "cell outside of core");
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "cell outside of core");
        assert_eq!(format!("{}", diag.code), "E015");
        assert!(diag.instance.is_none());
    }

    #[test]
    fn create_warning_and_note() {
        let diag = Diagnostic::warning(DiagnosticCode::new(Category::Warning, 34), "detailed placement failed");
        assert_eq!(diag.severity, Severity::Warning);
        let diag = Diagnostic::note(DiagnosticCode::new(Category::Note, 306), "global swap pass");
        assert_eq!(diag.severity, Severity::Note);
    }

    #[test]
    fn severity_from_code() {
        let diag = Diagnostic::new(DiagnosticCode::new(Category::Warning, 16), "group is too full");
        assert_eq!(diag.severity, Severity::Warning);
    }

    #[test]
    fn builder_methods() {
        let code = DiagnosticCode::new(Category::Error, 13);
        let diag = Diagnostic::error(code, "pixel already occupied")
            .with_instance("u_alu/add_3")
            .with_note("occupied by u_alu/add_2")
            .with_help("check for overlapping fixed instances");
        assert_eq!(diag.instance.as_deref(), Some("u_alu/add_3"));
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.help.len(), 1);
    }
}
