//! Diagnostic rendering backends for human-readable and machine-readable output.

use crate::diagnostic::Diagnostic;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;

    /// Renders a batch of diagnostics, one after another.
    fn render_all(&self, diags: &[Diagnostic]) -> String {
        diags.iter().map(|d| self.render(d)).collect()
    }
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// Produces output like:
/// ```text
/// warning[W034]: detailed placement failed
///   --> instance u_alu/add_3
///    = note: no legal site within 500 x 100
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn header(&self, diag: &Diagnostic) -> String {
        let head = format!("{}[{}]", diag.severity, diag.code);
        if !self.color {
            return head;
        }
        format!("\x1b[1;{}m{head}\x1b[0m", diag.severity.ansi_color())
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!("{}: {}\n", self.header(diag), diag.message);
        if let Some(inst) = &diag.instance {
            out.push_str(&format!("  --> instance {inst}\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

/// Renders each diagnostic as a single line of JSON.
pub struct JsonRenderer;

impl DiagnosticRenderer for JsonRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        match serde_json::to_string(diag) {
            Ok(mut line) => {
                line.push('\n');
                line
            }
            Err(e) => format!("{{\"error\":\"{e}\"}}\n"),
        }
    }
}
