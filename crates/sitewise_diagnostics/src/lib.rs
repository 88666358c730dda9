//! Diagnostic creation, severity management, and rendering for the placer.
//!
//! This crate provides structured [`Diagnostic`] messages with severity levels,
//! codes, the offending instance, and notes. The thread-safe [`DiagnosticSink`]
//! accumulates diagnostics during a placement run, and [`DiagnosticRenderer`]
//! implementations format them for a terminal or as JSON.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
