//! Diagnostic codes with category prefixes for structured message identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
///
/// Each category maps to a single-character prefix used in diagnostic code
/// display (e.g., `E015` for an error, `W016` for a warning, `N306` for a
/// progress note).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Error diagnostics, prefixed with `E`.
    Error,
    /// Warning diagnostics, prefixed with `W`.
    Warning,
    /// Informational progress notes, prefixed with `N`.
    Note,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Note => 'N',
        }
    }
}

/// A structured diagnostic code combining a category prefix and a numeric identifier.
///
/// Displayed as the category prefix followed by a zero-padded 3-digit number,
/// e.g., `E015`, `W034`, `N306`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }

    /// `E` code.
    pub const fn error(number: u16) -> Self {
        Self::new(Category::Error, number)
    }

    /// `W` code.
    pub const fn warning(number: u16) -> Self {
        Self::new(Category::Warning, number)
    }

    /// `N` code.
    pub const fn note(number: u16) -> Self {
        Self::new(Category::Note, number)
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_prefixes() {
        assert_eq!(Category::Error.prefix(), 'E');
        assert_eq!(Category::Warning.prefix(), 'W');
        assert_eq!(Category::Note.prefix(), 'N');
    }

    #[test]
    fn display_format() {
        let code = DiagnosticCode::new(Category::Error, 15);
        assert_eq!(format!("{code}"), "E015");

        let code = DiagnosticCode::new(Category::Warning, 3);
        assert_eq!(format!("{code}"), "W003");

        let code = DiagnosticCode::new(Category::Note, 306);
        assert_eq!(format!("{code}"), "N306");
    }

    #[test]
    fn shorthand_constructors() {
        assert_eq!(DiagnosticCode::warning(34), DiagnosticCode::new(Category::Warning, 34));
        assert_eq!(DiagnosticCode::note(307).to_string(), "N307");
        assert_eq!(DiagnosticCode::error(219).category, Category::Error);
    }
}
