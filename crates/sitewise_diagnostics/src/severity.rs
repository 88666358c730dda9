//! How serious a diagnostic is.

use crate::code::Category;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic, least severe first.
///
/// Notes report progress (global swap passes), warnings report cells or
/// groups the placer had to give up on, and errors abort the run.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Severity {
    /// Progress report.
    Note,
    /// Recoverable problem; the run continues.
    Warning,
    /// Fatal problem.
    Error,
}

impl Severity {
    /// Every severity, least severe first.
    pub const ALL: [Severity; 3] = [Severity::Note, Severity::Warning, Severity::Error];

    /// Returns `true` for [`Severity::Error`].
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }

    /// Lowercase label used in rendered headers.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// ANSI foreground color code for terminal headers.
    pub fn ansi_color(self) -> &'static str {
        match self {
            Severity::Note => "36",
            Severity::Warning => "33",
            Severity::Error => "31",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl From<Category> for Severity {
    fn from(category: Category) -> Self {
        match category {
            Category::Note => Severity::Note,
            Category::Warning => Severity::Warning,
            Category::Error => Severity::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_rank_below_errors() {
        let mut all = Severity::ALL;
        all.reverse();
        all.sort();
        assert_eq!(all, Severity::ALL);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn category_decides_severity() {
        assert_eq!(Severity::from(Category::Error), Severity::Error);
        assert_eq!(Severity::from(Category::Warning), Severity::Warning);
        assert_eq!(Severity::from(Category::Note), Severity::Note);
        assert!(Severity::from(Category::Error).is_error());
    }

    #[test]
    fn labels() {
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Note.label(), "note");
    }
}
