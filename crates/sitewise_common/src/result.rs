//! Broken-invariant error shared by the placer crates.

/// The grid, segment table, or journal no longer agrees with itself.
///
/// Never caused by the input design; problems with the design are reported
/// through diagnostics or their own error variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal placer error: {message}")]
pub struct InternalError {
    /// What went wrong.
    pub message: String,
}

impl InternalError {
    /// Creates an internal error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_prefixed() {
        let err = InternalError::new("pixel has no site");
        assert_eq!(err.to_string(), "internal placer error: pixel has no site");
        assert_eq!(err, InternalError::new(String::from("pixel has no site")));
    }
}
