//! Small string utilities for outbound message text.

use std::error::Error;
use std::fmt;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextError {
    /// `filter` was called with an empty pattern, which would never shorten
    /// the target and thus never terminate.
    EmptyPattern,
}

impl fmt::Display for TextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextError::EmptyPattern => write!(f, "invalid argument: empty filter pattern"),
        }
    }
}

impl Error for TextError {}

// ---------------------------------------------------------------------------
// filter
// ---------------------------------------------------------------------------

/// Remove every non-overlapping occurrence of `pattern` from `target`.
///
/// Repeatedly excises the first occurrence until none remains. Each pass
/// shortens the string by at least `pattern.len()` bytes and the pattern is
/// never reinserted, so the loop terminates for any non-empty pattern.
///
/// # Errors
///
/// Returns [`TextError::EmptyPattern`] if `pattern` is empty.
pub fn filter(target: &str, pattern: &str) -> Result<String, TextError> {
    if pattern.is_empty() {
        return Err(TextError::EmptyPattern);
    }

    let mut out = target.to_string();
    while let Some(at) = out.find(pattern) {
        out.replace_range(at..at + pattern.len(), "");
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
