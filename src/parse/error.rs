use thiserror::Error;

/// Errors produced when parsing a rule string.
///
/// Each kind is its own variant so callers can branch on it. A parse either
/// succeeds completely or fails with one of these; no partial tree is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The input is not a complete rule: nothing could be tokenized, it ends
    /// early, a keyword sits where a literal belongs, tokens are left over
    /// after a complete expression, or groups nest too deeply.
    #[error("invalid rule string format")]
    InvalidFormat,

    #[error("mismatched parentheses")]
    MismatchedParentheses,

    #[error("invalid attribute: {0} is not a valid attribute")]
    InvalidAttribute(String),

    #[error("invalid operator: {0}")]
    InvalidOperator(String),
}
