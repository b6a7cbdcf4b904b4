mod error;
mod lexer;
mod parser;

use tracing::debug;

pub use error::ParseError;
pub use parser::MAX_NESTING;

use crate::{AttributeSet, Node};

/// Parse a rule string into a [`Node`] using the default attribute set
/// (`age`, `department`, `salary`, `experience`).
///
/// # Errors
///
/// Returns [`ParseError`] if the rule string is malformed or references an
/// unrecognized attribute.
pub fn parse(input: &str) -> Result<Node, ParseError> {
    parse_with(input, &AttributeSet::default())
}

/// Parse a rule string, accepting only attributes in `attributes`.
///
/// # Errors
///
/// Returns [`ParseError`] if the rule string is malformed or references an
/// attribute outside `attributes`.
pub fn parse_with(input: &str, attributes: &AttributeSet) -> Result<Node, ParseError> {
    let result = lexer::tokenize(input)
        .and_then(|tokens| parser::Parser::new(&tokens, attributes).parse());
    if let Err(err) = &result {
        debug!(rule = input, error = %err, "rule string rejected");
    }
    result
}
