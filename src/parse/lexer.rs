use std::fmt;

use tracing::trace;
use winnow::combinator::{alt, repeat};
use winnow::error::ModalResult;
use winnow::prelude::*;
use winnow::token::{any, take_while};

use super::ParseError;
use crate::{Comparator, LogicalOp};

/// Lexical unit of a rule string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    LParen,
    RParen,
    /// A run of word characters: an attribute name or a literal.
    Word(&'a str),
    Comparator(Comparator),
    Logic(LogicalOp),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Word(w) => f.write_str(w),
            Token::Comparator(c) => write!(f, "{c}"),
            Token::Logic(op) => write!(f, "{op}"),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn word<'i>(input: &mut &'i str) -> ModalResult<Token<'i>> {
    take_while(1.., is_word_char)
        .map(|w: &'i str| match LogicalOp::from_keyword(w) {
            Some(op) => Token::Logic(op),
            None => Token::Word(w),
        })
        .parse_next(input)
}

/// One scan step. Characters that start no token are consumed and yield `None`.
fn step<'i>(input: &mut &'i str) -> ModalResult<Option<Token<'i>>> {
    alt((
        '('.value(Some(Token::LParen)),
        ')'.value(Some(Token::RParen)),
        word.map(Some),
        '>'.value(Some(Token::Comparator(Comparator::Gt))),
        '<'.value(Some(Token::Comparator(Comparator::Lt))),
        '='.value(Some(Token::Comparator(Comparator::Eq))),
        any.value(None),
    ))
    .parse_next(input)
}

/// Split a rule string into tokens, left to right.
///
/// Unrecognized characters (whitespace, punctuation, non-ASCII) are dropped.
/// Fails with [`ParseError::InvalidFormat`] only when nothing is left.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Token<'_>>, ParseError> {
    let scanned: Vec<Option<Token<'_>>> = repeat(0.., step)
        .parse(input)
        .map_err(|_| ParseError::InvalidFormat)?;

    let tokens: Vec<Token<'_>> = scanned.into_iter().flatten().collect();
    if tokens.is_empty() {
        return Err(ParseError::InvalidFormat);
    }

    trace!(count = tokens.len(), "tokenized rule string");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_simple_comparison() {
        let tokens = tokenize("age > 30").unwrap();
        assert_eq!(
            tokens,
            [
                Token::Word("age"),
                Token::Comparator(Comparator::Gt),
                Token::Word("30"),
            ]
        );
    }

    #[test]
    fn tokenize_groups_and_keywords() {
        let tokens = tokenize("(age<30 OR salary>5)AND department=Sales").unwrap();
        assert_eq!(
            tokens,
            [
                Token::LParen,
                Token::Word("age"),
                Token::Comparator(Comparator::Lt),
                Token::Word("30"),
                Token::Logic(LogicalOp::Or),
                Token::Word("salary"),
                Token::Comparator(Comparator::Gt),
                Token::Word("5"),
                Token::RParen,
                Token::Logic(LogicalOp::And),
                Token::Word("department"),
                Token::Comparator(Comparator::Eq),
                Token::Word("Sales"),
            ]
        );
    }

    #[test]
    fn quotes_and_punctuation_are_dropped() {
        let tokens = tokenize(r#"department = "Sales""#).unwrap();
        assert_eq!(
            tokens,
            [
                Token::Word("department"),
                Token::Comparator(Comparator::Eq),
                Token::Word("Sales"),
            ]
        );
    }

    #[test]
    fn keywords_are_case_sensitive() {
        let tokens = tokenize("and OR ANDROID").unwrap();
        assert_eq!(
            tokens,
            [
                Token::Word("and"),
                Token::Logic(LogicalOp::Or),
                Token::Word("ANDROID"),
            ]
        );
    }

    #[test]
    fn doubled_comparator_yields_two_tokens() {
        let tokens = tokenize("age >> 30").unwrap();
        assert_eq!(
            tokens,
            [
                Token::Word("age"),
                Token::Comparator(Comparator::Gt),
                Token::Comparator(Comparator::Gt),
                Token::Word("30"),
            ]
        );
    }

    #[test]
    fn decimal_point_splits_words() {
        let tokens = tokenize("3.5").unwrap();
        assert_eq!(tokens, [Token::Word("3"), Token::Word("5")]);
    }

    #[test]
    fn non_ascii_is_dropped() {
        let tokens = tokenize("âge > 3").unwrap();
        assert_eq!(tokens[0], Token::Word("ge"));
    }

    #[test]
    fn empty_input_is_invalid_format() {
        assert_eq!(tokenize(""), Err(ParseError::InvalidFormat));
        assert_eq!(tokenize("   "), Err(ParseError::InvalidFormat));
        assert_eq!(tokenize("!@#$%"), Err(ParseError::InvalidFormat));
    }

    #[test]
    fn token_display() {
        let rendered: Vec<String> = tokenize("( ) x > AND")
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, ["(", ")", "x", ">", "AND"]);
    }
}
