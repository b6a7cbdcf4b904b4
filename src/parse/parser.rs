use super::lexer::Token;
use super::ParseError;
use crate::{AttributeSet, Comparator, Node};

/// Deepest parenthesis nesting accepted. Deeper input is `InvalidFormat`.
pub const MAX_NESTING: usize = 256;

/// Recursive-descent parser over a token slice.
///
/// Grammar:
///
/// ```text
/// expression := term (("AND" | "OR") term)*
/// term       := "(" expression ")" | comparison
/// comparison := attribute (">" | "<" | "=") literal
/// ```
///
/// AND and OR share one precedence level and fold left, so `a AND b OR c`
/// is `(a AND b) OR c`. Use parentheses to group otherwise.
///
/// Groups recurse, so nesting is capped at [`MAX_NESTING`]. Flat chains are
/// folded in a loop and have no limit.
pub(crate) struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
    /// Open parentheses not yet closed.
    depth: usize,
    attributes: &'t AttributeSet,
}

impl<'t, 'a> Parser<'t, 'a> {
    pub(crate) fn new(tokens: &'t [Token<'a>], attributes: &'t AttributeSet) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            attributes,
        }
    }

    /// Parse the whole token slice into a single tree.
    pub(crate) fn parse(mut self) -> Result<Node, ParseError> {
        let node = self.expression()?;
        match self.peek() {
            None => Ok(node),
            Some(Token::RParen) => Err(ParseError::MismatchedParentheses),
            Some(_) => Err(ParseError::InvalidFormat),
        }
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token<'a>> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    /// Running out of tokens inside a group is a parenthesis error; at the
    /// top level it is a malformed rule.
    fn end_of_input(&self) -> ParseError {
        if self.depth > 0 {
            ParseError::MismatchedParentheses
        } else {
            ParseError::InvalidFormat
        }
    }

    fn expression(&mut self) -> Result<Node, ParseError> {
        let mut node = self.term()?;
        while let Some(Token::Logic(op)) = self.peek() {
            self.pos += 1;
            let right = self.term()?;
            node = Node::operator(op, node, right);
        }
        Ok(node)
    }

    fn term(&mut self) -> Result<Node, ParseError> {
        match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                if self.depth == MAX_NESTING {
                    return Err(ParseError::InvalidFormat);
                }
                self.depth += 1;
                let node = self.expression()?;
                match self.advance() {
                    Some(Token::RParen) => {
                        self.depth -= 1;
                        Ok(node)
                    }
                    _ => Err(ParseError::MismatchedParentheses),
                }
            }
            Some(Token::RParen) => Err(ParseError::MismatchedParentheses),
            _ => self.comparison(),
        }
    }

    fn comparison(&mut self) -> Result<Node, ParseError> {
        let attribute = match self.advance() {
            Some(Token::Word(name)) if self.attributes.contains(name) => name,
            Some(other) => return Err(ParseError::InvalidAttribute(other.to_string())),
            None => return Err(self.end_of_input()),
        };

        let comparator = match self.advance() {
            Some(Token::Comparator(c)) => c,
            Some(other) => return Err(ParseError::InvalidOperator(other.to_string())),
            None => return Err(self.end_of_input()),
        };

        let literal = match self.advance() {
            Some(Token::Word(lit)) => lit,
            Some(Token::Comparator(extra)) => {
                return Err(ParseError::InvalidOperator(compound(comparator, extra)));
            }
            Some(Token::LParen | Token::RParen) => {
                return Err(ParseError::MismatchedParentheses);
            }
            Some(Token::Logic(_)) => return Err(ParseError::InvalidFormat),
            None => return Err(self.end_of_input()),
        };

        Ok(Node::operand(attribute, comparator, literal))
    }
}

/// Operators like `>=` or `>>` reach the parser as two comparator tokens.
fn compound(first: Comparator, second: Comparator) -> String {
    format!("{}{}", first.symbol(), second.symbol())
}
