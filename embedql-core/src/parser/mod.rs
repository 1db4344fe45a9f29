//! Recursive-descent parser for the SQL subset and the formula grammar.
//!
//! Both grammars consume the same destructive [`TokenQueue`]: the statement
//! parser hands the queue to the expression parser for defaults, CHECK
//! constraints and predicates, so cursor state is shared exactly.

mod expressions;
mod statements;
#[cfg(test)]
mod tests;

use crate::ast::{Expr, Statement};
use crate::error::{ParseError, ParseResult};
use crate::keywords::Keyword;
use crate::lexer::{Token, TokenKind, TokenQueue};

/// Deepest expression nesting accepted before parsing fails.
pub const MAX_EXPRESSION_DEPTH: usize = 256;

/// Parser over a borrowed token queue.
pub struct Parser<'q> {
    pub(crate) queue: &'q mut TokenQueue,
    depth: usize,
}

impl<'q> Parser<'q> {
    pub fn new(queue: &'q mut TokenQueue) -> Self {
        Self { queue, depth: 0 }
    }

    /// Run `parse` one nesting level deeper.
    pub(crate) fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        if self.depth >= MAX_EXPRESSION_DEPTH {
            return Err(ParseError::TooDeep {
                limit: MAX_EXPRESSION_DEPTH,
                offset: self.offset(),
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Build the error for `token` when `expected` was required.
    pub(crate) fn unexpected(&self, token: &Token, expected: &str) -> ParseError {
        if token.is_symbol(")") {
            return ParseError::MismatchedParenthesis {
                found: token.text.clone(),
                offset: token.offset,
            };
        }
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.to_string(),
            offset: token.offset,
        }
    }

    pub(crate) fn end_of_input(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedEnd {
            expected: expected.to_string(),
            offset: self.queue.end_offset(),
        }
    }

    /// Error for whatever is at the front of the queue.
    pub(crate) fn error_at_front(&self, expected: &str) -> ParseError {
        match self.queue.peek() {
            Some(token) => self.unexpected(token, expected),
            None => self.end_of_input(expected),
        }
    }

    /// Offset of the next token, or end of input.
    pub(crate) fn offset(&self) -> usize {
        self.queue
            .peek()
            .map(|t| t.offset)
            .unwrap_or_else(|| self.queue.end_offset())
    }

    /// Pop the next token, failing at end of input.
    pub(crate) fn next_token(&mut self, expected: &str) -> ParseResult<Token> {
        match self.queue.pop() {
            Some(token) => Ok(token),
            None => Err(self.end_of_input(expected)),
        }
    }

    pub(crate) fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<Token> {
        if self.queue.next_is_keyword(keyword) {
            return self.next_token(keyword.as_str());
        }
        Err(self.error_at_front(&keyword.to_string()))
    }

    pub(crate) fn expect_symbol(&mut self, symbol: &str) -> ParseResult<Token> {
        if self.queue.next_is_symbol(symbol) {
            return self.next_token(symbol);
        }
        Err(self.error_at_front(&format!("'{}'", symbol)))
    }

    /// Expect the `)` closing a group opened at `open_offset`.
    pub(crate) fn expect_closing_paren(&mut self, open_offset: usize) -> ParseResult<()> {
        if self.queue.eat_symbol(")") {
            return Ok(());
        }
        Err(match self.queue.peek() {
            Some(token) => ParseError::MismatchedParenthesis {
                found: token.to_string(),
                offset: token.offset,
            },
            None => ParseError::MismatchedParenthesis {
                found: format!("unclosed '(' at offset {}", open_offset),
                offset: self.queue.end_offset(),
            },
        })
    }

    /// Expect an identifier (unreserved word or quoted name).
    pub(crate) fn expect_identifier(&mut self, what: &str) -> ParseResult<String> {
        match self.queue.peek() {
            Some(token) if token.is_identifier() => {
                let token = self.next_token(what)?;
                Ok(token.text)
            }
            Some(token) => Err(self.unexpected(token, what)),
            None => Err(self.end_of_input(what)),
        }
    }

    /// Identifier optionally qualified with dots: `main.users`.
    pub(crate) fn expect_qualified_name(&mut self, what: &str) -> ParseResult<String> {
        let mut name = self.expect_identifier(what)?;
        while self.queue.next_is_symbol(".")
            && self.queue.peek_nth(1).is_some_and(Token::is_identifier)
        {
            self.queue.pop();
            name.push('.');
            name.push_str(&self.expect_identifier(what)?);
        }
        Ok(name)
    }

    /// Parenthesized, comma-separated identifier list: `(a, b, c)`.
    pub(crate) fn parse_identifier_list(&mut self, what: &str) -> ParseResult<Vec<String>> {
        let open = self.expect_symbol("(")?;
        let mut names = Vec::new();

        loop {
            names.push(self.expect_identifier(what)?);
            if !self.queue.eat_symbol(",") {
                break;
            }
        }

        self.expect_closing_paren(open.offset)?;
        Ok(names)
    }

    /// Consume an optional statement terminator; anything else is an error.
    pub(crate) fn expect_end_of_statement(&mut self) -> ParseResult<()> {
        match self.queue.peek() {
            None => Ok(()),
            Some(token) if token.is_symbol(";") => {
                self.queue.pop();
                Ok(())
            }
            Some(token) => Err(self.unexpected(token, "';' or end of input")),
        }
    }
}

/// Parse one expression from the front of a shared queue.
///
/// Tokens that cannot continue the expression are left in the queue.
pub fn parse_expression(queue: &mut TokenQueue) -> ParseResult<Expr> {
    Parser::new(queue).parse_expression()
}

/// Parse a standalone formula; the whole input must be one expression.
pub fn parse_formula(input: &str) -> ParseResult<Expr> {
    let mut queue = TokenQueue::from_text(input)?;
    let token_count = queue.len();
    let mut parser = Parser::new(&mut queue);
    let expr = parser.parse_expression()?;
    parser.queue.eat_symbol(";");
    if let Some(token) = parser.queue.peek() {
        return Err(parser.unexpected(token, "end of expression"));
    }
    tracing::debug!(tokens = token_count, "parsed formula");
    Ok(expr)
}

/// Parse zero or more `;`-separated statements.
///
/// Fails on the first malformed statement; the error records its index.
pub fn parse_statements(input: &str) -> ParseResult<Vec<Statement>> {
    let mut queue = TokenQueue::from_text(input)?;
    let mut parser = Parser::new(&mut queue);
    let mut statements = Vec::new();

    loop {
        while parser.queue.eat_symbol(";") {}
        if parser.queue.is_empty() {
            break;
        }

        let index = statements.len();
        let statement = parser
            .parse_statement()
            .and_then(|stmt| parser.expect_end_of_statement().map(|_| stmt))
            .map_err(|e| ParseError::InStatement {
                index,
                source: Box::new(e),
            })?;
        statements.push(statement);
    }

    tracing::debug!(count = statements.len(), "parsed statement batch");
    Ok(statements)
}

/// Parse exactly one statement.
pub fn parse_statement(input: &str) -> ParseResult<Statement> {
    let mut statements = parse_statements(input)?;
    match statements.len() {
        1 => Ok(statements.remove(0)),
        0 => Err(ParseError::UnexpectedEnd {
            expected: "statement".to_string(),
            offset: input.len(),
        }),
        _ => Err(ParseError::UnexpectedToken {
            expected: "a single statement".to_string(),
            found: format!("{} statements", statements.len()),
            offset: 0,
        }),
    }
}

/// Parse numeric literal text into an integer or float value.
pub(crate) fn number_value(token: &Token, negative: bool) -> ParseResult<crate::value::Value> {
    use crate::value::Value;

    debug_assert_eq!(token.kind, TokenKind::Number);
    let text = if negative {
        format!("-{}", token.text)
    } else {
        token.text.clone()
    };
    let is_float = text.contains(['.', 'e', 'E']);

    if !is_float {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::Integer(i));
        }
    }
    text.parse::<f64>()
        .map(Value::Float)
        .map_err(|_| ParseError::UnexpectedToken {
            expected: "number".to_string(),
            found: token.text.clone(),
            offset: token.offset,
        })
}
