//! Continuation set for binary extension: which tokens may extend a parsed
//! operand, and at which precedence class.

use crate::ast::BinaryOperator;
use crate::keywords::Keyword;
use crate::lexer::{Token, TokenKind, TokenQueue};

pub(crate) const PREC_OR: u8 = 1;
pub(crate) const PREC_AND: u8 = 2;
pub(crate) const PREC_NOT: u8 = 3;
pub(crate) const PREC_COMPARISON: u8 = 4;
pub(crate) const PREC_ADDITIVE: u8 = 5;
pub(crate) const PREC_MULTIPLICATIVE: u8 = 6;
pub(crate) const PREC_CONCAT: u8 = 7;
pub(crate) const PREC_COLLATE: u8 = 8;

/// How the next tokens extend the expression on the left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Continuation {
    Binary(BinaryOperator, bool),
    Between(bool),
    In(bool),
    /// `ISNULL`, `NOTNULL`, `NOT NULL`
    NullTest(bool),
    Collate,
}

impl Continuation {
    pub(crate) fn precedence(self) -> u8 {
        match self {
            Continuation::Binary(op, _) => binary_precedence(op),
            Continuation::Between(_) | Continuation::In(_) | Continuation::NullTest(_) => {
                PREC_COMPARISON
            }
            Continuation::Collate => PREC_COLLATE,
        }
    }
}

pub(crate) fn binary_precedence(op: BinaryOperator) -> u8 {
    match op {
        BinaryOperator::Or => PREC_OR,
        BinaryOperator::And => PREC_AND,
        BinaryOperator::Add | BinaryOperator::Subtract => PREC_ADDITIVE,
        BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => {
            PREC_MULTIPLICATIVE
        }
        BinaryOperator::Concat => PREC_CONCAT,
        _ => PREC_COMPARISON,
    }
}

fn symbol_operator(token: &Token) -> Option<BinaryOperator> {
    if token.kind != TokenKind::Symbol {
        return None;
    }
    let op = match token.text.as_str() {
        "+" => BinaryOperator::Add,
        "-" => BinaryOperator::Subtract,
        "*" => BinaryOperator::Multiply,
        "/" => BinaryOperator::Divide,
        "%" => BinaryOperator::Modulo,
        "||" => BinaryOperator::Concat,
        "=" | "==" => BinaryOperator::Equal,
        "!=" | "<>" => BinaryOperator::NotEqual,
        "<" => BinaryOperator::LessThan,
        "<=" => BinaryOperator::LessThanOrEqual,
        ">" => BinaryOperator::GreaterThan,
        ">=" => BinaryOperator::GreaterThanOrEqual,
        _ => return None,
    };
    Some(op)
}

fn pattern_operator(keyword: Keyword) -> Option<BinaryOperator> {
    match keyword {
        Keyword::Like => Some(BinaryOperator::Like),
        Keyword::Glob => Some(BinaryOperator::Glob),
        Keyword::Regexp => Some(BinaryOperator::Regexp),
        Keyword::Match => Some(BinaryOperator::Match),
        _ => None,
    }
}

/// Classify the front of the queue without consuming it.
///
/// Returns the continuation and how many tokens form its operator.
pub(crate) fn peek_continuation(queue: &TokenQueue) -> Option<(Continuation, usize)> {
    let token = queue.peek()?;

    if let Some(op) = symbol_operator(token) {
        return Some((Continuation::Binary(op, false), 1));
    }

    let keyword = token.keyword()?;
    let next_keyword = queue.peek_nth(1).and_then(Token::keyword);

    let continuation = match keyword {
        Keyword::And => (Continuation::Binary(BinaryOperator::And, false), 1),
        Keyword::Or => (Continuation::Binary(BinaryOperator::Or, false), 1),
        Keyword::Between => (Continuation::Between(false), 1),
        Keyword::In => (Continuation::In(false), 1),
        Keyword::IsNull => (Continuation::NullTest(false), 1),
        Keyword::NotNull => (Continuation::NullTest(true), 1),
        Keyword::Collate => (Continuation::Collate, 1),
        Keyword::Is => match next_keyword {
            Some(Keyword::Not) => (Continuation::Binary(BinaryOperator::Is, true), 2),
            _ => (Continuation::Binary(BinaryOperator::Is, false), 1),
        },
        Keyword::Not => match next_keyword? {
            Keyword::Between => (Continuation::Between(true), 2),
            Keyword::In => (Continuation::In(true), 2),
            Keyword::Null => (Continuation::NullTest(true), 2),
            other => (Continuation::Binary(pattern_operator(other)?, true), 2),
        },
        other => (Continuation::Binary(pattern_operator(other)?, false), 1),
    };

    Some(continuation)
}
