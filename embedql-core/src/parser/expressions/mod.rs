//! Expression parsing.
//!
//! A primary operand is parsed first and then greedily extended while the next
//! tokens belong to the continuation set (see [`operators`]). The right-hand
//! operand of each extension is parsed at the operator's own precedence, so
//! operators of one class chain right-to-left: `10 - 4 - 3` is `10 - (4 - 3)`.
//! Existing formulas depend on this order.

pub(crate) mod operators;
mod primary;

use operators::{peek_continuation, Continuation, PREC_ADDITIVE, PREC_NOT};

use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::error::{ParseError, ParseResult};
use crate::keywords::Keyword;
use crate::lexer::TokenKind;
use crate::parser::{number_value, Parser};
use crate::value::Value;

impl<'q> Parser<'q> {
    /// Parse a full expression (lowest precedence).
    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_binary(0)
    }

    /// Parse an operand and extend it with operators of at least `min_prec`.
    pub(crate) fn parse_binary(&mut self, min_prec: u8) -> ParseResult<Expr> {
        self.nested(|parser| parser.extend_operand(min_prec))
    }

    fn extend_operand(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;

        while let Some((continuation, width)) = peek_continuation(self.queue) {
            let prec = continuation.precedence();
            if prec < min_prec {
                break;
            }
            for _ in 0..width {
                self.queue.pop();
            }

            left = match continuation {
                Continuation::Binary(op, negate) => {
                    let right = self.parse_binary(prec)?;
                    Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                        negate,
                    }
                }
                Continuation::Between(negate) => {
                    let low = self.parse_binary(PREC_ADDITIVE)?;
                    self.expect_keyword(Keyword::And)?;
                    let high = self.parse_binary(PREC_ADDITIVE)?;
                    Expr::Between {
                        expr: Box::new(left),
                        low: Box::new(low),
                        high: Box::new(high),
                        negate,
                    }
                }
                Continuation::In(negate) => {
                    let list = self.parse_in_list()?;
                    Expr::In {
                        expr: Box::new(left),
                        list,
                        negate,
                    }
                }
                Continuation::NullTest(negate) => Expr::Binary {
                    op: BinaryOperator::Is,
                    left: Box::new(left),
                    right: Box::new(Expr::Literal(Value::Null)),
                    negate,
                },
                Continuation::Collate => {
                    let collation = self.parse_collation_name()?;
                    Expr::Collate {
                        expr: Box::new(left),
                        collation,
                    }
                }
            };
        }

        Ok(left)
    }

    /// Prefix operators: `NOT`, unary `-` and `+`.
    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.queue.next_is_keyword(Keyword::Not) {
            self.queue.pop();
            // NOT binds looser than comparisons: NOT a = 1 is NOT (a = 1)
            let operand = self.parse_binary(PREC_NOT)?;
            return Ok(Expr::Unary {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            });
        }

        let sign = match self.queue.peek() {
            Some(t) if t.is_symbol("-") => Some(UnaryOperator::Negate),
            Some(t) if t.is_symbol("+") => Some(UnaryOperator::Plus),
            _ => None,
        };

        if let Some(op) = sign {
            self.queue.pop();

            // Fold signed numeric literals so i64::MIN stays representable
            if op == UnaryOperator::Negate
                && self
                    .queue
                    .peek()
                    .is_some_and(|t| t.kind == TokenKind::Number)
            {
                let token = self.next_token("number")?;
                return Ok(Expr::Literal(number_value(&token, true)?));
            }

            let operand = self.nested(Self::parse_unary)?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }

        self.parse_primary()
    }

    /// `( expr, ... )` after IN; an empty list is allowed.
    fn parse_in_list(&mut self) -> ParseResult<Vec<Expr>> {
        let open = self.expect_symbol("(")?;
        let mut list = Vec::new();

        if self.queue.eat_symbol(")") {
            return Ok(list);
        }

        loop {
            list.push(self.parse_expression()?);
            if !self.queue.eat_symbol(",") {
                break;
            }
        }

        self.expect_closing_paren(open.offset)?;
        Ok(list)
    }

    pub(crate) fn parse_collation_name(&mut self) -> ParseResult<crate::ast::Collation> {
        let token = self.next_token("collation name")?;
        if !matches!(token.kind, TokenKind::Word | TokenKind::QuotedIdentifier) {
            return Err(self.unexpected(&token, "collation name"));
        }
        crate::ast::Collation::lookup(&token.text).ok_or(ParseError::UnknownKeyword {
            word: token.text,
            offset: token.offset,
        })
    }
}
