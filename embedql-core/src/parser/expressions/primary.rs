//! Primary operands: literals, field references, parenthesized groups,
//! function calls, CASE and CAST.

use crate::ast::{Expr, TypeName};
use crate::error::{ParseError, ParseResult};
use crate::keywords::{Function, Keyword};
use crate::lexer::{Token, TokenKind};
use crate::parser::{number_value, Parser};
use crate::value::Value;

impl<'q> Parser<'q> {
    pub(crate) fn parse_primary(&mut self) -> ParseResult<Expr> {
        let Some(token) = self.queue.peek() else {
            return Err(self.end_of_input("expression"));
        };

        match token.kind {
            TokenKind::Number => {
                let token = self.next_token("number")?;
                Ok(Expr::Literal(number_value(&token, false)?))
            }
            TokenKind::String => {
                let token = self.next_token("string")?;
                Ok(Expr::Literal(Value::Text(token.text)))
            }
            TokenKind::Blob => {
                let token = self.next_token("blob")?;
                Ok(Expr::Literal(Value::Blob(decode_hex(&token)?)))
            }
            TokenKind::QuotedIdentifier => self.parse_field(),
            TokenKind::Symbol if token.is_symbol("(") => {
                let open = self.next_token("(")?;
                let expr = self.parse_expression()?;
                self.expect_closing_paren(open.offset)?;
                Ok(expr)
            }
            TokenKind::Symbol => Err(self.unexpected(token, "expression")),
            TokenKind::Word => self.parse_word(),
        }
    }

    fn parse_word(&mut self) -> ParseResult<Expr> {
        let next_is_paren = self.queue.peek_nth(1).is_some_and(|t| t.is_symbol("("));
        let token = self.next_token("expression")?;

        match token.keyword() {
            Some(Keyword::True) => return Ok(Expr::Literal(Value::Boolean(true))),
            Some(Keyword::False) => return Ok(Expr::Literal(Value::Boolean(false))),
            Some(Keyword::Null) => return Ok(Expr::Literal(Value::Null)),
            Some(Keyword::Case) => return self.parse_case(&token),
            Some(Keyword::Cast) => return self.parse_cast(&token),
            _ => {}
        }

        if next_is_paren {
            return match token.function() {
                Some(function) => self.parse_function_call(function, &token),
                None if token.keyword().is_some() => Err(self.unexpected(&token, "expression")),
                None => Err(ParseError::UnknownFunction {
                    name: token.text,
                    offset: token.offset,
                }),
            };
        }

        if token.keyword().is_some() {
            return Err(self.unexpected(&token, "expression"));
        }

        self.finish_field(token.text)
    }

    fn parse_field(&mut self) -> ParseResult<Expr> {
        let token = self.next_token("field name")?;
        self.finish_field(token.text)
    }

    /// Collect a dotted path following the first segment.
    fn finish_field(&mut self, mut path: String) -> ParseResult<Expr> {
        while self.queue.next_is_symbol(".")
            && self.queue.peek_nth(1).is_some_and(Token::is_identifier)
        {
            self.queue.pop();
            path.push('.');
            path.push_str(&self.expect_identifier("field name")?);
        }
        Ok(Expr::Field(path))
    }

    /// Arguments after `name`: `( )`, `( * )` for COUNT, or `( expr, ... )`.
    fn parse_function_call(&mut self, function: Function, name: &Token) -> ParseResult<Expr> {
        let open = self.expect_symbol("(")?;
        let mut args = Vec::new();

        if self.queue.eat_symbol(")") {
            return Ok(Expr::FunctionCall { function, args });
        }

        if function == Function::Count
            && self.queue.next_is_symbol("*")
            && self.queue.peek_nth(1).is_some_and(|t| t.is_symbol(")"))
        {
            self.queue.pop();
            self.queue.pop();
            return Ok(Expr::FunctionCall { function, args });
        }

        if self.queue.next_is_keyword(Keyword::Distinct) {
            return Err(self.malformed_arguments(name, "DISTINCT is not supported"));
        }

        loop {
            if self.queue.next_is_symbol(")") || self.queue.next_is_symbol(",") {
                return Err(self.malformed_arguments(name, "empty argument"));
            }
            args.push(self.parse_expression()?);

            match self.queue.peek() {
                Some(t) if t.is_symbol(",") => {
                    self.queue.pop();
                }
                Some(t) if t.is_symbol(")") => {
                    self.queue.pop();
                    break;
                }
                Some(_) => {
                    return Err(self.malformed_arguments(name, "expected ',' or ')'"));
                }
                None => {
                    return Err(ParseError::MismatchedParenthesis {
                        found: format!("unclosed '(' at offset {}", open.offset),
                        offset: self.queue.end_offset(),
                    });
                }
            }
        }

        Ok(Expr::FunctionCall { function, args })
    }

    fn malformed_arguments(&self, name: &Token, reason: &str) -> ParseError {
        ParseError::MalformedArguments {
            function: name.text.clone(),
            reason: reason.to_string(),
            offset: self.offset(),
        }
    }

    /// CASE [operand] WHEN .. THEN .. [WHEN .. THEN ..] ELSE .. END
    ///
    /// ELSE is mandatory so evaluation can never fall through.
    fn parse_case(&mut self, case_token: &Token) -> ParseResult<Expr> {
        let operand = if self.queue.next_is_keyword(Keyword::When) {
            None
        } else if self.queue.next_is_keyword(Keyword::Else) || self.queue.next_is_keyword(Keyword::End)
        {
            return Err(self.malformed_case("expected WHEN"));
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        if !self.queue.next_is_keyword(Keyword::When) {
            return Err(self.malformed_case("expected WHEN"));
        }

        let mut when_clauses = Vec::new();
        while self.queue.eat_keyword(Keyword::When) {
            let condition = self.parse_expression()?;
            if !self.queue.eat_keyword(Keyword::Then) {
                return Err(self.malformed_case("expected THEN after WHEN condition"));
            }
            let result = self.parse_expression()?;
            when_clauses.push((condition, result));
        }

        if !self.queue.eat_keyword(Keyword::Else) {
            let reason = if self.queue.next_is_keyword(Keyword::End) {
                format!("missing ELSE in CASE starting at offset {}", case_token.offset)
            } else {
                "expected WHEN, ELSE or END".to_string()
            };
            return Err(self.malformed_case(&reason));
        }
        let else_clause = self.parse_expression()?;

        if !self.queue.eat_keyword(Keyword::End) {
            return Err(self.malformed_case("missing END"));
        }

        Ok(Expr::Case {
            operand,
            when_clauses,
            else_clause: Box::new(else_clause),
        })
    }

    fn malformed_case(&self, reason: &str) -> ParseError {
        ParseError::MalformedCase {
            reason: reason.to_string(),
            offset: self.offset(),
        }
    }

    /// CAST ( expr AS type-name )
    fn parse_cast(&mut self, cast_token: &Token) -> ParseResult<Expr> {
        let open = self.expect_symbol("(")?;
        let expr = self.parse_expression()?;
        self.expect_keyword(Keyword::As)?;
        let target = match self.parse_type_name()? {
            Some(target) => target,
            None => {
                return Err(ParseError::MalformedArguments {
                    function: cast_token.text.clone(),
                    reason: "missing target type".to_string(),
                    offset: self.offset(),
                })
            }
        };
        self.expect_closing_paren(open.offset)?;

        Ok(Expr::Cast {
            expr: Box::new(expr),
            target,
        })
    }

    /// Optional declared type: one or more unreserved words followed by an
    /// optional `(n)` or `(n, m)` size.
    pub(crate) fn parse_type_name(&mut self) -> ParseResult<Option<TypeName>> {
        let mut words = Vec::new();
        while let Some(token) = self.queue.peek() {
            if token.kind == TokenKind::Word && token.keyword().is_none() {
                words.push(token.text.clone());
                self.queue.pop();
            } else {
                break;
            }
        }

        if words.is_empty() {
            return Ok(None);
        }

        let mut args = Vec::new();
        if self.queue.next_is_symbol("(") {
            let open = self.next_token("(")?;
            loop {
                let negative = self.queue.eat_symbol("-");
                if !negative {
                    self.queue.eat_symbol("+");
                }
                let token = self.next_token("type size")?;
                if token.kind != TokenKind::Number {
                    return Err(self.unexpected(&token, "type size"));
                }
                match number_value(&token, negative)? {
                    Value::Integer(n) => args.push(n),
                    Value::Float(f) => args.push(f as i64),
                    _ => {}
                }
                if !self.queue.eat_symbol(",") {
                    break;
                }
            }
            self.expect_closing_paren(open.offset)?;
        }

        Ok(Some(TypeName::new(words.join(" "), args)))
    }
}

fn decode_hex(token: &Token) -> ParseResult<Vec<u8>> {
    hex::decode(&token.text).map_err(|_| ParseError::UnexpectedToken {
        expected: "hexadecimal blob literal".to_string(),
        found: token.to_string(),
        offset: token.offset,
    })
}
