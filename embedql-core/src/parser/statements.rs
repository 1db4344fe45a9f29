//! Statement parsing: CREATE TABLE, DROP TABLE, INSERT, UPDATE, DELETE, SELECT.

use crate::ast::{
    ColumnConstraint, ColumnConstraintKind, ColumnDef, ConflictResolution, CreateTableStatement,
    DeleteStatement, DropTableStatement, Expr, ForeignKeyTarget, InsertStatement, OrderingTerm,
    ResultColumn, SelectStatement, Statement, TableConstraint, TableConstraintKind,
    UpdateStatement,
};
use crate::error::{ParseError, ParseResult};
use crate::keywords::Keyword;
use crate::lexer::TokenKind;
use crate::parser::{number_value, Parser};
use crate::value::Value;

impl<'q> Parser<'q> {
    /// Parse one statement from the front of the queue.
    ///
    /// The terminating `;` is left for the caller.
    pub fn parse_statement(&mut self) -> ParseResult<Statement> {
        let Some(token) = self.queue.peek() else {
            return Err(self.end_of_input("statement"));
        };

        match token.keyword() {
            Some(Keyword::Create) => self.parse_create_table().map(Statement::CreateTable),
            Some(Keyword::Drop) => self.parse_drop_table().map(Statement::DropTable),
            Some(Keyword::Insert) | Some(Keyword::Replace) => {
                self.parse_insert().map(Statement::Insert)
            }
            Some(Keyword::Update) => self.parse_update().map(Statement::Update),
            Some(Keyword::Delete) => self.parse_delete().map(Statement::Delete),
            Some(Keyword::Select) => self.parse_select().map(Statement::Select),
            _ if token.kind == TokenKind::Word => Err(ParseError::UnknownKeyword {
                word: token.text.clone(),
                offset: token.offset,
            }),
            _ => Err(self.unexpected(token, "statement")),
        }
    }

    // ------------------------------------------------------------------
    // CREATE TABLE
    // ------------------------------------------------------------------

    fn parse_create_table(&mut self) -> ParseResult<CreateTableStatement> {
        self.expect_keyword(Keyword::Create)?;
        self.expect_keyword(Keyword::Table)?;

        let if_not_exists = if self.queue.eat_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Not)?;
            self.expect_keyword(Keyword::Exists)?;
            true
        } else {
            false
        };

        let name = self.expect_qualified_name("table name")?;
        let open = self.expect_symbol("(")?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();

        loop {
            if self.next_is_table_constraint() {
                constraints.push(self.parse_table_constraint()?);
            } else if constraints.is_empty() {
                columns.push(self.parse_column_def()?);
            } else {
                // column definitions may not follow table constraints
                return Err(self.error_at_front("table constraint"));
            }

            if !self.queue.eat_symbol(",") {
                break;
            }
        }

        self.expect_closing_paren(open.offset)?;

        if columns.is_empty() {
            return Err(ParseError::UnexpectedToken {
                expected: "column definition".to_string(),
                found: "table constraint".to_string(),
                offset: open.offset,
            });
        }

        tracing::trace!(table = %name, columns = columns.len(), "parsed CREATE TABLE");

        Ok(CreateTableStatement {
            name,
            columns,
            constraints,
            if_not_exists,
        })
    }

    fn next_is_table_constraint(&self) -> bool {
        matches!(
            self.queue.peek().and_then(|t| t.keyword()),
            Some(
                Keyword::Constraint
                    | Keyword::Primary
                    | Keyword::Unique
                    | Keyword::Check
                    | Keyword::Foreign
            )
        )
    }

    fn parse_column_def(&mut self) -> ParseResult<ColumnDef> {
        let name = self.expect_identifier("column name")?;
        let type_name = self.parse_type_name()?;

        let mut column = ColumnDef {
            name,
            type_name,
            nullable: true,
            default: None,
            constraints: Vec::new(),
        };

        loop {
            let constraint_name = if self.queue.eat_keyword(Keyword::Constraint) {
                Some(self.expect_identifier("constraint name")?)
            } else {
                None
            };

            let Some(keyword) = self.queue.peek().and_then(|t| t.keyword()) else {
                if constraint_name.is_some() {
                    return Err(self.error_at_front("column constraint"));
                }
                break;
            };

            let kind = match keyword {
                Keyword::Primary => {
                    self.queue.pop();
                    self.expect_keyword(Keyword::Key)?;
                    let descending = if self.queue.eat_keyword(Keyword::Desc) {
                        true
                    } else {
                        self.queue.eat_keyword(Keyword::Asc);
                        false
                    };
                    let autoincrement = self.queue.eat_keyword(Keyword::Autoincrement);
                    ColumnConstraintKind::PrimaryKey {
                        descending,
                        autoincrement,
                    }
                }
                Keyword::Not => {
                    self.queue.pop();
                    self.expect_keyword(Keyword::Null)?;
                    column.nullable = false;
                    continue;
                }
                Keyword::Null => {
                    self.queue.pop();
                    column.nullable = true;
                    continue;
                }
                Keyword::Default => {
                    self.queue.pop();
                    column.default = Some(self.parse_default_value()?);
                    continue;
                }
                Keyword::Unique => {
                    self.queue.pop();
                    ColumnConstraintKind::Unique
                }
                Keyword::Check => {
                    self.queue.pop();
                    ColumnConstraintKind::Check(self.parse_parenthesized_expression()?)
                }
                Keyword::Collate => {
                    self.queue.pop();
                    ColumnConstraintKind::Collate(self.parse_collation_name()?)
                }
                Keyword::References => {
                    self.queue.pop();
                    ColumnConstraintKind::References(self.parse_foreign_key_target()?)
                }
                _ if constraint_name.is_some() => {
                    return Err(self.error_at_front("column constraint"));
                }
                _ => break,
            };

            column.constraints.push(ColumnConstraint {
                name: constraint_name,
                kind,
            });
        }

        Ok(column)
    }

    /// DEFAULT value: a literal, a signed number, or a parenthesized expression.
    fn parse_default_value(&mut self) -> ParseResult<Expr> {
        let Some(token) = self.queue.peek() else {
            return Err(self.end_of_input("default value"));
        };

        if token.is_symbol("(") {
            return self.parse_parenthesized_expression();
        }

        if token.is_symbol("-") || token.is_symbol("+") {
            let negative = token.is_symbol("-");
            self.queue.pop();
            let number = self.next_token("number")?;
            if number.kind != TokenKind::Number {
                return Err(self.unexpected(&number, "number"));
            }
            return Ok(Expr::Literal(number_value(&number, negative)?));
        }

        match (token.kind, token.keyword()) {
            (TokenKind::Number | TokenKind::String | TokenKind::Blob, _)
            | (TokenKind::Word, Some(Keyword::Null | Keyword::True | Keyword::False)) => {
                self.parse_primary()
            }
            // bare identifiers are taken as text, as in `DEFAULT active`
            (TokenKind::Word, None) => {
                let token = self.next_token("default value")?;
                Ok(Expr::Literal(Value::Text(token.text)))
            }
            _ => Err(self.unexpected(token, "default value")),
        }
    }

    fn parse_parenthesized_expression(&mut self) -> ParseResult<Expr> {
        let open = self.expect_symbol("(")?;
        let expr = self.parse_expression()?;
        self.expect_closing_paren(open.offset)?;
        Ok(expr)
    }

    /// `table [(col, ...)]` after REFERENCES.
    fn parse_foreign_key_target(&mut self) -> ParseResult<ForeignKeyTarget> {
        let table = self.expect_qualified_name("table name")?;
        let columns = if self.queue.next_is_symbol("(") {
            self.parse_identifier_list("column name")?
        } else {
            Vec::new()
        };
        Ok(ForeignKeyTarget { table, columns })
    }

    fn parse_table_constraint(&mut self) -> ParseResult<TableConstraint> {
        let name = if self.queue.eat_keyword(Keyword::Constraint) {
            Some(self.expect_identifier("constraint name")?)
        } else {
            None
        };

        let token = self.next_token("table constraint")?;
        let kind = match token.keyword() {
            Some(Keyword::Primary) => {
                self.expect_keyword(Keyword::Key)?;
                TableConstraintKind::PrimaryKey(self.parse_identifier_list("column name")?)
            }
            Some(Keyword::Unique) => {
                TableConstraintKind::Unique(self.parse_identifier_list("column name")?)
            }
            Some(Keyword::Check) => TableConstraintKind::Check(self.parse_parenthesized_expression()?),
            Some(Keyword::Foreign) => {
                self.expect_keyword(Keyword::Key)?;
                let columns = self.parse_identifier_list("column name")?;
                self.expect_keyword(Keyword::References)?;
                let target = self.parse_foreign_key_target()?;
                TableConstraintKind::ForeignKey { columns, target }
            }
            _ => return Err(self.unexpected(&token, "table constraint")),
        };

        Ok(TableConstraint { name, kind })
    }

    // ------------------------------------------------------------------
    // DROP TABLE
    // ------------------------------------------------------------------

    fn parse_drop_table(&mut self) -> ParseResult<DropTableStatement> {
        self.expect_keyword(Keyword::Drop)?;
        self.expect_keyword(Keyword::Table)?;

        let if_exists = if self.queue.eat_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Exists)?;
            true
        } else {
            false
        };

        let name = self.expect_qualified_name("table name")?;
        Ok(DropTableStatement { name, if_exists })
    }

    // ------------------------------------------------------------------
    // INSERT
    // ------------------------------------------------------------------

    fn parse_insert(&mut self) -> ParseResult<InsertStatement> {
        let on_conflict = if self.queue.eat_keyword(Keyword::Replace) {
            Some(ConflictResolution::Replace)
        } else {
            self.expect_keyword(Keyword::Insert)?;
            if self.queue.eat_keyword(Keyword::Or) {
                Some(self.parse_conflict_resolution()?)
            } else {
                None
            }
        };

        self.expect_keyword(Keyword::Into)?;
        let table = self.expect_qualified_name("table name")?;

        let columns = if self.queue.next_is_symbol("(") {
            self.parse_identifier_list("column name")?
        } else {
            Vec::new()
        };

        self.expect_keyword(Keyword::Values)?;

        let mut values = Vec::new();
        loop {
            let open = self.expect_symbol("(")?;
            let mut row = Vec::new();
            loop {
                row.push(self.parse_expression()?);
                if !self.queue.eat_symbol(",") {
                    break;
                }
            }
            self.expect_closing_paren(open.offset)?;

            if !columns.is_empty() && row.len() != columns.len() {
                return Err(ParseError::UnexpectedToken {
                    expected: format!("{} values", columns.len()),
                    found: format!("{} values", row.len()),
                    offset: open.offset,
                });
            }
            values.push(row);

            if !self.queue.eat_symbol(",") {
                break;
            }
        }

        Ok(InsertStatement {
            table,
            columns,
            values,
            on_conflict,
        })
    }

    fn parse_conflict_resolution(&mut self) -> ParseResult<ConflictResolution> {
        let token = self.next_token("conflict resolution")?;
        match token.keyword() {
            Some(Keyword::Replace) => Ok(ConflictResolution::Replace),
            Some(Keyword::Ignore) => Ok(ConflictResolution::Ignore),
            Some(Keyword::Abort) => Ok(ConflictResolution::Abort),
            Some(Keyword::Fail) => Ok(ConflictResolution::Fail),
            Some(Keyword::Rollback) => Ok(ConflictResolution::Rollback),
            _ => Err(self.unexpected(&token, "REPLACE, IGNORE, ABORT, FAIL or ROLLBACK")),
        }
    }

    // ------------------------------------------------------------------
    // UPDATE / DELETE
    // ------------------------------------------------------------------

    fn parse_update(&mut self) -> ParseResult<UpdateStatement> {
        self.expect_keyword(Keyword::Update)?;
        let table = self.expect_qualified_name("table name")?;
        self.expect_keyword(Keyword::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_identifier("column name")?;
            self.expect_symbol("=")?;
            let value = self.parse_expression()?;
            assignments.push((column, value));
            if !self.queue.eat_symbol(",") {
                break;
            }
        }

        let predicate = self.parse_where_clause()?;

        Ok(UpdateStatement {
            table,
            assignments,
            predicate,
        })
    }

    fn parse_delete(&mut self) -> ParseResult<DeleteStatement> {
        self.expect_keyword(Keyword::Delete)?;
        self.expect_keyword(Keyword::From)?;
        let table = self.expect_qualified_name("table name")?;
        let predicate = self.parse_where_clause()?;
        Ok(DeleteStatement { table, predicate })
    }

    fn parse_where_clause(&mut self) -> ParseResult<Option<Expr>> {
        if self.queue.eat_keyword(Keyword::Where) {
            Ok(Some(self.parse_expression()?))
        } else {
            Ok(None)
        }
    }

    // ------------------------------------------------------------------
    // SELECT
    // ------------------------------------------------------------------

    fn parse_select(&mut self) -> ParseResult<SelectStatement> {
        self.expect_keyword(Keyword::Select)?;

        let distinct = if self.queue.eat_keyword(Keyword::Distinct) {
            true
        } else {
            self.queue.eat_keyword(Keyword::All);
            false
        };

        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_result_column()?);
            if !self.queue.eat_symbol(",") {
                break;
            }
        }

        let table = if self.queue.eat_keyword(Keyword::From) {
            Some(self.expect_qualified_name("table name")?)
        } else {
            None
        };

        let predicate = self.parse_where_clause()?;

        let mut ordering = Vec::new();
        if self.queue.eat_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            loop {
                let expr = self.parse_expression()?;
                let descending = if self.queue.eat_keyword(Keyword::Desc) {
                    true
                } else {
                    self.queue.eat_keyword(Keyword::Asc);
                    false
                };
                ordering.push(OrderingTerm { expr, descending });
                if !self.queue.eat_symbol(",") {
                    break;
                }
            }
        }

        let mut limit = None;
        let mut offset = None;
        if self.queue.eat_keyword(Keyword::Limit) {
            let first = self.parse_expression()?;
            if self.queue.eat_keyword(Keyword::Offset) {
                limit = Some(first);
                offset = Some(self.parse_expression()?);
            } else if self.queue.eat_symbol(",") {
                // LIMIT skip, count
                offset = Some(first);
                limit = Some(self.parse_expression()?);
            } else {
                limit = Some(first);
            }
        }

        Ok(SelectStatement {
            distinct,
            columns,
            table,
            predicate,
            ordering,
            limit,
            offset,
        })
    }

    fn parse_result_column(&mut self) -> ParseResult<ResultColumn> {
        if self.queue.eat_symbol("*") {
            return Ok(ResultColumn::All);
        }

        let expr = self.parse_expression()?;
        let alias = if self.queue.eat_keyword(Keyword::As) {
            Some(self.expect_identifier("column alias")?)
        } else if self.queue.peek().is_some_and(|t| t.is_identifier()) {
            Some(self.expect_identifier("column alias")?)
        } else {
            None
        };

        Ok(ResultColumn::Expr { expr, alias })
    }
}
