use super::*;
use crate::ast::*;
use crate::keywords::Function;
use crate::value::Value;

fn formula(input: &str) -> Expr {
    parse_formula(input).unwrap()
}

fn int(i: i64) -> Expr {
    Expr::Literal(Value::Integer(i))
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_literals() {
    assert_eq!(formula("42"), int(42));
    assert_eq!(formula("2.5"), Expr::Literal(Value::Float(2.5)));
    assert_eq!(formula("1e3"), Expr::Literal(Value::Float(1000.0)));
    assert_eq!(formula("'it''s'"), Expr::Literal(Value::Text("it's".into())));
    assert_eq!(formula("NULL"), Expr::Literal(Value::Null));
    assert_eq!(formula("true"), Expr::Literal(Value::Boolean(true)));
    assert_eq!(formula("X'CAFE'"), Expr::Literal(Value::Blob(vec![0xCA, 0xFE])));
    assert_eq!(formula("-9223372036854775808"), int(i64::MIN));
}

#[test]
fn test_invalid_blob_literal() {
    assert!(matches!(
        parse_formula("X'ABC'"),
        Err(ParseError::UnexpectedToken { .. })
    ));
    assert!(matches!(
        parse_formula("X'ZZ'"),
        Err(ParseError::UnexpectedToken { offset: 0, .. })
    ));
}

#[test]
fn test_blob_literal_case_and_empty() {
    assert_eq!(formula("x'cafe'"), Expr::Literal(Value::Blob(vec![0xCA, 0xFE])));
    assert_eq!(formula("X''"), Expr::Literal(Value::Blob(Vec::new())));
}

#[test]
fn test_same_class_chains_right_to_left() {
    // 10 - 4 - 3 groups as 10 - (4 - 3)
    let expr = formula("10 - 4 - 3");
    assert_eq!(
        expr,
        Expr::binary(
            BinaryOperator::Subtract,
            int(10),
            Expr::binary(BinaryOperator::Subtract, int(4), int(3)),
        )
    );
}

#[test]
fn test_precedence_classes() {
    // 1 + 2 * 3 groups as 1 + (2 * 3)
    let expr = formula("1 + 2 * 3");
    assert_eq!(
        expr,
        Expr::binary(
            BinaryOperator::Add,
            int(1),
            Expr::binary(BinaryOperator::Multiply, int(2), int(3)),
        )
    );

    // 2 * 3 + 1 groups as (2 * 3) + 1
    let expr = formula("2 * 3 + 1");
    assert_eq!(
        expr,
        Expr::binary(
            BinaryOperator::Add,
            Expr::binary(BinaryOperator::Multiply, int(2), int(3)),
            int(1),
        )
    );

    // a = 1 OR b = 2 AND c = 3 groups as (a = 1) OR ((b = 2) AND (c = 3))
    let expr = formula("a = 1 OR b = 2 AND c = 3");
    if let Expr::Binary { op, right, .. } = expr {
        assert_eq!(op, BinaryOperator::Or);
        assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOperator::And,
                ..
            }
        ));
    } else {
        panic!("Expected OR at the root");
    }
}

#[test]
fn test_nesting_limit() {
    let deep = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
    assert!(matches!(
        parse_formula(&deep),
        Err(ParseError::TooDeep {
            limit: MAX_EXPRESSION_DEPTH,
            ..
        })
    ));

    let negations = format!("{}x", "- ".repeat(5_000));
    assert!(matches!(parse_formula(&negations), Err(ParseError::TooDeep { .. })));

    let nots = format!("{}x", "NOT ".repeat(5_000));
    assert!(matches!(parse_formula(&nots), Err(ParseError::TooDeep { .. })));

    let calls = format!("{}x{}", "abs(".repeat(5_000), ")".repeat(5_000));
    assert!(matches!(parse_formula(&calls), Err(ParseError::TooDeep { .. })));

    let cases = format!("{}1{}", "CASE WHEN x THEN ".repeat(5_000), " ELSE 0 END".repeat(5_000));
    assert!(matches!(parse_formula(&cases), Err(ParseError::TooDeep { .. })));
}

#[test]
fn test_moderate_nesting_parses() {
    let nested = format!("{}1{}", "(".repeat(100), ")".repeat(100));
    assert_eq!(formula(&nested), int(1));

    let chain = vec!["x = 1"; 100].join(" OR ");
    assert!(matches!(
        formula(&chain),
        Expr::Binary {
            op: BinaryOperator::Or,
            ..
        }
    ));
}

#[test]
fn test_not_binds_looser_than_comparison() {
    let expr = formula("NOT a = 1 AND b");
    if let Expr::Binary { op, left, .. } = expr {
        assert_eq!(op, BinaryOperator::And);
        if let Expr::Unary { op, operand } = *left {
            assert_eq!(op, UnaryOperator::Not);
            assert!(matches!(
                *operand,
                Expr::Binary {
                    op: BinaryOperator::Equal,
                    ..
                }
            ));
        } else {
            panic!("Expected NOT on the left");
        }
    } else {
        panic!("Expected AND at the root");
    }
}

#[test]
fn test_parenthesized_group() {
    let expr = formula("(10 - 4) - 3");
    assert_eq!(
        expr,
        Expr::binary(
            BinaryOperator::Subtract,
            Expr::binary(BinaryOperator::Subtract, int(10), int(4)),
            int(3),
        )
    );
}

#[test]
fn test_unary_minus_on_field() {
    let expr = formula("-price");
    assert_eq!(
        expr,
        Expr::Unary {
            op: UnaryOperator::Negate,
            operand: Box::new(Expr::field("price")),
        }
    );
}

#[test]
fn test_field_references() {
    assert_eq!(formula("name"), Expr::field("name"));
    assert_eq!(formula("\"first name\""), Expr::field("first name"));
    assert_eq!(formula("[order]"), Expr::field("order"));
    assert_eq!(formula("address.city"), Expr::field("address.city"));
}

#[test]
fn test_pattern_operators_with_not() {
    let expr = formula("name NOT LIKE 'A%'");
    if let Expr::Binary { op, negate, .. } = expr {
        assert_eq!(op, BinaryOperator::Like);
        assert!(negate);
    } else {
        panic!("Expected LIKE");
    }

    for (input, expected) in [
        ("a GLOB 'x*'", BinaryOperator::Glob),
        ("a REGEXP '^x'", BinaryOperator::Regexp),
        ("a MATCH 'foo'", BinaryOperator::Match),
    ] {
        assert!(
            matches!(formula(input), Expr::Binary { op, negate: false, .. } if op == expected),
            "{}",
            input
        );
    }
}

#[test]
fn test_between_and_in() {
    let expr = formula("age NOT BETWEEN 18 AND 65 AND active");
    if let Expr::Binary { op, left, .. } = expr {
        assert_eq!(op, BinaryOperator::And);
        assert_eq!(
            *left,
            Expr::Between {
                expr: Box::new(Expr::field("age")),
                low: Box::new(int(18)),
                high: Box::new(int(65)),
                negate: true,
            }
        );
    } else {
        panic!("Expected AND at the root");
    }

    assert_eq!(
        formula("status IN ('a', 'b')"),
        Expr::In {
            expr: Box::new(Expr::field("status")),
            list: vec![Expr::literal("a"), Expr::literal("b")],
            negate: false,
        }
    );
    assert!(matches!(
        formula("x NOT IN ()"),
        Expr::In { negate: true, ref list, .. } if list.is_empty()
    ));
}

#[test]
fn test_null_tests() {
    let is_not_null = Expr::Binary {
        op: BinaryOperator::Is,
        left: Box::new(Expr::field("x")),
        right: Box::new(Expr::Literal(Value::Null)),
        negate: true,
    };
    assert_eq!(formula("x IS NOT NULL"), is_not_null);
    assert_eq!(formula("x NOTNULL"), is_not_null);
    assert_eq!(formula("x NOT NULL"), is_not_null);
    assert!(matches!(
        formula("x ISNULL"),
        Expr::Binary { op: BinaryOperator::Is, negate: false, .. }
    ));
}

#[test]
fn test_function_calls() {
    assert_eq!(
        formula("now()"),
        Expr::FunctionCall {
            function: Function::Now,
            args: vec![],
        }
    );
    assert_eq!(
        formula("COUNT(*)"),
        Expr::FunctionCall {
            function: Function::Count,
            args: vec![],
        }
    );
    assert_eq!(
        formula("substr(name, 1, 3)"),
        Expr::FunctionCall {
            function: Function::Substr,
            args: vec![Expr::field("name"), int(1), int(3)],
        }
    );
    // REPLACE is also a keyword
    assert!(matches!(
        formula("replace(a, 'x', 'y')"),
        Expr::FunctionCall { function: Function::Replace, .. }
    ));
}

#[test]
fn test_function_call_errors() {
    assert!(matches!(
        parse_formula("frobnicate(1)"),
        Err(ParseError::UnknownFunction { ref name, offset: 0 }) if name == "frobnicate"
    ));
    assert!(matches!(
        parse_formula("upper(a,)"),
        Err(ParseError::MalformedArguments { .. })
    ));
    assert!(matches!(
        parse_formula("upper(a b)"),
        Err(ParseError::MalformedArguments { .. })
    ));
    assert!(matches!(
        parse_formula("count(DISTINCT a)"),
        Err(ParseError::MalformedArguments { .. })
    ));
    assert!(matches!(
        parse_formula("upper(a"),
        Err(ParseError::MismatchedParenthesis { .. })
    ));
}

#[test]
fn test_case_expression() {
    let expr = formula("CASE WHEN x > 1 THEN 'big' WHEN x > 0 THEN 'small' ELSE 'none' END");
    if let Expr::Case {
        operand,
        when_clauses,
        else_clause,
    } = expr
    {
        assert!(operand.is_none());
        assert_eq!(when_clauses.len(), 2);
        assert_eq!(*else_clause, Expr::literal("none"));
    } else {
        panic!("Expected CASE");
    }

    let expr = formula("CASE status WHEN 1 THEN 'on' ELSE 'off' END");
    assert!(matches!(expr, Expr::Case { operand: Some(_), .. }));
}

#[test]
fn test_case_requires_else_and_end() {
    assert!(matches!(
        parse_formula("CASE WHEN x THEN 1 END"),
        Err(ParseError::MalformedCase { .. })
    ));
    assert!(matches!(
        parse_formula("CASE WHEN x THEN 1 ELSE 2"),
        Err(ParseError::MalformedCase { .. })
    ));
    assert!(matches!(
        parse_formula("CASE WHEN x 1 ELSE 2 END"),
        Err(ParseError::MalformedCase { .. })
    ));
    assert!(matches!(
        parse_formula("CASE ELSE 2 END"),
        Err(ParseError::MalformedCase { .. })
    ));
}

#[test]
fn test_cast_and_collate() {
    let expr = formula("CAST(price AS DECIMAL(10, 2))");
    if let Expr::Cast { target, .. } = expr {
        assert_eq!(target.name, "DECIMAL");
        assert_eq!(target.args, vec![10, 2]);
        assert_eq!(target.affinity, Affinity::Numeric);
    } else {
        panic!("Expected CAST");
    }

    let expr = formula("name COLLATE NOCASE = 'bob'");
    if let Expr::Binary { left, .. } = expr {
        assert_eq!(left.collation(), Some(Collation::NoCase));
    } else {
        panic!("Expected comparison");
    }

    assert!(matches!(
        parse_formula("a COLLATE klingon"),
        Err(ParseError::UnknownKeyword { .. })
    ));
}

#[test]
fn test_mismatched_parenthesis() {
    assert!(matches!(
        parse_formula("(1 + 2"),
        Err(ParseError::MismatchedParenthesis { .. })
    ));
    assert!(matches!(
        parse_formula("1 + 2)"),
        Err(ParseError::MismatchedParenthesis { offset: 5, .. })
    ));
}

#[test]
fn test_trailing_tokens_rejected() {
    let err = parse_formula("1 2").unwrap_err();
    assert_eq!(err.offset(), 2);
    assert!(parse_formula("1 + 2;").is_ok());
}

#[test]
fn test_keyword_is_not_an_operand() {
    assert!(matches!(
        parse_formula("SELECT"),
        Err(ParseError::UnexpectedToken { .. })
    ));
    assert!(matches!(
        parse_formula("1 +"),
        Err(ParseError::UnexpectedEnd { .. })
    ));
}

#[test]
fn test_shared_queue_leaves_terminator() {
    let mut queue = TokenQueue::from_text("a + 1, b").unwrap();
    let expr = parse_expression(&mut queue).unwrap();
    assert!(matches!(expr, Expr::Binary { op: BinaryOperator::Add, .. }));
    assert!(queue.next_is_symbol(","));
    assert_eq!(queue.len(), 2);
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_create_table() {
    let stmt = parse_statement(
        "CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, name TEXT NOT NULL DEFAULT 'x')",
    )
    .unwrap();

    if let Statement::CreateTable(create) = stmt {
        assert_eq!(create.name, "users");
        assert!(create.if_not_exists);
        assert_eq!(create.columns.len(), 2);

        let id = &create.columns[0];
        assert!(id.is_primary_key());
        assert_eq!(id.affinity(), Affinity::Integer);

        let name = &create.columns[1];
        assert!(!name.nullable);
        assert_eq!(name.default, Some(Expr::literal("x")));
        assert_eq!(name.affinity(), Affinity::Text);
    } else {
        panic!("Expected CREATE TABLE");
    }
}

#[test]
fn test_create_table_constraints() {
    let stmt = parse_statement(
        "CREATE TABLE orders (
            id INTEGER CONSTRAINT pk PRIMARY KEY DESC AUTOINCREMENT,
            user_id INTEGER REFERENCES users (id),
            total REAL DEFAULT -1.5 CHECK (total >= 0),
            code VARCHAR(16) UNIQUE COLLATE NOCASE,
            note,
            CONSTRAINT uq UNIQUE (user_id, code),
            FOREIGN KEY (user_id) REFERENCES users (id),
            CHECK (total < 1000)
        )",
    )
    .unwrap();

    let Statement::CreateTable(create) = stmt else {
        panic!("Expected CREATE TABLE");
    };

    assert_eq!(create.columns.len(), 5);
    assert_eq!(create.constraints.len(), 3);

    let id = &create.columns[0];
    assert_eq!(id.constraints[0].name.as_deref(), Some("pk"));
    assert_eq!(
        id.constraints[0].kind,
        ColumnConstraintKind::PrimaryKey {
            descending: true,
            autoincrement: true,
        }
    );

    let user_id = &create.columns[1];
    assert_eq!(
        user_id.constraints[0].kind,
        ColumnConstraintKind::References(ForeignKeyTarget {
            table: "users".into(),
            columns: vec!["id".into()],
        })
    );

    let total = &create.columns[2];
    assert_eq!(total.default, Some(Expr::Literal(Value::Float(-1.5))));
    assert!(matches!(total.constraints[0].kind, ColumnConstraintKind::Check(_)));

    let code = &create.columns[3];
    assert_eq!(code.type_name.as_ref().map(|t| t.args.clone()), Some(vec![16]));
    assert!(code.is_unique());

    let note = &create.columns[4];
    assert!(note.type_name.is_none());
    assert_eq!(note.affinity(), Affinity::Blob);

    assert_eq!(create.constraints[0].name.as_deref(), Some("uq"));
    assert!(matches!(
        create.constraints[1].kind,
        TableConstraintKind::ForeignKey { .. }
    ));
}

#[test]
fn test_create_table_requires_columns() {
    assert!(parse_statement("CREATE TABLE t (PRIMARY KEY (a))").is_err());
    assert!(parse_statement("CREATE TABLE t ()").is_err());
    assert!(parse_statement("CREATE TABLE t (a INT, PRIMARY KEY (a), b INT)").is_err());
}

#[test]
fn test_drop_table() {
    let stmt = parse_statement("DROP TABLE IF EXISTS main.users").unwrap();
    assert_eq!(
        stmt,
        Statement::DropTable(DropTableStatement {
            name: "main.users".into(),
            if_exists: true,
        })
    );
}

#[test]
fn test_insert() {
    let stmt = parse_statement("INSERT INTO users (id, name) VALUES (1, 'a'), (2, 'b')").unwrap();
    if let Statement::Insert(insert) = stmt {
        assert_eq!(insert.table, "users");
        assert_eq!(insert.columns, vec!["id", "name"]);
        assert_eq!(insert.values.len(), 2);
        assert_eq!(insert.values[1][1], Expr::literal("b"));
        assert_eq!(insert.on_conflict, None);
    } else {
        panic!("Expected INSERT");
    }

    let stmt = parse_statement("INSERT OR IGNORE INTO t VALUES (1)").unwrap();
    assert!(matches!(
        stmt,
        Statement::Insert(InsertStatement {
            on_conflict: Some(ConflictResolution::Ignore),
            ..
        })
    ));

    let stmt = parse_statement("REPLACE INTO t VALUES (1)").unwrap();
    assert!(matches!(
        stmt,
        Statement::Insert(InsertStatement {
            on_conflict: Some(ConflictResolution::Replace),
            ..
        })
    ));
}

#[test]
fn test_insert_value_count_mismatch() {
    assert!(parse_statement("INSERT INTO t (a, b) VALUES (1)").is_err());
}

#[test]
fn test_update_and_delete() {
    let stmt = parse_statement("UPDATE users SET name = 'x', age = age + 1 WHERE id = 1").unwrap();
    if let Statement::Update(update) = stmt {
        assert_eq!(update.table, "users");
        assert_eq!(update.assignments.len(), 2);
        assert_eq!(update.assignments[1].0, "age");
        assert!(update.predicate.is_some());
    } else {
        panic!("Expected UPDATE");
    }

    let stmt = parse_statement("DELETE FROM users").unwrap();
    assert_eq!(
        stmt,
        Statement::Delete(DeleteStatement {
            table: "users".into(),
            predicate: None,
        })
    );
}

#[test]
fn test_select() {
    let stmt = parse_statement(
        "SELECT DISTINCT name, age * 2 AS double_age, city c FROM users \
         WHERE age > 18 ORDER BY name DESC, age LIMIT 10 OFFSET 5",
    )
    .unwrap();

    let Statement::Select(select) = stmt else {
        panic!("Expected SELECT");
    };

    assert!(select.distinct);
    assert_eq!(select.columns.len(), 3);
    assert!(matches!(
        &select.columns[1],
        ResultColumn::Expr { alias: Some(a), .. } if a == "double_age"
    ));
    assert!(matches!(
        &select.columns[2],
        ResultColumn::Expr { alias: Some(a), .. } if a == "c"
    ));
    assert_eq!(select.table.as_deref(), Some("users"));
    assert!(select.predicate.is_some());
    assert_eq!(select.ordering.len(), 2);
    assert!(select.ordering[0].descending);
    assert!(!select.ordering[1].descending);
    assert_eq!(select.limit, Some(int(10)));
    assert_eq!(select.offset, Some(int(5)));
}

#[test]
fn test_select_limit_with_comma() {
    let Statement::Select(select) = parse_statement("SELECT * FROM t LIMIT 5, 10").unwrap() else {
        panic!("Expected SELECT");
    };
    assert_eq!(select.columns, vec![ResultColumn::All]);
    assert_eq!(select.offset, Some(int(5)));
    assert_eq!(select.limit, Some(int(10)));
}

#[test]
fn test_select_without_from() {
    let Statement::Select(select) = parse_statement("SELECT 1 + 1").unwrap() else {
        panic!("Expected SELECT");
    };
    assert!(select.table.is_none());
}

#[test]
fn test_select_from_requires_table() {
    let err = parse_statement("SELECT * FROM").unwrap_err();
    if let ParseError::InStatement { index, source } = err {
        assert_eq!(index, 0);
        assert!(matches!(
            *source,
            ParseError::UnexpectedEnd { ref expected, .. } if expected == "table name"
        ));
    } else {
        panic!("Expected statement-wrapped error");
    }
}

#[test]
fn test_statement_sequence() {
    let statements = parse_statements(
        "CREATE TABLE t (a INT); INSERT INTO t VALUES (1);; SELECT a FROM t;",
    )
    .unwrap();
    assert_eq!(statements.len(), 3);
    assert!(matches!(statements[2], Statement::Select(_)));

    assert!(parse_statements("").unwrap().is_empty());
    assert!(parse_statements(" ; ; ").unwrap().is_empty());
}

#[test]
fn test_statement_error_reports_index() {
    let err = parse_statements("SELECT 1; FROB x; SELECT 2").unwrap_err();
    assert_eq!(err.statement_index(), Some(1));
    assert!(matches!(
        err,
        ParseError::InStatement { ref source, .. }
            if matches!(**source, ParseError::UnknownKeyword { ref word, offset: 10 } if word == "FROB")
    ));
}

#[test]
fn test_missing_statement_separator() {
    let err = parse_statements("SELECT 1 SELECT 2").unwrap_err();
    assert_eq!(err.statement_index(), Some(0));
    assert_eq!(err.offset(), 9);
}

#[test]
fn test_unterminated_literal_is_lex_error() {
    assert!(matches!(
        parse_statements("SELECT 'oops"),
        Err(ParseError::Lex(_))
    ));
}
