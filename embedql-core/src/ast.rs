//! Abstract syntax tree for expressions and statements.
//!
//! Every node is fully resolved when the parser returns it; trees serialize
//! with serde as tagged variants for inspection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::keywords::Function;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Negate,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    /// Null-safe equality (`IS`, `IS NOT` with negate).
    Is,

    // Logical
    And,
    Or,

    // Pattern
    Like,
    Glob,
    Regexp,
    Match,
}

impl BinaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Concat => "||",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::Is => "IS",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Like => "LIKE",
            BinaryOperator::Glob => "GLOB",
            BinaryOperator::Regexp => "REGEXP",
            BinaryOperator::Match => "MATCH",
        }
    }

    pub fn is_pattern(self) -> bool {
        matches!(
            self,
            BinaryOperator::Like | BinaryOperator::Glob | BinaryOperator::Regexp | BinaryOperator::Match
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
                | BinaryOperator::Is
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text comparison rule attached with `COLLATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collation {
    Binary,
    NoCase,
    RTrim,
}

impl Collation {
    pub fn lookup(name: &str) -> Option<Collation> {
        match name.to_ascii_uppercase().as_str() {
            "BINARY" => Some(Collation::Binary),
            "NOCASE" => Some(Collation::NoCase),
            "RTRIM" => Some(Collation::RTrim),
            _ => None,
        }
    }
}

/// Storage class a declared type maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Affinity {
    Integer,
    Real,
    Text,
    Blob,
    Numeric,
    Boolean,
    DateTime,
}

/// Declared column or CAST target type, e.g. `VARCHAR(255)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeName {
    pub name: String,
    pub args: Vec<i64>,
    pub affinity: Affinity,
}

impl TypeName {
    pub fn new(name: impl Into<String>, args: Vec<i64>) -> Self {
        let name = name.into();
        let affinity = affinity_of(&name);
        Self {
            name,
            args,
            affinity,
        }
    }
}

/// Derive affinity from a declared type name, first matching rule wins.
pub fn affinity_of(declared: &str) -> Affinity {
    let upper = declared.to_ascii_uppercase();
    if upper.contains("INT") {
        Affinity::Integer
    } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        Affinity::Text
    } else if upper.is_empty() || upper.contains("BLOB") {
        Affinity::Blob
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        Affinity::Real
    } else if upper.contains("BOOL") {
        Affinity::Boolean
    } else if upper.contains("DATE") || upper.contains("TIME") {
        Affinity::DateTime
    } else {
        Affinity::Numeric
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Value),
    /// Field reference; dotted paths address nested mappings.
    Field(String),
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
        negate: bool,
    },
    FunctionCall {
        function: Function,
        args: Vec<Expr>,
    },
    Case {
        /// Present for the simple form `CASE x WHEN ...`.
        operand: Option<Box<Expr>>,
        when_clauses: Vec<(Expr, Expr)>,
        else_clause: Box<Expr>,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negate: bool,
    },
    In {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negate: bool,
    },
    Cast {
        expr: Box<Expr>,
        target: TypeName,
    },
    Collate {
        expr: Box<Expr>,
        collation: Collation,
    },
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn field(name: impl Into<String>) -> Self {
        Expr::Field(name.into())
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            negate: false,
        }
    }

    /// Collation carried by this node, if it is a COLLATE node.
    pub fn collation(&self) -> Option<Collation> {
        match self {
            Expr::Collate { collation, .. } => Some(*collation),
            _ => None,
        }
    }

    /// Whether any aggregate call appears in the tree.
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expr::Literal(_) | Expr::Field(_) => false,
            Expr::Unary { operand, .. } => operand.contains_aggregate(),
            Expr::Binary { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Expr::FunctionCall { function, args } => {
                function.is_aggregate(args.len()) || args.iter().any(Expr::contains_aggregate)
            }
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                operand.as_ref().is_some_and(|o| o.contains_aggregate())
                    || when_clauses
                        .iter()
                        .any(|(w, t)| w.contains_aggregate() || t.contains_aggregate())
                    || else_clause.contains_aggregate()
            }
            Expr::Between {
                expr, low, high, ..
            } => expr.contains_aggregate() || low.contains_aggregate() || high.contains_aggregate(),
            Expr::In { expr, list, .. } => {
                expr.contains_aggregate() || list.iter().any(Expr::contains_aggregate)
            }
            Expr::Cast { expr, .. } | Expr::Collate { expr, .. } => expr.contains_aggregate(),
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    CreateTable(CreateTableStatement),
    DropTable(DropTableStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Select(SelectStatement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTableStatement {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub type_name: Option<TypeName>,
    pub nullable: bool,
    pub default: Option<Expr>,
    pub constraints: Vec<ColumnConstraint>,
}

impl ColumnDef {
    pub fn is_primary_key(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c.kind, ColumnConstraintKind::PrimaryKey { .. }))
    }

    pub fn is_unique(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c.kind, ColumnConstraintKind::Unique))
    }

    pub fn affinity(&self) -> Affinity {
        self.type_name
            .as_ref()
            .map(|t| t.affinity)
            .unwrap_or(Affinity::Blob)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConstraint {
    pub name: Option<String>,
    pub kind: ColumnConstraintKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnConstraintKind {
    PrimaryKey {
        descending: bool,
        autoincrement: bool,
    },
    Unique,
    Check(Expr),
    Collate(Collation),
    References(ForeignKeyTarget),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyTarget {
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConstraint {
    pub name: Option<String>,
    pub kind: TableConstraintKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableConstraintKind {
    PrimaryKey(Vec<String>),
    Unique(Vec<String>),
    Check(Expr),
    ForeignKey {
        columns: Vec<String>,
        target: ForeignKeyTarget,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropTableStatement {
    pub name: String,
    pub if_exists: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictResolution {
    Replace,
    Ignore,
    Abort,
    Fail,
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Expr>>,
    pub on_conflict: Option<ConflictResolution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<(String, Expr)>,
    pub predicate: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub table: String,
    pub predicate: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    pub distinct: bool,
    pub columns: Vec<ResultColumn>,
    pub table: Option<String>,
    pub predicate: Option<Expr>,
    pub ordering: Vec<OrderingTerm>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultColumn {
    All,
    Expr { expr: Expr, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderingTerm {
    pub expr: Expr,
    pub descending: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affinity_rules() {
        assert_eq!(affinity_of("INTEGER"), Affinity::Integer);
        assert_eq!(affinity_of("bigint"), Affinity::Integer);
        assert_eq!(affinity_of("VARCHAR"), Affinity::Text);
        assert_eq!(affinity_of("BLOB"), Affinity::Blob);
        assert_eq!(affinity_of(""), Affinity::Blob);
        assert_eq!(affinity_of("DOUBLE PRECISION"), Affinity::Real);
        assert_eq!(affinity_of("BOOLEAN"), Affinity::Boolean);
        assert_eq!(affinity_of("DATETIME"), Affinity::DateTime);
        assert_eq!(affinity_of("DECIMAL"), Affinity::Numeric);
        // "POINT" contains "INT"
        assert_eq!(affinity_of("POINT"), Affinity::Integer);
    }

    #[test]
    fn test_contains_aggregate() {
        let count = Expr::FunctionCall {
            function: Function::Count,
            args: vec![],
        };
        let sum = Expr::binary(BinaryOperator::Add, count, Expr::literal(1));
        assert!(sum.contains_aggregate());

        let scalar_max = Expr::FunctionCall {
            function: Function::Max,
            args: vec![Expr::field("a"), Expr::field("b")],
        };
        assert!(!scalar_max.contains_aggregate());
    }

    #[test]
    fn test_serializes_as_tagged_tree() {
        let expr = Expr::binary(BinaryOperator::Add, Expr::literal(1), Expr::field("x"));
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(json["Binary"]["op"], "Add");
        assert_eq!(json["Binary"]["left"]["Literal"]["Integer"], 1);
        assert_eq!(json["Binary"]["right"]["Field"], "x");
    }
}
