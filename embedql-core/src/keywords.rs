//! Reserved-word and builtin-function tables.
//!
//! Both tables are process-wide, built once on first use and never mutated,
//! so concurrent parse calls read them without synchronization.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Abort,
    All,
    And,
    As,
    Asc,
    Autoincrement,
    Between,
    By,
    Case,
    Cast,
    Check,
    Collate,
    Constraint,
    Create,
    Default,
    Delete,
    Desc,
    Distinct,
    Drop,
    Else,
    End,
    Exists,
    Fail,
    False,
    Foreign,
    From,
    Glob,
    If,
    Ignore,
    In,
    Insert,
    Into,
    Is,
    IsNull,
    Key,
    Like,
    Limit,
    Match,
    Not,
    NotNull,
    Null,
    Offset,
    Or,
    Order,
    Primary,
    References,
    Regexp,
    Replace,
    Rollback,
    Select,
    Set,
    Table,
    Then,
    True,
    Unique,
    Update,
    Values,
    When,
    Where,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("abort", Keyword::Abort),
    ("all", Keyword::All),
    ("and", Keyword::And),
    ("as", Keyword::As),
    ("asc", Keyword::Asc),
    ("autoincrement", Keyword::Autoincrement),
    ("between", Keyword::Between),
    ("by", Keyword::By),
    ("case", Keyword::Case),
    ("cast", Keyword::Cast),
    ("check", Keyword::Check),
    ("collate", Keyword::Collate),
    ("constraint", Keyword::Constraint),
    ("create", Keyword::Create),
    ("default", Keyword::Default),
    ("delete", Keyword::Delete),
    ("desc", Keyword::Desc),
    ("distinct", Keyword::Distinct),
    ("drop", Keyword::Drop),
    ("else", Keyword::Else),
    ("end", Keyword::End),
    ("exists", Keyword::Exists),
    ("fail", Keyword::Fail),
    ("false", Keyword::False),
    ("foreign", Keyword::Foreign),
    ("from", Keyword::From),
    ("glob", Keyword::Glob),
    ("if", Keyword::If),
    ("ignore", Keyword::Ignore),
    ("in", Keyword::In),
    ("insert", Keyword::Insert),
    ("into", Keyword::Into),
    ("is", Keyword::Is),
    ("isnull", Keyword::IsNull),
    ("key", Keyword::Key),
    ("like", Keyword::Like),
    ("limit", Keyword::Limit),
    ("match", Keyword::Match),
    ("not", Keyword::Not),
    ("notnull", Keyword::NotNull),
    ("null", Keyword::Null),
    ("offset", Keyword::Offset),
    ("or", Keyword::Or),
    ("order", Keyword::Order),
    ("primary", Keyword::Primary),
    ("references", Keyword::References),
    ("regexp", Keyword::Regexp),
    ("replace", Keyword::Replace),
    ("rollback", Keyword::Rollback),
    ("select", Keyword::Select),
    ("set", Keyword::Set),
    ("table", Keyword::Table),
    ("then", Keyword::Then),
    ("true", Keyword::True),
    ("unique", Keyword::Unique),
    ("update", Keyword::Update),
    ("values", Keyword::Values),
    ("when", Keyword::When),
    ("where", Keyword::Where),
];

static KEYWORD_TABLE: Lazy<HashMap<&'static str, Keyword>> =
    Lazy::new(|| KEYWORDS.iter().copied().collect());

impl Keyword {
    /// Case-insensitive lookup of a reserved word.
    pub fn lookup(name: &str) -> Option<Keyword> {
        KEYWORD_TABLE.get(name.to_ascii_lowercase().as_str()).copied()
    }

    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, kw)| *kw == self)
            .map(|(name, _)| *name)
            .unwrap_or("?")
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// Builtin function identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Function {
    // String
    Lower,
    Upper,
    Length,
    Substr,
    Trim,
    Ltrim,
    Rtrim,
    Replace,
    Instr,
    Concat,
    Hex,
    Char,
    Unicode,
    // Math
    Abs,
    Round,
    Sign,
    Ceil,
    Floor,
    Sqrt,
    Power,
    // Null handling and types
    Coalesce,
    IfNull,
    NullIf,
    Iif,
    TypeOf,
    // Aggregates
    Count,
    Sum,
    Total,
    Avg,
    Min,
    Max,
    GroupConcat,
    // Date/time
    Now,
    Date,
    Time,
    DateTime,
    StrFTime,
    UnixEpoch,
}

const FUNCTIONS: &[(&str, Function)] = &[
    ("lower", Function::Lower),
    ("upper", Function::Upper),
    ("length", Function::Length),
    ("substr", Function::Substr),
    ("substring", Function::Substr),
    ("trim", Function::Trim),
    ("ltrim", Function::Ltrim),
    ("rtrim", Function::Rtrim),
    ("replace", Function::Replace),
    ("instr", Function::Instr),
    ("concat", Function::Concat),
    ("hex", Function::Hex),
    ("char", Function::Char),
    ("unicode", Function::Unicode),
    ("abs", Function::Abs),
    ("round", Function::Round),
    ("sign", Function::Sign),
    ("ceil", Function::Ceil),
    ("ceiling", Function::Ceil),
    ("floor", Function::Floor),
    ("sqrt", Function::Sqrt),
    ("power", Function::Power),
    ("pow", Function::Power),
    ("coalesce", Function::Coalesce),
    ("ifnull", Function::IfNull),
    ("nullif", Function::NullIf),
    ("iif", Function::Iif),
    ("typeof", Function::TypeOf),
    ("count", Function::Count),
    ("sum", Function::Sum),
    ("total", Function::Total),
    ("avg", Function::Avg),
    ("min", Function::Min),
    ("max", Function::Max),
    ("group_concat", Function::GroupConcat),
    ("now", Function::Now),
    ("date", Function::Date),
    ("time", Function::Time),
    ("datetime", Function::DateTime),
    ("strftime", Function::StrFTime),
    ("unixepoch", Function::UnixEpoch),
];

static FUNCTION_TABLE: Lazy<HashMap<&'static str, Function>> =
    Lazy::new(|| FUNCTIONS.iter().copied().collect());

impl Function {
    /// Case-insensitive lookup of a builtin function name.
    pub fn lookup(name: &str) -> Option<Function> {
        FUNCTION_TABLE.get(name.to_ascii_lowercase().as_str()).copied()
    }

    /// Canonical (first registered) name.
    pub fn name(self) -> &'static str {
        FUNCTIONS
            .iter()
            .find(|(_, f)| *f == self)
            .map(|(name, _)| *name)
            .unwrap_or("?")
    }

    /// Accepted argument count as `(min, max)`; `None` means unbounded.
    pub fn arity(self) -> (usize, Option<usize>) {
        use Function::*;
        match self {
            Lower | Upper | Length | Hex | Unicode | Abs | Sign | Ceil | Floor | Sqrt | TypeOf => {
                (1, Some(1))
            }
            Substr => (2, Some(3)),
            Trim | Ltrim | Rtrim => (1, Some(2)),
            Replace | Iif => (3, Some(3)),
            Instr | Power | IfNull | NullIf => (2, Some(2)),
            Concat => (1, None),
            Char => (0, None),
            Round => (1, Some(2)),
            Coalesce => (2, None),
            Count => (0, Some(1)),
            Sum | Total | Avg => (1, Some(1)),
            Min | Max => (1, None),
            GroupConcat => (1, Some(2)),
            Now => (0, Some(0)),
            Date | Time | DateTime | UnixEpoch => (0, None),
            StrFTime => (1, None),
        }
    }

    /// Whether a call with `argc` arguments accumulates across records.
    ///
    /// `min`/`max` with two or more arguments are plain scalar functions.
    pub fn is_aggregate(self, argc: usize) -> bool {
        match self {
            Function::Count
            | Function::Sum
            | Function::Total
            | Function::Avg
            | Function::GroupConcat => true,
            Function::Min | Function::Max => argc == 1,
            _ => false,
        }
    }

    pub fn arity_description(self) -> String {
        match self.arity() {
            (min, Some(max)) if min == max => min.to_string(),
            (min, Some(max)) => format!("{} to {}", min, max),
            (min, None) => format!("at least {}", min),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup_is_case_insensitive() {
        assert_eq!(Keyword::lookup("select"), Some(Keyword::Select));
        assert_eq!(Keyword::lookup("SELECT"), Some(Keyword::Select));
        assert_eq!(Keyword::lookup("SeLeCt"), Some(Keyword::Select));
        assert_eq!(Keyword::lookup("users"), None);
    }

    #[test]
    fn test_keyword_display() {
        assert_eq!(Keyword::NotNull.to_string(), "NOTNULL");
        assert_eq!(Keyword::Where.as_str(), "where");
    }

    #[test]
    fn test_function_lookup_and_aliases() {
        assert_eq!(Function::lookup("UPPER"), Some(Function::Upper));
        assert_eq!(Function::lookup("substring"), Some(Function::Substr));
        assert_eq!(Function::lookup("Ceiling"), Some(Function::Ceil));
        assert_eq!(Function::lookup("frobnicate"), None);
        assert_eq!(Function::Substr.name(), "substr");
    }

    #[test]
    fn test_function_arity() {
        assert_eq!(Function::Now.arity(), (0, Some(0)));
        assert_eq!(Function::Substr.arity_description(), "2 to 3");
        assert_eq!(Function::Coalesce.arity_description(), "at least 2");
        assert!(Function::Max.is_aggregate(1));
        assert!(!Function::Max.is_aggregate(2));
        assert!(!Function::Upper.is_aggregate(1));
    }

    #[test]
    fn test_every_function_has_a_name() {
        for (name, func) in FUNCTIONS {
            assert_eq!(Function::lookup(name), Some(*func));
            assert_ne!(func.name(), "?");
        }
    }
}
