use std::fmt;

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::portable;
use embedql_core::{
    parse_formula, parse_statements, DateProvider, EvalOptions, Evaluator, Expr, Record,
    Statement, SystemClock, Value,
};

/// Parses and evaluates under one configuration.
///
/// ```
/// use embedql::{Engine, Record, Value};
///
/// let engine = Engine::default();
/// let mut record = Record::new();
/// record.insert("qty".to_string(), Value::Integer(3));
/// assert_eq!(engine.evaluate_formula("qty * 2", &record).unwrap(), Value::Integer(6));
/// ```
pub struct Engine {
    config: EngineConfig,
    options: EvalOptions,
    clock: Box<dyn DateProvider>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let options = config.eval_options();
        Self {
            config,
            options,
            clock: Box::new(SystemClock),
        }
    }

    /// Replace the wall clock, e.g. with a `FixedClock` for reproducible dates.
    pub fn with_clock(mut self, clock: impl DateProvider + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.options, self.clock.as_ref())
    }

    /// Parse a `;`-separated batch of statements.
    pub fn parse(&self, text: &str) -> Result<Vec<Statement>> {
        Ok(parse_statements(text)?)
    }

    pub fn parse_formula(&self, text: &str) -> Result<Expr> {
        Ok(parse_formula(text)?)
    }

    pub fn evaluate(&self, expr: &Expr, record: &Record) -> Result<Value> {
        Ok(self.evaluator().evaluate(expr, record)?)
    }

    pub fn evaluate_formula(&self, text: &str, record: &Record) -> Result<Value> {
        let expr = self.parse_formula(text)?;
        self.evaluate(&expr, record)
    }

    /// Run a validation predicate. NULL and false both reject the record.
    pub fn check(&self, predicate: &str, record: &Record) -> Result<bool> {
        let expr = self.parse_formula(predicate)?;
        let passed = self.evaluator().check(&expr, record)?;
        debug!(passed, "checked predicate");
        Ok(passed)
    }

    /// Portable text using the configured root object name.
    pub fn to_text(&self, value: &Value) -> String {
        portable::to_text_named(value, &self.config.root_object_name)
    }

    pub fn from_text(&self, text: &str) -> Result<Value> {
        Ok(portable::from_text(text)?)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::{TimeZone, Utc};
    use embedql_core::{EvalError, FixedClock};
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        match Value::from(value) {
            Value::Object(map) => map,
            _ => Record::new(),
        }
    }

    #[test]
    fn test_check_treats_null_as_false() {
        let engine = Engine::default();
        let row = record(json!({"age": 20, "email": null}));
        assert!(engine.check("age >= 18", &row).unwrap());
        assert!(!engine.check("email LIKE '%@%'", &row).unwrap());
        assert!(!engine.check("age < 18", &row).unwrap());
    }

    #[test]
    fn test_errors_are_aggregated() {
        let engine = Engine::default();
        let row = Record::new();
        assert!(matches!(engine.parse_formula("1 +"), Err(Error::Parse(_))));
        assert!(matches!(
            engine.evaluate_formula("1 / 0", &row),
            Err(Error::Eval(EvalError::DivisionByZero))
        ));
        assert!(matches!(engine.from_text("@obj:x<"), Err(Error::Format(_))));
    }

    #[test]
    fn test_fixed_clock_and_zone() {
        let config = EngineConfig {
            timezone: "Asia/Tokyo".to_string(),
            ..Default::default()
        };
        let engine = Engine::new(config)
            .with_clock(FixedClock(Utc.with_ymd_and_hms(2024, 3, 15, 20, 0, 0).unwrap()));
        let row = Record::new();
        assert_eq!(
            engine.evaluate_formula("date('now')", &row).unwrap(),
            Value::from("2024-03-15")
        );
        assert_eq!(
            engine
                .evaluate_formula("date('now', 'localtime')", &row)
                .unwrap(),
            Value::from("2024-03-16")
        );
    }

    #[test]
    fn test_case_insensitive_like_from_config() {
        let config = EngineConfig {
            like_case_sensitive: false,
            ..Default::default()
        };
        let engine = Engine::new(config);
        let row = record(json!({"name": "ALICE"}));
        assert!(engine.check("name LIKE 'ali%'", &row).unwrap());
        assert!(!Engine::default().check("name LIKE 'ali%'", &row).unwrap());
    }

    #[test]
    fn test_text_uses_root_name() {
        let config = EngineConfig {
            root_object_name: "row".to_string(),
            ..Default::default()
        };
        let engine = Engine::new(config);
        let value = Value::from(json!({"a": 1}));
        let text = engine.to_text(&value);
        assert_eq!(text, "@obj:row<a#=`1`>");
        assert_eq!(engine.from_text(&text).unwrap(), value);
    }
}
