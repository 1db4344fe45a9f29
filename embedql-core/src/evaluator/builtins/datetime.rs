//! DateTime builtin functions.
//!
//! Every function shares one representation: a time value is resolved to a
//! UTC instant, modifiers are applied in order, and the result is formatted.
//! Numbers are unix epoch seconds; `'now'` and zero arguments read the
//! evaluator's clock.

use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};

use super::text_arg;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::keywords::Function;
use crate::value::{parse_number, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Call a datetime function. Returns None if function not found.
pub fn call(function: Function, args: &[Value], evaluator: &Evaluator<'_>) -> EvalResult<Option<Value>> {
    let result = match function {
        Function::Now => Some(Value::DateTime(evaluator.now())),

        Function::Date => resolve(function, args, evaluator)?
            .map(|dt| Value::Text(dt.format(DATE_FORMAT).to_string())),

        Function::Time => resolve(function, args, evaluator)?
            .map(|dt| Value::Text(dt.format(TIME_FORMAT).to_string())),

        Function::DateTime => resolve(function, args, evaluator)?
            .map(|dt| Value::Text(dt.format(DATETIME_FORMAT).to_string())),

        Function::UnixEpoch => resolve(function, args, evaluator)?
            .map(|dt| Value::Integer(dt.and_utc().timestamp())),

        Function::StrFTime => match text_arg(function, args, 0)? {
            Some(format) => resolve(function, &args[1..], evaluator)?
                .map(|dt| Value::Text(strftime(&format, &dt))),
            None => None,
        },

        _ => return Ok(None),
    };

    Ok(Some(result.unwrap_or(Value::Null)))
}

/// Resolve `[time-value, modifier...]` to a naive UTC timestamp.
///
/// `Ok(None)` when any argument is NULL.
fn resolve(
    function: Function,
    args: &[Value],
    evaluator: &Evaluator<'_>,
) -> EvalResult<Option<NaiveDateTime>> {
    let mut dt = match args.first() {
        None => evaluator.now().naive_utc(),
        Some(Value::Null) => return Ok(None),
        Some(value) => match time_value(value, evaluator) {
            Some(dt) => dt,
            None => return Err(EvalError::InvalidDate(value.to_string())),
        },
    };

    for index in 1..args.len() {
        let Some(modifier) = text_arg(function, args, index)? else {
            return Ok(None);
        };
        dt = apply_modifier(dt, &modifier, evaluator)
            .ok_or_else(|| EvalError::InvalidDate(modifier.clone()))?;
    }

    Ok(Some(dt))
}

fn time_value(value: &Value, evaluator: &Evaluator<'_>) -> Option<NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Some(dt.naive_utc()),
        Value::Integer(secs) => DateTime::from_timestamp(*secs, 0).map(|dt| dt.naive_utc()),
        Value::Float(secs) => from_fractional_seconds(*secs),
        Value::Text(s) if s.trim().eq_ignore_ascii_case("now") => Some(evaluator.now().naive_utc()),
        Value::Text(s) => parse_datetime_text(s)
            .map(|dt| dt.naive_utc())
            .or_else(|| match parse_number(s)? {
                Value::Integer(secs) => DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc()),
                Value::Float(secs) => from_fractional_seconds(secs),
                _ => None,
            }),
        _ => None,
    }
}

fn from_fractional_seconds(secs: f64) -> Option<NaiveDateTime> {
    if !secs.is_finite() {
        return None;
    }
    let millis = (secs * 1000.0).round() as i64;
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

/// Parse the textual date/time forms accepted by the date functions, CAST
/// and comparisons.
///
/// RFC 3339 with offset, `YYYY-MM-DD[ T]HH:MM[:SS[.fff]]`, `YYYY-MM-DD`, and
/// `HH:MM[:SS]` (on 2000-01-01). Forms without an offset are UTC.
pub(crate) fn parse_datetime_text(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }

    for format in ["%H:%M:%S%.f", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(s, format) {
            let date = NaiveDate::from_ymd_opt(2000, 1, 1)?;
            return Some(date.and_time(time).and_utc());
        }
    }

    None
}

/// Apply one modifier; `None` when it is not recognized or overflows.
fn apply_modifier(
    dt: NaiveDateTime,
    modifier: &str,
    evaluator: &Evaluator<'_>,
) -> Option<NaiveDateTime> {
    let modifier = modifier.trim().to_ascii_lowercase();
    let timezone = evaluator.options().timezone;

    match modifier.as_str() {
        "start of day" => return Some(dt.date().and_time(NaiveTime::MIN)),
        "start of month" => {
            return NaiveDate::from_ymd_opt(dt.year(), dt.month(), 1)
                .map(|d| d.and_time(NaiveTime::MIN))
        }
        "start of year" => {
            return NaiveDate::from_ymd_opt(dt.year(), 1, 1).map(|d| d.and_time(NaiveTime::MIN))
        }
        "localtime" => return Some(timezone.from_utc_datetime(&dt).naive_local()),
        "utc" => {
            return timezone
                .from_local_datetime(&dt)
                .earliest()
                .map(|local| local.naive_utc())
        }
        "unixepoch" => return Some(dt),
        _ => {}
    }

    // [+|-]N unit
    let mut parts = modifier.split_whitespace();
    let amount: f64 = parts.next()?.parse().ok()?;
    let unit = parts.next()?;
    if parts.next().is_some() || !amount.is_finite() {
        return None;
    }

    let millis_per_unit: f64 = match unit.trim_end_matches('s') {
        "day" => 86_400_000.0,
        "hour" => 3_600_000.0,
        "minute" => 60_000.0,
        "second" => 1_000.0,
        "month" => return add_months(dt, amount),
        "year" => return add_months(dt, amount * 12.0),
        _ => return None,
    };

    let millis = (amount * millis_per_unit).round();
    if millis.abs() >= i64::MAX as f64 {
        return None;
    }
    dt.checked_add_signed(Duration::milliseconds(millis as i64))
}

/// Calendar month arithmetic; the day clamps to the end of a shorter month.
fn add_months(dt: NaiveDateTime, amount: f64) -> Option<NaiveDateTime> {
    if amount.fract() != 0.0 || amount.abs() > u32::MAX as f64 {
        return None;
    }
    let months = Months::new(amount.abs() as u32);
    if amount >= 0.0 {
        dt.checked_add_months(months)
    } else {
        dt.checked_sub_months(months)
    }
}

/// Format with the strftime subset `%d %f %H %j %J %m %M %s %S %w %W %Y %%`.
/// Unknown conversions are copied through unchanged.
fn strftime(format: &str, dt: &NaiveDateTime) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(spec @ ('d' | 'H' | 'j' | 'm' | 'M' | 's' | 'S' | 'w' | 'W' | 'Y')) => {
                out.push_str(&dt.format(&format!("%{}", spec)).to_string());
            }
            Some('f') => out.push_str(&dt.format("%S%.3f").to_string()),
            Some('J') => {
                let days = dt.and_utc().timestamp_millis() as f64 / 86_400_000.0;
                out.push_str(&(days + 2_440_587.5).to_string());
            }
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{EvalOptions, FixedClock};

    fn with_evaluator<T>(options: EvalOptions, f: impl FnOnce(&Evaluator<'_>) -> T) -> T {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 31, 22, 15, 30).unwrap());
        let evaluator = Evaluator::new(&options, &clock);
        f(&evaluator)
    }

    fn run(function: Function, args: &[Value]) -> EvalResult<Value> {
        with_evaluator(EvalOptions::default(), |e| {
            call(function, args, e).map(|r| r.unwrap_or(Value::Null))
        })
    }

    fn text(s: &str) -> Value {
        Value::from(s)
    }

    #[test]
    fn test_now_uses_clock() {
        assert_eq!(
            run(Function::Now, &[]).unwrap(),
            Value::DateTime(Utc.with_ymd_and_hms(2024, 1, 31, 22, 15, 30).unwrap())
        );
        assert_eq!(run(Function::Date, &[]).unwrap(), text("2024-01-31"));
        assert_eq!(run(Function::Time, &[text("now")]).unwrap(), text("22:15:30"));
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(
            run(Function::DateTime, &[text("2024-05-06T07:08:09Z")]).unwrap(),
            text("2024-05-06 07:08:09")
        );
        assert_eq!(
            run(Function::DateTime, &[text("2024-05-06T09:08:09+02:00")]).unwrap(),
            text("2024-05-06 07:08:09")
        );
        assert_eq!(
            run(Function::DateTime, &[text("2024-05-06 07:08")]).unwrap(),
            text("2024-05-06 07:08:00")
        );
        assert_eq!(
            run(Function::DateTime, &[text("2024-05-06")]).unwrap(),
            text("2024-05-06 00:00:00")
        );
        assert_eq!(
            run(Function::DateTime, &[Value::Integer(0)]).unwrap(),
            text("1970-01-01 00:00:00")
        );
        assert_eq!(run(Function::Date, &[Value::Null]).unwrap(), Value::Null);
        assert_eq!(
            run(Function::Date, &[text("not a date")]),
            Err(EvalError::InvalidDate("not a date".to_string()))
        );
    }

    #[test]
    fn test_modifiers() {
        let base = text("2024-01-31 10:30:00");
        assert_eq!(
            run(Function::Date, &[base.clone(), text("+1 day")]).unwrap(),
            text("2024-02-01")
        );
        assert_eq!(
            run(Function::Date, &[base.clone(), text("+1 month")]).unwrap(),
            text("2024-02-29")
        );
        assert_eq!(
            run(Function::Date, &[base.clone(), text("-2 years")]).unwrap(),
            text("2022-01-31")
        );
        assert_eq!(
            run(Function::DateTime, &[base.clone(), text("-90 minutes")]).unwrap(),
            text("2024-01-31 09:00:00")
        );
        assert_eq!(
            run(Function::DateTime, &[base.clone(), text("start of month")]).unwrap(),
            text("2024-01-01 00:00:00")
        );
        assert_eq!(
            run(
                Function::DateTime,
                &[base.clone(), text("start of year"), text("+12 hours")]
            )
            .unwrap(),
            text("2024-01-01 12:00:00")
        );
        assert_eq!(
            run(Function::Date, &[base.clone(), text("fortnight")]),
            Err(EvalError::InvalidDate("fortnight".to_string()))
        );
        assert_eq!(run(Function::Date, &[base, Value::Null]).unwrap(), Value::Null);
    }

    #[test]
    fn test_localtime_uses_configured_zone() {
        let options = EvalOptions {
            timezone: chrono_tz::Europe::Paris,
            ..EvalOptions::default()
        };
        let result = with_evaluator(options, |e| {
            call(
                Function::DateTime,
                &[text("2024-07-01 12:00:00"), text("localtime")],
                e,
            )
        });
        assert_eq!(result.unwrap(), Some(text("2024-07-01 14:00:00")));

        let result = with_evaluator(options, |e| {
            call(
                Function::DateTime,
                &[text("2024-07-01 14:00:00"), text("utc")],
                e,
            )
        });
        assert_eq!(result.unwrap(), Some(text("2024-07-01 12:00:00")));
    }

    #[test]
    fn test_strftime_and_unixepoch() {
        assert_eq!(
            run(
                Function::StrFTime,
                &[text("%Y/%m/%d %H:%M %% %j"), text("2024-02-03 04:05:06")]
            )
            .unwrap(),
            text("2024/02/03 04:05 % 034")
        );
        assert_eq!(
            run(Function::StrFTime, &[text("%f"), text("2024-02-03 04:05:06.789")]).unwrap(),
            text("06.789")
        );
        assert_eq!(
            run(Function::StrFTime, &[text("%Q")]).unwrap(),
            text("%Q")
        );
        assert_eq!(
            run(Function::UnixEpoch, &[text("1970-01-02")]).unwrap(),
            Value::Integer(86_400)
        );
    }
}
