//! serde helper storing `DateTime<Utc>` fields as the date/time variant.
//!
//! ```rust
//! use chrono::{DateTime, Utc};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Default)]
//! struct Event {
//!     #[serde(with = "embedql::codec::datetime")]
//!     at: DateTime<Utc>,
//! }
//! ```
//!
//! Other serializers see a plain string: RFC 3339 for years 1 through 9999,
//! `@<seconds>[.<nanoseconds>]` since the Unix epoch outside that range.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

/// Newtype name the encoder recognizes.
pub(crate) const TOKEN: &str = "$embedql::private::DateTime";

pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_newtype_struct(TOKEN, &format(value))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse(&text).ok_or_else(|| D::Error::custom(format!("invalid date/time '{}'", text)))
}

/// Text form that [`parse`] reads back exactly.
pub(crate) fn format(value: &DateTime<Utc>) -> String {
    if (1..=9999).contains(&value.year()) {
        return value.to_rfc3339_opts(SecondsFormat::AutoSi, true);
    }
    match value.timestamp_subsec_nanos() {
        0 => format!("@{}", value.timestamp()),
        nanos => format!("@{}.{:09}", value.timestamp(), nanos),
    }
}

pub(crate) fn parse(text: &str) -> Option<DateTime<Utc>> {
    let Some(epoch) = text.strip_prefix('@') else {
        return DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    };

    let (seconds, nanos) = match epoch.split_once('.') {
        Some((seconds, nanos)) if nanos.len() == 9 => (seconds, nanos.parse::<u32>().ok()?),
        Some(_) => return None,
        None => (epoch, 0),
    };
    DateTime::from_timestamp(seconds.parse::<i64>().ok()?, nanos)
}
