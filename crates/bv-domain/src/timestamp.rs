//! `uploaded_at` wire format: `YYYY-MM-DDTHH:MM:SSZ`, UTC, second precision.

use serde::{de, Deserialize, Deserializer, Serializer};
use time::{macros::format_description, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Current UTC time truncated to whole seconds.
#[must_use]
pub fn now_utc() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    OffsetDateTime::from_unix_timestamp(now.unix_timestamp()).unwrap_or(now)
}

pub fn format(ts: OffsetDateTime) -> Result<String, time::error::Format> {
    ts.to_offset(UtcOffset::UTC)
        .format(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z"))
}

pub fn parse(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let naive = PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z"),
    )?;
    Ok(naive.assume_utc())
}

pub fn serialize<S>(ts: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let rendered = format(*ts).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&rendered)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(|err| de::Error::custom(format!("invalid uploaded_at '{raw}': {err}")))
}
