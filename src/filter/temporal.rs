//! Temporal helpers backing `to_datetime`, `timestamp`, `age_seconds`,
//! `before`, and `after`.
//!
//! Datetimes flow through the value tree as either an epoch-seconds
//! integer/float or an RFC 3339 string; every temporal filter normalizes to
//! epoch seconds before comparing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::Result;
use crate::value::Value;

pub fn to_epoch(v: &Value, fmt: Option<&str>) -> Result<Option<i64>> {
    Ok(match v {
        Value::Integer(i) => Some(*i),
        Value::Float(f) => Some(*f as i64),
        Value::String(s) => parse_datetime_str(s, fmt),
        _ => None,
    })
}

pub fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

pub fn compare(v: &Value, other: &str, cmp: impl Fn(i64, i64) -> bool) -> Result<Value> {
    let a = to_epoch(v, None)?;
    let b = parse_datetime_str(other, None);
    Ok(match (a, b) {
        (Some(a), Some(b)) => Value::Bool(cmp(a, b)),
        _ => Value::Null,
    })
}

fn parse_datetime_str(s: &str, fmt: Option<&str>) -> Option<i64> {
    if let Some(fmt) = fmt {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().timestamp());
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
        }
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc().timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339() {
        assert!(to_epoch(&Value::String("2024-01-01T00:00:00Z".into()), None).unwrap().is_some());
    }

    #[test]
    fn parses_plain_date() {
        assert!(to_epoch(&Value::String("2024-01-01".into()), None).unwrap().is_some());
    }

    #[test]
    fn integer_is_already_epoch() {
        assert_eq!(to_epoch(&Value::Integer(100), None).unwrap(), Some(100));
    }

    #[test]
    fn before_after_compare() {
        let a = Value::String("2024-01-01".into());
        assert_eq!(compare(&a, "2024-06-01", |x, y| x < y).unwrap(), Value::Bool(true));
        assert_eq!(compare(&a, "2024-06-01", |x, y| x > y).unwrap(), Value::Bool(false));
    }
}
