//! Lexical checks for built-in datatypes and simple type facets.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

use super::model::{Builtin, SimpleType};

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static XS_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").expect("valid regex")
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static XS_DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})T([01]\d|2[0-3]):[0-5]\d:[0-5]\d(\.\d+)?(Z|[+-]\d{2}:\d{2})?$")
        .expect("valid regex")
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static XS_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+$").expect("valid regex"));

/// Collapse runs of whitespace to single spaces and trim.
fn collapse(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Calendar date encoded in an `xs:date` or `xs:dateTime` literal.
///
/// Any timezone suffix is ignored; only the calendar date is kept.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use inventory_harvester::schema::parse_xs_date;
///
/// let expected = NaiveDate::from_ymd_opt(2013, 12, 1);
/// assert_eq!(parse_xs_date("2013-12-01"), expected);
/// assert_eq!(parse_xs_date("2013-12-01Z"), expected);
/// assert_eq!(parse_xs_date("2013-12-01T09:30:00+01:00"), expected);
/// assert_eq!(parse_xs_date("2013-02-30"), None);
/// ```
pub fn parse_xs_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let caps = XS_DATE
        .captures(value)
        .or_else(|| XS_DATE_TIME.captures(value))?;

    let year = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    let day = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn check_builtin(base: Builtin, value: &str) -> Result<(), String> {
    let ok = match base {
        Builtin::String | Builtin::Token => true,
        // Real-world URIs are rarely escaped correctly; only reject embedded whitespace
        Builtin::AnyUri => !value.contains(char::is_whitespace),
        Builtin::Date => XS_DATE.is_match(value) && parse_xs_date(value).is_some(),
        Builtin::DateTime => XS_DATE_TIME.is_match(value) && parse_xs_date(value).is_some(),
        Builtin::Boolean => matches!(value, "true" | "false" | "1" | "0"),
        Builtin::Integer => XS_INTEGER.is_match(value),
    };

    if ok {
        Ok(())
    } else {
        Err(format!("'{value}' is not a valid {}", base.name()))
    }
}

/// Check a text or attribute value against a simple type.
///
/// Returns a message describing the first violated constraint.
pub fn check_simple_value(simple: &SimpleType, raw: &str) -> Result<(), String> {
    let collapsed;
    let value = if simple.base.collapses_whitespace() {
        collapsed = collapse(raw);
        collapsed.as_str()
    } else {
        raw
    };

    check_builtin(simple.base, value)?;

    let type_name = simple.name.as_deref().unwrap_or("anonymous type");

    if !simple.enumeration.is_empty() && !simple.enumeration.iter().any(|e| e == value) {
        return Err(format!(
            "'{value}' is not one of [{}] allowed by {type_name}",
            simple.enumeration.join(", ")
        ));
    }

    let length = value.chars().count();
    if let Some(min) = simple.min_length {
        if length < min {
            return Err(format!(
                "'{value}' is shorter than the minimum length {min} of {type_name}"
            ));
        }
    }
    if let Some(max) = simple.max_length {
        if length > max {
            return Err(format!(
                "value of length {length} exceeds the maximum length {max} of {type_name}"
            ));
        }
    }

    Ok(())
}
