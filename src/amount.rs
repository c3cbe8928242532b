use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How upstream strings write their numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountLocale {
    /// `1.234.567,89`: period groups thousands, comma marks decimals.
    #[default]
    DotThousands,
    /// `1234567.89` or `1,234,567.89`: commas are grouping noise.
    Plain,
}

fn dot_thousands_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d{1,3}(\.\d{3})+(,\d*)?$").unwrap())
}

fn numeric_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?(\d+(\.\d+)?|\.\d+)").unwrap())
}

/// Amount of a JSON field. Missing, null and non-numeric values are 0.
pub fn parse_amount(value: Option<&Value>, locale: AmountLocale) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Some(Value::String(s)) => parse_amount_str(s, locale),
        _ => 0.0,
    }
}

pub fn parse_amount_str(raw: &str, locale: AmountLocale) -> f64 {
    // Upstream sometimes leaves a stray comma on the last field of a record.
    let trimmed = raw.trim().trim_end_matches(',').trim();
    let kept: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    let normalized = match locale {
        AmountLocale::DotThousands if uses_dot_thousands(&kept) => {
            let no_dots = kept.replace('.', "");
            match no_dots.rfind(',') {
                Some(pos) => format!("{}.{}", &no_dots[..pos], &no_dots[pos + 1..]),
                None => no_dots,
            }
        }
        _ => kept,
    };
    let digits: String = normalized
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();

    numeric_prefix_re()
        .find(&digits)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn uses_dot_thousands(s: &str) -> bool {
    s.contains(',') || s.matches('.').count() > 1 || dot_thousands_re().is_match(s)
}

/// Unit count of a JSON field: rounded, never negative. Strings are read
/// like amounts, so `"2.0"` is 2 and `"1,5"` rounds to 2.
pub fn parse_quantity(value: Option<&Value>, locale: AmountLocale) -> Option<u64> {
    match value {
        Some(Value::Number(n)) => n.as_f64().map(clamp_quantity),
        Some(Value::String(s)) => Some(clamp_quantity(parse_amount_str(s, locale))),
        _ => None,
    }
}

/// Sales CSV quantity column. Keeps digits and sign only, so `"3 un."` is 3 and `"1.000"` is 1000.
pub fn parse_quantity_str(raw: &str) -> u64 {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    kept.parse::<i64>().map(|q| q.max(0) as u64).unwrap_or(0)
}

fn clamp_quantity(q: f64) -> u64 {
    if q.is_finite() && q > 0.0 {
        q.round() as u64
    } else {
        0
    }
}
