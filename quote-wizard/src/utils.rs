use std::sync::LazyLock;

use quote_core::AnswerValue;
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

/// Error returned when a string cannot be parsed as a [`Decimal`].
#[derive(Debug, Error)]
#[error("invalid decimal '{input}': {source}")]
pub struct ParseDecimalError {
    input: String,
    #[source]
    source: rust_decimal::Error,
}

/// Error returned for a malformed `field=value` answer.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("expected field=value, got '{0}'")]
pub struct ParseAssignmentError(String);

/// Number with an optional trailing unit word, e.g. `120 ft`, `1,500 sqft`.
static QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?[0-9][0-9,]*(?:\.[0-9]+)?|-?\.[0-9]+)\s*([A-Za-z%]+(?:\s[A-Za-z]+)?)?$")
        .expect("quantity pattern is valid")
});

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z0-9_]*)\s*=\s*(.*?)\s*$").expect("assignment pattern is valid")
});

/// Normalizes input for decimal parsing: trims whitespace and removes commas (thousands separator).
fn normalize_decimal_input(s: &str) -> String {
    s.trim().replace(',', "")
}

/// Parses a string into a [`Decimal`].
///
/// Handles comma as thousands separator (e.g. `"1,234.56"`).
/// Empty or whitespace-only input is treated as 0.
pub fn parse_decimal(s: &str) -> Result<Decimal, ParseDecimalError> {
    let normalized = normalize_decimal_input(s);
    if normalized.is_empty() {
        return Ok(Decimal::ZERO);
    }
    normalized.parse().map_err(|e| {
        tracing::error!(input = %s, "invalid decimal: {}", e);
        ParseDecimalError {
            input: s.to_string(),
            source: e,
        }
    })
}

/// Reads a numeric quantity, ignoring a trailing unit word.
pub fn parse_quantity(s: &str) -> Option<Decimal> {
    let captures = QUANTITY.captures(s.trim())?;
    parse_decimal(&captures[1]).ok()
}

/// Interprets a raw answer typed on the command line: booleans, then
/// quantities, then plain text.
pub fn parse_answer_value(raw: &str) -> AnswerValue {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => return AnswerValue::Bool(true),
        "false" => return AnswerValue::Bool(false),
        _ => {}
    }
    match parse_quantity(trimmed) {
        Some(n) => AnswerValue::Number(n),
        None => AnswerValue::Text(trimmed.to_string()),
    }
}

/// Splits `field=value` into a field name and a parsed answer.
pub fn parse_assignment(s: &str) -> Result<(String, AnswerValue), ParseAssignmentError> {
    let captures = ASSIGNMENT
        .captures(s)
        .ok_or_else(|| ParseAssignmentError(s.to_string()))?;
    Ok((captures[1].to_string(), parse_answer_value(&captures[2])))
}

/// Formats an optional [`Decimal`] for display, using "—" when `None`.
pub fn opt_decimal_display(d: &Option<Decimal>) -> String {
    d.as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "—".to_string())
}

/// Whole dollars with thousands separators, e.g. `$1,234,567`.
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round();
    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}
