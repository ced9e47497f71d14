use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single wizard answer. Untagged so answer files read naturally
/// (`tunnelLength = 120`, `dryerType = "standard"`, `hasReclaim = true`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(Decimal),
    Bool(bool),
    Text(String),
}

impl AnswerValue {
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().replace(',', "").parse().ok(),
            Self::Bool(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Booleans plus the yes/no strings select questions produce.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" | "true" | "y" => Some(true),
                "no" | "false" | "n" => Some(false),
                _ => None,
            },
            Self::Number(n) => Some(!n.is_zero()),
        }
    }
}

impl From<Decimal> for AnswerValue {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for AnswerValue {
    fn from(value: i64) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Free-form answer bag keyed by question field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answers(BTreeMap<String, AnswerValue>);

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        field: &str,
        value: impl Into<AnswerValue>,
    ) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(
        &mut self,
        field: &str,
        value: impl Into<AnswerValue>,
    ) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn remove(
        &mut self,
        field: &str,
    ) -> Option<AnswerValue> {
        self.0.remove(field)
    }

    pub fn get(
        &self,
        field: &str,
    ) -> Option<&AnswerValue> {
        self.0.get(field)
    }

    pub fn contains(
        &self,
        field: &str,
    ) -> bool {
        self.0.contains_key(field)
    }

    pub fn number(
        &self,
        field: &str,
    ) -> Option<Decimal> {
        self.get(field).and_then(AnswerValue::as_decimal)
    }

    /// Numeric answer, falling back to `default` when missing or negative.
    pub fn number_or(
        &self,
        field: &str,
        default: Decimal,
    ) -> Decimal {
        match self.number(field) {
            Some(n) if n >= Decimal::ZERO => n,
            _ => default,
        }
    }

    /// Equipment counts: whole, non-negative numbers. Fractions are truncated.
    pub fn count(
        &self,
        field: &str,
    ) -> Decimal {
        self.number_or(field, Decimal::ZERO).trunc()
    }

    pub fn text(
        &self,
        field: &str,
    ) -> Option<&str> {
        self.get(field).and_then(AnswerValue::as_text)
    }

    pub fn flag(
        &self,
        field: &str,
    ) -> bool {
        self.get(field)
            .and_then(AnswerValue::as_bool)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.0.iter()
    }
}

impl FromIterator<(String, AnswerValue)> for Answers {
    fn from_iter<T: IntoIterator<Item = (String, AnswerValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
