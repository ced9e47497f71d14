//! Column conversions. Money and energy values are stored as REAL; JSON
//! documents (answers, question options, event payloads) as TEXT.

use quote_core::RepositoryError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};

/// Reads a decimal from an INTEGER or REAL column. NULL reads as zero.
pub fn get_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Decimal, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{}' not found: {}", column, e)))?;

    let type_name = value_ref.type_info().name().to_string();
    match type_name.as_str() {
        "INTEGER" => {
            let val: i64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get INTEGER from '{}': {}", column, e))
            })?;
            Ok(Decimal::from(val))
        }
        "REAL" => {
            let val: f64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get REAL from '{}': {}", column, e))
            })?;
            Decimal::try_from(val).map_err(|e| {
                RepositoryError::Database(format!("Failed to convert {} to Decimal: {}", val, e))
            })
        }
        "NULL" => Ok(Decimal::ZERO),
        other => Err(RepositoryError::Database(format!(
            "Unexpected type '{}' for column '{}'",
            other, column
        ))),
    }
}

/// Like [`get_decimal`] but NULL reads as `None`.
pub fn get_optional_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{}' not found: {}", column, e)))?;

    if value_ref.is_null() {
        return Ok(None);
    }

    get_decimal(row, column).map(Some)
}

pub fn decimal_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Deserializes a JSON TEXT column.
pub fn get_json<T: DeserializeOwned>(
    row: &SqliteRow,
    column: &str,
) -> Result<T, RepositoryError> {
    let text: String = row
        .try_get(column)
        .map_err(|e| RepositoryError::Database(format!("Failed to get TEXT from '{}': {}", column, e)))?;
    serde_json::from_str(&text)
        .map_err(|e| RepositoryError::Database(format!("Invalid JSON in '{}': {}", column, e)))
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Database(e.to_string()))
}
