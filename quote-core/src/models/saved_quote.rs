use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::answers::Answers;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedQuote {
    pub id: i64,
    pub use_case_id: i64,

    // User-provided values
    pub answers: Answers,

    // Calculated values (recommended configuration)
    pub bess_kw: Decimal,
    pub bess_kwh: Decimal,
    pub solar_kw: Decimal,
    pub generator_kw: Decimal,
    pub total_cost: Decimal,
    pub net_cost: Decimal,
    pub annual_savings: Decimal,
    pub payback_years: Option<Decimal>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// For creating new quotes (no id or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSavedQuote {
    pub use_case_id: i64,
    pub answers: Answers,
    pub bess_kw: Decimal,
    pub bess_kwh: Decimal,
    pub solar_kw: Decimal,
    pub generator_kw: Decimal,
    pub total_cost: Decimal,
    pub net_cost: Decimal,
    pub annual_savings: Decimal,
    pub payback_years: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAnalyticsEvent {
    pub event_type: String,
    pub use_case_slug: Option<String>,
    pub payload: serde_json::Value,
}
