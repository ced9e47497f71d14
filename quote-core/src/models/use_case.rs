use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::industry::{IndustryKey, IndustryTemplate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCase {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub industry: IndustryKey,
    pub is_active: bool,
}

/// Default sizing data stored for a use case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCaseConfiguration {
    pub id: i64,
    pub use_case_id: i64,
    pub config_name: String,
    pub is_default: bool,
    pub typical_load_kw: Decimal,
    pub peak_load_kw: Decimal,
    pub preferred_duration_hours: Decimal,
    pub operating_hours_per_day: Decimal,
    pub operating_days_per_year: Decimal,
}

impl UseCaseConfiguration {
    /// Overlays the stored operating profile on top of the built-in template.
    pub fn apply_to(
        &self,
        template: &IndustryTemplate,
    ) -> IndustryTemplate {
        let mut merged = template.clone();
        if self.preferred_duration_hours > Decimal::ZERO {
            merged.storage_duration_hours = self.preferred_duration_hours;
        }
        if self.operating_hours_per_day > Decimal::ZERO {
            merged.operating_hours_per_day = self.operating_hours_per_day;
        }
        if self.operating_days_per_year > Decimal::ZERO {
            merged.operating_days_per_year = self.operating_days_per_year;
        }
        merged
    }
}
