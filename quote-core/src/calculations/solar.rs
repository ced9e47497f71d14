//! Solar capacity sizing from roof and carport area.
//!
//! # Formula
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Normalize areas to square feet (sqm × 10.764) |
//! | 2    | Roof usable area = roof sqft × roof usable factor |
//! | 3    | Carport usable area = carport sqft × carport usable factor (0 if not wanted) |
//! | 4    | Total kW = (roof usable + carport usable) × solar density |
//! | 5    | Annual kWh = total kW × peak sun hours × 365 × performance ratio |
//!
//! Every step is recorded in the result's audit trail together with the
//! constants it used.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use quote_core::calculations::{AreaUnit, CarportInterest, SolarCapacityCalculator, SolarCapacityInput};
//! use quote_core::{IndustryKey, IndustryTemplate};
//!
//! let template = IndustryTemplate::builtin(IndustryKey::CarWash);
//! let input = SolarCapacityInput {
//!     roof_area: dec!(10000),
//!     roof_unit: AreaUnit::SquareFeet,
//!     carport_area: Some(dec!(5000)),
//!     carport_unit: AreaUnit::SquareFeet,
//!     carport_interest: CarportInterest::Yes,
//!     peak_sun_hours: None,
//! };
//!
//! let result = SolarCapacityCalculator::new(&template).calculate(&input).unwrap();
//!
//! // (10000 × 0.60 + 5000 × 0.80) × 0.015
//! assert_eq!(result.total_kw, dec!(150.00));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::IndustryTemplate;
use crate::calculations::common::{SQM_TO_SQFT, round_half_up};

/// Sun hours assumed when no location data is available.
pub const DEFAULT_PEAK_SUN_HOURS: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// System losses (inverter, wiring, soiling, temperature).
pub const PERFORMANCE_RATIO: Decimal = Decimal::from_parts(80, 0, 0, false, 2);

const DAYS_PER_YEAR: Decimal = Decimal::from_parts(365, 0, 0, false, 0);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SolarCapacityError {
    #[error("invalid solar input: {}", .0.join("; "))]
    InvalidInput(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaUnit {
    #[default]
    SquareFeet,
    SquareMeters,
}

impl AreaUnit {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace([' ', '.', '_'], "").as_str() {
            "sqft" | "ft2" | "squarefeet" => Some(Self::SquareFeet),
            "sqm" | "m2" | "squaremeters" | "squaremetres" => Some(Self::SquareMeters),
            _ => None,
        }
    }

    pub fn to_sqft(
        &self,
        area: Decimal,
    ) -> Decimal {
        match self {
            Self::SquareFeet => area,
            Self::SquareMeters => area * SQM_TO_SQFT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarportInterest {
    Yes,
    #[default]
    No,
    Unsure,
}

impl CarportInterest {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "unsure" | "maybe" => Some(Self::Unsure),
            _ => None,
        }
    }

    fn includes_carport(&self) -> bool {
        !matches!(self, Self::No)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolarCapacityInput {
    pub roof_area: Decimal,
    pub roof_unit: AreaUnit,
    pub carport_area: Option<Decimal>,
    pub carport_unit: AreaUnit,
    pub carport_interest: CarportInterest,
    pub peak_sun_hours: Option<Decimal>,
}

/// One line of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub label: String,
    pub formula: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolarCapacityResult {
    pub roof_usable_sqft: Decimal,
    pub carport_usable_sqft: Decimal,
    pub total_usable_sqft: Decimal,
    pub roof_kw: Decimal,
    pub carport_kw: Decimal,
    pub total_kw: Decimal,
    pub annual_generation_kwh: Decimal,
    pub audit: Vec<AuditEntry>,
}

/// Returns the problems with a solar input as human-readable strings.
/// An empty vector means the input can be calculated.
pub fn validate_solar_input(input: &SolarCapacityInput) -> Vec<String> {
    let mut errors = Vec::new();

    if input.roof_area <= Decimal::ZERO {
        errors.push("Roof area must be greater than zero".to_string());
    }
    if input.carport_interest.includes_carport()
        && let Some(carport) = input.carport_area
        && carport <= Decimal::ZERO
    {
        errors.push("Carport area must be greater than zero".to_string());
    }
    if let Some(hours) = input.peak_sun_hours
        && (hours <= Decimal::ZERO || hours > Decimal::from(12))
    {
        errors.push("Peak sun hours must be between 0 and 12".to_string());
    }

    errors
}

#[derive(Debug, Clone)]
pub struct SolarCapacityCalculator<'a> {
    template: &'a IndustryTemplate,
}

impl<'a> SolarCapacityCalculator<'a> {
    pub fn new(template: &'a IndustryTemplate) -> Self {
        Self { template }
    }

    /// Sizes the array and records each step.
    ///
    /// # Errors
    ///
    /// Returns [`SolarCapacityError::InvalidInput`] with every message from
    /// [`validate_solar_input`] when the input is rejected.
    pub fn calculate(
        &self,
        input: &SolarCapacityInput,
    ) -> Result<SolarCapacityResult, SolarCapacityError> {
        let errors = validate_solar_input(input);
        if !errors.is_empty() {
            return Err(SolarCapacityError::InvalidInput(errors));
        }

        let mut audit = Vec::new();
        let t = self.template;

        let roof_sqft = input.roof_unit.to_sqft(input.roof_area);
        if input.roof_unit == AreaUnit::SquareMeters {
            audit.push(entry(
                "roof_sqft",
                format!("{} sqm × {}", input.roof_area, SQM_TO_SQFT),
                roof_sqft,
            ));
        }

        let roof_usable = roof_sqft * t.roof_usable_factor;
        audit.push(entry(
            "roof_usable_sqft",
            format!("{} sqft × {}", roof_sqft, t.roof_usable_factor),
            roof_usable,
        ));

        let carport_usable = match input.carport_area {
            Some(area) if input.carport_interest.includes_carport() => {
                let carport_sqft = input.carport_unit.to_sqft(area);
                let usable = carport_sqft * t.carport_usable_factor;
                audit.push(entry(
                    "carport_usable_sqft",
                    format!("{} sqft × {}", carport_sqft, t.carport_usable_factor),
                    usable,
                ));
                usable
            }
            Some(_) => {
                debug!("carport area ignored, interest is 'no'");
                Decimal::ZERO
            }
            None => Decimal::ZERO,
        };

        let total_usable = roof_usable + carport_usable;
        let roof_kw = roof_usable * t.solar_density_kw_per_sqft;
        let carport_kw = carport_usable * t.solar_density_kw_per_sqft;
        let total_kw = total_usable * t.solar_density_kw_per_sqft;
        audit.push(entry(
            "total_kw",
            format!(
                "({} + {}) sqft × {} kW/sqft",
                roof_usable, carport_usable, t.solar_density_kw_per_sqft
            ),
            total_kw,
        ));

        let sun_hours = input.peak_sun_hours.unwrap_or(DEFAULT_PEAK_SUN_HOURS);
        let annual_kwh = total_kw * sun_hours * DAYS_PER_YEAR * PERFORMANCE_RATIO;
        audit.push(entry(
            "annual_generation_kwh",
            format!(
                "{} kW × {} h × {} d × {}",
                total_kw, sun_hours, DAYS_PER_YEAR, PERFORMANCE_RATIO
            ),
            annual_kwh,
        ));

        Ok(SolarCapacityResult {
            roof_usable_sqft: round_half_up(roof_usable),
            carport_usable_sqft: round_half_up(carport_usable),
            total_usable_sqft: round_half_up(total_usable),
            roof_kw: round_half_up(roof_kw),
            carport_kw: round_half_up(carport_kw),
            total_kw: round_half_up(total_kw),
            annual_generation_kwh: round_half_up(annual_kwh),
            audit,
        })
    }
}

fn entry(
    label: &str,
    formula: String,
    value: Decimal,
) -> AuditEntry {
    AuditEntry {
        label: label.to_string(),
        formula,
        value: round_half_up(value),
    }
}
