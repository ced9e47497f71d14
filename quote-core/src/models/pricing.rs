use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Equipment prices, utility rates and financial constants used to price a
/// system configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingScenario {
    pub id: i64,
    pub name: String,
    pub bess_cost_per_kwh: Decimal,
    pub solar_cost_per_watt: Decimal,
    pub generator_cost_per_kw: Decimal,
    /// Installation / balance-of-system cost as a share of equipment cost.
    pub installation_factor: Decimal,
    /// Blended energy rate in $/kWh.
    pub electricity_rate: Decimal,
    /// Monthly demand charge in $/kW.
    pub demand_charge_per_kw: Decimal,
    /// Peak minus off-peak energy rate in $/kWh.
    pub peak_offpeak_spread: Decimal,
    pub annual_cycles: Decimal,
    pub round_trip_efficiency: Decimal,
    /// Federal Investment Tax Credit rate.
    pub itc_rate: Decimal,
    pub is_default: bool,
}

impl PricingScenario {
    /// Constants used when no scenario can be read from the database.
    pub fn fallback() -> Self {
        Self {
            id: 0,
            name: "fallback".to_string(),
            bess_cost_per_kwh: Decimal::from(350),
            solar_cost_per_watt: Decimal::new(185, 2),
            generator_cost_per_kw: Decimal::from(800),
            installation_factor: Decimal::new(15, 2),
            electricity_rate: Decimal::new(14, 2),
            demand_charge_per_kw: Decimal::from(15),
            peak_offpeak_spread: Decimal::new(8, 2),
            annual_cycles: Decimal::from(250),
            round_trip_efficiency: Decimal::new(88, 2),
            itc_rate: Decimal::new(30, 2),
            is_default: true,
        }
    }
}
