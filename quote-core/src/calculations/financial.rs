//! Cost, incentive and savings calculation for a system configuration.
//!
//! | Line                 | Formula |
//! |----------------------|---------|
//! | BESS cost            | bess_kwh × $/kWh |
//! | Solar cost           | solar_kw × 1000 × $/W |
//! | Generator cost       | generator_kw × $/kW |
//! | Installation         | equipment × installation factor |
//! | ITC                  | (BESS + solar) × (1 + installation factor) × ITC rate |
//! | Demand savings       | bess_kw × demand charge × 12 × 0.75 |
//! | Arbitrage savings    | bess_kwh × cycles × spread × round-trip efficiency |
//! | Solar savings        | solar annual kWh × energy rate |
//! | Payback              | net cost ÷ annual savings |
//! | ROI                  | (annual savings × 25 − net cost) ÷ net cost × 100 |
//!
//! Generators are not ITC-eligible.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PricingScenario;
use crate::calculations::common::{ratio, round_half_up};
use crate::calculations::sizing::SystemConfiguration;

/// Share of the battery's nameplate power that reliably shaves the monthly peak.
pub const DEMAND_CHARGE_CAPTURE: Decimal = Decimal::from_parts(75, 0, 0, false, 2);

/// Analysis horizon for ROI.
pub const ROI_HORIZON_YEARS: Decimal = Decimal::from_parts(25, 0, 0, false, 0);

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);
const WATTS_PER_KW: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);
const HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub bess_cost: Decimal,
    pub solar_cost: Decimal,
    pub generator_cost: Decimal,
    pub equipment_cost: Decimal,
    pub installation_cost: Decimal,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsBreakdown {
    pub demand_charge: Decimal,
    pub arbitrage: Decimal,
    pub solar: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub costs: CostBreakdown,
    pub itc_eligible_cost: Decimal,
    pub itc_rate: Decimal,
    pub itc_amount: Decimal,
    pub net_cost: Decimal,
    pub savings: SavingsBreakdown,
    pub annual_savings: Decimal,
    pub payback_years: Option<Decimal>,
    pub roi_percent: Option<Decimal>,
}

/// Simple payback. `None` when the system never pays back.
///
/// ```
/// use rust_decimal_macros::dec;
/// use quote_core::calculations::payback_years;
///
/// assert_eq!(payback_years(dec!(500000), dec!(100000)), Some(dec!(5.00)));
/// assert_eq!(payback_years(dec!(500000), dec!(0)), None);
/// ```
pub fn payback_years(
    net_cost: Decimal,
    annual_savings: Decimal,
) -> Option<Decimal> {
    if annual_savings <= Decimal::ZERO {
        return None;
    }
    ratio(net_cost, annual_savings).map(round_half_up)
}

/// Lifetime return on the net investment, in percent.
pub fn roi_percent(
    net_cost: Decimal,
    annual_savings: Decimal,
) -> Option<Decimal> {
    if net_cost <= Decimal::ZERO {
        return None;
    }
    ratio(annual_savings * ROI_HORIZON_YEARS - net_cost, net_cost).map(|r| round_half_up(r * HUNDRED))
}

#[derive(Debug, Clone)]
pub struct FinancialCalculator<'a> {
    pricing: &'a PricingScenario,
}

impl<'a> FinancialCalculator<'a> {
    pub fn new(pricing: &'a PricingScenario) -> Self {
        Self { pricing }
    }

    pub fn calculate(
        &self,
        system: &SystemConfiguration,
    ) -> FinancialMetrics {
        let costs = self.costs(system);

        let itc_eligible_cost = round_half_up(
            (costs.bess_cost + costs.solar_cost) * (Decimal::ONE + self.pricing.installation_factor),
        );
        let itc_amount = round_half_up(itc_eligible_cost * self.pricing.itc_rate);
        let net_cost = costs.total_cost - itc_amount;

        let savings = self.savings(system);
        let annual_savings = savings.total;

        FinancialMetrics {
            itc_eligible_cost,
            itc_rate: self.pricing.itc_rate,
            itc_amount,
            net_cost,
            annual_savings,
            payback_years: payback_years(net_cost, annual_savings),
            roi_percent: roi_percent(net_cost, annual_savings),
            costs,
            savings,
        }
    }

    fn costs(
        &self,
        system: &SystemConfiguration,
    ) -> CostBreakdown {
        let p = self.pricing;
        let bess_cost = round_half_up(system.bess_kwh * p.bess_cost_per_kwh);
        let solar_cost = round_half_up(system.solar_kw * WATTS_PER_KW * p.solar_cost_per_watt);
        let generator_cost = round_half_up(system.generator_kw * p.generator_cost_per_kw);
        let equipment_cost = bess_cost + solar_cost + generator_cost;
        let installation_cost = round_half_up(equipment_cost * p.installation_factor);

        CostBreakdown {
            bess_cost,
            solar_cost,
            generator_cost,
            equipment_cost,
            installation_cost,
            total_cost: equipment_cost + installation_cost,
        }
    }

    fn savings(
        &self,
        system: &SystemConfiguration,
    ) -> SavingsBreakdown {
        let p = self.pricing;
        let demand_charge = round_half_up(
            system.bess_kw * p.demand_charge_per_kw * MONTHS_PER_YEAR * DEMAND_CHARGE_CAPTURE,
        );
        let arbitrage = round_half_up(
            system.bess_kwh * p.annual_cycles * p.peak_offpeak_spread * p.round_trip_efficiency,
        );
        let solar = round_half_up(system.solar_annual_kwh * p.electricity_rate);

        SavingsBreakdown {
            demand_charge,
            arbitrage,
            solar,
            total: demand_charge + arbitrage + solar,
        }
    }
}
