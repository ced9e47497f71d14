//! Recommended system sizing and proposal tiers.
//!
//! | Grid connection | BESS power ratio | Generator fraction |
//! |-----------------|------------------|--------------------|
//! | reliable        | 0.40             | 0.00               |
//! | unreliable      | 0.60             | 0.50               |
//! | limited         | 0.70             | 0.25               |
//! | off_grid        | 1.00             | 1.00               |
//! | microgrid       | 0.80             | 0.50               |
//!
//! `bess_kw = peak × ratio`, `bess_kwh = bess_kw × duration`,
//! `generator_kw = peak × fraction × 1.25`. When the site reports a grid
//! capacity the battery must at least cover the demand above it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{max, round_half_up};
use crate::calculations::solar::SolarCapacityResult;

/// Generator oversizing for motor starting and derating.
pub const GENERATOR_RESERVE_FACTOR: Decimal = Decimal::from_parts(125, 0, 0, false, 2);

/// Minimum generator fraction once the customer asks for a generator.
const REQUESTED_GENERATOR_FRACTION: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridConnection {
    #[default]
    Reliable,
    Unreliable,
    Limited,
    OffGrid,
    Microgrid,
}

impl GridConnection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "reliable" | "on_grid" => Some(Self::Reliable),
            "unreliable" => Some(Self::Unreliable),
            "limited" => Some(Self::Limited),
            "off_grid" | "offgrid" => Some(Self::OffGrid),
            "microgrid" => Some(Self::Microgrid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reliable => "reliable",
            Self::Unreliable => "unreliable",
            Self::Limited => "limited",
            Self::OffGrid => "off_grid",
            Self::Microgrid => "microgrid",
        }
    }

    pub fn bess_power_ratio(&self) -> Decimal {
        match self {
            Self::Reliable => Decimal::new(40, 2),
            Self::Unreliable => Decimal::new(60, 2),
            Self::Limited => Decimal::new(70, 2),
            Self::OffGrid => Decimal::ONE,
            Self::Microgrid => Decimal::new(80, 2),
        }
    }

    pub fn generator_fraction(&self) -> Decimal {
        match self {
            Self::Reliable => Decimal::ZERO,
            Self::Unreliable => Decimal::new(50, 2),
            Self::Limited => Decimal::new(25, 2),
            Self::OffGrid => Decimal::ONE,
            Self::Microgrid => Decimal::new(50, 2),
        }
    }
}

/// Optional equipment picked on the add-ons step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddOns {
    pub solar: bool,
    pub generator: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfiguration {
    pub bess_kw: Decimal,
    pub bess_kwh: Decimal,
    pub duration_hours: Decimal,
    pub solar_kw: Decimal,
    pub solar_annual_kwh: Decimal,
    pub generator_kw: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizingInput<'a> {
    pub peak_kw: Decimal,
    pub grid: GridConnection,
    /// Utility service limit in kW; zero means unconstrained.
    pub grid_capacity_kw: Decimal,
    pub duration_hours: Decimal,
    pub add_ons: AddOns,
    pub solar: Option<&'a SolarCapacityResult>,
}

/// Sizes the recommended (perfect fit) system.
pub fn size_system(input: &SizingInput<'_>) -> SystemConfiguration {
    let peak = max(input.peak_kw, Decimal::ZERO);

    let mut bess_kw = peak * input.grid.bess_power_ratio();
    if input.grid_capacity_kw > Decimal::ZERO {
        bess_kw = max(bess_kw, peak - input.grid_capacity_kw);
    }
    let bess_kwh = bess_kw * input.duration_hours;

    let mut fraction = input.grid.generator_fraction();
    if input.add_ons.generator {
        fraction = max(fraction, REQUESTED_GENERATOR_FRACTION);
    }
    let generator_kw = peak * fraction * GENERATOR_RESERVE_FACTOR;

    let (solar_kw, solar_annual_kwh) = match input.solar {
        Some(solar) if input.add_ons.solar => (solar.total_kw, solar.annual_generation_kwh),
        _ => (Decimal::ZERO, Decimal::ZERO),
    };

    SystemConfiguration {
        bess_kw: round_half_up(bess_kw),
        bess_kwh: round_half_up(bess_kwh),
        duration_hours: input.duration_hours,
        solar_kw,
        solar_annual_kwh,
        generator_kw: round_half_up(generator_kw),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "starter")]
    Starter,
    #[serde(rename = "perfectFit")]
    PerfectFit,
    #[serde(rename = "beastMode")]
    BeastMode,
}

impl Tier {
    pub fn all() -> [Tier; 3] {
        [Tier::Starter, Tier::PerfectFit, Tier::BeastMode]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::PerfectFit => "perfectFit",
            Self::BeastMode => "beastMode",
        }
    }

    pub fn storage_multiplier(&self) -> Decimal {
        match self {
            Self::Starter => Decimal::new(70, 2),
            Self::PerfectFit => Decimal::ONE,
            Self::BeastMode => Decimal::new(150, 2),
        }
    }

    /// Solar never grows past the recommendation: it is already roof-limited.
    pub fn solar_multiplier(&self) -> Decimal {
        match self {
            Self::Starter => Decimal::new(70, 2),
            Self::PerfectFit | Self::BeastMode => Decimal::ONE,
        }
    }

    /// Scales a recommended system to this tier. Generator sizing is
    /// resilience-driven and stays the same.
    pub fn scale(
        &self,
        base: &SystemConfiguration,
    ) -> SystemConfiguration {
        let storage = self.storage_multiplier();
        let solar = self.solar_multiplier();
        SystemConfiguration {
            bess_kw: round_half_up(base.bess_kw * storage),
            bess_kwh: round_half_up(base.bess_kwh * storage),
            duration_hours: base.duration_hours,
            solar_kw: round_half_up(base.solar_kw * solar),
            solar_annual_kwh: round_half_up(base.solar_annual_kwh * solar),
            generator_kw: base.generator_kw,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn input(grid: GridConnection) -> SizingInput<'static> {
        SizingInput {
            peak_kw: dec!(500),
            grid,
            grid_capacity_kw: Decimal::ZERO,
            duration_hours: dec!(4),
            add_ons: AddOns::default(),
            solar: None,
        }
    }

    // =========================================================================
    // grid connection
    // =========================================================================

    #[test]
    fn parse_accepts_kebab_and_snake_case() {
        assert_eq!(GridConnection::parse("off-grid"), Some(GridConnection::OffGrid));
        assert_eq!(GridConnection::parse("off_grid"), Some(GridConnection::OffGrid));
        assert_eq!(GridConnection::parse(" Microgrid "), Some(GridConnection::Microgrid));
        assert_eq!(GridConnection::parse("satellite"), None);
    }

    #[test]
    fn parse_round_trips_as_str() {
        for grid in [
            GridConnection::Reliable,
            GridConnection::Unreliable,
            GridConnection::Limited,
            GridConnection::OffGrid,
            GridConnection::Microgrid,
        ] {
            assert_eq!(GridConnection::parse(grid.as_str()), Some(grid));
        }
    }

    // =========================================================================
    // sizing
    // =========================================================================

    #[test]
    fn reliable_grid_sizes_battery_without_generator() {
        let system = size_system(&input(GridConnection::Reliable));

        assert_eq!(system.bess_kw, dec!(200.00));
        assert_eq!(system.bess_kwh, dec!(800.00));
        assert_eq!(system.generator_kw, dec!(0.00));
    }

    #[test]
    fn off_grid_covers_full_peak_with_generator_reserve() {
        let system = size_system(&input(GridConnection::OffGrid));

        assert_eq!(system.bess_kw, dec!(500.00));
        assert_eq!(system.generator_kw, dec!(625.00));
    }

    #[test]
    fn limited_grid_capacity_raises_battery_power() {
        let mut sizing = input(GridConnection::Limited);
        sizing.grid_capacity_kw = dec!(100);

        let system = size_system(&sizing);

        // 500 × 0.70 = 350 < 500 − 100
        assert_eq!(system.bess_kw, dec!(400.00));
        assert_eq!(system.generator_kw, dec!(156.25));
    }

    #[test]
    fn requested_generator_gets_at_least_half_peak() {
        let mut sizing = input(GridConnection::Reliable);
        sizing.add_ons.generator = true;

        let system = size_system(&sizing);

        assert_eq!(system.generator_kw, dec!(312.50));
    }

    #[test]
    fn solar_only_counts_when_add_on_selected() {
        let solar = SolarCapacityResult {
            roof_usable_sqft: dec!(6000),
            carport_usable_sqft: dec!(0),
            total_usable_sqft: dec!(6000),
            roof_kw: dec!(90),
            carport_kw: dec!(0),
            total_kw: dec!(90),
            annual_generation_kwh: dec!(131400),
            audit: Vec::new(),
        };
        let mut sizing = input(GridConnection::Reliable);
        sizing.solar = Some(&solar);

        assert_eq!(size_system(&sizing).solar_kw, dec!(0));

        sizing.add_ons.solar = true;
        let system = size_system(&sizing);
        assert_eq!(system.solar_kw, dec!(90));
        assert_eq!(system.solar_annual_kwh, dec!(131400));
    }

    // =========================================================================
    // tiers
    // =========================================================================

    #[test]
    fn tiers_scale_storage_and_solar() {
        let base = SystemConfiguration {
            bess_kw: dec!(200),
            bess_kwh: dec!(800),
            duration_hours: dec!(4),
            solar_kw: dec!(100),
            solar_annual_kwh: dec!(146000),
            generator_kw: dec!(250),
        };

        let starter = Tier::Starter.scale(&base);
        let beast = Tier::BeastMode.scale(&base);

        assert_eq!(starter.bess_kwh, dec!(560.00));
        assert_eq!(starter.solar_kw, dec!(70.00));
        assert_eq!(beast.bess_kw, dec!(300.00));
        assert_eq!(beast.solar_kw, dec!(100.00));
        assert_eq!(beast.generator_kw, dec!(250));
        assert_eq!(Tier::PerfectFit.scale(&base), base);
    }

    #[test]
    fn tier_names_use_camel_case() {
        assert_eq!(Tier::PerfectFit.to_string(), "perfectFit");
        assert_eq!(
            serde_json::to_string(&Tier::BeastMode).unwrap(),
            "\"beastMode\""
        );
    }
}
