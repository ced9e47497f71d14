use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndustryKey {
    CarWash,
    Hotel,
    Hospital,
    DataCenter,
    Manufacturing,
    Warehouse,
    Office,
    Retail,
}

impl IndustryKey {
    pub fn all() -> &'static [IndustryKey] {
        &[
            Self::CarWash,
            Self::Hotel,
            Self::Hospital,
            Self::DataCenter,
            Self::Manufacturing,
            Self::Warehouse,
            Self::Office,
            Self::Retail,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CarWash => "car_wash",
            Self::Hotel => "hotel",
            Self::Hospital => "hospital",
            Self::DataCenter => "data_center",
            Self::Manufacturing => "manufacturing",
            Self::Warehouse => "warehouse",
            Self::Office => "office",
            Self::Retail => "retail",
        }
    }

    /// Accepts both the snake_case key and the kebab-case slug form.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "car_wash" => Some(Self::CarWash),
            "hotel" => Some(Self::Hotel),
            "hospital" => Some(Self::Hospital),
            "data_center" => Some(Self::DataCenter),
            "manufacturing" => Some(Self::Manufacturing),
            "warehouse" => Some(Self::Warehouse),
            "office" => Some(Self::Office),
            "retail" => Some(Self::Retail),
            _ => None,
        }
    }
}

impl std::fmt::Display for IndustryKey {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-industry multipliers used by the sizing calculators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryTemplate {
    pub industry: IndustryKey,
    /// Share of the roof that can carry panels after setbacks and rooftop equipment.
    pub roof_usable_factor: Decimal,
    pub carport_usable_factor: Decimal,
    /// Installed DC capacity per usable square foot.
    pub solar_density_kw_per_sqft: Decimal,
    /// Facility load density used when no equipment-level profile applies.
    pub load_density_w_per_sqft: Decimal,
    /// Ratio of average to peak demand.
    pub load_factor: Decimal,
    pub operating_hours_per_day: Decimal,
    pub operating_days_per_year: Decimal,
    pub storage_duration_hours: Decimal,
}

impl IndustryTemplate {
    /// Built-in template for an industry. These are the fallback constants used
    /// whenever the database cannot supply a configuration.
    pub fn builtin(industry: IndustryKey) -> Self {
        // (roof, carport, density, W/sqft, load factor, hours, days, duration)
        let (roof, carport, density, w_sqft, lf, hours, days, duration) = match industry {
            IndustryKey::CarWash => (60, 80, 15, 0, 45, 12, 360, 4),
            IndustryKey::Hotel => (55, 80, 15, 8, 55, 24, 365, 4),
            IndustryKey::Hospital => (45, 75, 15, 12, 70, 24, 365, 4),
            IndustryKey::DataCenter => (65, 70, 15, 0, 90, 24, 365, 2),
            IndustryKey::Manufacturing => (70, 80, 16, 10, 60, 16, 300, 4),
            IndustryKey::Warehouse => (75, 80, 16, 3, 40, 16, 300, 4),
            IndustryKey::Office => (50, 80, 15, 6, 45, 10, 260, 4),
            IndustryKey::Retail => (60, 80, 15, 7, 50, 12, 360, 4),
        };

        Self {
            industry,
            roof_usable_factor: Decimal::new(roof, 2),
            carport_usable_factor: Decimal::new(carport, 2),
            solar_density_kw_per_sqft: Decimal::new(density, 3),
            load_density_w_per_sqft: Decimal::from(w_sqft),
            load_factor: Decimal::new(lf, 2),
            operating_hours_per_day: Decimal::from(hours),
            operating_days_per_year: Decimal::from(days),
            storage_duration_hours: Decimal::from(duration),
        }
    }
}
