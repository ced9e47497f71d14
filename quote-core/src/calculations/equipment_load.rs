//! Equipment load aggregation.
//!
//! Maps categorical answers (counts, equipment types, yes/no amenities) to kW
//! figures through fixed lookup tables, sums them into a connected load and
//! derives demand:
//!
//! | Figure        | Formula |
//! |---------------|---------|
//! | connected kW  | Σ component kW |
//! | peak kW       | connected kW × 0.70 (simultaneity) |
//! | average kW    | peak kW × industry load factor |
//! | annual kWh    | average kW × operating hours × operating days |
//!
//! A positive `peakLoad` answer (MW, from a utility bill) replaces the
//! calculated peak.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculations::common::{HP_TO_KW, min, round_half_up};
use crate::{Answers, IndustryKey, IndustryTemplate, UseCaseEquipment, universal};

/// Share of connected load assumed to run at the same time.
pub const SIMULTANEITY_FACTOR: Decimal = Decimal::from_parts(70, 0, 0, false, 2);

const KW_PER_MW: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);
const HOURS_PER_DAY: Decimal = Decimal::from_parts(24, 0, 0, false, 0);
const DEFAULT_FACILITY_SQFT: Decimal = Decimal::from_parts(10000, 0, 0, false, 0);

/// Level 2 charger.
const EV_CHARGER_KW: Decimal = Decimal::from_parts(72, 0, 0, false, 1);

mod car_wash {
    use rust_decimal::Decimal;

    pub const TUNNEL_KW_PER_FOOT: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
    pub const PUMP_HP: Decimal = Decimal::from_parts(10, 0, 0, false, 0);
    pub const VACUUM_HP: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
    pub const RECLAIM_HP: Decimal = Decimal::from_parts(75, 0, 0, false, 1);
    /// Lighting, controls, pay stations.
    pub const BASE_KW: Decimal = Decimal::from_parts(8, 0, 0, false, 0);

    pub fn dryer_hp(dryer_type: &str) -> Decimal {
        match dryer_type {
            "high_efficiency" => Decimal::from(10),
            "none" => Decimal::ZERO,
            _ => Decimal::from(15),
        }
    }

    pub fn water_heater_kw(kind: &str) -> Decimal {
        match kind {
            "electric" => Decimal::from(18),
            "none" => Decimal::ZERO,
            // gas burners still need blowers and controls
            _ => Decimal::new(5, 1),
        }
    }
}

mod hospitality {
    use rust_decimal::Decimal;

    pub const KW_PER_ROOM: Decimal = Decimal::from_parts(25, 0, 0, false, 1);
    pub const POOL_KW: Decimal = Decimal::from_parts(15, 0, 0, false, 0);
    pub const RESTAURANT_KW: Decimal = Decimal::from_parts(50, 0, 0, false, 0);
    pub const LAUNDRY_KW: Decimal = Decimal::from_parts(40, 0, 0, false, 0);
}

mod healthcare {
    use rust_decimal::Decimal;

    pub const KW_PER_BED: Decimal = Decimal::from_parts(8, 0, 0, false, 0);
    pub const IMAGING_UNIT_KW: Decimal = Decimal::from_parts(150, 0, 0, false, 0);
}

mod industrial {
    use rust_decimal::Decimal;

    pub const PUMP_HP: Decimal = Decimal::from_parts(15, 0, 0, false, 0);
    pub const BLOWER_HP: Decimal = Decimal::from_parts(25, 0, 0, false, 0);
    pub const COMPRESSOR_HP: Decimal = Decimal::from_parts(50, 0, 0, false, 0);
    pub const DEFAULT_PUE: Decimal = Decimal::from_parts(15, 0, 0, false, 1);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakSource {
    Calculated,
    UtilityBill,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadComponent {
    pub name: String,
    pub kw: Decimal,
    pub formula: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentLoadResult {
    pub components: Vec<LoadComponent>,
    pub connected_kw: Decimal,
    pub estimated_peak_kw: Decimal,
    pub average_kw: Decimal,
    pub operating_hours_per_day: Decimal,
    pub operating_days_per_year: Decimal,
    pub annual_kwh: Decimal,
    pub peak_source: PeakSource,
}

/// Aggregates equipment loads for one use case.
///
/// `catalog` holds the equipment rows the database attaches to the use case;
/// they are added on top of the answer-driven profile.
#[derive(Debug, Clone)]
pub struct EquipmentLoadCalculator<'a> {
    template: &'a IndustryTemplate,
    catalog: &'a [UseCaseEquipment],
}

impl<'a> EquipmentLoadCalculator<'a> {
    pub fn new(
        template: &'a IndustryTemplate,
        catalog: &'a [UseCaseEquipment],
    ) -> Self {
        Self { template, catalog }
    }

    pub fn calculate(
        &self,
        answers: &Answers,
    ) -> EquipmentLoadResult {
        let mut components = self.profile_components(answers);

        let chargers = answers.count("evChargerCount");
        if chargers > Decimal::ZERO {
            components.push(component(
                "ev_chargers",
                chargers * EV_CHARGER_KW,
                format!("{} × {} kW", chargers, EV_CHARGER_KW),
            ));
        }

        for row in self.catalog {
            components.push(component(
                &row.template.name,
                row.connected_kw(),
                format!(
                    "{} kW × {} × {} duty",
                    row.template.nameplate_kw, row.quantity, row.template.duty_cycle
                ),
            ));
        }

        let connected_kw: Decimal = components.iter().map(|c| c.kw).sum();

        let reported_peak_mw = answers.number_or(universal::PEAK_LOAD, Decimal::ZERO);
        let (peak_kw, peak_source) = if reported_peak_mw > Decimal::ZERO {
            debug!(%reported_peak_mw, "using reported peak load");
            (reported_peak_mw * KW_PER_MW, PeakSource::UtilityBill)
        } else {
            (connected_kw * SIMULTANEITY_FACTOR, PeakSource::Calculated)
        };

        let hours = min(
            answers.number_or(
                universal::OPERATING_HOURS,
                self.template.operating_hours_per_day,
            ),
            HOURS_PER_DAY,
        );
        let days = self.template.operating_days_per_year;
        let average_kw = peak_kw * self.template.load_factor;
        let annual_kwh = average_kw * hours * days;

        EquipmentLoadResult {
            components: components
                .into_iter()
                .map(|c| LoadComponent {
                    kw: round_half_up(c.kw),
                    ..c
                })
                .collect(),
            connected_kw: round_half_up(connected_kw),
            estimated_peak_kw: round_half_up(peak_kw),
            average_kw: round_half_up(average_kw),
            operating_hours_per_day: hours,
            operating_days_per_year: days,
            annual_kwh: round_half_up(annual_kwh),
            peak_source,
        }
    }

    fn profile_components(
        &self,
        answers: &Answers,
    ) -> Vec<LoadComponent> {
        match self.template.industry {
            IndustryKey::CarWash => car_wash_components(answers),
            IndustryKey::Hotel => hotel_components(answers),
            IndustryKey::Hospital => hospital_components(answers),
            IndustryKey::DataCenter => data_center_components(answers),
            IndustryKey::Manufacturing => {
                let mut parts = self.facility_components(answers);
                parts.extend(motor_components(answers));
                parts
            }
            IndustryKey::Warehouse | IndustryKey::Office | IndustryKey::Retail => {
                self.facility_components(answers)
            }
        }
    }

    fn facility_components(
        &self,
        answers: &Answers,
    ) -> Vec<LoadComponent> {
        let sqft = answers.number_or(universal::FACILITY_SIZE, DEFAULT_FACILITY_SQFT);
        let density = self.template.load_density_w_per_sqft;
        vec![component(
            "facility",
            sqft * density / KW_PER_MW,
            format!("{} sqft × {} W/sqft ÷ 1000", sqft, density),
        )]
    }
}

fn component(
    name: &str,
    kw: Decimal,
    formula: String,
) -> LoadComponent {
    LoadComponent {
        name: name.to_string(),
        kw,
        formula,
    }
}

fn motors(
    name: &str,
    count: Decimal,
    hp: Decimal,
) -> Option<LoadComponent> {
    if count <= Decimal::ZERO || hp <= Decimal::ZERO {
        return None;
    }
    Some(component(
        name,
        count * hp * HP_TO_KW,
        format!("{} × {} HP × {}", count, hp, HP_TO_KW),
    ))
}

fn car_wash_components(answers: &Answers) -> Vec<LoadComponent> {
    let tunnel_ft = answers.number_or("tunnelLength", Decimal::ZERO);
    let dryer_type = answers.text("dryerType").unwrap_or("standard");
    let water_heating = answers.text("waterHeating").unwrap_or("gas");

    let mut parts = vec![component(
        "lighting_controls",
        car_wash::BASE_KW,
        "fixed".to_string(),
    )];

    if tunnel_ft > Decimal::ZERO {
        parts.push(component(
            "tunnel_equipment",
            tunnel_ft * car_wash::TUNNEL_KW_PER_FOOT,
            format!("{} ft × {} kW/ft", tunnel_ft, car_wash::TUNNEL_KW_PER_FOOT),
        ));
    }
    parts.extend(motors(
        "dryers",
        answers.count("dryerCount"),
        car_wash::dryer_hp(dryer_type),
    ));
    parts.extend(motors("pumps", answers.count("pumpCount"), car_wash::PUMP_HP));
    parts.extend(motors(
        "vacuum_stations",
        answers.count("vacuumStations"),
        car_wash::VACUUM_HP,
    ));
    if answers.flag("hasReclaim") {
        parts.extend(motors("water_reclaim", Decimal::ONE, car_wash::RECLAIM_HP));
    }

    let heater_kw = car_wash::water_heater_kw(water_heating);
    if heater_kw > Decimal::ZERO {
        parts.push(component(
            "water_heating",
            heater_kw,
            format!("{} heater", water_heating),
        ));
    }

    parts
}

fn hotel_components(answers: &Answers) -> Vec<LoadComponent> {
    let rooms = answers.count("roomCount");
    let mut parts = vec![component(
        "guest_rooms",
        rooms * hospitality::KW_PER_ROOM,
        format!("{} rooms × {} kW", rooms, hospitality::KW_PER_ROOM),
    )];
    for (field, name, kw) in [
        ("hasPool", "pool", hospitality::POOL_KW),
        ("hasRestaurant", "restaurant", hospitality::RESTAURANT_KW),
        ("hasLaundry", "laundry", hospitality::LAUNDRY_KW),
    ] {
        if answers.flag(field) {
            parts.push(component(name, kw, "fixed".to_string()));
        }
    }
    parts
}

fn hospital_components(answers: &Answers) -> Vec<LoadComponent> {
    let beds = answers.count("bedCount");
    let imaging = answers.count("imagingUnits");
    let mut parts = vec![component(
        "patient_beds",
        beds * healthcare::KW_PER_BED,
        format!("{} beds × {} kW", beds, healthcare::KW_PER_BED),
    )];
    if imaging > Decimal::ZERO {
        parts.push(component(
            "imaging",
            imaging * healthcare::IMAGING_UNIT_KW,
            format!("{} units × {} kW", imaging, healthcare::IMAGING_UNIT_KW),
        ));
    }
    parts
}

fn data_center_components(answers: &Answers) -> Vec<LoadComponent> {
    let it_kw = answers.number_or("itLoadKw", Decimal::ZERO);
    let pue = match answers.number("pue") {
        Some(p) if p >= Decimal::ONE => p,
        _ => industrial::DEFAULT_PUE,
    };
    vec![component(
        "it_and_cooling",
        it_kw * pue,
        format!("{} kW IT × {} PUE", it_kw, pue),
    )]
}

fn motor_components(answers: &Answers) -> Vec<LoadComponent> {
    [
        ("pumps", "pumpCount", industrial::PUMP_HP),
        ("blowers", "blowerCount", industrial::BLOWER_HP),
        ("compressors", "compressorCount", industrial::COMPRESSOR_HP),
    ]
    .into_iter()
    .filter_map(|(name, field, hp)| motors(name, answers.count(field), hp))
    .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::EquipmentTemplate;

    fn template(industry: IndustryKey) -> IndustryTemplate {
        IndustryTemplate::builtin(industry)
    }

    fn car_wash_answers(
        tunnel: Decimal,
        dryers: Decimal,
    ) -> Answers {
        Answers::new()
            .with("tunnelLength", tunnel)
            .with("dryerCount", dryers)
            .with("dryerType", "standard")
            .with("pumpCount", dec!(2))
            .with("waterHeating", "gas")
    }

    fn peak(answers: &Answers) -> Decimal {
        let t = template(IndustryKey::CarWash);
        EquipmentLoadCalculator::new(&t, &[])
            .calculate(answers)
            .estimated_peak_kw
    }

    // =========================================================================
    // car wash
    // =========================================================================

    #[test]
    fn car_wash_components_and_peak() {
        let t = template(IndustryKey::CarWash);
        let result = EquipmentLoadCalculator::new(&t, &[])
            .calculate(&car_wash_answers(dec!(100), dec!(0)));

        // 8 base + 50 tunnel + 14.92 pumps + 0.5 gas heater
        assert_eq!(result.connected_kw, dec!(73.42));
        assert_eq!(result.estimated_peak_kw, dec!(51.39));
        assert_eq!(result.peak_source, PeakSource::Calculated);
    }

    #[test]
    fn car_wash_peak_scales_linearly_with_tunnel_length() {
        let p100 = peak(&car_wash_answers(dec!(100), dec!(0)));
        let p200 = peak(&car_wash_answers(dec!(200), dec!(0)));
        let p300 = peak(&car_wash_answers(dec!(300), dec!(0)));

        // 100 ft × 0.5 kW/ft × 0.70
        assert_eq!(p200 - p100, dec!(35.00));
        assert_eq!(p300 - p200, dec!(35.00));
    }

    #[test]
    fn car_wash_peak_scales_linearly_with_dryer_count() {
        let p0 = peak(&car_wash_answers(dec!(100), dec!(0)));
        let p10 = peak(&car_wash_answers(dec!(100), dec!(10)));
        let p20 = peak(&car_wash_answers(dec!(100), dec!(20)));

        // 10 × 15 HP × 0.746 × 0.70
        assert_eq!(p10 - p0, dec!(78.33));
        assert_eq!(p20 - p10, dec!(78.33));
    }

    #[test]
    fn high_efficiency_dryers_draw_less() {
        let standard = car_wash_answers(dec!(100), dec!(4));
        let efficient = standard.clone().with("dryerType", "high_efficiency");

        assert!(peak(&efficient) < peak(&standard));
    }

    #[test]
    fn electric_water_heating_and_reclaim_add_load() {
        let t = template(IndustryKey::CarWash);
        let answers = car_wash_answers(dec!(0), dec!(0))
            .with("waterHeating", "electric")
            .with("hasReclaim", "yes");

        let result = EquipmentLoadCalculator::new(&t, &[]).calculate(&answers);

        let names: Vec<_> = result.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["lighting_controls", "pumps", "water_reclaim", "water_heating"]
        );
        // 8 + 14.92 + 5.595 + 18
        assert_eq!(result.connected_kw, dec!(46.52));
    }

    // =========================================================================
    // other profiles
    // =========================================================================

    #[test]
    fn hotel_amenities_are_summed() {
        let t = template(IndustryKey::Hotel);
        let answers = Answers::new()
            .with("roomCount", dec!(120))
            .with("hasPool", true)
            .with("hasRestaurant", "no")
            .with("hasLaundry", "yes");

        let result = EquipmentLoadCalculator::new(&t, &[]).calculate(&answers);

        assert_eq!(result.connected_kw, dec!(355.00));
        assert_eq!(result.estimated_peak_kw, dec!(248.50));
    }

    #[test]
    fn data_center_applies_pue() {
        let t = template(IndustryKey::DataCenter);
        let answers = Answers::new().with("itLoadKw", dec!(400)).with("pue", dec!(1.4));

        let result = EquipmentLoadCalculator::new(&t, &[]).calculate(&answers);

        assert_eq!(result.connected_kw, dec!(560.00));
    }

    #[test]
    fn data_center_ignores_impossible_pue() {
        let t = template(IndustryKey::DataCenter);
        let answers = Answers::new().with("itLoadKw", dec!(400)).with("pue", dec!(0.5));

        let result = EquipmentLoadCalculator::new(&t, &[]).calculate(&answers);

        assert_eq!(result.connected_kw, dec!(600.00));
    }

    #[test]
    fn manufacturing_adds_motors_to_facility_load() {
        let t = template(IndustryKey::Manufacturing);
        let answers = Answers::new()
            .with(universal::FACILITY_SIZE, dec!(50000))
            .with("pumpCount", dec!(2))
            .with("blowerCount", dec!(1));

        let result = EquipmentLoadCalculator::new(&t, &[]).calculate(&answers);

        // 500 facility + 22.38 pumps + 18.65 blower
        assert_eq!(result.connected_kw, dec!(541.03));
        assert_eq!(result.components.len(), 3);
    }

    #[test]
    fn office_uses_default_facility_size() {
        let t = template(IndustryKey::Office);

        let result = EquipmentLoadCalculator::new(&t, &[]).calculate(&Answers::new());

        assert_eq!(result.connected_kw, dec!(60.00));
    }

    #[test]
    fn catalog_equipment_and_ev_chargers_are_added() {
        let t = template(IndustryKey::Retail);
        let catalog = vec![UseCaseEquipment {
            id: 1,
            use_case_id: 1,
            template: EquipmentTemplate {
                id: 7,
                name: "walk_in_cooler".to_string(),
                category: "refrigeration".to_string(),
                nameplate_kw: dec!(6),
                duty_cycle: dec!(0.5),
                description: None,
            },
            quantity: dec!(2),
        }];
        let answers = Answers::new()
            .with(universal::FACILITY_SIZE, dec!(20000))
            .with("evChargerCount", dec!(4));

        let result = EquipmentLoadCalculator::new(&t, &catalog).calculate(&answers);

        // 140 facility + 28.8 chargers + 6 cooler
        assert_eq!(result.connected_kw, dec!(174.80));
        assert_eq!(result.components.last().unwrap().name, "walk_in_cooler");
    }

    // =========================================================================
    // demand and energy
    // =========================================================================

    #[test]
    fn reported_peak_overrides_calculation() {
        let t = template(IndustryKey::Office);
        let answers = Answers::new().with(universal::PEAK_LOAD, dec!(0.25));

        let result = EquipmentLoadCalculator::new(&t, &[]).calculate(&answers);

        assert_eq!(result.estimated_peak_kw, dec!(250.00));
        assert_eq!(result.peak_source, PeakSource::UtilityBill);
    }

    #[test]
    fn annual_energy_uses_hours_and_days() {
        let t = template(IndustryKey::Office);
        let answers = Answers::new()
            .with(universal::PEAK_LOAD, dec!(0.1))
            .with(universal::OPERATING_HOURS, dec!(8));

        let result = EquipmentLoadCalculator::new(&t, &[]).calculate(&answers);

        // 100 kW × 0.45 = 45 kW average; × 8 h × 260 d
        assert_eq!(result.average_kw, dec!(45.00));
        assert_eq!(result.annual_kwh, dec!(93600.00));
    }

    #[test]
    fn operating_hours_are_capped_at_a_day() {
        let t = template(IndustryKey::Office);
        let answers = Answers::new().with(universal::OPERATING_HOURS, dec!(30));

        let result = EquipmentLoadCalculator::new(&t, &[]).calculate(&answers);

        assert_eq!(result.operating_hours_per_day, dec!(24));
    }
}
