use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentTemplate {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub nameplate_kw: Decimal,
    /// Fraction of nameplate drawn while the facility is operating.
    pub duty_cycle: Decimal,
    pub description: Option<String>,
}

/// For creating new templates (no id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEquipmentTemplate {
    pub name: String,
    pub category: String,
    pub nameplate_kw: Decimal,
    pub duty_cycle: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentAttachment {
    pub use_case_id: i64,
    pub quantity: Decimal,
}

/// One template of a category replacement, with the use case it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub template: NewEquipmentTemplate,
    pub attach_to: Option<EquipmentAttachment>,
}

/// An equipment row attached to a use case, joined with its template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCaseEquipment {
    pub id: i64,
    pub use_case_id: i64,
    pub template: EquipmentTemplate,
    pub quantity: Decimal,
}

impl UseCaseEquipment {
    pub fn connected_kw(&self) -> Decimal {
        self.template.nameplate_kw * self.quantity * self.template.duty_cycle
    }
}
