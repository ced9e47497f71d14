//! Sizing, pricing and validation calculators for energy-system quotes.
//!
//! Each calculator is a pure function over the models in [`crate::models`]:
//! solar capacity, equipment load, system sizing with tiers, financial
//! metrics and proposal validation. [`QuoteEngine`] chains them.

pub mod common;
pub mod equipment_load;
pub mod financial;
pub mod quote;
pub mod sizing;
pub mod solar;
pub mod validator;

pub use equipment_load::{
    EquipmentLoadCalculator, EquipmentLoadResult, LoadComponent, PeakSource, SIMULTANEITY_FACTOR,
};
pub use financial::{
    CostBreakdown, FinancialCalculator, FinancialMetrics, SavingsBreakdown, payback_years,
    roi_percent,
};
pub use quote::{Quote, QuoteContext, QuoteEngine, QuoteError, QuoteRequest};
pub use sizing::{AddOns, GridConnection, SizingInput, SystemConfiguration, Tier, size_system};
pub use solar::{
    AreaUnit, AuditEntry, CarportInterest, SolarCapacityCalculator, SolarCapacityError,
    SolarCapacityInput, SolarCapacityResult, validate_solar_input,
};
pub use validator::{
    AuthenticatedProposal, CheckResult, Proposal, ProposalValidator, ValidationOutcome,
    ValidatorConfig,
};
