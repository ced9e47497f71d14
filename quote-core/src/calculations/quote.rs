//! End-to-end quote pipeline.
//!
//! answers → equipment load → (optional) solar → recommended system →
//! tiers → pricing → validation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::calculations::equipment_load::{EquipmentLoadCalculator, EquipmentLoadResult};
use crate::calculations::financial::FinancialCalculator;
use crate::calculations::sizing::{
    AddOns, GridConnection, SizingInput, SystemConfiguration, Tier, size_system,
};
use crate::calculations::solar::{
    SolarCapacityCalculator, SolarCapacityError, SolarCapacityInput, SolarCapacityResult,
};
use crate::calculations::validator::{Proposal, ProposalValidator, ValidationOutcome};
use crate::{
    Answers, CustomQuestion, IndustryTemplate, PricingScenario, UseCase, UseCaseEquipment,
    universal, validate_answers,
};

const KW_PER_MW: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuoteError {
    #[error("invalid answers: {}", .0.join("; "))]
    InvalidAnswers(Vec<String>),

    #[error(transparent)]
    Solar(#[from] SolarCapacityError),
}

/// Everything looked up for one use case before a quote can be built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteContext {
    pub use_case: UseCase,
    pub template: IndustryTemplate,
    pub questions: Vec<CustomQuestion>,
    pub equipment: Vec<UseCaseEquipment>,
    pub pricing: PricingScenario,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub answers: Answers,
    pub add_ons: AddOns,
    pub solar: Option<SolarCapacityInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub use_case_slug: String,
    pub grid: GridConnection,
    pub load: EquipmentLoadResult,
    pub solar: Option<SolarCapacityResult>,
    pub recommended: Proposal,
    pub tiers: Vec<Proposal>,
    pub validation: ValidationOutcome,
}

impl Quote {
    pub fn tier(
        &self,
        tier: Tier,
    ) -> Option<&Proposal> {
        self.tiers.iter().find(|p| p.tier == tier)
    }
}

#[derive(Debug, Clone)]
pub struct QuoteEngine<'a> {
    context: &'a QuoteContext,
    validator: ProposalValidator,
}

impl<'a> QuoteEngine<'a> {
    pub fn new(context: &'a QuoteContext) -> Self {
        Self {
            context,
            validator: ProposalValidator::default().with_itc_rate(context.pricing.itc_rate),
        }
    }

    /// Replaces the validator. The ITC rate always comes from the context's
    /// pricing scenario.
    pub fn with_validator(
        mut self,
        validator: ProposalValidator,
    ) -> Self {
        self.validator = validator.with_itc_rate(self.context.pricing.itc_rate);
        self
    }

    /// Builds and validates a quote.
    ///
    /// # Errors
    ///
    /// [`QuoteError::InvalidAnswers`] when required questions are missing or
    /// malformed; [`QuoteError::Solar`] when the solar add-on input is invalid.
    pub fn build(
        &self,
        request: &QuoteRequest,
    ) -> Result<Quote, QuoteError> {
        let ctx = self.context;

        let errors = validate_answers(&ctx.questions, &request.answers);
        if !errors.is_empty() {
            return Err(QuoteError::InvalidAnswers(errors));
        }

        let load = EquipmentLoadCalculator::new(&ctx.template, &ctx.equipment)
            .calculate(&request.answers);
        debug!(peak_kw = %load.estimated_peak_kw, "load calculated");

        let solar = match &request.solar {
            Some(input) if request.add_ons.solar => {
                Some(SolarCapacityCalculator::new(&ctx.template).calculate(input)?)
            }
            _ => None,
        };

        let grid = request
            .answers
            .text(universal::GRID_CONNECTION)
            .and_then(GridConnection::parse)
            .unwrap_or_default();
        let grid_capacity_kw =
            request.answers.number_or(universal::GRID_CAPACITY, Decimal::ZERO) * KW_PER_MW;

        let system = size_system(&SizingInput {
            peak_kw: load.estimated_peak_kw,
            grid,
            grid_capacity_kw,
            duration_hours: ctx.template.storage_duration_hours,
            add_ons: request.add_ons,
            solar: solar.as_ref(),
        });

        let pricer = FinancialCalculator::new(&ctx.pricing);
        let price = |tier: Tier, system: SystemConfiguration| Proposal {
            tier,
            financials: pricer.calculate(&system),
            system,
        };

        let recommended = price(Tier::PerfectFit, system.clone());
        let tiers: Vec<Proposal> = Tier::all()
            .into_iter()
            .map(|tier| price(tier, tier.scale(&system)))
            .collect();

        let validation = self.validator.validate(&recommended, &tiers);
        info!(
            use_case = %ctx.use_case.slug,
            bess_kw = %recommended.system.bess_kw,
            bess_kwh = %recommended.system.bess_kwh,
            authenticated = validation.is_authenticated(),
            "quote built"
        );

        Ok(Quote {
            use_case_slug: ctx.use_case.slug.clone(),
            grid,
            load,
            solar,
            recommended,
            tiers,
            validation,
        })
    }
}
