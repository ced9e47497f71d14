//! Wizard session state.
//!
//! One [`WizardState`] exists per session. It holds the current step, the
//! answers collected so far and the last computed sizing and financials. The
//! whole struct is what the session buffer persists.

use quote_core::calculations::{
    AddOns, FinancialMetrics, Quote, SolarCapacityInput, SystemConfiguration,
    validate_solar_input,
};
use quote_core::{AnswerValue, Answers, CustomQuestion, universal, validate_answers};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Industry,
    Facility,
    Details,
    Goals,
    Options,
    Results,
}

impl WizardStep {
    /// One-based position shown to the user.
    pub fn number(&self) -> u8 {
        match self {
            Self::Industry => 1,
            Self::Facility => 2,
            Self::Details => 3,
            Self::Goals => 4,
            Self::Options => 5,
            Self::Results => 6,
        }
    }

    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Industry => Some(Self::Facility),
            Self::Facility => Some(Self::Details),
            Self::Details => Some(Self::Goals),
            Self::Goals => Some(Self::Options),
            Self::Options => Some(Self::Results),
            Self::Results => None,
        }
    }

    pub fn previous(&self) -> Option<Self> {
        match self {
            Self::Industry => None,
            Self::Facility => Some(Self::Industry),
            Self::Details => Some(Self::Facility),
            Self::Goals => Some(Self::Details),
            Self::Options => Some(Self::Goals),
            Self::Results => Some(Self::Options),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    ReduceDemandCharges,
    BackupPower,
    EnergyArbitrage,
    Sustainability,
}

impl Goal {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "reduce_demand_charges" | "demand" => Some(Self::ReduceDemandCharges),
            "backup_power" | "backup" => Some(Self::BackupPower),
            "energy_arbitrage" | "arbitrage" => Some(Self::EnergyArbitrage),
            "sustainability" => Some(Self::Sustainability),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    /// Database pricing was unavailable and built-in constants were used.
    Fallback,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("choose an industry first")]
    NoIndustry,

    #[error("{}", .0.join("; "))]
    InvalidAnswers(Vec<String>),

    #[error("confirm at least one goal")]
    NoGoals,

    #[error("already on the last step")]
    AtEnd,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WizardState {
    pub current_step: WizardStep,
    /// Selected use case slug.
    pub industry: Option<String>,
    pub answers: Answers,
    pub step3_complete: bool,
    pub goals: Vec<Goal>,
    pub goals_confirmed: bool,
    pub add_ons: AddOns,
    pub solar: Option<SolarCapacityInput>,
    pub pricing_status: PricingStatus,
    pub is_loading: bool,
    pub error: Option<String>,
    pub sizing: Option<SystemConfiguration>,
    pub financials: Option<FinancialMetrics>,
}

fn is_universal(question: &CustomQuestion) -> bool {
    [
        universal::FACILITY_SIZE,
        universal::OPERATING_HOURS,
        universal::PEAK_LOAD,
        universal::GRID_CONNECTION,
        universal::GRID_CAPACITY,
    ]
    .contains(&question.field_name.as_str())
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks a use case. Changing to a different one discards answers and
    /// results collected for the previous one.
    pub fn select_industry(
        &mut self,
        slug: &str,
    ) {
        if self.industry.as_deref() != Some(slug) {
            let previous = self.industry.replace(slug.to_string());
            debug!(?previous, industry = slug, "industry changed");
            self.answers = Answers::new();
            self.step3_complete = false;
            self.clear_results();
        }
        self.error = None;
    }

    pub fn set_answer(
        &mut self,
        field: &str,
        value: impl Into<AnswerValue>,
    ) {
        self.answers.set(field, value);
        self.clear_results();
    }

    /// Fills in declared defaults for questions that have no answer yet.
    pub fn apply_defaults(
        &mut self,
        questions: &[CustomQuestion],
    ) {
        for question in questions {
            if !self.answers.contains(&question.field_name)
                && let Some(value) = question.default_answer()
            {
                self.answers.set(&question.field_name, value);
            }
        }
    }

    pub fn confirm_goals(
        &mut self,
        goals: Vec<Goal>,
    ) {
        self.goals_confirmed = !goals.is_empty();
        self.goals = goals;
    }

    pub fn set_add_ons(
        &mut self,
        add_ons: AddOns,
        solar: Option<SolarCapacityInput>,
    ) {
        self.add_ons = add_ons;
        self.solar = solar;
        self.clear_results();
    }

    /// Checks what the current step requires and moves forward.
    ///
    /// `questions` is the full question set for the selected use case; the
    /// facility step validates the universal ones and the details step the
    /// rest.
    pub fn advance(
        &mut self,
        questions: &[CustomQuestion],
    ) -> Result<WizardStep, WizardError> {
        if let Err(e) = self.check_current(questions) {
            self.error = Some(e.to_string());
            return Err(e);
        }

        let next = self.current_step.next().ok_or(WizardError::AtEnd)?;
        if self.current_step == WizardStep::Details {
            self.step3_complete = true;
        }
        self.current_step = next;
        self.error = None;
        debug!(step = next.number(), "advanced");
        Ok(next)
    }

    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.current_step.previous() {
            self.current_step = previous;
        }
        self.error = None;
        self.current_step
    }

    fn check_current(
        &self,
        questions: &[CustomQuestion],
    ) -> Result<(), WizardError> {
        match self.current_step {
            WizardStep::Industry => {
                if self.industry.is_none() {
                    return Err(WizardError::NoIndustry);
                }
            }
            WizardStep::Facility | WizardStep::Details => {
                let want_universal = self.current_step == WizardStep::Facility;
                let step_questions: Vec<CustomQuestion> = questions
                    .iter()
                    .filter(|q| is_universal(q) == want_universal)
                    .cloned()
                    .collect();
                let errors = validate_answers(&step_questions, &self.answers);
                if !errors.is_empty() {
                    return Err(WizardError::InvalidAnswers(errors));
                }
            }
            WizardStep::Goals => {
                if !self.goals_confirmed {
                    return Err(WizardError::NoGoals);
                }
            }
            WizardStep::Options => {
                if self.add_ons.solar
                    && let Some(solar) = &self.solar
                {
                    let errors = validate_solar_input(solar);
                    if !errors.is_empty() {
                        return Err(WizardError::InvalidAnswers(errors));
                    }
                }
            }
            WizardStep::Results => return Err(WizardError::AtEnd),
        }
        Ok(())
    }

    pub fn begin_loading(&mut self) {
        self.is_loading = true;
        self.pricing_status = PricingStatus::Loading;
        self.error = None;
    }

    /// Stores the recommended sizing and financials from a finished quote.
    pub fn finish_quote(
        &mut self,
        quote: &Quote,
        pricing_fallback: bool,
    ) {
        self.sizing = Some(quote.recommended.system.clone());
        self.financials = Some(quote.recommended.financials.clone());
        self.pricing_status = if pricing_fallback {
            PricingStatus::Fallback
        } else {
            PricingStatus::Ready
        };
        self.is_loading = false;
        self.error = None;
    }

    pub fn fail(
        &mut self,
        message: impl Into<String>,
    ) {
        self.is_loading = false;
        self.pricing_status = PricingStatus::Idle;
        self.error = Some(message.into());
    }

    pub fn has_results(&self) -> bool {
        self.sizing.is_some() && self.financials.is_some()
    }

    fn clear_results(&mut self) {
        self.sizing = None;
        self.financials = None;
        self.pricing_status = PricingStatus::Idle;
    }
}
