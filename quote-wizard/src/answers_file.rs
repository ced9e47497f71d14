//! Answers file for non-interactive quoting.
//!
//! A TOML document naming the use case and carrying everything the wizard
//! would otherwise collect step by step.
//!
//! | Key | Required | Notes |
//! |--------------------|----------|---------------------------------------------------|
//! | `use_case` | yes | Use case slug, e.g. `car-wash` |
//! | `pricing` | no | Pricing scenario name; overrides the config file |
//! | `goals` | no | `reduce_demand_charges`, `backup_power`, ... |
//! | `[answers]` | no | Question field name to number, bool or string |
//! | `[add_ons]` | no | `solar` and `generator`, both default to `false` |
//! | `[solar]` | no | Roof and carport areas for the solar add-on |
//!
//! ```toml
//! use_case = "car-wash"
//! goals = ["reduce_demand_charges", "backup_power"]
//!
//! [answers]
//! tunnelLength = 150
//! dryerType = "high_efficiency"
//! operatingHours = 14
//! gridConnection = "reliable"
//!
//! [add_ons]
//! solar = true
//!
//! [solar]
//! roof_area = 8000
//! roof_unit = "sqft"
//! carport_interest = "unsure"
//! carport_area = 500
//! carport_unit = "sqm"
//! ```
use std::path::{Path, PathBuf};

use quote_core::Answers;
use quote_core::calculations::{AddOns, AreaUnit, CarportInterest, QuoteRequest, SolarCapacityInput};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::state::{Goal, WizardState};

// ---------------------------------------------------------------------------
// Serde-compatible document that mirrors the file layout
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AnswersDocument {
    use_case: String,
    pricing: Option<String>,
    #[serde(default)]
    goals: Vec<String>,
    #[serde(default)]
    answers: Answers,
    #[serde(default)]
    add_ons: AddOnsSection,
    solar: Option<SolarSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AddOnsSection {
    solar: bool,
    generator: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SolarSection {
    roof_area: Decimal,
    roof_unit: Option<String>,
    carport_area: Option<Decimal>,
    carport_unit: Option<String>,
    carport_interest: Option<String>,
    peak_sun_hours: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Public error type
// ---------------------------------------------------------------------------

/// Errors that can occur while reading or converting an answers file.
#[derive(Debug, thiserror::Error)]
pub enum AnswersFileError {
    #[error("cannot read answers file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Structurally invalid TOML, a missing `use_case`, a type mismatch or
    /// an unknown key.
    #[error("answers file parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unrecognised goal '{0}'")]
    UnknownGoal(String),

    #[error("unrecognised area unit '{value}' for {field}")]
    UnknownUnit { field: &'static str, value: String },

    #[error("unrecognised carport interest '{0}' (expected yes, no or unsure)")]
    UnknownCarportInterest(String),
}

/// A parsed answers file, ready to drive a quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswersFile {
    pub use_case: String,
    pub pricing: Option<String>,
    pub goals: Vec<Goal>,
    pub request: QuoteRequest,
}

impl AnswersFile {
    /// Replays the file into a wizard session: industry, answers, goals and
    /// add-ons. Defaults for unanswered questions are not filled here.
    pub fn apply_to(
        &self,
        state: &mut WizardState,
    ) {
        state.select_industry(&self.use_case);
        for (field, value) in self.request.answers.iter() {
            state.set_answer(field, value.clone());
        }
        if !self.goals.is_empty() {
            state.confirm_goals(self.goals.clone());
        }
        state.set_add_ons(self.request.add_ons, self.request.solar.clone());
    }
}

// ---------------------------------------------------------------------------
// Core loader
// ---------------------------------------------------------------------------

fn area_unit(
    field: &'static str,
    value: Option<String>,
) -> Result<AreaUnit, AnswersFileError> {
    match value {
        None => Ok(AreaUnit::default()),
        Some(raw) => {
            AreaUnit::parse(&raw).ok_or(AnswersFileError::UnknownUnit { field, value: raw })
        }
    }
}

fn convert_solar(section: SolarSection) -> Result<SolarCapacityInput, AnswersFileError> {
    let carport_interest = match section.carport_interest {
        None => CarportInterest::default(),
        Some(raw) => {
            CarportInterest::parse(&raw).ok_or(AnswersFileError::UnknownCarportInterest(raw))?
        }
    };

    Ok(SolarCapacityInput {
        roof_area: section.roof_area,
        roof_unit: area_unit("roof_unit", section.roof_unit)?,
        carport_area: section.carport_area,
        carport_unit: area_unit("carport_unit", section.carport_unit)?,
        carport_interest,
        peak_sun_hours: section.peak_sun_hours,
    })
}

/// Parse answers-file text (the full file contents as a &str).
///
/// # Errors
///
/// * [AnswersFileError::Parse] when the TOML is invalid or does not match
///   the layout above.
/// * [AnswersFileError::UnknownGoal], [AnswersFileError::UnknownUnit] and
///   [AnswersFileError::UnknownCarportInterest] for unrecognised names.
pub fn load_from_str(input: &str) -> Result<AnswersFile, AnswersFileError> {
    let doc: AnswersDocument = toml::from_str(input)?;

    let goals = doc
        .goals
        .into_iter()
        .map(|g| Goal::parse(&g).ok_or(AnswersFileError::UnknownGoal(g)))
        .collect::<Result<Vec<_>, _>>()?;

    let solar = doc.solar.map(convert_solar).transpose()?;

    Ok(AnswersFile {
        use_case: doc.use_case.trim().to_string(),
        pricing: doc.pricing,
        goals,
        request: QuoteRequest {
            answers: doc.answers,
            add_ons: AddOns {
                solar: doc.add_ons.solar,
                generator: doc.add_ons.generator,
            },
            solar,
        },
    })
}

/// Convenience wrapper: read a file from disk and delegate to [load_from_str].
pub fn load_from_file(path: &Path) -> Result<AnswersFile, AnswersFileError> {
    let contents = std::fs::read_to_string(path).map_err(|source| AnswersFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file = load_from_str(&contents)?;
    tracing::debug!(
        path = %path.display(),
        use_case = %file.use_case,
        answers = file.request.answers.len(),
        "answers file loaded"
    );
    Ok(file)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
