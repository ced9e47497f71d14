use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::answers::{AnswerValue, Answers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Number,
    Select,
    Boolean,
    Text,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Select => "select",
            Self::Boolean => "boolean",
            Self::Text => "text",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "number" => Some(Self::Number),
            "select" => Some(Self::Select),
            "boolean" => Some(Self::Boolean),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomQuestion {
    pub id: i64,
    pub use_case_id: i64,
    pub field_name: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub default_value: Option<String>,
    pub unit: Option<String>,
    pub options: Vec<QuestionOption>,
    pub help_text: Option<String>,
    pub is_required: bool,
    pub display_order: i32,
}

impl CustomQuestion {
    /// Typed default, if the question declares one.
    pub fn default_answer(&self) -> Option<AnswerValue> {
        let raw = self.default_value.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        match self.question_type {
            QuestionType::Number => raw.parse::<Decimal>().ok().map(AnswerValue::Number),
            QuestionType::Boolean => AnswerValue::from(raw).as_bool().map(AnswerValue::Bool),
            QuestionType::Select | QuestionType::Text => Some(AnswerValue::from(raw)),
        }
    }
}

/// Field names of the questions every use case asks.
pub mod universal {
    pub const FACILITY_SIZE: &str = "facilitySize";
    pub const OPERATING_HOURS: &str = "operatingHours";
    pub const PEAK_LOAD: &str = "peakLoad";
    pub const GRID_CONNECTION: &str = "gridConnection";
    pub const GRID_CAPACITY: &str = "gridCapacity";
}

fn option(
    value: &str,
    label: &str,
) -> QuestionOption {
    QuestionOption {
        value: value.to_string(),
        label: label.to_string(),
    }
}

/// Questions appended to every use case that does not already ask them.
/// `use_case_id` and `id` are zero because these never come from the database.
pub fn universal_questions() -> Vec<CustomQuestion> {
    let base = |field: &str, text: &str, kind: QuestionType| CustomQuestion {
        id: 0,
        use_case_id: 0,
        field_name: field.to_string(),
        question_text: text.to_string(),
        question_type: kind,
        default_value: None,
        unit: None,
        options: Vec::new(),
        help_text: None,
        is_required: false,
        display_order: 900,
    };

    vec![
        CustomQuestion {
            default_value: Some("10000".to_string()),
            unit: Some("sq ft".to_string()),
            help_text: Some("Total building/facility square footage".to_string()),
            display_order: 900,
            ..base(universal::FACILITY_SIZE, "Facility size (sq ft)", QuestionType::Number)
        },
        CustomQuestion {
            default_value: Some("12".to_string()),
            unit: Some("hours".to_string()),
            help_text: Some("Hours per day the facility operates".to_string()),
            is_required: true,
            display_order: 901,
            ..base(universal::OPERATING_HOURS, "Daily operating hours", QuestionType::Number)
        },
        CustomQuestion {
            default_value: Some("0".to_string()),
            unit: Some("MW".to_string()),
            help_text: Some(
                "Optional: actual peak load from utility bill (leave 0 for auto-calculation)"
                    .to_string(),
            ),
            display_order: 902,
            ..base(universal::PEAK_LOAD, "Peak power demand (if known)", QuestionType::Number)
        },
        CustomQuestion {
            default_value: Some("reliable".to_string()),
            options: vec![
                option("reliable", "Reliable Grid - Stable power, rare outages"),
                option("unreliable", "Unreliable Grid - Frequent outages"),
                option("limited", "Limited Capacity - Grid undersized for facility"),
                option("off_grid", "Off-Grid - No grid connection"),
                option("microgrid", "Microgrid - Independent power system"),
            ],
            help_text: Some(
                "Grid quality affects backup requirements and generation needs".to_string(),
            ),
            is_required: true,
            display_order: 903,
            ..base(universal::GRID_CONNECTION, "Grid connection quality", QuestionType::Select)
        },
        CustomQuestion {
            default_value: Some("0".to_string()),
            unit: Some("MW".to_string()),
            help_text: Some(
                "If limited grid: max capacity from utility. 0 means unlimited.".to_string(),
            ),
            display_order: 904,
            ..base(
                universal::GRID_CAPACITY,
                "Grid connection capacity (if limited)",
                QuestionType::Number,
            )
        },
    ]
}

/// Appends the universal questions a use case is missing, keyed by field name.
pub fn with_universal_questions(mut questions: Vec<CustomQuestion>) -> Vec<CustomQuestion> {
    for extra in universal_questions() {
        if !questions.iter().any(|q| q.field_name == extra.field_name) {
            questions.push(extra);
        }
    }
    questions.sort_by_key(|q| q.display_order);
    questions
}

/// Checks answers against the question set and returns human-readable errors.
/// An empty vector means the answers are acceptable.
pub fn validate_answers(
    questions: &[CustomQuestion],
    answers: &Answers,
) -> Vec<String> {
    let mut errors = Vec::new();

    for question in questions {
        let Some(value) = answers.get(&question.field_name) else {
            if question.is_required {
                errors.push(format!("{} is required", question.question_text));
            }
            continue;
        };

        match question.question_type {
            QuestionType::Number => match value.as_decimal() {
                Some(n) if n < Decimal::ZERO => {
                    errors.push(format!("{} cannot be negative", question.question_text));
                }
                Some(_) => {}
                None => errors.push(format!("{} must be a number", question.question_text)),
            },
            QuestionType::Select => {
                let chosen = match value {
                    AnswerValue::Text(s) => s.clone(),
                    other => match other.as_decimal() {
                        Some(n) => n.to_string(),
                        None => String::new(),
                    },
                };
                if !question.options.is_empty()
                    && !question.options.iter().any(|o| o.value == chosen)
                {
                    errors.push(format!(
                        "{} must be one of: {}",
                        question.question_text,
                        question
                            .options
                            .iter()
                            .map(|o| o.value.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ));
                }
            }
            QuestionType::Boolean => {
                if value.as_bool().is_none() {
                    errors.push(format!("{} must be yes or no", question.question_text));
                }
            }
            QuestionType::Text => {
                if question.is_required && value.as_text().is_some_and(|s| s.trim().is_empty()) {
                    errors.push(format!("{} is required", question.question_text));
                }
            }
        }
    }

    errors
}
