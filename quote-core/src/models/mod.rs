mod answers;
mod equipment;
mod industry;
mod pricing;
mod question;
mod saved_quote;
mod use_case;

pub use answers::{AnswerValue, Answers};
pub use equipment::{
    CategoryEntry, EquipmentAttachment, EquipmentTemplate, NewEquipmentTemplate, UseCaseEquipment,
};
pub use industry::{IndustryKey, IndustryTemplate};
pub use pricing::PricingScenario;
pub use question::{
    CustomQuestion, QuestionOption, QuestionType, universal, universal_questions,
    validate_answers, with_universal_questions,
};
pub use saved_quote::{NewAnalyticsEvent, NewSavedQuote, SavedQuote};
pub use use_case::{UseCase, UseCaseConfiguration};
