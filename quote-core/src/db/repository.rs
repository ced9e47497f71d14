use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    CategoryEntry, CustomQuestion, EquipmentTemplate, NewAnalyticsEvent, NewSavedQuote, PricingScenario, SavedQuote, UseCase, UseCaseConfiguration, UseCaseEquipment,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    // Use cases
    async fn list_use_cases(
        &self,
        active_only: bool,
    ) -> Result<Vec<UseCase>, RepositoryError>;
    async fn get_use_case(
        &self,
        slug: &str,
    ) -> Result<UseCase, RepositoryError>;

    // Configurations
    async fn list_configurations(
        &self,
        use_case_id: i64,
    ) -> Result<Vec<UseCaseConfiguration>, RepositoryError>;
    /// The configuration flagged default, else the first by id.
    async fn get_default_configuration(
        &self,
        use_case_id: i64,
    ) -> Result<UseCaseConfiguration, RepositoryError>;

    // Questions, ordered by display_order
    async fn list_questions(
        &self,
        use_case_id: i64,
    ) -> Result<Vec<CustomQuestion>, RepositoryError>;

    // Equipment catalog
    async fn list_equipment_templates(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<EquipmentTemplate>, RepositoryError>;
    /// Replaces every template in `category` with `entries`, attaching each
    /// to its use case. The replacement is all or nothing.
    async fn replace_equipment_category(
        &self,
        category: &str,
        entries: &[CategoryEntry],
    ) -> Result<Vec<EquipmentTemplate>, RepositoryError>;
    async fn list_use_case_equipment(
        &self,
        use_case_id: i64,
    ) -> Result<Vec<UseCaseEquipment>, RepositoryError>;

    // Pricing
    async fn get_pricing_scenario(
        &self,
        name: &str,
    ) -> Result<PricingScenario, RepositoryError>;
    async fn get_default_pricing(&self) -> Result<PricingScenario, RepositoryError>;
    async fn list_pricing_scenarios(&self) -> Result<Vec<PricingScenario>, RepositoryError>;

    // Saved quotes
    async fn create_quote(
        &self,
        quote: NewSavedQuote,
    ) -> Result<SavedQuote, RepositoryError>;
    async fn get_quote(
        &self,
        id: i64,
    ) -> Result<SavedQuote, RepositoryError>;
    async fn update_quote(
        &self,
        quote: &SavedQuote,
    ) -> Result<(), RepositoryError>;
    async fn delete_quote(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError>;
    async fn list_quotes(
        &self,
        use_case_id: Option<i64>,
    ) -> Result<Vec<SavedQuote>, RepositoryError>;

    // Analytics
    async fn record_event(
        &self,
        event: NewAnalyticsEvent,
    ) -> Result<(), RepositoryError>;
}
