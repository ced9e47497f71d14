//! In-memory [`QuoteRepository`] for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use super::repository::{QuoteRepository, RepositoryError};
use crate::models::{
    CategoryEntry, CustomQuestion, EquipmentTemplate, IndustryKey, NewAnalyticsEvent,
    NewSavedQuote, PricingScenario, SavedQuote, UseCase, UseCaseConfiguration, UseCaseEquipment,
};

#[derive(Default)]
struct State {
    use_cases: Vec<UseCase>,
    configurations: Vec<UseCaseConfiguration>,
    questions: Vec<CustomQuestion>,
    templates: Vec<EquipmentTemplate>,
    attachments: Vec<(i64, i64, i64, Decimal)>,
    pricing: Vec<PricingScenario>,
    quotes: Vec<SavedQuote>,
    events: Vec<NewAnalyticsEvent>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Counts every trait call in `calls` so cache tests can see pass-through.
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
    pub calls: Arc<AtomicUsize>,
}

impl MemoryRepository {
    /// One active car wash use case with a default configuration and a
    /// default pricing scenario.
    pub fn seeded() -> Self {
        let repo = Self::default();
        {
            let mut s = repo.state.lock().unwrap();
            s.use_cases.push(UseCase {
                id: 1,
                slug: "car-wash".to_string(),
                name: "Car Wash".to_string(),
                description: None,
                industry: IndustryKey::CarWash,
                is_active: true,
            });
            s.configurations.push(UseCaseConfiguration {
                id: 1,
                use_case_id: 1,
                config_name: "standard".to_string(),
                is_default: true,
                typical_load_kw: Decimal::from(150),
                peak_load_kw: Decimal::from(250),
                preferred_duration_hours: Decimal::from(4),
                operating_hours_per_day: Decimal::from(12),
                operating_days_per_year: Decimal::from(360),
            });
            s.pricing.push(PricingScenario {
                id: 1,
                name: "default".to_string(),
                ..PricingScenario::fallback()
            });
            s.next_id = 10;
        }
        repo
    }

    pub fn events(&self) -> Vec<NewAnalyticsEvent> {
        self.state.lock().unwrap().events.clone()
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuoteRepository for MemoryRepository {
    async fn list_use_cases(
        &self,
        active_only: bool,
    ) -> Result<Vec<UseCase>, RepositoryError> {
        self.tick();
        let s = self.state.lock().unwrap();
        Ok(s.use_cases
            .iter()
            .filter(|u| !active_only || u.is_active)
            .cloned()
            .collect())
    }

    async fn get_use_case(
        &self,
        slug: &str,
    ) -> Result<UseCase, RepositoryError> {
        self.tick();
        let s = self.state.lock().unwrap();
        s.use_cases
            .iter()
            .find(|u| u.slug == slug)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_configurations(
        &self,
        use_case_id: i64,
    ) -> Result<Vec<UseCaseConfiguration>, RepositoryError> {
        self.tick();
        let s = self.state.lock().unwrap();
        Ok(s.configurations
            .iter()
            .filter(|c| c.use_case_id == use_case_id)
            .cloned()
            .collect())
    }

    async fn get_default_configuration(
        &self,
        use_case_id: i64,
    ) -> Result<UseCaseConfiguration, RepositoryError> {
        self.tick();
        let s = self.state.lock().unwrap();
        let mut configs: Vec<_> = s
            .configurations
            .iter()
            .filter(|c| c.use_case_id == use_case_id)
            .collect();
        configs.sort_by_key(|c| (!c.is_default, c.id));
        configs.first().map(|c| (*c).clone()).ok_or(RepositoryError::NotFound)
    }

    async fn list_questions(
        &self,
        use_case_id: i64,
    ) -> Result<Vec<CustomQuestion>, RepositoryError> {
        self.tick();
        let s = self.state.lock().unwrap();
        let mut questions: Vec<_> = s
            .questions
            .iter()
            .filter(|q| q.use_case_id == use_case_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.display_order);
        Ok(questions)
    }

    async fn list_equipment_templates(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<EquipmentTemplate>, RepositoryError> {
        self.tick();
        let s = self.state.lock().unwrap();
        Ok(s.templates
            .iter()
            .filter(|t| category.is_none_or(|c| t.category == c))
            .cloned()
            .collect())
    }

    async fn replace_equipment_category(
        &self,
        category: &str,
        entries: &[CategoryEntry],
    ) -> Result<Vec<EquipmentTemplate>, RepositoryError> {
        self.tick();
        let mut s = self.state.lock().unwrap();
        for (i, entry) in entries.iter().enumerate() {
            let name = &entry.template.name;
            let clashes_outside = s
                .templates
                .iter()
                .any(|t| &t.name == name && t.category != category);
            let repeated = entries[..i].iter().any(|e| &e.template.name == name);
            if clashes_outside || repeated {
                return Err(RepositoryError::Database(format!(
                    "UNIQUE constraint failed: equipment_templates.name ({name})"
                )));
            }
        }

        let removed: Vec<i64> = s
            .templates
            .iter()
            .filter(|t| t.category == category)
            .map(|t| t.id)
            .collect();
        s.templates.retain(|t| t.category != category);
        s.attachments.retain(|(_, _, template_id, _)| !removed.contains(template_id));

        let mut inserted = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = s.next_id();
            let stored = EquipmentTemplate {
                id,
                name: entry.template.name.clone(),
                category: category.to_string(),
                nameplate_kw: entry.template.nameplate_kw,
                duty_cycle: entry.template.duty_cycle,
                description: entry.template.description.clone(),
            };
            s.templates.push(stored.clone());
            if let Some(attach) = entry.attach_to {
                let row = s.next_id();
                s.attachments.push((row, attach.use_case_id, id, attach.quantity));
            }
            inserted.push(stored);
        }
        Ok(inserted)
    }

    async fn list_use_case_equipment(
        &self,
        use_case_id: i64,
    ) -> Result<Vec<UseCaseEquipment>, RepositoryError> {
        self.tick();
        let s = self.state.lock().unwrap();
        Ok(s.attachments
            .iter()
            .filter(|(_, uc, _, _)| *uc == use_case_id)
            .filter_map(|(id, uc, template_id, quantity)| {
                s.templates
                    .iter()
                    .find(|t| t.id == *template_id)
                    .map(|t| UseCaseEquipment {
                        id: *id,
                        use_case_id: *uc,
                        template: t.clone(),
                        quantity: *quantity,
                    })
            })
            .collect())
    }

    async fn get_pricing_scenario(
        &self,
        name: &str,
    ) -> Result<PricingScenario, RepositoryError> {
        self.tick();
        let s = self.state.lock().unwrap();
        s.pricing
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_default_pricing(&self) -> Result<PricingScenario, RepositoryError> {
        self.tick();
        let s = self.state.lock().unwrap();
        s.pricing
            .iter()
            .find(|p| p.is_default)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_pricing_scenarios(&self) -> Result<Vec<PricingScenario>, RepositoryError> {
        self.tick();
        Ok(self.state.lock().unwrap().pricing.clone())
    }

    async fn create_quote(
        &self,
        quote: NewSavedQuote,
    ) -> Result<SavedQuote, RepositoryError> {
        self.tick();
        let mut s = self.state.lock().unwrap();
        let now = Utc::now();
        let saved = SavedQuote {
            id: s.next_id(),
            use_case_id: quote.use_case_id,
            answers: quote.answers,
            bess_kw: quote.bess_kw,
            bess_kwh: quote.bess_kwh,
            solar_kw: quote.solar_kw,
            generator_kw: quote.generator_kw,
            total_cost: quote.total_cost,
            net_cost: quote.net_cost,
            annual_savings: quote.annual_savings,
            payback_years: quote.payback_years,
            created_at: now,
            updated_at: now,
        };
        s.quotes.push(saved.clone());
        Ok(saved)
    }

    async fn get_quote(
        &self,
        id: i64,
    ) -> Result<SavedQuote, RepositoryError> {
        self.tick();
        let s = self.state.lock().unwrap();
        s.quotes
            .iter()
            .find(|q| q.id == id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_quote(
        &self,
        quote: &SavedQuote,
    ) -> Result<(), RepositoryError> {
        self.tick();
        let mut s = self.state.lock().unwrap();
        let slot = s
            .quotes
            .iter_mut()
            .find(|q| q.id == quote.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = quote.clone();
        Ok(())
    }

    async fn delete_quote(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        self.tick();
        let mut s = self.state.lock().unwrap();
        let before = s.quotes.len();
        s.quotes.retain(|q| q.id != id);
        if s.quotes.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_quotes(
        &self,
        use_case_id: Option<i64>,
    ) -> Result<Vec<SavedQuote>, RepositoryError> {
        self.tick();
        let s = self.state.lock().unwrap();
        Ok(s.quotes
            .iter()
            .filter(|q| use_case_id.is_none_or(|id| q.use_case_id == id))
            .cloned()
            .collect())
    }

    async fn record_event(
        &self,
        event: NewAnalyticsEvent,
    ) -> Result<(), RepositoryError> {
        self.tick();
        self.state.lock().unwrap().events.push(event);
        Ok(())
    }
}
