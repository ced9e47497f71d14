//! Read-through cache over a [`QuoteRepository`].
//!
//! Use case, configuration, question, equipment and pricing lookups change
//! rarely, so successful results are kept for a fixed time-to-live. Errors are
//! never cached. Writes to the equipment catalog drop every entry and bump a
//! generation counter, so a load that was already in flight when the write
//! landed is returned to its caller but not stored. Saved quotes and
//! analytics always go straight to the backend.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::repository::{QuoteRepository, RepositoryError};
use crate::models::{
    CategoryEntry, CustomQuestion, EquipmentTemplate, NewAnalyticsEvent, NewSavedQuote,
    PricingScenario, SavedQuote, UseCase, UseCaseConfiguration, UseCaseEquipment,
};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    stored_at: Instant,
}

pub struct CachedQuoteRepository {
    inner: Box<dyn QuoteRepository>,
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
    generation: AtomicU64,
}

impl CachedQuoteRepository {
    pub fn new(inner: Box<dyn QuoteRepository>) -> Self {
        Self::with_ttl(inner, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(
        inner: Box<dyn QuoteRepository>,
        ttl: Duration,
    ) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn get_or_load<T, F>(
        &self,
        key: String,
        load: F,
    ) -> Result<T, RepositoryError>
    where
        T: Clone + Send + Sync + 'static,
        F: Future<Output = Result<T, RepositoryError>> + Send,
    {
        let generation = self.generation.load(Ordering::SeqCst);
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&key)
                && entry.stored_at.elapsed() < self.ttl
                && let Some(value) = entry.value.downcast_ref::<T>()
            {
                trace!(%key, "cache hit");
                return Ok(value.clone());
            }
        }

        debug!(%key, "cache miss");
        let value = load.await?;
        let mut entries = self.entries.write().await;
        if self.generation.load(Ordering::SeqCst) == generation {
            entries.insert(
                key,
                Entry {
                    value: Arc::new(value.clone()),
                    stored_at: Instant::now(),
                },
            );
        } else {
            debug!(%key, "catalog changed during load, not caching");
        }
        Ok(value)
    }
}

#[async_trait]
impl QuoteRepository for CachedQuoteRepository {
    async fn list_use_cases(
        &self,
        active_only: bool,
    ) -> Result<Vec<UseCase>, RepositoryError> {
        self.get_or_load(
            format!("use_cases:{active_only}"),
            self.inner.list_use_cases(active_only),
        )
        .await
    }

    async fn get_use_case(
        &self,
        slug: &str,
    ) -> Result<UseCase, RepositoryError> {
        self.get_or_load(format!("use_case:{slug}"), self.inner.get_use_case(slug))
            .await
    }

    async fn list_configurations(
        &self,
        use_case_id: i64,
    ) -> Result<Vec<UseCaseConfiguration>, RepositoryError> {
        self.get_or_load(
            format!("configurations:{use_case_id}"),
            self.inner.list_configurations(use_case_id),
        )
        .await
    }

    async fn get_default_configuration(
        &self,
        use_case_id: i64,
    ) -> Result<UseCaseConfiguration, RepositoryError> {
        self.get_or_load(
            format!("default_configuration:{use_case_id}"),
            self.inner.get_default_configuration(use_case_id),
        )
        .await
    }

    async fn list_questions(
        &self,
        use_case_id: i64,
    ) -> Result<Vec<CustomQuestion>, RepositoryError> {
        self.get_or_load(
            format!("questions:{use_case_id}"),
            self.inner.list_questions(use_case_id),
        )
        .await
    }

    async fn list_equipment_templates(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<EquipmentTemplate>, RepositoryError> {
        self.get_or_load(
            format!("templates:{}", category.unwrap_or("*")),
            self.inner.list_equipment_templates(category),
        )
        .await
    }

    async fn replace_equipment_category(
        &self,
        category: &str,
        entries: &[CategoryEntry],
    ) -> Result<Vec<EquipmentTemplate>, RepositoryError> {
        let templates = self.inner.replace_equipment_category(category, entries).await?;
        self.clear().await;
        Ok(templates)
    }

    async fn list_use_case_equipment(
        &self,
        use_case_id: i64,
    ) -> Result<Vec<UseCaseEquipment>, RepositoryError> {
        self.get_or_load(
            format!("equipment:{use_case_id}"),
            self.inner.list_use_case_equipment(use_case_id),
        )
        .await
    }

    async fn get_pricing_scenario(
        &self,
        name: &str,
    ) -> Result<PricingScenario, RepositoryError> {
        self.get_or_load(
            format!("pricing:{name}"),
            self.inner.get_pricing_scenario(name),
        )
        .await
    }

    async fn get_default_pricing(&self) -> Result<PricingScenario, RepositoryError> {
        self.get_or_load("pricing_default".to_string(), self.inner.get_default_pricing())
            .await
    }

    async fn list_pricing_scenarios(&self) -> Result<Vec<PricingScenario>, RepositoryError> {
        self.inner.list_pricing_scenarios().await
    }

    async fn create_quote(
        &self,
        quote: NewSavedQuote,
    ) -> Result<SavedQuote, RepositoryError> {
        self.inner.create_quote(quote).await
    }

    async fn get_quote(
        &self,
        id: i64,
    ) -> Result<SavedQuote, RepositoryError> {
        self.inner.get_quote(id).await
    }

    async fn update_quote(
        &self,
        quote: &SavedQuote,
    ) -> Result<(), RepositoryError> {
        self.inner.update_quote(quote).await
    }

    async fn delete_quote(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        self.inner.delete_quote(id).await
    }

    async fn list_quotes(
        &self,
        use_case_id: Option<i64>,
    ) -> Result<Vec<SavedQuote>, RepositoryError> {
        self.inner.list_quotes(use_case_id).await
    }

    async fn record_event(
        &self,
        event: NewAnalyticsEvent,
    ) -> Result<(), RepositoryError> {
        self.inner.record_event(event).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::db::testing::MemoryRepository;
    use crate::models::{EquipmentAttachment, NewEquipmentTemplate};

    fn cached(ttl: Duration) -> (CachedQuoteRepository, Arc<std::sync::atomic::AtomicUsize>) {
        let inner = MemoryRepository::seeded();
        let calls = inner.calls.clone();
        (CachedQuoteRepository::with_ttl(Box::new(inner), ttl), calls)
    }

    #[tokio::test]
    async fn repeated_lookups_hit_the_cache() {
        let (repo, calls) = cached(DEFAULT_CACHE_TTL);

        let first = repo.get_use_case("car-wash").await.unwrap();
        let second = repo.get_use_case("car-wash").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn keys_are_per_argument() {
        let (repo, calls) = cached(DEFAULT_CACHE_TTL);

        repo.list_use_cases(true).await.unwrap();
        repo.list_use_cases(false).await.unwrap();
        repo.list_use_cases(true).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn expired_entries_are_reloaded() {
        let (repo, calls) = cached(Duration::ZERO);

        repo.get_default_pricing().await.unwrap();
        repo.get_default_pricing().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let (repo, calls) = cached(DEFAULT_CACHE_TTL);

        assert_eq!(repo.get_use_case("nope").await, Err(RepositoryError::NotFound));
        assert_eq!(repo.get_use_case("nope").await, Err(RepositoryError::NotFound));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(repo.is_empty().await);
    }

    fn ice_machine_for(use_case_id: i64) -> CategoryEntry {
        CategoryEntry {
            template: NewEquipmentTemplate {
                name: "ice_machine".to_string(),
                category: "kitchen".to_string(),
                nameplate_kw: dec!(3),
                duty_cycle: dec!(0.6),
                description: None,
            },
            attach_to: Some(EquipmentAttachment {
                use_case_id,
                quantity: dec!(2),
            }),
        }
    }

    #[tokio::test]
    async fn catalog_writes_invalidate() {
        let (repo, _) = cached(DEFAULT_CACHE_TTL);
        assert!(repo.list_use_case_equipment(1).await.unwrap().is_empty());
        assert!(repo.list_equipment_templates(Some("kitchen")).await.unwrap().is_empty());

        repo.replace_equipment_category("kitchen", &[ice_machine_for(1)])
            .await
            .unwrap();

        let equipment = repo.list_use_case_equipment(1).await.unwrap();
        assert_eq!(equipment.len(), 1);
        assert_eq!(equipment[0].template.name, "ice_machine");
        assert_eq!(repo.list_equipment_templates(Some("kitchen")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn load_racing_a_catalog_write_is_not_stored() {
        let (repo, calls) = cached(DEFAULT_CACHE_TTL);

        // The list is read, then the catalog changes before the result lands.
        let stale = repo
            .get_or_load("equipment:1".to_string(), async {
                let before = repo.inner.list_use_case_equipment(1).await?;
                repo.replace_equipment_category("kitchen", &[ice_machine_for(1)])
                    .await?;
                Ok::<_, RepositoryError>(before)
            })
            .await
            .unwrap();
        assert!(stale.is_empty());
        assert!(repo.is_empty().await);

        let calls_before = calls.load(Ordering::SeqCst);
        let fresh = repo.list_use_case_equipment(1).await.unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), calls_before + 1);
    }

    #[tokio::test]
    async fn failed_replacement_keeps_entries() {
        let (repo, _) = cached(DEFAULT_CACHE_TTL);
        repo.replace_equipment_category("kitchen", &[ice_machine_for(1)])
            .await
            .unwrap();
        repo.list_use_case_equipment(1).await.unwrap();

        // ice_machine already belongs to kitchen
        let mut clash = ice_machine_for(1);
        clash.template.category = "bar".to_string();
        let result = repo.replace_equipment_category("bar", &[clash]).await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn quotes_bypass_the_cache() {
        let (repo, calls) = cached(DEFAULT_CACHE_TTL);

        repo.list_quotes(None).await.unwrap();
        repo.list_quotes(None).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(repo.is_empty().await);
    }
}
