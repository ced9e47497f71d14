//! Backend selection for the quote catalog.
//!
//! The core never names a database. Backend crates hand a
//! [`RepositoryFactory`] to the binary, which registers it and asks the
//! [`RepositoryRegistry`] for a cached repository by backend name.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::cache::CachedQuoteRepository;
use super::repository::{QuoteRepository, RepositoryError};

/// Where the use cases, questions, equipment catalog and saved quotes live.
///
/// | backend  | connection_string                                    |
/// |----------|------------------------------------------------------|
/// | `sqlite` | `quotes.db`, `sqlite:quotes.db?mode=rwc`, `:memory:` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

impl DbConfig {
    /// Backend key as factories register it.
    pub fn backend_key(&self) -> String {
        self.backend.trim().to_ascii_lowercase()
    }
}

#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Lowercase registry key.
    fn backend_name(&self) -> &'static str;

    /// Returns a repository whose schema is current and whose seed catalog
    /// has been applied.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn QuoteRepository>, RepositoryError>;
}

#[derive(Default)]
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A later factory with the same name wins.
    pub fn register(
        &mut self,
        factory: Box<dyn RepositoryFactory>,
    ) {
        debug!(backend = factory.backend_name(), "quote backend registered");
        self.factories.insert(factory.backend_name(), factory);
    }

    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens the backend named in `config`, uncached.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Configuration`] for an unregistered backend, or the
    /// factory's own error.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn QuoteRepository>, RepositoryError> {
        let key = config.backend_key();
        let Some(factory) = self.factories.get(key.as_str()) else {
            return Err(RepositoryError::Configuration(format!(
                "unknown quote backend '{}'; registered: {}",
                config.backend,
                self.available_backends().join(", ")
            )));
        };

        info!(backend = %key, "opening quote catalog");
        factory.create(config).await
    }

    /// Opens the backend behind a lookup cache with `cache_ttl`.
    ///
    /// A catalog without any active use case still opens, with a warning,
    /// since saved quotes and sessions remain usable.
    pub async fn open(
        &self,
        config: &DbConfig,
        cache_ttl: Duration,
    ) -> Result<CachedQuoteRepository, RepositoryError> {
        let repo = CachedQuoteRepository::with_ttl(self.create(config).await?, cache_ttl);
        let active = repo.list_use_cases(true).await?;
        if active.is_empty() {
            warn!(
                backend = %config.backend_key(),
                "quote catalog has no active use cases; apply the seeds or load a catalog"
            );
        } else {
            debug!(use_cases = active.len(), "quote catalog ready");
        }
        Ok(repo)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::cache::DEFAULT_CACHE_TTL;
    use crate::db::testing::MemoryRepository;

    /// Counts how often it was asked to open a catalog.
    struct MemoryFactory {
        name: &'static str,
        seeded: bool,
        opened: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RepositoryFactory for MemoryFactory {
        fn backend_name(&self) -> &'static str {
            self.name
        }

        async fn create(
            &self,
            _config: &DbConfig,
        ) -> Result<Box<dyn QuoteRepository>, RepositoryError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(if self.seeded {
                MemoryRepository::seeded()
            } else {
                MemoryRepository::default()
            }))
        }
    }

    struct UnreachableFactory;

    #[async_trait]
    impl RepositoryFactory for UnreachableFactory {
        fn backend_name(&self) -> &'static str {
            "remote"
        }

        async fn create(
            &self,
            config: &DbConfig,
        ) -> Result<Box<dyn QuoteRepository>, RepositoryError> {
            Err(RepositoryError::Connection(format!(
                "cannot reach {}",
                config.connection_string
            )))
        }
    }

    fn registry_with(
        name: &'static str,
        seeded: bool,
    ) -> (RepositoryRegistry, Arc<AtomicUsize>) {
        let opened = Arc::new(AtomicUsize::new(0));
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(MemoryFactory {
            name,
            seeded,
            opened: opened.clone(),
        }));
        (registry, opened)
    }

    fn config(backend: &str) -> DbConfig {
        DbConfig {
            backend: backend.to_string(),
            ..DbConfig::default()
        }
    }

    #[test]
    fn default_config_is_in_memory_sqlite() {
        assert_eq!(DbConfig::default().backend_key(), "sqlite");
        assert_eq!(DbConfig::default().connection_string, ":memory:");
    }

    #[test]
    fn backends_are_listed_sorted_and_deduplicated() {
        let (mut registry, _) = registry_with("sqlite", true);
        registry.register(Box::new(UnreachableFactory));
        registry.register(Box::new(MemoryFactory {
            name: "sqlite",
            seeded: false,
            opened: Arc::new(AtomicUsize::new(0)),
        }));

        assert_eq!(registry.available_backends(), vec!["remote", "sqlite"]);
    }

    #[tokio::test]
    async fn backend_name_is_matched_case_insensitively() {
        let (registry, opened) = registry_with("sqlite", true);

        let repo = registry.create(&config(" SQLite ")).await.unwrap();

        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(repo.get_use_case("car-wash").await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn unknown_backend_lists_registered_ones() {
        let (registry, opened) = registry_with("sqlite", true);

        let result = registry.create(&config("postgres")).await;

        let Err(RepositoryError::Configuration(msg)) = result else {
            panic!("expected a configuration error");
        };
        assert_eq!(msg, "unknown quote backend 'postgres'; registered: sqlite");
        assert_eq!(opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn factory_errors_pass_through() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(UnreachableFactory));
        let config = DbConfig {
            backend: "remote".to_string(),
            connection_string: "db.internal:5432".to_string(),
        };

        let result = registry.open(&config, DEFAULT_CACHE_TTL).await;

        assert!(matches!(
            result,
            Err(RepositoryError::Connection(ref msg)) if msg == "cannot reach db.internal:5432"
        ));
    }

    #[tokio::test]
    async fn open_returns_a_warm_cache() {
        let (registry, _) = registry_with("sqlite", true);

        let repo = registry.open(&config("sqlite"), DEFAULT_CACHE_TTL).await.unwrap();

        // the readiness check already cached the active use case list
        assert_eq!(repo.len().await, 1);
        assert_eq!(repo.list_use_cases(true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_catalog_still_opens() {
        let (registry, _) = registry_with("sqlite", false);

        let repo = registry.open(&config("sqlite"), DEFAULT_CACHE_TTL).await.unwrap();

        assert!(repo.list_use_cases(true).await.unwrap().is_empty());
    }
}
