use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use quote_core::db::repository::{QuoteRepository, RepositoryError};
use quote_core::db::{DbConfig, RepositoryFactory};

use crate::repository::SqliteRepository;

pub const SEEDS_DIR_ENV: &str = "QUOTE_DB_SQLITE_SEEDS_DIR";

/// Resolution order:
/// 1. `QUOTE_DB_SQLITE_SEEDS_DIR` when set.
/// 2. `./seeds` if it exists in the working directory.
/// 3. `$CARGO_MANIFEST_DIR/seeds` for runs from the build tree.
pub fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(SEEDS_DIR_ENV) {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// [`RepositoryFactory`] for SQLite.
///
/// ```rust,no_run
/// use quote_core::db::RepositoryRegistry;
/// use quote_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Opens `config.connection_string` (a file path, a `sqlite:` URL or
    /// `:memory:`), migrates it and applies any seed files it has not seen.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn QuoteRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{:#}", e)))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{:#}", e)))?;

        let seeds = seeds_dir();
        debug!(dir = %seeds.display(), "loading seeds");
        repo.run_seeds(&seeds)
            .await
            .map_err(|e| RepositoryError::Database(format!("{:#}", e)))?;
        Ok(Box::new(repo))
    }
}
