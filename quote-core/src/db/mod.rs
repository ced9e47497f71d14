pub mod cache;
pub mod factory;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::CachedQuoteRepository;
pub use factory::{DbConfig, RepositoryFactory, RepositoryRegistry};
pub use repository::{QuoteRepository, RepositoryError};
