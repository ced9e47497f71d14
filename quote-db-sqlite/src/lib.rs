//! SQLite backend for the quote repository.

pub mod decimal;
pub mod factory;
pub mod repository;

pub use factory::SqliteRepositoryFactory;
pub use repository::SqliteRepository;
