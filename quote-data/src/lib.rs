pub mod loader;

pub use loader::{CatalogLoaderError, EquipmentCatalogLoader, EquipmentRecord, LoadSummary};
