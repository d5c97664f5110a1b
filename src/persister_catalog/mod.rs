pub mod catalog;
pub mod config;
pub mod errors;
pub mod fragments;
pub mod persister;

// Re-export commonly used types
pub use catalog::{AssociationCatalog, MappingCatalog};
pub use config::{load_catalog, MappingConfig};
pub use errors::MappingError;
pub use fragments::EnabledFilters;
pub use persister::{
    qualify, AssociationMapping, Cardinality, CollectionElement, CollectionPersister,
    ComponentMapping, EntityPersister, FetchStyle,
};
