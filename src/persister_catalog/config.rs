/// Mapping file loading.
///
/// Persister metadata can be supplied as YAML:
///
/// ```yaml
/// name: shop                        # Optional mapping name
/// entities:
///   - name: Order
///     table: orders
///     key_columns: [id]
///     columns: [placed_at, customer_id]
///     filters:
///       tenant: "{alias}.tenant_id = :tenantId"
///     associations:
///       - property: customer
///         cardinality: many_to_one
///         target: Customer
///         columns: [customer_id]
///         nullable: false
///       - property: lines
///         cardinality: one_to_many
///         target: Order.lines       # collection role
///         fetch: join
/// collections:
///   - role: Order.lines
///     owner: Order
///     table: order_lines
///     key_columns: [order_id]
///     element: { kind: one_to_many, entity: OrderLine }
///     order_by: "{alias}.line_no asc"
/// ```
///
/// Loading validates the whole catalog (see [`MappingCatalog::validate`]).
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::catalog::MappingCatalog;
use super::errors::MappingError;
use super::persister::{CollectionPersister, EntityPersister};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub entities: Vec<EntityPersister>,
    #[serde(default)]
    pub collections: Vec<CollectionPersister>,
}

impl MappingConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, MappingError> {
        serde_yaml::from_str(content).map_err(|e| MappingError::MappingParseError {
            error: e.to_string(),
        })
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, MappingError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| MappingError::MappingReadError {
            error: format!("{}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Build and validate the catalog described by this configuration.
    pub fn into_catalog(self) -> Result<MappingCatalog, MappingError> {
        let mut catalog = MappingCatalog::new();

        for entity in self.entities {
            if catalog.entity_names().contains(&entity.name.as_str()) {
                return Err(MappingError::InvalidMapping {
                    message: format!("entity `{}` is declared twice", entity.name),
                });
            }
            catalog.insert_entity(entity);
        }

        for collection in self.collections {
            if catalog.collection_roles().contains(&collection.role.as_str()) {
                return Err(MappingError::InvalidMapping {
                    message: format!("collection role `{}` is declared twice", collection.role),
                });
            }
            catalog.insert_collection(collection);
        }

        catalog.validate()?;
        log::debug!(
            "Loaded mapping {:?}: {} entities, {} collections",
            self.name,
            catalog.entity_names().len(),
            catalog.collection_roles().len()
        );
        Ok(catalog)
    }
}

/// Read, parse and validate a mapping file in one step.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<MappingCatalog, MappingError> {
    MappingConfig::from_yaml_file(path)?.into_catalog()
}
