use std::collections::HashMap;
use std::fmt;

use super::errors::MappingError;
use super::persister::{AssociationMapping, CollectionPersister, EntityPersister};

/// Source of persister metadata consumed by the walkers.
///
/// Implementations must be immutable for the lifetime of the loaders built from
/// them; the walkers cache compiled statements keyed only by names.
pub trait AssociationCatalog: Send + Sync + fmt::Debug {
    fn entity(&self, name: &str) -> Option<&EntityPersister>;

    fn collection(&self, role: &str) -> Option<&CollectionPersister>;

    fn require_entity(&self, name: &str) -> Result<&EntityPersister, MappingError> {
        self.entity(name).ok_or_else(|| MappingError::UnknownEntity {
            entity: name.to_string(),
        })
    }

    fn require_collection(&self, role: &str) -> Result<&CollectionPersister, MappingError> {
        self.collection(role)
            .ok_or_else(|| MappingError::UnknownCollection {
                role: role.to_string(),
            })
    }
}

/// In-memory catalog, usually built from a [`super::config::MappingConfig`].
#[derive(Debug, Clone, Default)]
pub struct MappingCatalog {
    entities: HashMap<String, EntityPersister>,
    collections: HashMap<String, CollectionPersister>,
}

impl MappingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, persister: EntityPersister) -> Self {
        self.insert_entity(persister);
        self
    }

    pub fn with_collection(mut self, persister: CollectionPersister) -> Self {
        self.insert_collection(persister);
        self
    }

    pub fn insert_entity(&mut self, persister: EntityPersister) {
        self.entities.insert(persister.name.clone(), persister);
    }

    pub fn insert_collection(&mut self, persister: CollectionPersister) {
        self.collections.insert(persister.role.clone(), persister);
    }

    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn collection_roles(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = self.collections.keys().map(String::as_str).collect();
        roles.sort_unstable();
        roles
    }

    /// Check that every reference in the catalog resolves and has a usable shape.
    ///
    /// Walk-time validation still happens per edge; this catches defects up front
    /// so a bad mapping file fails at load instead of at first use.
    pub fn validate(&self) -> Result<(), MappingError> {
        for name in self.entity_names() {
            let entity = self.require_entity(name)?;
            if entity.key_columns.is_empty() {
                return Err(MappingError::MissingKeyColumns {
                    entity: entity.name.clone(),
                });
            }

            for (path, association) in entity.all_associations() {
                self.validate_association(&entity.name, &path, association)?;
            }
        }

        for role in self.collection_roles() {
            let collection = self.require_collection(role)?;
            let context = format!("collection `{}`", collection.role);
            if self.entity(&collection.owner).is_none() {
                return Err(MappingError::entity_error_with_context(&collection.owner, &context));
            }
            if let Some(element) = collection.element_entity() {
                if self.entity(element).is_none() {
                    return Err(MappingError::entity_error_with_context(element, &context));
                }
            }
            for association in collection.element_associations() {
                if association.is_collection() {
                    return Err(MappingError::UnsupportedCardinality {
                        property: format!("{}.{}", collection.role, association.property),
                        cardinality: association.cardinality,
                        target: association.target.clone(),
                    });
                }
                self.validate_association(&collection.role, &association.property, association)?;
            }
        }

        Ok(())
    }

    fn validate_association(
        &self,
        owner: &str,
        path: &str,
        association: &AssociationMapping,
    ) -> Result<(), MappingError> {
        let context = format!("association `{}.{}`", owner, path);
        let unsupported = || MappingError::UnsupportedCardinality {
            property: format!("{}.{}", owner, path),
            cardinality: association.cardinality,
            target: association.target.clone(),
        };

        if association.is_collection() {
            let collection = self.collection(&association.target).ok_or_else(|| {
                MappingError::collection_error_with_context(&association.target, &context)
            })?;
            if collection.cardinality() != association.cardinality {
                return Err(unsupported());
            }
        } else if self.entity(&association.target).is_none() {
            if self.collection(&association.target).is_some() {
                return Err(unsupported());
            }
            return Err(MappingError::entity_error_with_context(
                &association.target,
                &context,
            ));
        }
        Ok(())
    }
}

impl AssociationCatalog for MappingCatalog {
    fn entity(&self, name: &str) -> Option<&EntityPersister> {
        self.entities.get(name)
    }

    fn collection(&self, role: &str) -> Option<&CollectionPersister> {
        self.collections.get(role)
    }
}
