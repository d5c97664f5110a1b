use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declared shape of an association between two persistent types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    ManyToOne,
    OneToOne,
    OneToMany,
    ManyToMany,
    ElementCollection,
}

impl Cardinality {
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            Cardinality::OneToMany | Cardinality::ManyToMany | Cardinality::ElementCollection
        )
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cardinality::ManyToOne => "many-to-one",
            Cardinality::OneToOne => "one-to-one",
            Cardinality::OneToMany => "one-to-many",
            Cardinality::ManyToMany => "many-to-many",
            Cardinality::ElementCollection => "element-collection",
        };
        write!(f, "{}", name)
    }
}

/// Mapping-level fetch configuration of an association.
///
/// - `Join`: always fetched eagerly by joining
/// - `Select`: never joined, loaded by a later select
/// - `Default`: to-one associations are joined unless their target entity is
///   lazy (proxied); collections are never joined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStyle {
    Join,
    Select,
    #[default]
    Default,
}

fn default_nullable() -> bool {
    true
}

/// One named association of an entity.
///
/// `target` is an entity name for to-one associations and a collection role for
/// collection-valued ones. `columns` are the foreign-key columns on the owner's
/// table; a one-to-one without columns shares the owner's primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationMapping {
    pub property: String,
    pub cardinality: Cardinality,
    pub target: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub fetch: FetchStyle,
}

impl AssociationMapping {
    pub fn is_collection(&self) -> bool {
        self.cardinality.is_collection()
    }
}

/// Read-only metadata for an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPersister {
    pub name: String,
    pub table: String,
    pub key_columns: Vec<String>,
    /// Non-key columns, in select order
    #[serde(default)]
    pub columns: Vec<String>,
    /// Whether references to this entity are proxied (lazy) by default
    #[serde(default)]
    pub lazy: bool,
    /// Filter name -> condition template (`{alias}` placeholder, `:param` parameters)
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default)]
    pub associations: Vec<AssociationMapping>,
    /// Embedded values stored in this entity's table
    #[serde(default)]
    pub components: Vec<ComponentMapping>,
}

impl EntityPersister {
    /// Key columns, property columns, then component columns, without repeats.
    pub fn selectable_columns(&self) -> Vec<String> {
        let mut result = self.key_columns.clone();
        let mut push = |column: &String| {
            if !result.contains(column) {
                result.push(column.clone());
            }
        };
        self.columns.iter().for_each(&mut push);
        for component in &self.components {
            component.for_each_column(&mut push);
        }
        result
    }

    /// Every association of the entity with its dotted property path, component
    /// associations included (`billing.country`).
    pub fn all_associations(&self) -> Vec<(String, &AssociationMapping)> {
        let mut result: Vec<(String, &AssociationMapping)> = self
            .associations
            .iter()
            .map(|a| (a.property.clone(), a))
            .collect();
        for component in &self.components {
            component.collect_associations("", &mut result);
        }
        result
    }
}

/// An embedded value mapped onto its owner's table.
///
/// Associations declared inside a component are joined from the owner's alias;
/// their property paths are prefixed with the component's property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMapping {
    pub property: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub associations: Vec<AssociationMapping>,
    #[serde(default)]
    pub components: Vec<ComponentMapping>,
}

impl ComponentMapping {
    fn for_each_column<F: FnMut(&String)>(&self, f: &mut F) {
        self.columns.iter().for_each(&mut *f);
        for nested in &self.components {
            nested.for_each_column(f);
        }
    }

    fn collect_associations<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a AssociationMapping)>) {
        let path = qualify(prefix, &self.property);
        out.extend(
            self.associations
                .iter()
                .map(|a| (qualify(&path, &a.property), a)),
        );
        for nested in &self.components {
            nested.collect_associations(&path, out);
        }
    }
}

/// `prefix.property`, or `property` alone at the top level.
pub fn qualify(prefix: &str, property: &str) -> String {
    if prefix.is_empty() {
        property.to_string()
    } else {
        format!("{}.{}", prefix, property)
    }
}

/// What a collection holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectionElement {
    /// Values stored in the collection table. Composite elements may also hold
    /// to-one `associations` whose foreign keys live in the collection table.
    Values {
        columns: Vec<String>,
        #[serde(default)]
        associations: Vec<AssociationMapping>,
    },
    /// Entities whose own table carries the collection key
    OneToMany { entity: String },
    /// Entities reached through a join table; `columns` reference the element key
    ManyToMany {
        entity: String,
        columns: Vec<String>,
        #[serde(default)]
        fetch: FetchStyle,
    },
}

/// Read-only metadata for a collection role such as `Order.lines`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionPersister {
    pub role: String,
    pub owner: String,
    pub table: String,
    /// Columns of `table` referencing the owner's key
    pub key_columns: Vec<String>,
    pub element: CollectionElement,
    /// Ordering template applied against the collection table alias
    #[serde(default)]
    pub order_by: Option<String>,
    /// Ordering template applied against the many-to-many element alias
    #[serde(default)]
    pub many_to_many_order_by: Option<String>,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    /// Filters applied against the many-to-many element alias
    #[serde(default)]
    pub many_to_many_filters: BTreeMap<String, String>,
}

impl CollectionPersister {
    pub fn is_one_to_many(&self) -> bool {
        matches!(self.element, CollectionElement::OneToMany { .. })
    }

    pub fn is_many_to_many(&self) -> bool {
        matches!(self.element, CollectionElement::ManyToMany { .. })
    }

    pub fn element_entity(&self) -> Option<&str> {
        match &self.element {
            CollectionElement::Values { .. } => None,
            CollectionElement::OneToMany { entity } => Some(entity),
            CollectionElement::ManyToMany { entity, .. } => Some(entity),
        }
    }

    /// The cardinality an owning association must declare to reference this role.
    pub fn cardinality(&self) -> Cardinality {
        match self.element {
            CollectionElement::Values { .. } => Cardinality::ElementCollection,
            CollectionElement::OneToMany { .. } => Cardinality::OneToMany,
            CollectionElement::ManyToMany { .. } => Cardinality::ManyToMany,
        }
    }

    /// Columns of the collection table selected for the collection itself:
    /// the key plus any element columns stored there.
    pub fn collection_columns(&self) -> Vec<String> {
        let mut result = self.key_columns.clone();
        let element_columns: &[String] = match &self.element {
            CollectionElement::Values { columns, .. } => columns,
            CollectionElement::ManyToMany { columns, .. } => columns,
            CollectionElement::OneToMany { .. } => &[],
        };
        let reference_columns = self
            .element_associations()
            .iter()
            .flat_map(|a| a.columns.iter());
        for column in element_columns.iter().chain(reference_columns) {
            if !result.contains(column) {
                result.push(column.clone());
            }
        }
        result
    }

    /// To-one references held by composite elements.
    pub fn element_associations(&self) -> &[AssociationMapping] {
        match &self.element {
            CollectionElement::Values { associations, .. } => associations,
            _ => &[],
        }
    }
}
