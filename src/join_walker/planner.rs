//! Association graph walk.
//!
//! [`JoinPlanner`] walks the association graph depth-first from a root entity or
//! collection role and decides, edge by edge, what to fetch in the same statement:
//!
//! 1. lazily fetched associations are skipped, except the requested fetch role
//! 2. the [`JoinTypeResolver`] picks INNER / LEFT OUTER / NONE
//! 3. the [`DuplicateAssociationGuard`] rejects foreign keys already joined
//! 4. the edge is appended, then the walk descends into its target
//!
//! A branch stops descending when its target type is already on the current
//! path, so cyclic mappings produce a finite plan even without a depth limit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::association::{
    AssociationEdge, AssociationKey, JoinColumn, JoinPlan, JoinType, ManyToManyFragments,
    PlanRoot, RootKind, SelectShape,
};
use super::duplicate_guard::{
    DuplicateAssociationGuard, OneToManyGuard, VisitedAssociations, VisitedKeyGuard,
};
use super::join_type::{
    CollectionRootResolver, FetchLimits, JoinCandidate, JoinTypeResolver, OuterJoinResolver,
    WalkPath,
};
use crate::persister_catalog::fragments::{self, ALIAS_PLACEHOLDER};
use crate::persister_catalog::{
    qualify, AssociationCatalog, AssociationMapping, Cardinality, CollectionElement,
    CollectionPersister, ComponentMapping, EnabledFilters, EntityPersister, FetchStyle,
    MappingError,
};
use crate::sql_render::alias::AliasAllocator;

/// What a loader is rooted at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoadRoot {
    Entity(String),
    Collection(String),
}

impl LoadRoot {
    pub fn entity(name: impl Into<String>) -> Self {
        LoadRoot::Entity(name.into())
    }

    pub fn collection(role: impl Into<String>) -> Self {
        LoadRoot::Collection(role.into())
    }

    pub fn name(&self) -> &str {
        match self {
            LoadRoot::Entity(name) => name,
            LoadRoot::Collection(role) => role,
        }
    }
}

impl fmt::Display for LoadRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadRoot::Entity(name) => write!(f, "entity {}", name),
            LoadRoot::Collection(role) => write!(f, "collection {}", role),
        }
    }
}

/// The two rules that distinguish one walker variant from another.
#[derive(Debug)]
pub struct WalkStrategy {
    name: &'static str,
    resolver: Box<dyn JoinTypeResolver>,
    guard: Box<dyn DuplicateAssociationGuard>,
}

impl WalkStrategy {
    pub fn new(
        name: &'static str,
        resolver: Box<dyn JoinTypeResolver>,
        guard: Box<dyn DuplicateAssociationGuard>,
    ) -> Self {
        WalkStrategy {
            name,
            resolver,
            guard,
        }
    }

    pub fn entity(limits: FetchLimits) -> Self {
        Self::new(
            "entity",
            Box::new(OuterJoinResolver::new(limits)),
            Box::new(VisitedKeyGuard),
        )
    }

    pub fn many_to_many(limits: FetchLimits) -> Self {
        Self::new(
            "many-to-many",
            Box::new(CollectionRootResolver::new(limits)),
            Box::new(VisitedKeyGuard),
        )
    }

    pub fn collection_of_values(limits: FetchLimits) -> Self {
        Self::new(
            "collection-of-values",
            Box::new(CollectionRootResolver::new(limits)),
            Box::new(VisitedKeyGuard),
        )
    }

    pub fn one_to_many(limits: FetchLimits, collection: &CollectionPersister) -> Self {
        Self::new(
            "one-to-many",
            Box::new(OuterJoinResolver::new(limits)),
            Box::new(OneToManyGuard::new(&collection.table, &collection.key_columns)),
        )
    }

    /// The walker variant matching a collection's element kind.
    pub fn for_collection(limits: FetchLimits, collection: &CollectionPersister) -> Self {
        match collection.element {
            CollectionElement::OneToMany { .. } => Self::one_to_many(limits, collection),
            CollectionElement::ManyToMany { .. } => Self::many_to_many(limits),
            CollectionElement::Values { .. } => Self::collection_of_values(limits),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Where the walk continues after an edge has been appended.
enum NextWalk<'c> {
    Entity(&'c EntityPersister),
    ManyToManyElement(&'c CollectionPersister),
    CompositeElement(&'c CollectionPersister),
    Stop,
}

/// The table an association's foreign key is read from: an entity, or the
/// collection table of a composite element.
struct OwnerSide<'c> {
    name: &'c str,
    table: &'c str,
    key_columns: &'c [String],
    composite_element: bool,
}

impl<'c> OwnerSide<'c> {
    fn entity(entity: &'c EntityPersister) -> Self {
        OwnerSide {
            name: &entity.name,
            table: &entity.table,
            key_columns: &entity.key_columns,
            composite_element: false,
        }
    }

    fn composite_element(collection: &'c CollectionPersister) -> Self {
        OwnerSide {
            name: &collection.role,
            table: &collection.table,
            key_columns: &[],
            composite_element: true,
        }
    }
}

/// Everything known about an edge's target before it is appended.
struct EdgeTarget<'c> {
    name: String,
    table: String,
    join_columns: Vec<JoinColumn>,
    key: AssociationKey,
    shape: SelectShape,
    filter_templates: Vec<&'c BTreeMap<String, String>>,
    order_template: Option<&'c str>,
    next: NextWalk<'c>,
}

struct PendingEdge<'a, 'c> {
    property_path: &'a str,
    cardinality: Cardinality,
    nullable: bool,
    join_type: JoinType,
    depth: usize,
    many_to_many_role: Option<&'a str>,
    synthetic_owner: bool,
    target: &'a EdgeTarget<'c>,
}

/// Per-invocation accumulator; nothing here outlives one `plan` call.
struct WalkState<'r> {
    filters: &'r EnabledFilters,
    fetch_role: Option<&'r str>,
    edges: Vec<AssociationEdge>,
    visited: VisitedAssociations,
    aliases: AliasAllocator,
    many_to_many: Vec<ManyToManyFragments>,
}

impl<'r> WalkState<'r> {
    fn new(filters: &'r EnabledFilters, fetch_role: Option<&'r str>) -> Self {
        WalkState {
            filters,
            fetch_role,
            edges: Vec::new(),
            visited: VisitedAssociations::new(),
            aliases: AliasAllocator::new(),
            many_to_many: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct JoinPlanner<'c> {
    catalog: &'c dyn AssociationCatalog,
    strategy: WalkStrategy,
}

impl<'c> JoinPlanner<'c> {
    pub fn new(catalog: &'c dyn AssociationCatalog, strategy: WalkStrategy) -> Self {
        JoinPlanner { catalog, strategy }
    }

    /// Planner using the walker variant appropriate for `root`.
    pub fn for_root(
        catalog: &'c dyn AssociationCatalog,
        root: &LoadRoot,
        limits: FetchLimits,
    ) -> Result<Self, MappingError> {
        let strategy = match root {
            LoadRoot::Entity(_) => WalkStrategy::entity(limits),
            LoadRoot::Collection(role) => {
                WalkStrategy::for_collection(limits, catalog.require_collection(role)?)
            }
        };
        Ok(Self::new(catalog, strategy))
    }

    pub fn strategy(&self) -> &WalkStrategy {
        &self.strategy
    }

    pub fn plan(&self, root: &LoadRoot, filters: &EnabledFilters) -> Result<JoinPlan, MappingError> {
        self.plan_with_fetch_role(root, filters, None)
    }

    /// Plan a walk that also joins the association at `fetch_role` (a dotted
    /// property path from the root) even when it is mapped as lazy.
    pub fn plan_with_fetch_role(
        &self,
        root: &LoadRoot,
        filters: &EnabledFilters,
        fetch_role: Option<&str>,
    ) -> Result<JoinPlan, MappingError> {
        let mut state = WalkState::new(filters, fetch_role);

        let plan_root = match root {
            LoadRoot::Entity(name) => self.plan_entity_root(&mut state, name)?,
            LoadRoot::Collection(role) => self.plan_collection_root(&mut state, role)?,
        };

        log::debug!(
            "Planned {} ({} walker): {} edge(s)",
            root,
            self.strategy.name,
            state.edges.len()
        );

        Ok(JoinPlan {
            root: plan_root,
            edges: state.edges,
            many_to_many: state.many_to_many,
        })
    }

    fn plan_entity_root(&self, state: &mut WalkState<'_>, name: &str) -> Result<PlanRoot, MappingError> {
        let entity = self.catalog.require_entity(name)?;
        let alias = state.aliases.root_alias(&entity.name);

        let root = PlanRoot {
            kind: RootKind::Entity,
            name: entity.name.clone(),
            alias: alias.clone(),
            table: entity.table.clone(),
            key_columns: entity.key_columns.clone(),
            shape: SelectShape::Entity {
                columns: entity.selectable_columns(),
            },
            filter_fragment: fragments::filter_fragment(&entity.filters, state.filters, &alias),
            order_fragment: None,
        };

        let mut path = WalkPath::new(Some(&entity.name));
        self.walk_entity(state, entity, &alias, &mut path)?;
        Ok(root)
    }

    fn plan_collection_root(
        &self,
        state: &mut WalkState<'_>,
        role: &str,
    ) -> Result<PlanRoot, MappingError> {
        let collection = self.catalog.require_collection(role)?;
        let alias = state.aliases.root_alias(&collection.role);
        let order_fragment = collection
            .order_by
            .as_deref()
            .map(|t| fragments::render_template(t, &alias));

        match &collection.element {
            CollectionElement::OneToMany { entity } => {
                let element = self.require_entity(entity, &collection.role)?;
                let root = PlanRoot {
                    kind: RootKind::OneToMany,
                    name: collection.role.clone(),
                    alias: alias.clone(),
                    table: collection.table.clone(),
                    key_columns: collection.key_columns.clone(),
                    shape: SelectShape::CollectionOfEntities {
                        collection_columns: collection.collection_columns(),
                        entity_columns: element.selectable_columns(),
                    },
                    filter_fragment: fragments::combined_filter_fragment(
                        &[&collection.filters, &element.filters],
                        state.filters,
                        &alias,
                    ),
                    order_fragment,
                };

                let mut path = WalkPath::new(Some(&element.name));
                self.walk_entity(state, element, &alias, &mut path)?;
                Ok(root)
            }
            CollectionElement::ManyToMany { .. } | CollectionElement::Values { .. } => {
                let kind = if collection.is_many_to_many() {
                    RootKind::ManyToMany
                } else {
                    RootKind::CollectionOfValues
                };
                let root = PlanRoot {
                    kind,
                    name: collection.role.clone(),
                    alias: alias.clone(),
                    table: collection.table.clone(),
                    key_columns: collection.key_columns.clone(),
                    shape: SelectShape::Collection {
                        columns: collection.collection_columns(),
                    },
                    filter_fragment: fragments::filter_fragment(
                        &collection.filters,
                        state.filters,
                        &alias,
                    ),
                    order_fragment,
                };

                let mut path = WalkPath::new(None);
                if collection.is_many_to_many() {
                    self.walk_many_to_many_element(state, collection, &alias, &mut path)?;
                } else {
                    self.walk_composite_element(state, collection, &alias, &mut path)?;
                }
                self.append_owner_edge(state, collection, &alias)?;
                Ok(root)
            }
        }
    }

    fn walk_entity(
        &self,
        state: &mut WalkState<'_>,
        entity: &'c EntityPersister,
        alias: &str,
        path: &mut WalkPath,
    ) -> Result<(), MappingError> {
        let owner = OwnerSide::entity(entity);
        self.walk_properties(state, &owner, &entity.associations, "", alias, path)?;
        for component in &entity.components {
            self.walk_component(state, &owner, component, "", alias, path)?;
        }
        Ok(())
    }

    /// Component associations join from the owner's alias; only their property
    /// paths carry the component's name.
    fn walk_component(
        &self,
        state: &mut WalkState<'_>,
        owner: &OwnerSide<'c>,
        component: &'c ComponentMapping,
        prefix: &str,
        alias: &str,
        path: &mut WalkPath,
    ) -> Result<(), MappingError> {
        let prefix = qualify(prefix, &component.property);
        self.walk_properties(state, owner, &component.associations, &prefix, alias, path)?;
        for nested in &component.components {
            self.walk_component(state, owner, nested, &prefix, alias, path)?;
        }
        Ok(())
    }

    /// Join the references held by the composite elements of a collection
    /// whose table is aliased `collection_alias`.
    fn walk_composite_element(
        &self,
        state: &mut WalkState<'_>,
        collection: &'c CollectionPersister,
        collection_alias: &str,
        path: &mut WalkPath,
    ) -> Result<(), MappingError> {
        let owner = OwnerSide::composite_element(collection);
        self.walk_properties(
            state,
            &owner,
            collection.element_associations(),
            "",
            collection_alias,
            path,
        )
    }

    fn walk_properties(
        &self,
        state: &mut WalkState<'_>,
        owner: &OwnerSide<'c>,
        associations: &'c [AssociationMapping],
        prefix: &str,
        alias: &str,
        path: &mut WalkPath,
    ) -> Result<(), MappingError> {
        for association in associations {
            let property = qualify(prefix, &association.property);
            let property_path = path.property_path(&property);

            if owner.composite_element && association.is_collection() {
                return Err(MappingError::UnsupportedCardinality {
                    property: format!("{}.{}", owner.name, property),
                    cardinality: association.cardinality,
                    target: association.target.clone(),
                });
            }

            if !self.is_join_fetch_enabled(state, association, &property_path) {
                log::debug!("Skipping lazy association `{}`", property_path);
                continue;
            }

            let depth = path.depth();
            let candidate = JoinCandidate {
                property_path: &property_path,
                cardinality: association.cardinality,
                nullable: association.nullable,
                element_join: false,
            };
            let join_type = self.strategy.resolver.resolve(&candidate, path, depth);
            if join_type == JoinType::None {
                log::debug!("Not joining `{}` at depth {}", property_path, depth);
                continue;
            }

            let target = self.resolve_target(owner, association, &property, &property_path)?;
            if self.strategy.guard.is_duplicate(&target.key, &state.visited) {
                log::debug!(
                    "Skipping `{}`: foreign key {} already joined",
                    property_path,
                    target.key
                );
                continue;
            }

            let edge_alias = self.append_edge(
                state,
                alias,
                PendingEdge {
                    property_path: &property_path,
                    cardinality: association.cardinality,
                    nullable: association.nullable,
                    join_type,
                    depth,
                    many_to_many_role: None,
                    synthetic_owner: false,
                    target: &target,
                },
            );
            if association.is_collection() {
                path.record_collection_fetch();
            }

            self.descend(state, &target.next, &edge_alias, &property, join_type, path)?;
        }
        Ok(())
    }

    fn descend(
        &self,
        state: &mut WalkState<'_>,
        next: &NextWalk<'c>,
        alias: &str,
        property: &str,
        join_type: JoinType,
        path: &mut WalkPath,
    ) -> Result<(), MappingError> {
        match *next {
            NextWalk::Entity(entity) => {
                if path.contains_type(&entity.name) {
                    log::debug!(
                        "Not descending into `{}`: {} is already on the path",
                        path.property_path(property),
                        entity.name
                    );
                    return Ok(());
                }
                path.push(property, join_type, Some(&entity.name));
                let result = self.walk_entity(state, entity, alias, path);
                path.pop();
                result
            }
            NextWalk::ManyToManyElement(collection) => {
                path.push(property, join_type, None);
                let result = self.walk_many_to_many_element(state, collection, alias, path);
                path.pop();
                result
            }
            NextWalk::CompositeElement(collection) => {
                path.push(property, join_type, None);
                let result = self.walk_composite_element(state, collection, alias, path);
                path.pop();
                result
            }
            NextWalk::Stop => Ok(()),
        }
    }

    /// Join the element entity of a many-to-many collection whose join table is
    /// aliased `collection_alias`. At the root of a collection walk the path is
    /// empty and the join is treated as non-nullable.
    fn walk_many_to_many_element(
        &self,
        state: &mut WalkState<'_>,
        collection: &'c CollectionPersister,
        collection_alias: &str,
        path: &mut WalkPath,
    ) -> Result<(), MappingError> {
        let CollectionElement::ManyToMany {
            entity,
            columns,
            fetch,
        } = &collection.element
        else {
            return Err(MappingError::UnsupportedCardinality {
                property: collection.role.clone(),
                cardinality: Cardinality::ManyToMany,
                target: collection.role.clone(),
            });
        };
        let element = self.require_entity(entity, &collection.role)?;
        let root_level = path.depth() == 0;

        let target_fragments = ManyToManyFragments {
            role: collection.role.clone(),
            element_entity: element.name.clone(),
            collection_alias: collection_alias.to_string(),
            filter_template: fragments::filter_fragment(
                &collection.many_to_many_filters,
                state.filters,
                ALIAS_PLACEHOLDER,
            ),
            order_template: collection.many_to_many_order_by.clone(),
        };
        let has_fragments = target_fragments.filter_template.is_some()
            || target_fragments.order_template.is_some();

        let property_path = if root_level {
            collection.role.clone()
        } else {
            path.current_path()
        };

        let joined = self.join_many_to_many_element(
            state,
            collection,
            element,
            columns,
            *fetch,
            collection_alias,
            &property_path,
            path,
        )?;

        // Collection-rooted walks register their target-side fragments even when
        // the element join was skipped; assembly then reports the missing join.
        if has_fragments && (root_level || joined.is_some()) {
            state.many_to_many.push(target_fragments);
        }

        match joined {
            Some((edge_alias, join_type)) => self.descend(
                state,
                &NextWalk::Entity(element),
                &edge_alias,
                "",
                join_type,
                path,
            ),
            None => Ok(()),
        }
    }

    /// Append the join table -> element entity edge, if it is fetched at all.
    #[allow(clippy::too_many_arguments)]
    fn join_many_to_many_element(
        &self,
        state: &mut WalkState<'_>,
        collection: &'c CollectionPersister,
        element: &'c EntityPersister,
        columns: &[String],
        fetch: FetchStyle,
        collection_alias: &str,
        property_path: &str,
        path: &WalkPath,
    ) -> Result<Option<(String, JoinType)>, MappingError> {
        let root_level = path.depth() == 0;
        let fetch_enabled = state.fetch_role == Some(property_path)
            || match fetch {
                FetchStyle::Join => true,
                FetchStyle::Select => false,
                FetchStyle::Default => !element.lazy,
            };
        if !fetch_enabled {
            log::debug!("Skipping lazy many-to-many element of `{}`", collection.role);
            return Ok(None);
        }

        // The join table does not count towards the fetch depth
        let depth = path.depth().saturating_sub(1);
        let candidate = JoinCandidate {
            property_path,
            cardinality: Cardinality::ManyToOne,
            nullable: !root_level,
            element_join: true,
        };
        let join_type = self.strategy.resolver.resolve(&candidate, path, depth);
        if join_type == JoinType::None {
            return Ok(None);
        }

        check_column_count(property_path, columns, &element.key_columns)?;
        let target = EdgeTarget {
            name: element.name.clone(),
            table: element.table.clone(),
            join_columns: JoinColumn::pair(columns, &element.key_columns),
            key: AssociationKey::new(&collection.table, columns),
            shape: SelectShape::Entity {
                columns: element.selectable_columns(),
            },
            filter_templates: vec![&element.filters],
            order_template: None,
            next: NextWalk::Entity(element),
        };
        if self.strategy.guard.is_duplicate(&target.key, &state.visited) {
            return Ok(None);
        }

        let edge_alias = self.append_edge(
            state,
            collection_alias,
            PendingEdge {
                property_path,
                cardinality: Cardinality::ManyToOne,
                nullable: !root_level,
                join_type,
                depth,
                many_to_many_role: Some(&collection.role),
                synthetic_owner: false,
                target: &target,
            },
        );
        Ok(Some((edge_alias, join_type)))
    }

    /// Append the join from a collection-rooted walk back to the owning entity.
    ///
    /// Always the last edge and always INNER: every collection row has an owner.
    /// It bypasses the duplicate guard since it may share the collection table
    /// with the element join (on a different column set).
    fn append_owner_edge(
        &self,
        state: &mut WalkState<'_>,
        collection: &'c CollectionPersister,
        collection_alias: &str,
    ) -> Result<(), MappingError> {
        let owner = self.require_entity(&collection.owner, &collection.role)?;
        let property_path = format!("{}.owner", collection.role);
        check_column_count(&property_path, &collection.key_columns, &owner.key_columns)?;

        let target = EdgeTarget {
            name: owner.name.clone(),
            table: owner.table.clone(),
            join_columns: JoinColumn::pair(&collection.key_columns, &owner.key_columns),
            key: AssociationKey::new(&collection.table, &collection.key_columns),
            shape: SelectShape::Entity {
                columns: owner.selectable_columns(),
            },
            filter_templates: vec![],
            order_template: None,
            next: NextWalk::Stop,
        };
        self.append_edge(
            state,
            collection_alias,
            PendingEdge {
                property_path: &property_path,
                cardinality: Cardinality::ManyToOne,
                nullable: false,
                join_type: JoinType::Inner,
                depth: 0,
                many_to_many_role: None,
                synthetic_owner: true,
                target: &target,
            },
        );
        Ok(())
    }

    fn append_edge(
        &self,
        state: &mut WalkState<'_>,
        source_alias: &str,
        pending: PendingEdge<'_, 'c>,
    ) -> String {
        let target = pending.target;
        let index = state.edges.len();
        let alias = state.aliases.allocate(index, &target.name);

        let filter_fragment =
            fragments::combined_filter_fragment(&target.filter_templates, state.filters, &alias);
        let order_fragment = target
            .order_template
            .map(|t| fragments::render_template(t, &alias));

        state.visited.record(target.key.clone());
        log::debug!(
            "Edge {}: {} `{}` -> {} as {} on {}",
            index,
            pending.join_type,
            pending.property_path,
            target.table,
            alias,
            target.key
        );

        state.edges.push(AssociationEdge {
            index,
            property_path: pending.property_path.to_string(),
            source_alias: source_alias.to_string(),
            target_alias: alias.clone(),
            target_name: target.name.clone(),
            target_table: target.table.clone(),
            join_columns: target.join_columns.clone(),
            key: target.key.clone(),
            cardinality: pending.cardinality,
            nullable: pending.nullable,
            join_type: pending.join_type,
            depth: pending.depth,
            is_many_to_many: pending.many_to_many_role.is_some(),
            many_to_many_role: pending.many_to_many_role.map(str::to_string),
            synthetic_owner: pending.synthetic_owner,
            filter_fragment,
            order_fragment,
            shape: target.shape.clone(),
        });
        alias
    }

    /// Mapping-level decision: should this association be fetched by joining?
    fn is_join_fetch_enabled(
        &self,
        state: &WalkState<'_>,
        association: &AssociationMapping,
        property_path: &str,
    ) -> bool {
        if state.fetch_role == Some(property_path) {
            return true;
        }
        match association.fetch {
            FetchStyle::Join => true,
            FetchStyle::Select => false,
            FetchStyle::Default => {
                !association.is_collection()
                    && self
                        .catalog
                        .entity(&association.target)
                        .map_or(true, |target| !target.lazy)
            }
        }
    }

    fn resolve_target(
        &self,
        owner: &OwnerSide<'c>,
        association: &'c AssociationMapping,
        property: &str,
        property_path: &str,
    ) -> Result<EdgeTarget<'c>, MappingError> {
        let unsupported = || MappingError::UnsupportedCardinality {
            property: format!("{}.{}", owner.name, property),
            cardinality: association.cardinality,
            target: association.target.clone(),
        };

        match association.cardinality {
            Cardinality::ManyToOne | Cardinality::OneToOne => {
                let target = match self.catalog.entity(&association.target) {
                    Some(target) => target,
                    None if self.catalog.collection(&association.target).is_some() => {
                        return Err(unsupported())
                    }
                    None => {
                        return Err(MappingError::entity_error_with_context(
                            &association.target,
                            format!("walking association `{}`", property_path),
                        ))
                    }
                };

                // A one-to-one without columns shares the owner's primary key,
                // so the foreign key lives on the target side.
                let (lhs, key) = if association.columns.is_empty()
                    && association.cardinality == Cardinality::OneToOne
                {
                    (
                        owner.key_columns,
                        AssociationKey::new(&target.table, &target.key_columns),
                    )
                } else {
                    (
                        association.columns.as_slice(),
                        AssociationKey::new(owner.table, &association.columns),
                    )
                };
                check_column_count(property_path, lhs, &target.key_columns)?;

                Ok(EdgeTarget {
                    name: target.name.clone(),
                    table: target.table.clone(),
                    join_columns: JoinColumn::pair(lhs, &target.key_columns),
                    key,
                    shape: SelectShape::Entity {
                        columns: target.selectable_columns(),
                    },
                    filter_templates: vec![&target.filters],
                    order_template: None,
                    next: NextWalk::Entity(target),
                })
            }
            Cardinality::OneToMany | Cardinality::ManyToMany | Cardinality::ElementCollection => {
                let collection = match self.catalog.collection(&association.target) {
                    Some(collection) => collection,
                    None if self.catalog.entity(&association.target).is_some() => {
                        return Err(unsupported())
                    }
                    None => {
                        return Err(MappingError::collection_error_with_context(
                            &association.target,
                            format!("walking association `{}`", property_path),
                        ))
                    }
                };
                if collection.cardinality() != association.cardinality {
                    return Err(unsupported());
                }
                check_column_count(property_path, owner.key_columns, &collection.key_columns)?;

                let mut target = EdgeTarget {
                    name: collection.role.clone(),
                    table: collection.table.clone(),
                    join_columns: JoinColumn::pair(owner.key_columns, &collection.key_columns),
                    key: AssociationKey::new(&collection.table, &collection.key_columns),
                    shape: SelectShape::Collection {
                        columns: collection.collection_columns(),
                    },
                    filter_templates: vec![&collection.filters],
                    order_template: collection.order_by.as_deref(),
                    next: NextWalk::Stop,
                };

                match &collection.element {
                    CollectionElement::OneToMany { entity } => {
                        let element = self.require_entity(entity, &collection.role)?;
                        target.shape = SelectShape::CollectionOfEntities {
                            collection_columns: collection.collection_columns(),
                            entity_columns: element.selectable_columns(),
                        };
                        target.filter_templates.push(&element.filters);
                        target.next = NextWalk::Entity(element);
                    }
                    CollectionElement::ManyToMany { .. } => {
                        target.next = NextWalk::ManyToManyElement(collection);
                    }
                    CollectionElement::Values { associations, .. } if !associations.is_empty() => {
                        target.next = NextWalk::CompositeElement(collection);
                    }
                    CollectionElement::Values { .. } => {}
                }
                Ok(target)
            }
        }
    }

    fn require_entity(&self, name: &str, role: &str) -> Result<&'c EntityPersister, MappingError> {
        self.catalog.entity(name).ok_or_else(|| {
            MappingError::entity_error_with_context(name, format!("element or owner of `{}`", role))
        })
    }
}

fn check_column_count(path: &str, lhs: &[String], rhs: &[String]) -> Result<(), MappingError> {
    if lhs.is_empty() || lhs.len() != rhs.len() {
        return Err(MappingError::ColumnCountMismatch {
            path: path.to_string(),
            lhs: lhs.len(),
            rhs: rhs.len(),
        });
    }
    Ok(())
}
