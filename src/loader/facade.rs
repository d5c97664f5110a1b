//! Loader compilation.
//!
//! [`LoaderFacade`] ties the pieces together for one load request:
//!
//! 1. pick the walk strategy from the root (entity, one-to-many, many-to-many,
//!    collection of values) and plan the joins once
//! 2. number aliases and suffixes for the plan
//! 3. render one statement per batch ladder rung, each with its own key predicate
//!
//! Every statement goes through the injected [`StatementCache`], so a loader
//! requested twice with the same key is compiled once.

use serde::Serialize;
use std::sync::Arc;

use super::cache::{LruStatementCache, StatementCache, StatementCacheKey};
use super::errors::LoaderError;
use crate::batch::{BatchDescriptor, BatchSelection, PendingKeyQueue};
use crate::config::LoaderConfig;
use crate::join_walker::{JoinPlan, JoinPlanner, LoadRoot};
use crate::persister_catalog::{AssociationCatalog, EnabledFilters};
use crate::sql_render::{AliasTable, KeyPredicate, StatementAssembler, StatementParts};

/// A compiled loader statement with everything needed to read its rows back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedStatement {
    pub sql: String,
    /// Number of keys bound by parameters; 0 for sub-select statements
    pub batch_size: usize,
    #[serde(serialize_with = "crate::utils::serde_arc::serialize")]
    pub plan: Arc<JoinPlan>,
    #[serde(serialize_with = "crate::utils::serde_arc::serialize")]
    pub aliases: Arc<AliasTable>,
}

/// What to load and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub root: LoadRoot,
    /// `None` uses the configured default batch size
    pub batch_size: Option<usize>,
    pub filters: EnabledFilters,
    /// Property path of a lazy association to join anyway
    pub fetch_role: Option<String>,
}

impl LoadRequest {
    pub fn new(root: LoadRoot) -> Self {
        LoadRequest {
            root,
            batch_size: None,
            filters: EnabledFilters::none(),
            fetch_role: None,
        }
    }

    pub fn entity(name: impl Into<String>) -> Self {
        Self::new(LoadRoot::entity(name))
    }

    pub fn collection(role: impl Into<String>) -> Self {
        Self::new(LoadRoot::collection(role))
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_filters(mut self, filters: EnabledFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn fetch_role(mut self, path: impl Into<String>) -> Self {
        self.fetch_role = Some(path.into());
        self
    }

    fn cache_key(&self, batch_size: usize) -> StatementCacheKey {
        StatementCacheKey::new(&self.root.to_string(), batch_size, &self.filters)
            .with_fetch_role(self.fetch_role.as_deref())
    }
}

/// A compiled loader: one statement per realized batch size.
#[derive(Debug, Clone)]
pub struct BatchingLoader {
    root: LoadRoot,
    descriptor: BatchDescriptor<Arc<GeneratedStatement>>,
}

impl BatchingLoader {
    pub fn root(&self) -> &LoadRoot {
        &self.root
    }

    pub fn descriptor(&self) -> &BatchDescriptor<Arc<GeneratedStatement>> {
        &self.descriptor
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.descriptor.sizes()
    }

    pub fn statement_for(&self, size: usize) -> Option<&Arc<GeneratedStatement>> {
        self.descriptor.statement_for(size)
    }

    /// Statements from the largest rung down to size 1.
    pub fn statements(&self) -> impl Iterator<Item = &Arc<GeneratedStatement>> {
        self.descriptor.rungs().map(|(_, statement)| statement)
    }

    /// Choose the statement and keys for loading `key`, see [`BatchDescriptor::initialize`].
    pub fn initialize<K, Q>(&self, key: &K, queue: &mut Q) -> BatchSelection<'_, Arc<GeneratedStatement>, K>
    where
        K: Clone,
        Q: PendingKeyQueue<K> + ?Sized,
    {
        self.descriptor.initialize(self.root.name(), key, queue)
    }
}

type CompiledPlan = (Arc<JoinPlan>, Arc<AliasTable>);

#[derive(Debug, Clone)]
pub struct LoaderFacade {
    catalog: Arc<dyn AssociationCatalog>,
    config: LoaderConfig,
    cache: Arc<dyn StatementCache>,
}

impl LoaderFacade {
    /// The cache must only be shared between facades with the same configuration;
    /// its keys do not include fetch limits.
    pub fn new(
        catalog: Arc<dyn AssociationCatalog>,
        config: LoaderConfig,
        cache: Arc<dyn StatementCache>,
    ) -> Self {
        LoaderFacade {
            catalog,
            config,
            cache,
        }
    }

    /// Facade with its own LRU cache sized from `config`.
    pub fn with_config(catalog: Arc<dyn AssociationCatalog>, config: LoaderConfig) -> Self {
        let cache = Arc::new(LruStatementCache::new(config.cache_max_entries));
        Self::new(catalog, config, cache)
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn StatementCache> {
        &self.cache
    }

    pub fn entity_loader(
        &self,
        entity: &str,
        batch_size: usize,
        filters: &EnabledFilters,
    ) -> Result<BatchingLoader, LoaderError> {
        self.entity_loader_for(
            &LoadRequest::entity(entity)
                .with_batch_size(batch_size)
                .with_filters(filters.clone()),
        )
    }

    /// Loader for an entity or collection request, honoring its fetch role.
    pub fn entity_loader_for(&self, request: &LoadRequest) -> Result<BatchingLoader, LoaderError> {
        self.loader(request)
    }

    /// Loader for a collection role; one-to-many roles use the one-to-many walk,
    /// values and many-to-many roles the collection walk.
    pub fn collection_loader(
        &self,
        role: &str,
        batch_size: usize,
        filters: &EnabledFilters,
    ) -> Result<BatchingLoader, LoaderError> {
        self.loader(
            &LoadRequest::collection(role)
                .with_batch_size(batch_size)
                .with_filters(filters.clone()),
        )
    }

    /// Single statement loading a collection for every owner key returned by
    /// `subselect`.
    pub fn subselect_collection_loader(
        &self,
        role: &str,
        subselect: &str,
        filters: &EnabledFilters,
    ) -> Result<Arc<GeneratedStatement>, LoaderError> {
        let subselect = subselect.trim();
        if subselect.is_empty() {
            return Err(LoaderError::EmptySubselect {
                role: role.to_string(),
            });
        }
        self.catalog.require_collection(role)?;

        let request = LoadRequest::collection(role).with_filters(filters.clone());
        let key = request.cache_key(0).with_subselect(subselect);
        self.cache.get_or_compute(key, &mut || {
            let (plan, aliases) = self.compile_plan(&request)?;
            let predicate = KeyPredicate::subselect(&plan.root.alias, &plan.root.key_columns, subselect);
            self.render(plan, aliases, &predicate, 0)
        })
    }

    /// Plan a request without rendering it.
    pub fn plan(&self, request: &LoadRequest) -> Result<JoinPlan, LoaderError> {
        let planner = JoinPlanner::for_root(self.catalog.as_ref(), &request.root, self.config.fetch_limits())?;
        Ok(planner.plan_with_fetch_role(
            &request.root,
            &request.filters,
            request.fetch_role.as_deref(),
        )?)
    }

    fn loader(&self, request: &LoadRequest) -> Result<BatchingLoader, LoaderError> {
        let batch_size = request.batch_size.unwrap_or(self.config.default_batch_size);
        let ladder = self.config.ladder();

        // Planned on the first cache miss and shared by every rung
        let mut shared: Option<CompiledPlan> = None;
        let descriptor = BatchDescriptor::new(batch_size, ladder.as_ref(), |size| {
            self.cache.get_or_compute(request.cache_key(size), &mut || {
                let (plan, aliases) = match &shared {
                    Some(compiled) => compiled.clone(),
                    None => {
                        let fresh = self.compile_plan(request)?;
                        shared = Some(fresh.clone());
                        fresh
                    }
                };
                let predicate = KeyPredicate::keys(&plan.root.alias, &plan.root.key_columns, size);
                self.render(plan, aliases, &predicate, size)
            })
        })?;

        log::info!(
            "Compiled loader for {} with batch sizes {:?}",
            request.root,
            descriptor.sizes()
        );
        Ok(BatchingLoader {
            root: request.root.clone(),
            descriptor,
        })
    }

    fn compile_plan(&self, request: &LoadRequest) -> Result<CompiledPlan, LoaderError> {
        let plan = self.plan(request)?;
        let aliases = AliasTable::from_plan(&plan);
        Ok((Arc::new(plan), Arc::new(aliases)))
    }

    fn render(
        &self,
        plan: Arc<JoinPlan>,
        aliases: Arc<AliasTable>,
        predicate: &KeyPredicate,
        batch_size: usize,
    ) -> Result<GeneratedStatement, LoaderError> {
        let sql = StatementAssembler::render_sql(
            &StatementParts::new(&plan, &aliases).with_key_predicate(predicate),
        )?;
        Ok(GeneratedStatement {
            sql,
            batch_size,
            plan,
            aliases,
        })
    }
}
