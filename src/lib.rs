//! Joinwalker - eager-fetch SQL loaders for mapped persistent types
//!
//! This crate compiles the association graph of an object-relational mapping into
//! batch loading statements:
//! - Persister metadata catalog (entities, collection roles, filters)
//! - Join planning with fetch limits, cycle detection and join type resolution
//! - Alias and column-suffix allocation
//! - SQL assembly with key predicates for batch and sub-select loads
//! - Batch ladders and greedy batch composition over pending keys
//! - A loader facade with a statement cache

pub mod utils;

pub mod batch;
pub mod config;
pub mod join_walker;
pub mod loader;
pub mod persister_catalog;
pub mod sql_render;
