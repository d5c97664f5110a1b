//! Loader facade: compiles batch loaders for entities and collections and
//! caches the generated statements.

pub mod cache;
pub mod errors;
pub mod facade;

pub use cache::{CacheMetrics, LruStatementCache, StatementCache, StatementCacheKey};
pub use errors::LoaderError;
pub use facade::{BatchingLoader, GeneratedStatement, LoadRequest, LoaderFacade};
