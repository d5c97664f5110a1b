use thiserror::Error;

use crate::batch::BatchConfigError;
use crate::persister_catalog::MappingError;

/// Errors raised while compiling a loader.
///
/// Both kinds are configuration defects; nothing here is worth retrying.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoaderError {
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Batch configuration error: {0}")]
    Configuration(#[from] BatchConfigError),

    #[error("Sub-select text must not be empty for collection `{role}`")]
    EmptySubselect { role: String },
}
