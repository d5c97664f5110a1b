use thiserror::Error;

/// Invalid batch configuration, rejected before any statement is built.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BatchConfigError {
    #[error("Batch size must be positive, got {requested}")]
    NonPositiveBatchSize { requested: usize },

    #[error("Batch ladder `{ladder}` produced invalid sizes {sizes:?}: {reason}")]
    MalformedLadder {
        ladder: String,
        sizes: Vec<usize>,
        reason: String,
    },

    #[error("Unknown batch ladder `{name}` (expected legacy, doubling or linear)")]
    UnknownLadder { name: String },
}

impl BatchConfigError {
    pub fn malformed(ladder: &str, sizes: &[usize], reason: impl Into<String>) -> Self {
        BatchConfigError::MalformedLadder {
            ladder: ladder.to_string(),
            sizes: sizes.to_vec(),
            reason: reason.into(),
        }
    }
}
