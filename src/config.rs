use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

use crate::batch::{BatchLadder, BatchLadderKind};
use crate::join_walker::FetchLimits;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Loader settings with validation
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Maximum join depth below the root; `None` walks until the graph ends
    #[validate(range(min = 1, max = 64, message = "Max fetch depth must be between 1 and 64"))]
    pub max_fetch_depth: Option<usize>,

    /// Maximum number of collections fetched by join in one statement
    #[validate(range(max = 16, message = "Max collection fetches must be at most 16"))]
    pub max_collection_fetches: Option<usize>,

    /// Batch size used when a loader is requested without one
    #[validate(range(
        min = 1,
        max = 1000,
        message = "Default batch size must be between 1 and 1000"
    ))]
    pub default_batch_size: usize,

    /// Progression of realized batch sizes
    pub batch_ladder: BatchLadderKind,

    /// Step of the linear batch ladder
    #[validate(range(min = 1, message = "Linear ladder step must be at least 1"))]
    pub linear_step: usize,

    /// Compiled statements kept in the statement cache; 0 disables caching
    #[validate(range(
        max = 1_000_000,
        message = "Cache size must be at most 1000000 entries"
    ))]
    pub cache_max_entries: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_fetch_depth: None,
            max_collection_fetches: Some(1),
            default_batch_size: 1,
            batch_ladder: BatchLadderKind::Legacy,
            linear_step: 5,
            cache_max_entries: 1000,
        }
    }
}

impl LoaderConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            max_fetch_depth: parse_optional_env_var("JOINWALKER_MAX_FETCH_DEPTH", None)?,
            max_collection_fetches: parse_optional_env_var(
                "JOINWALKER_MAX_COLLECTION_FETCHES",
                Some(1),
            )?,
            default_batch_size: parse_env_var("JOINWALKER_DEFAULT_BATCH_SIZE", "1")?,
            batch_ladder: parse_env_var("JOINWALKER_BATCH_LADDER", "legacy")?,
            linear_step: parse_env_var("JOINWALKER_LINEAR_STEP", "5")?,
            cache_max_entries: parse_env_var("JOINWALKER_CACHE_MAX_ENTRIES", "1000")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply command line overrides, then validate the result
    pub fn from_cli(base: Self, cli: CliConfig) -> Result<Self, ConfigError> {
        let mut config = base;
        config.merge(cli);
        config.validate()?;
        Ok(config)
    }

    /// Merge command line overrides (CLI overrides file and environment)
    pub fn merge(&mut self, cli: CliConfig) {
        if cli.unbounded_depth {
            self.max_fetch_depth = None;
        } else if let Some(depth) = cli.max_fetch_depth {
            self.max_fetch_depth = Some(depth);
        }
        if let Some(fetches) = cli.max_collection_fetches {
            self.max_collection_fetches = Some(fetches);
        }
        if let Some(size) = cli.default_batch_size {
            self.default_batch_size = size;
        }
        if let Some(ladder) = cli.batch_ladder {
            self.batch_ladder = ladder;
        }
        if let Some(step) = cli.linear_step {
            self.linear_step = step;
        }
        if let Some(entries) = cli.cache_max_entries {
            self.cache_max_entries = entries;
        }
    }

    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            max_fetch_depth: self.max_fetch_depth,
            max_collection_fetches: self.max_collection_fetches,
        }
    }

    pub fn ladder(&self) -> Box<dyn BatchLadder> {
        self.batch_ladder.build(self.linear_step)
    }
}

/// CLI overrides (parsed from command line arguments)
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub max_fetch_depth: Option<usize>,
    pub unbounded_depth: bool,
    pub max_collection_fetches: Option<usize>,
    pub default_batch_size: Option<usize>,
    pub batch_ladder: Option<BatchLadderKind>,
    pub linear_step: Option<usize>,
    pub cache_max_entries: Option<usize>,
}

/// Parse an environment variable with a default value
fn parse_env_var<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.trim().parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

/// Parse an optional limit; an empty value or `none` means unbounded
fn parse_optional_env_var<T: FromStr>(key: &str, default: Option<T>) -> Result<Option<T>, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    match trimmed.parse() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => Err(ConfigError::Parse {
            field: key.to_string(),
            value,
            source: Box::new(e),
        }),
    }
}
