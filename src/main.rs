use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use joinwalker::batch::BatchLadderKind;
use joinwalker::config::{CliConfig, LoaderConfig};
use joinwalker::loader::{GeneratedStatement, LoadRequest, LoaderFacade};
use joinwalker::persister_catalog::{load_catalog, EnabledFilters};

/// Joinwalker - print the SQL loaders compiled for a mapping
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Mapping YAML file describing entities and collection roles
    #[arg(long)]
    mapping: PathBuf,

    /// Entity to load
    #[arg(long, conflicts_with = "collection", required_unless_present = "collection")]
    entity: Option<String>,

    /// Collection role to load (e.g. `Order.lines`)
    #[arg(long)]
    collection: Option<String>,

    /// Batch size; defaults to the configured default batch size
    #[arg(long)]
    batch_size: Option<usize>,

    /// Enable a filter by name (repeatable)
    #[arg(long = "filter")]
    filters: Vec<String>,

    /// Join this lazy association path anyway
    #[arg(long, conflicts_with = "subselect")]
    fetch_role: Option<String>,

    /// Load the collection for every owner key returned by this sub-select
    #[arg(long, requires = "collection")]
    subselect: Option<String>,

    /// Loader configuration YAML file (environment variables are used otherwise)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Maximum join depth below the root
    #[arg(long, conflicts_with = "unbounded_depth")]
    max_fetch_depth: Option<usize>,

    /// Walk the association graph without a depth limit
    #[arg(long)]
    unbounded_depth: bool,

    /// Maximum collections fetched by join in one statement
    #[arg(long)]
    max_collection_fetches: Option<usize>,

    /// Batch ladder: legacy, doubling or linear
    #[arg(long)]
    batch_ladder: Option<BatchLadderKind>,

    /// Step of the linear batch ladder
    #[arg(long)]
    linear_step: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl From<&Cli> for CliConfig {
    fn from(cli: &Cli) -> Self {
        CliConfig {
            max_fetch_depth: cli.max_fetch_depth,
            unbounded_depth: cli.unbounded_depth,
            max_collection_fetches: cli.max_collection_fetches,
            default_batch_size: None,
            batch_ladder: cli.batch_ladder,
            linear_step: cli.linear_step,
            cache_max_entries: None,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    root: String,
    statements: Vec<&'a GeneratedStatement>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // Defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => LoaderConfig::from_yaml_file(path)
            .with_context(|| format!("reading loader configuration {}", path.display()))?,
        None => LoaderConfig::from_env().context("reading loader configuration from environment")?,
    };
    let config = LoaderConfig::from_cli(base, CliConfig::from(&cli))?;
    log::debug!("Loader configuration: {:?}", config);

    let catalog = load_catalog(&cli.mapping)
        .with_context(|| format!("loading mapping {}", cli.mapping.display()))?;
    let facade = LoaderFacade::with_config(std::sync::Arc::new(catalog), config);
    let filters: EnabledFilters = cli.filters.iter().map(String::as_str).collect();

    let (request, statements) = match (&cli.entity, &cli.collection, &cli.subselect) {
        (_, Some(role), Some(subselect)) => {
            let statement = facade.subselect_collection_loader(role, subselect, &filters)?;
            (LoadRequest::collection(role.clone()), vec![statement])
        }
        (Some(entity), None, None) => compile(&facade, &cli, LoadRequest::entity(entity.clone()), filters)?,
        (None, Some(role), None) => compile(&facade, &cli, LoadRequest::collection(role.clone()), filters)?,
        _ => bail!("exactly one of --entity or --collection is required"),
    };

    match cli.format {
        OutputFormat::Text => {
            for statement in &statements {
                println!("-- {} batch size {}", request.root, statement.batch_size);
                println!("{};\n", statement.sql);
            }
        }
        OutputFormat::Json => {
            let report = Report {
                root: request.root.to_string(),
                statements: statements.iter().map(|s| s.as_ref()).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn compile(
    facade: &LoaderFacade,
    cli: &Cli,
    request: LoadRequest,
    filters: EnabledFilters,
) -> anyhow::Result<(LoadRequest, Vec<std::sync::Arc<GeneratedStatement>>)> {
    let mut request = request.with_filters(filters);
    if let Some(size) = cli.batch_size {
        request = request.with_batch_size(size);
    }
    if let Some(path) = &cli.fetch_role {
        request = request.fetch_role(path.clone());
    }

    let loader = facade.entity_loader_for(&request)?;
    let statements = loader.statements().cloned().collect();
    Ok((request, statements))
}
