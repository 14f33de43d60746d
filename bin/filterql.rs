use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use filterql::prelude::*;
use filterql::{HttpTransport, RegistryConfig};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "filterql")]
#[command(about = "Compile entity filters into Elasticsearch queries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the compiled query document
    Compile {
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Run a highlighted search and print the snippets
    Highlight {
        #[command(flatten)]
        search: SearchArgs,

        /// Base URL of the Elasticsearch endpoint
        #[arg(long, env = "FILTERQL_URL", default_value = "http://127.0.0.1:9200")]
        url: String,

        /// Zero-based page; omit for every hit up to the result window
        #[arg(long)]
        page: Option<usize>,

        /// Page size
        #[arg(long, default_value = "20")]
        size: usize,

        /// Sort fields as `field` or `field:desc`
        #[arg(long, value_delimiter = ',')]
        sort: Vec<String>,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// JSON file describing the indexed types
    #[arg(long, env = "FILTERQL_REGISTRY")]
    registry: PathBuf,

    /// JSON file with search settings
    #[arg(long, env = "FILTERQL_SETTINGS")]
    settings: Option<PathBuf>,

    /// JSON object mapping field names to filters
    #[arg(long)]
    filters: Option<PathBuf>,

    /// Entity type to search; all indexed types when omitted
    #[arg(long = "type")]
    entity_type: Option<String>,

    /// Free-text query, `*` for everything
    #[arg(long)]
    query: Option<String>,
}

/// Collaborator for the parts of a search the CLI has no backend for
struct Detached;

impl QuerySubmitter<Value> for Detached {
    fn submit<'a>(
        &'a self,
        _query: &Value,
        _scope: &SearchScope,
    ) -> filterql::Result<Box<dyn ResultCursor<Value> + 'a>> {
        Err(FilterQlError::Backend("no query submitter configured".to_string()))
    }
}

impl RawTransport for Detached {
    fn perform_request(
        &self,
        _method: &str,
        _path: &str,
        _headers: &[(String, String)],
        _body: &[u8],
    ) -> filterql::Result<Vec<u8>> {
        Err(FilterQlError::Transport("no transport configured".to_string()))
    }
}

impl EntityFetcher<Value> for Detached {
    fn fetch_by_ids(
        &self,
        _type_name: &str,
        _id_field: &str,
        _ids: &[EntityId],
    ) -> filterql::Result<Vec<Value>> {
        Ok(Vec::new())
    }

    fn identifier(&self, _entity: &Value) -> Option<EntityId> {
        None
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Compile { search } => {
            let service = service(&search, Arc::new(Detached))?;
            let builder = builder(&service, &search)?;
            let compiled = builder.build()?;
            println!("{}", serde_json::to_string_pretty(&compiled.document)?);
        }
        Command::Highlight {
            search,
            url,
            page,
            size,
            sort,
        } => {
            info!("Searching {}", url);
            let transport = Arc::new(HttpTransport::new(&url)?);
            let service = service(&search, transport)?;
            let builder = builder(&service, &search)?;

            let pageable = match page {
                Some(page) => Pageable::of(page, size),
                None => Pageable::Unpaged,
            };
            let sortable = parse_sort(&sort)?;
            let results = builder.highlight(pageable, &sortable)?;

            info!("{} hits, showing {}", results.count, results.data.len());
            for result in &results.data {
                println!(
                    "{}\t{}\t{:.3}\t{}",
                    result.type_name, result.id, result.score, result.highlight
                );
            }
        }
    }
    Ok(())
}

fn service(args: &SearchArgs, transport: Arc<dyn RawTransport>) -> Result<SearchService<Value>> {
    let registry = RegistryConfig::from_file(&args.registry)
        .with_context(|| format!("Failed to load registry from {}", args.registry.display()))?
        .into_registry();
    info!("Loaded {} entity types", registry.len());

    let settings = match &args.settings {
        Some(path) => SearchSettings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => SearchSettings::default(),
    };

    let detached = Arc::new(Detached);
    Ok(
        SearchService::new(Arc::new(registry), detached.clone(), transport, detached)
            .with_settings(settings),
    )
}

fn builder<'s>(
    service: &'s SearchService<Value>,
    args: &SearchArgs,
) -> Result<FilterQueryBuilder<'s, Value>> {
    let scope = match &args.entity_type {
        Some(name) => SearchScope::of(name.clone()),
        None => SearchScope::Global,
    };
    let mut builder = FilterQueryBuilder::new(service, scope, args.query.as_deref())?;
    if let Some(path) = &args.filters {
        for (field, filter) in load_filters(path)? {
            builder.add(&field, &filter)?;
        }
    }
    Ok(builder)
}

fn load_filters(path: &Path) -> Result<Vec<(String, QueryFilter)>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read filters from {}", path.display()))?;
    let map: Map<String, Value> = serde_json::from_str(&raw)?;
    map.into_iter()
        .map(|(field, value)| -> Result<(String, QueryFilter)> {
            let filter = serde_json::from_value(value)
                .with_context(|| format!("Invalid filter for field '{}'", field))?;
            Ok((field, filter))
        })
        .collect()
}

fn parse_sort(entries: &[String]) -> Result<Sortable> {
    let mut sortable = Sortable::unsorted();
    for entry in entries {
        let field = match entry.split_once(':') {
            None => SortField::asc(entry.as_str()),
            Some((name, "asc")) => SortField::asc(name),
            Some((name, "desc")) => SortField::desc(name),
            Some((_, other)) => bail!("Unknown sort order '{}' in '{}'", other, entry),
        };
        sortable = sortable.by(field);
    }
    Ok(sortable)
}
