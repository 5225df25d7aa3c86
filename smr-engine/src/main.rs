//! smr - Candidate resolution driver
//!
//! Reads one lookup request as JSON from stdin and writes the result as JSON
//! to stdout. Logs go to stderr so stdout stays machine-readable.
//!
//! **Usage:**
//! ```bash
//! echo '{"title":"Scene.Alpha.mp4","url":"https://www.site.com/scene-alpha/4412"}' \
//!     | smr scene --source network --local-id 12
//! echo '{"name":"Jane Example"}' | smr find --performer --sub-source siteA
//! echo '{"title":"Scene Alpha"}' | smr search
//! smr init-config
//! ```

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use smr_common::config::{
    load_or_default, load_toml_config, resolve_config_path, user_config_path, write_toml_config,
    MatchingConfig, TomlConfig, CONFIG_ENV_VAR,
};
use smr_engine::library::{enrich_reference, open_library};
use smr_engine::sources::{CandidateSource, HttpJsonSource, StaticSource, SubSourceCatalog};
use smr_engine::{
    build_reference, EngineSettings, FederatedMode, FederatedSearchCoordinator, LookupRequest,
    QueryFallbackOrchestrator, Resolution,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Command-line arguments for smr
#[derive(Parser, Debug)]
#[command(name = "smr")]
#[command(about = "Resolve local media items against remote metadata catalogs")]
#[command(version)]
struct Cli {
    /// Config file (overrides SMR_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve one scene through the identifier/slug/title fallback chain
    Scene(SceneArgs),
    /// Federated single-hit lookup across sub-sources
    Find(FindArgs),
    /// Federated listing across sub-sources
    Search(SearchArgs),
    /// Write a config file with the compiled defaults
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Answer queries from a canned JSON fixture
    #[arg(long, value_name = "FILE", conflicts_with = "source")]
    fixture: Option<PathBuf>,

    /// Configured source name (defaults to the first `[[sources]]` entry)
    #[arg(long)]
    source: Option<String>,
}

#[derive(Args, Debug)]
struct SceneArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Local library record id (overrides the request's `id`)
    #[arg(long)]
    local_id: Option<String>,
}

#[derive(Args, Debug)]
struct FindArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Name lookup with the stricter performer threshold
    #[arg(long)]
    performer: bool,

    /// Sub-source to search, in order (repeatable; default: request `extra`, else all)
    #[arg(long = "sub-source", value_name = "NAME")]
    sub_sources: Vec<String>,

    /// Minimum ratio to accept a hit
    #[arg(long)]
    min_ratio: Option<f64>,
}

#[derive(Args, Debug)]
struct SearchArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Sub-source to search, in order (repeatable; default: request `extra`, else all)
    #[arg(long = "sub-source", value_name = "NAME")]
    sub_sources: Vec<String>,
}

/// The source selected on the command line
enum SelectedSource {
    Fixture(StaticSource),
    Http(HttpJsonSource),
}

impl SelectedSource {
    fn open(args: &SourceArgs, config: &TomlConfig) -> Result<Self> {
        if let Some(path) = &args.fixture {
            let source = StaticSource::load(path)
                .with_context(|| format!("Failed to load fixture {}", path.display()))?;
            return Ok(SelectedSource::Fixture(source));
        }

        let source_config = match &args.source {
            Some(name) => config
                .source(name)
                .ok_or_else(|| anyhow!("Source '{}' is not configured", name))?,
            None => config
                .sources
                .first()
                .ok_or_else(|| anyhow!("No sources configured; pass --fixture or add [[sources]]"))?,
        };

        let source = HttpJsonSource::new(source_config.clone())
            .with_context(|| format!("Failed to set up source '{}'", source_config.name))?;
        Ok(SelectedSource::Http(source))
    }

    fn candidates(&self) -> &dyn CandidateSource {
        match self {
            SelectedSource::Fixture(source) => source,
            SelectedSource::Http(source) => source,
        }
    }

    fn catalog(&self) -> &dyn SubSourceCatalog {
        match self {
            SelectedSource::Fixture(source) => source,
            SelectedSource::Http(source) => source,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref(), CONFIG_ENV_VAR);
    init_tracing(config_path.as_deref());

    if let Command::InitConfig { force } = &cli.command {
        return init_config(config_path, *force);
    }

    let config = load_or_default(config_path.as_deref());
    let settings = EngineSettings::resolve(&config);

    match &cli.command {
        Command::Scene(args) => run_scene(args, &config, settings).await,
        Command::Find(args) => run_find(args, &config, settings).await,
        Command::Search(args) => run_search(args, &config, settings).await,
        Command::InitConfig { .. } => Ok(()),
    }
}

/// Install the stderr subscriber; `RUST_LOG` wins over the config level
fn init_tracing(config_path: Option<&Path>) {
    let level = config_path
        .and_then(|path| load_toml_config(path).ok())
        .map(|config| config.logging.level)
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run_scene(args: &SceneArgs, config: &TomlConfig, settings: EngineSettings) -> Result<()> {
    let request = read_request()?;
    let mut reference = build_reference(&request);

    if let Some(local_id) = args.local_id.as_ref().or(request.id.as_ref()) {
        match open_library(config).await {
            Some(library) => {
                enrich_reference(library.as_ref(), local_id, &mut reference).await;
            }
            None => warn!("No usable library endpoint or database; continuing without local facts"),
        }
    }

    let source = SelectedSource::open(&args.source, config)?;
    let orchestrator = QueryFallbackOrchestrator::new(source.candidates(), settings);
    let outcome = orchestrator
        .resolve(&reference)
        .await
        .context("Scene resolution failed")?;

    match outcome.resolution {
        Resolution::Matched(matched) => print_json(&matched),
        Resolution::NoMatch => print_json(&serde_json::json!({})),
    }
}

async fn run_find(args: &FindArgs, config: &TomlConfig, settings: EngineSettings) -> Result<()> {
    let request = read_request()?;
    let query = search_text(&request)?;
    let sub_sources = requested_sub_sources(&args.sub_sources, &request);

    let min_ratio = args.min_ratio.unwrap_or(if args.performer {
        settings.performer_min_ratio
    } else {
        settings.federated_min_ratio
    });

    let source = SelectedSource::open(&args.source, config)?;
    let coordinator = FederatedSearchCoordinator::new(
        source.catalog(),
        FederatedMode::from_concurrency(settings.federated_concurrency),
    );
    let outcome = coordinator
        .find(&query, &sub_sources, min_ratio)
        .await
        .context("Federated lookup failed")?;

    match outcome.accepted() {
        Some(hit) => print_json(hit),
        None => print_json(&serde_json::Value::Null),
    }
}

async fn run_search(args: &SearchArgs, config: &TomlConfig, settings: EngineSettings) -> Result<()> {
    let request = read_request()?;
    let query = search_text(&request)?;
    let sub_sources = requested_sub_sources(&args.sub_sources, &request);

    let source = SelectedSource::open(&args.source, config)?;
    let coordinator = FederatedSearchCoordinator::new(
        source.catalog(),
        FederatedMode::from_concurrency(settings.federated_concurrency),
    );
    let listing = coordinator
        .search_all(&query, &sub_sources)
        .await
        .context("Federated listing failed")?;

    print_json(&listing)
}

/// Write the compiled defaults, refusing to clobber an existing file
fn init_config(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = config_path
        .or_else(user_config_path)
        .ok_or_else(|| anyhow!("No config directory available; pass --config"))?;

    if path.exists() && !force {
        bail!("{} already exists (use --force to replace it)", path.display());
    }

    let defaults = EngineSettings::default();
    let config = TomlConfig {
        matching: MatchingConfig {
            duration_tolerance_secs: Some(defaults.duration_tolerance_secs),
            identity_duration_tolerance_secs: Some(defaults.identity_duration_tolerance_secs),
            size_tolerance_percent: Some(defaults.size_tolerance_percent),
            federated_min_ratio: Some(defaults.federated_min_ratio),
            performer_min_ratio: Some(defaults.performer_min_ratio),
            federated_concurrency: Some(defaults.federated_concurrency),
        },
        ..Default::default()
    };

    write_toml_config(&config, &path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote default config to {}", path.display());
    Ok(())
}

fn read_request() -> Result<LookupRequest> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read request from stdin")?;
    serde_json::from_str(&input).context("Request is not a valid lookup JSON object")
}

/// Free-text query for federated requests: `name`, else the cleaned title
fn search_text(request: &LookupRequest) -> Result<String> {
    if let Some(name) = request.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }

    build_reference(request)
        .title
        .ok_or_else(|| anyhow!("Request needs a `name` or `title` to search for"))
}

/// `--sub-source` flags win; otherwise the request's `extra` list
fn requested_sub_sources(flags: &[String], request: &LookupRequest) -> Vec<String> {
    if !flags.is_empty() {
        return flags.to_vec();
    }
    match &request.extra {
        Some(extra) => {
            debug!(sub_sources = ?extra, "Using sub-sources from request");
            extra.clone()
        }
        None => Vec::new(),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}
