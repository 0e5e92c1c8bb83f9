mod render;
mod shell;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use cheapfinds_contracts::events::EventWriter;
use cheapfinds_contracts::identity::StaticIdentity;
use cheapfinds_contracts::regions::RegionRegistry;
use cheapfinds_contracts::search::{ImageBlob, SearchMode, SearchRequest};
use cheapfinds_contracts::share::{share_url, take_shared_result};
use cheapfinds_engine::{default_provider_registry, EngineConfig, SearchPipeline};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;
use uuid::Uuid;

use crate::render::{render_regions, render_result};
use crate::shell::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "cheapfinds",
    version,
    about = "Find the cheapest price for a product from photos or a description"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one search and print the interpreted result.
    Search(SearchArgs),
    /// Interactive shell with single, multi and chat modes.
    Shell(SessionArgs),
    /// Render the result carried by a share link.
    Open(OpenArgs),
    /// List the countries a search can be focused on.
    Regions,
}

#[derive(Debug, Args)]
struct SessionArgs {
    #[arg(long, env = "CHEAPFINDS_COUNTRY", default_value = "Global")]
    country: String,
    #[arg(long, env = "CHEAPFINDS_PROVIDER", default_value = "gemini")]
    provider: String,
    #[arg(long, env = "CHEAPFINDS_SIGNED_IN")]
    signed_in: bool,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long, env = "CHEAPFINDS_SHARE_BASE")]
    share_base: Option<Url>,
}

#[derive(Debug, Args)]
struct SearchArgs {
    #[command(flatten)]
    session: SessionArgs,
    #[arg(long = "image")]
    images: Vec<PathBuf>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    multi: bool,
    /// Print the provider's answer verbatim instead of the structured view.
    #[arg(long)]
    raw: bool,
}

#[derive(Debug, Args)]
struct OpenArgs {
    url: Url,
    #[arg(long)]
    raw: bool,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("cheapfinds error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Err(err) = dotenv {
        if !err.not_found() {
            tracing::warn!("ignoring .env: {err}");
        }
    }

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(dispatch(cli))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Search(args) => run_search(args).await,
        Command::Shell(args) => run_shell(args).await,
        Command::Open(args) => Ok(run_open(args)),
        Command::Regions => {
            let regions = RegionRegistry::default();
            print!("{}", render_regions(regions.list()));
            Ok(0)
        }
    }
}

fn build_pipeline(args: &SessionArgs) -> Result<SearchPipeline> {
    let config = EngineConfig::from_env();
    let registry = default_provider_registry(&config);
    let Some(provider) = registry.get(&args.provider) else {
        bail!(
            "unknown provider '{}' (available: {})",
            args.provider,
            registry.names().join(", ")
        );
    };
    let mut pipeline = SearchPipeline::new(provider).with_max_image_dim(config.max_image_dim);
    if let Some(path) = args.events.as_ref() {
        pipeline = pipeline.with_events(EventWriter::new(path, Uuid::new_v4().to_string()));
    }
    Ok(pipeline)
}

async fn run_search(args: SearchArgs) -> Result<i32> {
    let identity = StaticIdentity::new(args.session.signed_in);
    let requested = if args.multi {
        SearchMode::Multi
    } else {
        SearchMode::Single
    };
    let mode = requested.gated(&identity);
    if mode != requested {
        eprintln!("Multi-product search needs --signed-in; running a single search.");
    }
    let region = RegionRegistry::default().resolve(&args.session.country);

    let mut request = SearchRequest::new(mode, region.name)
        .with_description(args.description.unwrap_or_default());
    for path in &args.images {
        request = request.with_image(ImageBlob::from_path(path)?);
    }

    let mut pipeline = build_pipeline(&args.session)?;
    let result = pipeline.search(request).await?;
    print!("{}", render_result(&result, args.raw));
    if let Some(base) = args.session.share_base.as_ref() {
        println!("\nShare: {}", share_url(base, &result)?);
    }
    Ok(0)
}

async fn run_shell(args: SessionArgs) -> Result<i32> {
    let regions = RegionRegistry::default();
    let region = regions.resolve(&args.country);
    let pipeline = build_pipeline(&args)?;
    Shell::new(
        pipeline,
        regions,
        StaticIdentity::new(args.signed_in),
        region,
        args.share_base,
    )
    .run()
    .await
}

fn run_open(args: OpenArgs) -> i32 {
    let mut url = args.url;
    match take_shared_result(&mut url) {
        Some(result) => {
            print!("{}", render_result(&result, args.raw));
        }
        None => {
            println!("No shared result in {url}. Start a search with `cheapfinds search`.");
        }
    }
    0
}
