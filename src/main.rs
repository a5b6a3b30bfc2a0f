//! CLI entry point for querying GTFS-RT feeds.
//!
//! Each subcommand runs one request through the feed pipeline and prints the
//! resulting page. Failures are logged by kind and mapped to distinct exit
//! codes so wrapping scripts can decide what to retry.

use std::ffi::OsStr;
use std::io;
use std::num::NonZeroUsize;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gtfs_rt_feeds::config::Settings;
use gtfs_rt_feeds::fetch::auth::ApiKey;
use gtfs_rt_feeds::fetch::{BasicClient, HttpClient};
use gtfs_rt_feeds::output::{write_csv, write_json, write_pretty};
use gtfs_rt_feeds::paginate::MAX_PAGE_LIMIT;
use gtfs_rt_feeds::{EntityType, ErrorKind, FeedError, FeedPage, FeedService, FilterCriteria};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_rt_feeds")]
#[command(about = "Filtered, paginated views of GTFS-RT feeds", long_about = None)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Json, global = true)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Pretty,
    Csv,
}

#[derive(Args)]
struct Filters {
    /// Only entities on this route
    #[arg(long)]
    route_id: Option<String>,

    /// Only entities at this stop
    #[arg(long)]
    stop_id: Option<String>,

    /// Only entities for this trip
    #[arg(long)]
    trip_id: Option<String>,
}

impl Filters {
    fn criteria(self) -> FilterCriteria {
        FilterCriteria::new().trip_fields(self.route_id, self.stop_id, self.trip_id)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List configured feeds and their upstream URLs
    Feeds,
    /// One page of a feed's entities
    Entities {
        /// Feed identifier (e.g. ACE)
        feed: String,

        /// alert, trip_schedule_update or vehicle_position
        #[arg(long)]
        entity_type: Option<EntityType>,

        #[command(flatten)]
        filters: Filters,

        /// Number of entities to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Maximum number of entities to return
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=MAX_PAGE_LIMIT as u64))]
        limit: u64,
    },
    /// The first page (up to 1000) of a feed's entities
    All {
        feed: String,

        #[arg(long)]
        entity_type: Option<EntityType>,

        #[command(flatten)]
        filters: Filters,
    },
    /// Every alert in a feed
    Alerts { feed: String },
    /// Every trip update in a feed
    Trips {
        feed: String,

        #[command(flatten)]
        filters: Filters,
    },
    /// Every vehicle position in a feed
    Vehicles {
        feed: String,

        #[command(flatten)]
        filters: Filters,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<FeedError>() {
            Some(feed_error) => {
                let kind = feed_error.kind();
                if feed_error.is_transient() {
                    warn!(%kind, "Upstream unavailable; safe to retry");
                }
                ExitCode::from(exit_status(kind))
            }
            None => {
                error!(error = %format!("{e:#}"), "Startup failed");
                ExitCode::from(1)
            }
        },
    }
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gtfs_rt_feeds.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_feeds.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(io::stderr)
        .with_filter(
            EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        );

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(
            EnvFilter::try_from_env("RUST_LOG_JSON").unwrap_or_else(|_| EnvFilter::new("debug")),
        );

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    file_guard
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env().context("invalid configuration")?;
    info!(?settings, "Settings loaded");

    let registry = Arc::new(settings.load_registry()?);
    let client: Box<dyn HttpClient> = match &settings.api_key {
        Some(key) => Box::new(
            ApiKey::new(BasicClient::new(), &settings.api_key_header, key)
                .context("invalid API key configuration")?,
        ),
        None => Box::new(BasicClient::new()),
    };
    let service = FeedService::new(registry, client, settings.limits);

    let page = match cli.command {
        Commands::Feeds => {
            for (feed, url) in service.registry().iter() {
                println!("{feed}\t{url}");
            }
            return Ok(());
        }
        Commands::Entities {
            feed,
            entity_type,
            filters,
            offset,
            limit,
        } => {
            let limit = usize::try_from(limit)
                .ok()
                .and_then(NonZeroUsize::new)
                .context("limit must be between 1 and 1000")?;
            let criteria = FilterCriteria {
                entity_type,
                ..filters.criteria()
            };
            service.get_entities(&feed, &criteria, offset, limit).await
        }
        Commands::All {
            feed,
            entity_type,
            filters,
        } => {
            let criteria = FilterCriteria {
                entity_type,
                ..filters.criteria()
            };
            service.get_all_paginated(&feed, &criteria).await
        }
        Commands::Alerts { feed } => service.get_alerts(&feed).await,
        Commands::Trips { feed, filters } => {
            service.get_trip_updates(&feed, &filters.criteria()).await
        }
        Commands::Vehicles { feed, filters } => {
            service.get_vehicle_updates(&feed, &filters.criteria()).await
        }
    }?;

    render(&page, cli.format)
}

fn render(page: &FeedPage, format: Format) -> Result<()> {
    for (name, value) in page.header.metadata() {
        info!(header = name, %value, "Feed metadata");
    }
    if let Some(generated_at) = page.header.generated_at() {
        info!(%generated_at, total = page.page.total, "Feed snapshot");
    }

    let stdout = io::stdout().lock();
    match format {
        Format::Json => write_json(stdout, page),
        Format::Csv => write_csv(stdout, page),
        Format::Pretty => write_pretty(stdout, page),
    }
}

fn exit_status(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::EndpointNotFound => 2,
        ErrorKind::Fetch => 3,
        ErrorKind::Timeout => 4,
        ErrorKind::Processing => 5,
    }
}
