mod delivery;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use jobfeed_client::{HtmlExtractor, ProxyConfig, ReqwestFetcher};
use jobfeed_core::models::Destination;
use jobfeed_core::pipeline::RunRequest;
use jobfeed_core::sources::{SourceSelector, builtin_sources};
use jobfeed_core::{
    Aggregator, DestinationDirectory, PipelineContext, Scheduler, SeenStore, Source,
    TracingSchedulerReporter,
};

use delivery::{CONSOLE_DESTINATION, CONSOLE_ENDPOINT, DailySpec, RoutedMessenger, parse_destinations};

type Pipeline = PipelineContext<ReqwestFetcher, HtmlExtractor, RoutedMessenger, DestinationDirectory>;

#[derive(Parser)]
#[command(name = "jobfeed", version, about = "Fresher job postings, deduplicated and delivered")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Config {
    /// Seen-links store file
    #[arg(long, env = "JOBFEED_STORE_PATH", default_value = "data/seen.json", global = true)]
    store: PathBuf,

    /// Default IANA timezone for schedules
    #[arg(long, env = "JOBFEED_TIMEZONE", default_value = "Asia/Kolkata", global = true)]
    timezone: String,

    /// Webhook destinations as id=url, comma separated
    #[arg(long, env = "JOBFEED_WEBHOOKS", default_value = "", global = true)]
    webhooks: String,

    /// Pass-through proxy prefix prepended to every source URL
    #[arg(long, env = "JOBFEED_PROXY_PREFIX", global = true)]
    proxy_prefix: Option<String>,

    /// HTTP(S)/SOCKS proxy for source requests
    #[arg(long, env = "JOBFEED_HTTP_PROXY", global = true, conflicts_with = "proxy_prefix")]
    http_proxy: Option<String>,

    /// Per-request fetch timeout in seconds
    #[arg(long, env = "JOBFEED_FETCH_TIMEOUT_SECS", default_value_t = 20, global = true)]
    fetch_timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in sources in priority order
    Sources,

    /// Fetch jobs and print them, without touching the seen store
    Fetch {
        /// Source names (comma separated) or "all"
        #[arg(short, long, default_value = "all")]
        sources: SourceSelector,

        /// Jobs per source (1-50)
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Print JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Run the pipeline once for one destination
    Run {
        /// Destination id ("console" prints to stdout)
        #[arg(short, long, default_value = CONSOLE_DESTINATION)]
        to: String,

        /// Source names (comma separated) or "all"
        #[arg(short, long, default_value = "all")]
        sources: SourceSelector,

        /// Jobs per source (1-50); defaults to 10 with --all, 30 otherwise
        #[arg(short, long)]
        limit: Option<usize>,

        /// Deliver everything found, including links seen before
        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// Run scheduled refreshes until interrupted
    Serve {
        /// Daily refresh as id=HH:MM[@Area/City]; repeatable
        #[arg(long)]
        daily: Vec<DailySpec>,

        /// 5-field cron for the default destination
        #[arg(long, env = "JOBFEED_REFRESH_CRON")]
        cron: Option<String>,

        /// Destination refreshed by --cron
        #[arg(long, env = "JOBFEED_DEFAULT_DESTINATION", default_value = CONSOLE_DESTINATION)]
        default_destination: String,
    },

    /// Show how many links each destination has already received
    Seen {
        /// Limit output to one destination
        #[arg(short, long)]
        destination: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobfeed=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sources => cmd_sources(),
        Commands::Fetch {
            sources,
            limit,
            json,
        } => cmd_fetch(&cli.config, &sources, limit, json).await?,
        Commands::Run {
            to,
            sources,
            limit,
            all,
        } => {
            let mut request = if all {
                RunRequest::listing()
            } else {
                RunRequest::manual_refresh()
            };
            if let Some(limit) = limit {
                request = request.with_limit(limit);
            }
            cmd_run(&cli.config, &to, request.with_sources(sources)).await?;
        }
        Commands::Serve {
            daily,
            cron,
            default_destination,
        } => cmd_serve(&cli.config, &daily, cron.as_deref(), &default_destination).await?,
        Commands::Seen { destination } => cmd_seen(&cli.config, destination.as_deref()).await?,
    }

    Ok(())
}

fn build_fetcher(config: &Config) -> Result<ReqwestFetcher> {
    let proxy = match (&config.proxy_prefix, &config.http_proxy) {
        (Some(prefix), _) => ProxyConfig::Prefix(prefix.clone()),
        (None, Some(proxy)) => ProxyConfig::Http(proxy.clone()),
        (None, None) => ProxyConfig::Direct,
    };
    ReqwestFetcher::with_config(Duration::from_secs(config.fetch_timeout), proxy)
        .context("Failed to create HTTP client")
}

fn build_aggregator(config: &Config) -> Result<Aggregator<ReqwestFetcher, HtmlExtractor>> {
    let sources = builtin_sources()
        .iter()
        .map(|profile| {
            let extractor = HtmlExtractor::new(profile)
                .with_context(|| format!("Invalid source profile '{}'", profile.name))?;
            Ok(Source::new(profile.name.clone(), profile.url.clone(), extractor))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Aggregator::new(build_fetcher(config)?, sources))
}

fn build_directory(config: &Config) -> Result<DestinationDirectory> {
    let mut destinations =
        parse_destinations(&config.webhooks).context("Invalid JOBFEED_WEBHOOKS value")?;
    if !destinations.iter().any(|d| d.id == CONSOLE_DESTINATION) {
        destinations.push(Destination {
            id: CONSOLE_DESTINATION.to_string(),
            endpoint: CONSOLE_ENDPOINT.to_string(),
        });
    }
    Ok(DestinationDirectory::from_destinations(destinations))
}

async fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let store = Arc::new(SeenStore::load(&config.store).await);
    let messenger = RoutedMessenger::new().context("Failed to create webhook client")?;
    Ok(PipelineContext::new(
        build_aggregator(config)?,
        store,
        messenger,
        Arc::new(build_directory(config)?),
    ))
}

fn cmd_sources() {
    for (i, profile) in builtin_sources().iter().enumerate() {
        let strategies: Vec<_> = profile.strategies.iter().map(|s| s.name()).collect();
        println!(
            "{}. {} {} ({})",
            i + 1,
            profile.name,
            profile.url,
            strategies.join(" -> ")
        );
    }
}

async fn cmd_fetch(config: &Config, sources: &SourceSelector, limit: usize, json: bool) -> Result<()> {
    let aggregator = build_aggregator(config)?;
    let limit = jobfeed_core::pipeline::clamp_limit(limit);
    let jobs = aggregator
        .aggregate(sources, limit)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(count = jobs.len(), %sources, "Fetch complete");

    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
    } else if jobs.is_empty() {
        println!("{}", jobfeed_core::pipeline::NO_JOBS_TEXT);
    } else {
        for job in &jobs {
            println!("{}", jobfeed_client::console::render_job(job));
        }
    }
    Ok(())
}

async fn cmd_run(config: &Config, destination_id: &str, request: RunRequest) -> Result<()> {
    let pipeline = build_pipeline(config).await?;
    let outcome = pipeline
        .run_pipeline(destination_id, &request)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("Refresh for '{destination_id}' failed"))?;
    tracing::info!(destination = %destination_id, ?outcome, "Run complete");
    Ok(())
}

async fn cmd_serve(
    config: &Config,
    daily: &[DailySpec],
    cron: Option<&str>,
    default_destination: &str,
) -> Result<()> {
    let pipeline = build_pipeline(config).await?;
    let scheduler = Scheduler::new();

    if let Some(expression) = cron {
        scheduler
            .schedule(
                default_destination,
                expression,
                &config.timezone,
                RunRequest::scheduled(),
            )
            .map_err(|e| anyhow::anyhow!(e))
            .context("Invalid JOBFEED_REFRESH_CRON")?;
    }
    for spec in daily {
        let timezone = spec.timezone.as_deref().unwrap_or(&config.timezone);
        scheduler
            .schedule_daily(
                &spec.destination_id,
                spec.hour,
                spec.minute,
                timezone,
                RunRequest::scheduled_in(timezone),
            )
            .map_err(|e| anyhow::anyhow!(e))
            .with_context(|| format!("Invalid --daily for '{}'", spec.destination_id))?;
    }

    let entries = scheduler.entries();
    if entries.is_empty() {
        anyhow::bail!("Nothing to schedule: pass --daily or set JOBFEED_REFRESH_CRON");
    }
    for entry in &entries {
        println!(
            "{} \"{}\" ({}) next: {}",
            entry.destination_id,
            entry.cron.expression(),
            entry.cron.timezone(),
            entry
                .next_fire
                .map(|at| at.with_timezone(&entry.cron.timezone()).to_rfc3339())
                .unwrap_or_else(|| "never".to_string())
        );
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        shutdown.cancel();
    });

    scheduler
        .run(&pipeline, &TracingSchedulerReporter, cancel)
        .await;
    Ok(())
}

async fn cmd_seen(config: &Config, destination: Option<&str>) -> Result<()> {
    let store = SeenStore::load(&config.store).await;
    let snapshot = store.snapshot().await;

    let rows: Vec<_> = snapshot
        .destinations
        .iter()
        .filter(|(id, _)| destination.is_none_or(|d| d == id.as_str()))
        .collect();

    if rows.is_empty() {
        println!("No seen links recorded in {}", store.path().display());
        return Ok(());
    }
    for (id, record) in rows {
        println!("{id}: {} links", record.links.len());
    }
    Ok(())
}
