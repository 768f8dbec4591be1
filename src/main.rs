use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use pricewatch::adapters::AdapterRegistry;
use pricewatch::pipeline::Pipeline;
use pricewatch::scheduler;
use pricewatch::utils::loader;
use pricewatch::AppConfig;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Competitive price monitoring for e-commerce product pages"
)]
struct Args {
    /// CSV or TXT file with the product URLs to monitor
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Repeat the run every HOURS hours until interrupted
    #[arg(long, value_name = "HOURS")]
    schedule: Option<u64>,

    /// Email a digest of the run once it finishes
    #[arg(long)]
    summary: bool,

    /// List the supported site families and exit
    #[arg(long)]
    sites: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool, logs_dir: &Path) -> Result<WorkerGuard> {
    let default_directives = if verbose {
        "pricewatch=debug,info"
    } else {
        "pricewatch=info,warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    fs::create_dir_all(logs_dir)
        .with_context(|| format!("cannot create log directory {}", logs_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(logs_dir, "pricewatch.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let _guard = init_tracing(args.verbose, &config.storage.logs_dir)?;

    if args.sites {
        let sites = AdapterRegistry::new().supported_sites();
        println!("Sites supportés:");
        for site in &sites {
            println!("  - {site}");
        }
        println!("Total: {} sites", sites.len());
        return Ok(());
    }

    let Some(file) = args.file else {
        bail!("a URL file is required, use -f/--file (or --sites to list adapters)");
    };

    let urls = loader::load_urls(&file)
        .with_context(|| format!("cannot load URL list from {}", file.display()))?;
    if urls.is_empty() {
        bail!("no usable URLs in {}", file.display());
    }

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            signal_cancel.cancel();
        }
    });

    let mut pipeline = Pipeline::new(&config).context("cannot initialize pipeline")?;

    if let Some(hours) = args.schedule {
        if hours == 0 {
            bail!("--schedule must be at least 1 hour");
        }
        scheduler::run_periodic(
            &mut pipeline,
            &urls,
            Duration::from_secs(hours * 3600),
            &cancel,
        )
        .await?;
    } else {
        let outcome = pipeline.run(&urls, &cancel).await?;
        if args.summary {
            pipeline.send_summary(&outcome.summary).await?;
        }
        info!(
            scraped = outcome.records.len(),
            changes = outcome.events.len(),
            alerts = outcome.alerts_sent,
            "run finished"
        );
    }

    Ok(())
}
