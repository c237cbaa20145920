use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use oergraph_common::Config;
use oergraph_crawler::dedup::{DedupCache, JsonFileStore};
use oergraph_crawler::sink::{CsvSinks, DEDUP_FILE};
use oergraph_crawler::verify::verify_data_dir;
use oergraph_crawler::{CrawlSettings, Crawler};
use wikipedia_client::WikipediaClient;
use x5gon_client::X5gonClient;

#[derive(Parser)]
#[command(name = "oergraph-crawl")]
#[command(about = "Crawl the X5GON catalog into material, concept and link tables")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a crawl
    Crawl {
        /// Resume from this page URL instead of the first page. Existing
        /// tables are appended to and material tags continue after them.
        #[arg(long)]
        start_url: Option<String>,

        /// Stop after this many pages. Stopping there is a successful run;
        /// the URL to resume from is logged and printed in the summary.
        #[arg(long)]
        max_pages: Option<u32>,

        /// Output directory (overrides DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Check the tables in a data directory for broken references
    Verify {
        /// Output directory (overrides DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.json_logs) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("oergraph=info".parse()?)
        .add_directive("x5gon_client=info".parse()?)
        .add_directive("wikipedia_client=info".parse()?);
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

async fn run(command: Commands) -> Result<ExitCode> {
    let mut config = Config::from_env()?;

    match command {
        Commands::Crawl {
            start_url,
            max_pages,
            data_dir,
        } => {
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            config.log_summary();
            crawl(&config, start_url, max_pages).await
        }
        Commands::Verify { data_dir } => {
            let dir = data_dir.unwrap_or(config.data_dir);
            let report = verify_data_dir(&dir)
                .with_context(|| format!("reading tables under {}", dir.display()))?;
            println!("{report}");
            Ok(if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

async fn crawl(config: &Config, start_url: Option<String>, max_pages: Option<u32>) -> Result<ExitCode> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .user_agent(config.user_agent.as_str())
        .build()
        .context("building HTTP client")?;

    let catalog = X5gonClient::new(http.clone(), &config.catalog_url)
        .with_window(config.page_size, config.start_offset);
    let knowledge = WikipediaClient::new(http, &config.wikipedia_api_url);

    let store = JsonFileStore::new(config.data_dir.join(DEDUP_FILE));
    let store_path = store.path().display().to_string();
    let cache = DedupCache::load(Box::new(store))
        .with_context(|| format!("loading dedup store {store_path}"))?;

    let sink = match start_url {
        Some(_) => CsvSinks::resume(&config.data_dir),
        None => CsvSinks::open(&config.data_dir),
    }
    .context("opening output tables")?;

    let settings = CrawlSettings {
        max_pages,
        first_material_tag: sink.next_material_tag(),
        start_url,
        ..CrawlSettings::from_config(config)
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current material");
            on_signal.cancel();
        }
    });

    let crawler = Crawler::new(
        Arc::new(catalog),
        Arc::new(knowledge),
        Box::new(sink),
        cache,
        settings,
        cancel,
    );

    match crawler.run().await {
        Ok(stats) => {
            info!("{stats}");
            if let Some(resume) = &stats.resume_url {
                warn!(resume_url = resume.as_str(), "Catalog not exhausted, rerun with --start-url to continue");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            error!(%failure, "Crawl failed");
            if let Some(resume) = &failure.resume_cursor {
                info!(resume_url = resume.as_str(), "Rerun with --start-url to continue");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
