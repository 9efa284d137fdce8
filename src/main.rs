use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobharvest::config::Config;
use jobharvest::models::SearchQuery;
use jobharvest::pipeline::{Orchestrator, Schedule};
use jobharvest::storage::{SharedStore, SqliteStore, SCHEMA};

#[derive(Parser)]
#[command(
    name = "jobharvest",
    version,
    about = "Job posting ingestion pipeline: boards, APIs and employer careers pages",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

/// Search overrides shared by the scraping commands
#[derive(Args, Debug, Clone, Default)]
struct QueryArgs {
    /// Search keywords
    #[arg(short, long)]
    keywords: Option<String>,

    /// Search location
    #[arg(short, long)]
    location: Option<String>,

    /// Maximum results per connector
    #[arg(short, long)]
    max_results: Option<usize>,
}

impl QueryArgs {
    fn apply(&self, base: &SearchQuery) -> SearchQuery {
        SearchQuery {
            keywords: self.keywords.clone().unwrap_or_else(|| base.keywords.clone()),
            location: self.location.clone().unwrap_or_else(|| base.location.clone()),
            max_results: self.max_results.unwrap_or(base.max_results),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    InitDb {
        /// Print the schema instead of applying it
        #[arg(long, default_value = "false")]
        print: bool,
    },

    /// Fill the employer registry from ranking pages and the seed file
    FetchEmployers,

    /// Resolve missing employer careers URLs
    DiscoverUrls,

    /// Run every connector and the careers-page harvest
    ScrapeJobs {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Write workbook and CSV snapshots of the job store
    Export {
        /// Output directory (overrides config)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Run every stage in order
    RunAll {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Run every stage on a fixed interval until Ctrl-C
    Schedule {
        /// Seconds between runs (overrides config)
        #[arg(long)]
        interval_secs: Option<u64>,

        #[command(flatten)]
        query: QueryArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }

    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;
    config.validate().context("Invalid configuration")?;

    tracing::info!("jobharvest starting");

    match cli.command {
        Commands::InitDb { print } => {
            if print {
                println!("{}", SCHEMA.trim());
            } else {
                open_store(&config)?;
                println!("Schema ready at {}", config.database.path.display());
            }
        }

        Commands::FetchEmployers => {
            let mut orchestrator = build_orchestrator(config)?;
            let report = orchestrator.fetch_employers().await?;
            println!(
                "Employers: {} new, {} existing, {} resolved from seed, {} dropped",
                report.inserted, report.existing, report.resolved_from_seed, report.dropped
            );
        }

        Commands::DiscoverUrls => {
            let orchestrator = build_orchestrator(config)?;
            let report = orchestrator.discover_urls().await?;
            println!(
                "Discovery: {} resolved ({} lookup, {} heuristic), {} missed",
                report.resolved(),
                report.resolved_by_lookup,
                report.resolved_by_heuristic,
                report.missed
            );
        }

        Commands::ScrapeJobs { query } => {
            let query = query.apply(&config.search);
            tracing::info!(
                keywords = %query.keywords,
                location = %query.location,
                max_results = query.max_results,
                "Starting scrape-jobs command"
            );
            let mut orchestrator = build_orchestrator(config)?;
            for report in orchestrator.scrape_jobs(&query).await? {
                match &report.error {
                    Some(e) => println!("{}: FAILED ({e})", report.name),
                    None => println!("{}: found {} ({})", report.name, report.found, report.ingest),
                }
            }
        }

        Commands::Export { dir } => {
            if let Some(dir) = dir {
                config.export.dir = dir;
            }
            let orchestrator = build_orchestrator(config)?;
            let report = orchestrator.export().await?;
            println!(
                "Exported {} rows x {} columns\n  {}\n  {}",
                report.rows,
                report.columns,
                report.workbook_path.display(),
                report.csv_path.display()
            );
        }

        Commands::RunAll { query } => {
            let query = query.apply(&config.search);
            let mut orchestrator = build_orchestrator(config)?;
            let summary = orchestrator.run_all(&query).await;
            print!("{summary}");
        }

        Commands::Schedule {
            interval_secs,
            query,
        } => {
            let query = query.apply(&config.search);
            if let Some(secs) = interval_secs {
                config.schedule.interval_secs = secs;
            }
            let schedule = Schedule::new(config.schedule_interval())?;
            let mut orchestrator = build_orchestrator(config)?;
            let runs = schedule.run(&mut orchestrator, &query).await;
            println!("Schedule stopped after {runs} run(s)");
        }
    }

    tracing::info!("jobharvest finished");
    Ok(())
}

fn open_store(config: &Config) -> Result<SharedStore> {
    let store = SqliteStore::open(&config.database.path).with_context(|| {
        format!("Failed to open database at {}", config.database.path.display())
    })?;
    Ok(Arc::new(store))
}

fn build_orchestrator(config: Config) -> Result<Orchestrator> {
    let store = open_store(&config)?;
    Orchestrator::builder(config, store)
        .build()
        .context("Failed to build pipeline")
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("jobharvest=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("jobharvest={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
