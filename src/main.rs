//! scholar-export - search Google Scholar and export citations
//!
//! ## Usage
//!
//! ```bash
//! scholar-export search "graph neural networks" --max-results 20 --format csv,xlsx
//! scholar-export search "machine learning, deep learning" --operator or --year-from 2018
//! scholar-export config init
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scholar_export::config::Config;
use scholar_export::exporter::ExportFormat;
use scholar_export::fetcher::ProxyConfig;
use scholar_export::query::{compose_phrase, BooleanOperator, SearchQuery};
use scholar_export::session::{SearchReport, SearchSession};
use scholar_export::{CitationRecord, ScholarError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Search Google Scholar and export citations to CSV/XLSX
#[derive(Parser)]
#[command(name = "scholar-export")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Config file (default: <config dir>/scholar-export/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search Google Scholar and export the results
    Search(SearchArgs),

    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Search keywords, comma-separated
    keywords: String,

    /// How keywords are combined: and, or, plain
    #[arg(long, default_value = "and")]
    operator: BooleanOperator,

    /// Results from this year onwards
    #[arg(long)]
    year_from: Option<i32>,

    /// Results up to this year
    #[arg(long)]
    year_to: Option<i32>,

    /// Maximum number of results (1-1000)
    #[arg(short = 'n', long, default_value = "50")]
    max_results: u32,

    /// Results per page (1-20)
    #[arg(long)]
    page_size: Option<u32>,

    /// Proxy host
    #[arg(long, requires = "proxy_port")]
    proxy_host: Option<String>,

    /// Proxy port
    #[arg(long, requires = "proxy_host")]
    proxy_port: Option<u16>,

    /// Proxy username
    #[arg(long, requires = "proxy_host")]
    proxy_user: Option<String>,

    /// Proxy password
    #[arg(long, requires = "proxy_user")]
    proxy_pass: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Export formats, comma-separated: csv, xlsx
    #[arg(short, long, value_delimiter = ',')]
    format: Vec<ExportFormat>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output file name (extension added per format)
    #[arg(long)]
    file_name: Option<String>,

    /// Print results as JSON instead of a listing
    #[arg(long)]
    json: bool,

    /// Only print results, do not write files
    #[arg(long)]
    no_export: bool,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show config file path
    Path,
    /// Write a default config file
    Init,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let outcome = match cli.command {
        Commands::Search(args) => run_search(cli.config, args).await,
        Commands::Config { action } => handle_config(cli.config, action),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            if let Some(scholar) = e.downcast_ref::<ScholarError>() {
                eprintln!("Hint: {}", scholar.hint());
            }
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Search
// ============================================================================

async fn run_search(config_path: Option<PathBuf>, args: SearchArgs) -> Result<()> {
    let mut config = Config::resolve(config_path.as_deref())?;
    apply_overrides(&mut config, &args);

    let keywords: Vec<&str> = args.keywords.split(',').collect();
    let phrase = compose_phrase(&keywords, args.operator);

    let query = SearchQuery::new(phrase)
        .with_years(args.year_from, args.year_to)
        .with_max_results(args.max_results)
        .with_page_size(config.search.page_size);

    let mut session = SearchSession::from_config(&config)?;
    let outcome = session.search(&query).await;
    let (report, failure) = keep_partial_results(outcome, session.store().len())?;

    if session.store().is_empty() {
        println!("No results from Google Scholar.");
        return Ok(());
    }

    match (&report, &failure) {
        (Some(report), _) => println!(
            "Found {} results from Google Scholar ({} of {} pages).",
            report.records, report.pages_fetched, report.pages_requested
        ),
        (None, Some(e)) => {
            warn!(error = %e, kept = session.store().len(), "Search stopped early");
            println!(
                "Search stopped early ({}); keeping {} results collected so far.",
                e,
                session.store().len()
            );
        }
        (None, None) => {}
    }

    if args.json {
        let json = serde_json::to_string_pretty(session.store().snapshot())
            .context("Failed to serialize results")?;
        println!("{}", json);
    } else {
        print_results(session.store().snapshot());
    }

    if args.no_export {
        return Ok(());
    }

    let directory = &config.output.directory;
    for format in &config.output.formats {
        let path = match &args.file_name {
            Some(name) => session.export(*format, directory.join(with_extension(name, *format)))?,
            None => session.export_to_dir(*format, directory, &query.phrase)?,
        };
        println!("Saved: {}", path.display());
    }

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Turn a search outcome into the report to show and the error to raise
/// once the collected results have been listed and exported.
///
/// A failure with nothing collected is returned straight away.
fn keep_partial_results(
    outcome: scholar_export::Result<SearchReport>,
    collected: usize,
) -> scholar_export::Result<(Option<SearchReport>, Option<ScholarError>)> {
    match outcome {
        Ok(report) => Ok((Some(report), None)),
        Err(e) if collected == 0 => Err(e),
        Err(e) => Ok((None, Some(e))),
    }
}

fn apply_overrides(config: &mut Config, args: &SearchArgs) {
    if let Some(page_size) = args.page_size {
        config.search.page_size = page_size;
    }
    if let (Some(host), Some(port)) = (&args.proxy_host, args.proxy_port) {
        let mut proxy = ProxyConfig::new(host.clone(), port);
        if let Some(user) = &args.proxy_user {
            proxy = proxy.with_credentials(user.clone(), args.proxy_pass.clone().unwrap_or_default());
        }
        config.proxy = Some(proxy);
    }
    if let Some(timeout) = args.timeout {
        config.network.timeout_secs = timeout.max(1);
    }
    if !args.format.is_empty() {
        config.output.formats = args.format.clone();
    }
    if let Some(output) = &args.output {
        config.output.directory = output.clone();
    }
}

fn with_extension(name: &str, format: ExportFormat) -> String {
    let stem = name
        .strip_suffix(&format!(".{}", format.extension()))
        .unwrap_or(name);
    format!("{}.{}", stem, format.extension())
}

fn print_results(records: &[CitationRecord]) {
    for (i, record) in records.iter().enumerate() {
        println!("{}. {}", i + 1, record.title);
        println!("   Authors: {}", record.authors.join(", "));
        println!(
            "   Year: {}",
            record.year().map(|y| y.to_string()).unwrap_or_default()
        );
        println!(
            "   Citations: {}",
            record.cited_by.map(|n| n.to_string()).unwrap_or_default()
        );
        println!("   URL: {}", record.url.as_deref().unwrap_or(""));
        if let Some(snippet) = &record.snippet {
            let short: String = snippet.chars().take(200).collect();
            let ellipsis = if short.len() < snippet.len() { "..." } else { "" };
            println!("   Abstract: {}{}", short, ellipsis);
        }
        println!("{}\n", "-".repeat(80));
    }
}

// ============================================================================
// Config Management
// ============================================================================

fn handle_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    match action {
        ConfigAction::Path => {
            println!("Config file: {}", path.display());
        }
        ConfigAction::Init => {
            if path.exists() {
                anyhow::bail!("Config file already exists: {}", path.display());
            }
            Config::default().save(&path)?;
            println!("Wrote default config to {}", path.display());
        }
    }

    Ok(())
}
