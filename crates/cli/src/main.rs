//! Coursework CLI - Main Entry Point
//!
//! Release, fetch, submit and inspect notebook assignments from the
//! command line.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

use commands::{assignment, listing};
use coursework_tracker::{AssignmentTracker, TrackerConfig};

/// Coursework - notebook assignment tracker
#[derive(Parser)]
#[command(name = "coursework")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to ~/.coursework/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the store directory
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Course to operate on
    #[arg(long, env = "COURSEWORK_COURSE", global = true)]
    course: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Release an assignment to the exchange
    Release(assignment::ReleaseArgs),

    /// Fetch a released assignment into a local directory
    Fetch(FetchCommand),

    /// Submit a fetched assignment
    Submit(assignment::SubmitArgs),

    /// List released, fetched and submitted assignments
    List(listing::ListArgs),

    /// List the notebooks of an assignment
    Expand(listing::ExpandArgs),

    /// Validate one notebook of a fetched assignment
    Validate(assignment::ValidateArgs),

    /// List known courses
    Courses,

    /// Show store and exchange locations
    Status,

    /// Show version information
    Version,
}

#[derive(clap::Args)]
struct FetchCommand {
    #[command(flatten)]
    args: assignment::FetchArgs,

    /// Replace a non-empty destination
    #[arg(long)]
    overwrite: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<TrackerConfig> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| coursework_common::default_store_path().join("config.toml"));
    let mut config = TrackerConfig::load(&path)?;

    if let Some(store) = &cli.store {
        config.store_path = store.clone();
    }
    if let Commands::Fetch(cmd) = &cli.command {
        config.fetch.allow_overwrite |= cmd.overwrite;
    }
    tracing::debug!("Using store at {:?}", config.store_path);
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Version = cli.command {
        println!("Coursework CLI v{}", coursework_common::VERSION);
        return Ok(());
    }

    let config = load_config(&cli)?;
    let tracker = AssignmentTracker::open(&config).await?;
    let format = cli.format;
    let course = cli.course;

    match cli.command {
        Commands::Release(args) => assignment::release(args, course, &tracker, format).await?,
        Commands::Fetch(cmd) => assignment::fetch(cmd.args, course, &tracker, format).await?,
        Commands::Submit(args) => assignment::submit(args, course, &tracker, format).await?,
        Commands::List(args) => listing::list(args, course, &tracker, format).await?,
        Commands::Expand(args) => listing::expand(args, course, &tracker, format)?,
        Commands::Validate(args) => {
            if !assignment::validate(args, course, &tracker, format).await? {
                std::process::exit(2);
            }
        }
        Commands::Courses => listing::courses(&tracker, format),
        Commands::Status => {
            println!("Store:     {}", config.store_path.display());
            println!("Database:  {}", config.db_path().display());
            println!("Exchange:  {}", config.exchange_root().display());
            println!("Sources:   {}", config.exchange.source_root.display());
            println!("Student:   {}", config.exchange.student_id);
            println!("Courses:   {}", tracker.courses().len());
        }
        Commands::Version => unreachable!("handled before the store is opened"),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<coursework_common::Error>() {
            Some(err) => output::print_error(&format!("{} ({})", err, err.kind())),
            None => output::print_error(&format!("{:#}", e)),
        }
        std::process::exit(1);
    }
}
