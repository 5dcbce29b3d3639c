use crate::{commands::Commands, error::CliError};
use clap::Parser;
use engine_config::{settings::task::TaskConfig, templates};
use engine_runtime::execution::executor;
use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod error;
mod output;

#[derive(Parser)]
#[command(
    name = "conveyor",
    version,
    about = "Extracts records from files and databases onto a Redis queue, resumably"
)]
struct Cli {
    #[arg(short, long, global = true, help = "Print debug information")]
    verbose: bool,

    #[arg(
        long,
        global = true,
        help = "File that receives DEBUG logging in addition to the console"
    )]
    debug_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug_file.as_deref())?;

    match cli.command {
        Commands::Sync { task, sync } => {
            let mut config = TaskConfig::load(&task.config)?;
            config.apply_overrides(&sync.overrides())?;
            let report = executor::sync(&config).await?;
            info!(
                "Synced {} records of {} in {} pages ({:.2?})",
                report.metrics.records_pushed, report.source, report.pages, report.elapsed
            );
        }
        Commands::Monitor { task, json } => {
            let config = TaskConfig::load(&task.config)?;
            let status = executor::status(&config).await?;
            output::print_status(&status, json)?;
        }
        Commands::Clear { task, scope } => {
            let config = TaskConfig::load(&task.config)?;
            executor::clear(&config, scope.into()).await?;
        }
        Commands::New { task_type, output } => {
            let template = templates::template_for(task_type.into());
            match output {
                Some(path) => {
                    std::fs::write(&path, template)?;
                    info!("Task template saved to {}", path.display());
                }
                None => print!("{template}"),
            }
        }
    }

    Ok(())
}

/// Console at INFO (DEBUG with `--verbose`, `RUST_LOG` wins when set), plus an
/// optional plain-text DEBUG file.
fn init_logging(verbose: bool, debug_file: Option<&Path>) -> Result<(), CliError> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let console_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let console = fmt::layer().with_target(false).with_filter(console_filter);

    let file_layer = match debug_file {
        Some(path) => {
            let file = File::create(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))
}
