use anyhow::Result;
use clap::Parser;
use nasdaq_scanner::cli::{Cli, Commands};
use nasdaq_scanner::storage_utils::AsyncStorageManager;
use nasdaq_scanner::{analysis, comfy_table, tui};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn init_logging(command: &Commands) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    // Anything written to the terminal would tear the alternate screen.
    if matches!(command, Commands::Tui) {
        builder.with_writer(std::io::sink).init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.command);

    let storage = match cli.storage {
        Some(dir) => AsyncStorageManager::new(dir).await?,
        None => AsyncStorageManager::new_relative("storage").await?,
    };

    match cli.command {
        Commands::Update => {
            analysis::run_analysis_pipeline(&storage).await?;
        }
        Commands::Table { clear } => {
            let batch = analysis::load_report(&storage).await?;
            comfy_table::run(&batch, clear)?;
        }
        Commands::Run => {
            let batch = analysis::run_analysis_pipeline(&storage).await?;
            if let Err(e) = comfy_table::run(&batch, false) {
                error!(error = %e, "Error displaying table");
            }
        }
        Commands::Tui => {
            tui::run_tui(&storage).await?;
        }
    }

    Ok(())
}
