use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nasdaq-scanner")]
#[command(about = "Weekly RSI / Stochastic RSI buy-signal scanner for the NASDAQ-100", long_about = None)]
pub struct Cli {
    /// Storage directory for config and results (defaults to `storage` next to the binary)
    #[arg(short, long, global = true)]
    pub storage: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch prices, compute indicators and save the report
    Update,
    /// Print the last saved report
    Table {
        /// Clear the terminal before printing
        #[arg(long)]
        clear: bool,
    },
    /// Update, then print the report
    Run,
    /// Interactive view of the last report (F5 refreshes)
    Tui,
}
