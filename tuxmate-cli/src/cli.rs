use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "tuxmate",
    about = "Recurring maintenance-task scheduler for the Tuxmate assistant"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List all scheduled maintenance tasks.
    List,
    /// Schedule a task described by a JSON payload file.
    Add {
        /// Path to the task payload.
        payload: PathBuf,
    },
    /// Delete a scheduled task.
    Remove {
        /// Task id.
        id: String,
    },
    /// Flip a task between enabled and disabled.
    Toggle {
        /// Task id.
        id: String,
    },
    /// Report which scheduling mechanisms this host supports.
    Detect,
}
