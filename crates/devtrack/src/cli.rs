//! Command-line interface definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DevTrack ticket tracker
///
/// Create tickets and move them through To Do, In Progress, Testing, and Deployed.
///
/// Exit Codes:
///   0  - Command succeeded
///   1  - Generic or storage error
///   2  - Invalid arguments or usage error
///   3  - Ticket not found
///   4  - Validation or workflow failure
#[derive(Parser, Debug)]
#[command(name = "devtrack")]
#[command(about = "DevTrack ticket tracker", long_about = None)]
pub struct Cli {
    /// Storage URL: memory, file:<path>, or sqlite:<path>
    #[arg(long, global = true, env = "DEVTRACK_STORAGE")]
    pub storage: Option<String>,

    /// Path to a TOML config file
    #[arg(long, global = true, env = "DEVTRACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all tickets in creation order
    List,

    /// Show one ticket
    Show {
        /// Ticket id
        id: u64,
    },

    /// Create a ticket
    Create {
        /// Short summary
        #[arg(short, long)]
        title: String,

        /// Initial status, e.g. "To Do" (any label; only workflow statuses can advance)
        #[arg(short, long)]
        status: String,
    },

    /// Edit a ticket's title and/or status without workflow checks
    Update {
        /// Ticket id
        id: u64,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Move a ticket to the next workflow status
    Advance {
        /// Ticket id
        id: u64,
    },

    /// Delete a ticket
    Delete {
        /// Ticket id
        id: u64,
    },

    /// Show ticket counts per status
    Status,
}
