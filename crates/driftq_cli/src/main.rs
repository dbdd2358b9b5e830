//! DriftQ CLI
//!
//! Command-line tools for inspecting and driving a file-backed sync queue.
//!
//! # Commands
//!
//! - `inspect` - Display queue statistics
//! - `list` - List queue items
//! - `enqueue` - Append one item to the queue
//! - `process` - Run one processing pass against the simulated adapter
//! - `retry` - Reset failed and conflicted items to pending
//! - `clear` - Bulk-delete items
//! - `compact` - Rewrite the journal, dropping superseded records

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// DriftQ command-line sync queue tools.
#[derive(Parser)]
#[command(name = "driftq")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the queue journal file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Tenant to operate on
    #[arg(global = true, short, long)]
    tenant: Option<String>,

    /// Enable verbose output
    #[arg(global = true, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display queue statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List queue items
    List {
        /// Only show items with this status
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum number of items to show
        #[arg(short, long, default_value = "50")]
        limit: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Append one item to the queue
    Enqueue {
        /// Target entity collection
        #[arg(long)]
        store: String,

        /// Target entity id
        #[arg(long)]
        entity: String,

        /// Action (create, update, delete, upsert, ...)
        #[arg(long, default_value = "update")]
        action: String,

        /// Entity payload as a JSON object (omit for deletes)
        #[arg(long)]
        payload: Option<String>,

        /// Priority (low, normal, high, critical)
        #[arg(long, default_value = "normal")]
        priority: String,

        /// Correlation id grouping related items
        #[arg(long)]
        correlation_id: Option<String>,

        /// Override the delivery attempt ceiling
        #[arg(long)]
        max_attempts: Option<u32>,
    },

    /// Run one processing pass against the simulated adapter.
    ///
    /// A development tool: outcomes are randomized, not real deliveries.
    Process {
        /// Items to process in this pass
        #[arg(short, long, default_value = "10")]
        batch_size: usize,

        /// Simulated failure probability (0.0 - 1.0)
        #[arg(long, default_value = "0.1")]
        failure_rate: f64,

        /// Simulated conflict probability (0.0 - 1.0)
        #[arg(long, default_value = "0.05")]
        conflict_rate: f64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Reset failed and conflicted items to pending
    Retry {
        /// Only reset items below this attempt count
        #[arg(long)]
        max_retries: Option<u32>,

        /// Only reset items targeting this store
        #[arg(long)]
        store: Option<String>,

        /// Only reset items targeting this entity
        #[arg(long)]
        entity: Option<String>,
    },

    /// Bulk-delete items
    Clear {
        /// Only delete items with these statuses (repeatable)
        #[arg(short, long)]
        status: Vec<String>,

        /// Only delete items targeting this store
        #[arg(long)]
        store: Option<String>,

        /// Only delete items enqueued more than this many seconds ago
        #[arg(long)]
        older_than_secs: Option<i64>,
    },

    /// Rewrite the journal, dropping superseded records
    Compact,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Cli {
        path,
        tenant,
        verbose,
        command,
    } = Cli::parse();

    // Initialize logging
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let path = || path.clone().ok_or("Queue path required (--path)");
    let tenant = || tenant.clone().ok_or("Tenant required (--tenant)");

    match command {
        Commands::Inspect { format } => {
            commands::inspect::run(&path()?, &tenant()?, &format)?;
        }
        Commands::List {
            status,
            limit,
            format,
        } => {
            commands::list::run(&path()?, &tenant()?, status.as_deref(), limit, &format)?;
        }
        Commands::Enqueue {
            store,
            entity,
            action,
            payload,
            priority,
            correlation_id,
            max_attempts,
        } => {
            commands::enqueue::run(
                &path()?,
                &tenant()?,
                &store,
                &entity,
                &action,
                payload.as_deref(),
                &priority,
                correlation_id.as_deref(),
                max_attempts,
            )?;
        }
        Commands::Process {
            batch_size,
            failure_rate,
            conflict_rate,
            format,
        } => {
            commands::process::run(
                &path()?,
                &tenant()?,
                batch_size,
                failure_rate,
                conflict_rate,
                &format,
            )?;
        }
        Commands::Retry {
            max_retries,
            store,
            entity,
        } => {
            commands::retry::run(
                &path()?,
                &tenant()?,
                max_retries,
                store.as_deref(),
                entity.as_deref(),
            )?;
        }
        Commands::Clear {
            status,
            store,
            older_than_secs,
        } => {
            commands::clear::run(
                &path()?,
                &tenant()?,
                &status,
                store.as_deref(),
                older_than_secs,
            )?;
        }
        Commands::Compact => {
            commands::compact::run(&path()?)?;
        }
        Commands::Version => {
            println!("DriftQ CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
