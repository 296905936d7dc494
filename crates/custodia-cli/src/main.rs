//! custodia - evidence chain-of-custody command line.
//!
//! Drives the custody engine against a configured SQLite ledger and a
//! directory-backed content vault. Exit codes are uniform across
//! commands:
//!
//! - 0: success, clean result
//! - 1: operational error (bad input, missing records, storage failure)
//! - 2: integrity or continuity finding

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use custodia_core::CustodyError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod commands;
mod fs_vault;
mod output;

use output::{exit_codes, OutputFormat};

/// custodia - evidence chain-of-custody ledger
#[derive(Parser, Debug)]
#[command(name = "custodia")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the engine configuration file
    #[arg(short, long, default_value = "custodia.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Output format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    // === Registry ===
    /// Register a new evidence item
    Register(commands::register::RegisterArgs),

    /// Show one evidence item
    Show {
        /// Evidence item id
        evidence_id: Uuid,
    },

    /// List registered evidence items
    #[command(alias = "ls")]
    Items,

    // === Custody ledger ===
    /// Append a custody entry to an item's ledger
    Append(commands::append::AppendArgs),

    /// List an item's custody entries
    List(commands::list::ListArgs),

    /// Show one custody entry
    Entry {
        /// Evidence item id
        evidence_id: Uuid,

        /// Entry id
        entry_id: Uuid,
    },

    // === Approvals ===
    /// List entries awaiting approval
    Pending {
        /// Restrict the queue to one evidence item
        evidence_id: Option<Uuid>,
    },

    /// Approve a pending custody entry
    Approve(commands::decide::ApproveArgs),

    /// Reject a pending custody entry
    Reject(commands::decide::RejectArgs),

    // === Integrity ===
    /// Validate hand-over continuity of an item's active chain
    Validate {
        /// Evidence item id
        evidence_id: Uuid,
    },

    /// Recompute and compare an item's content fingerprint
    Verify {
        /// Evidence item id
        evidence_id: Uuid,
    },

    /// Verify an item's record hash chain
    VerifyChain {
        /// Evidence item id
        evidence_id: Uuid,
    },

    // === Audit & administration ===
    /// List an item's audit side records
    SideRecords {
        /// Evidence item id
        evidence_id: Uuid,
    },

    /// Administratively delete a custody entry
    DeleteEntry(commands::admin::DeleteEntryArgs),

    /// Mark an evidence item disposed
    Dispose(commands::admin::DisposeArgs),

    /// Show ledger statistics
    Stats,
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let code = match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            err.downcast_ref::<CustodyError>()
                .map_or(exit_codes::ERROR, output::exit_code_for)
        },
    };
    std::process::exit(i32::from(code));
}

fn run(cli: &Cli) -> Result<u8> {
    let config = commands::load_config(&cli.config)?;
    let engine = commands::open_engine(&config)?;
    let format = cli.format;

    match &cli.command {
        Commands::Register(args) => {
            commands::register::run(&engine, args, format)?;
            Ok(exit_codes::SUCCESS)
        },
        Commands::Show { evidence_id } => {
            commands::list::show(&engine, evidence_id, format)?;
            Ok(exit_codes::SUCCESS)
        },
        Commands::Items => {
            commands::list::items(&engine, format)?;
            Ok(exit_codes::SUCCESS)
        },
        Commands::Append(args) => commands::append::run(&engine, args, format),
        Commands::List(args) => {
            commands::list::entries(&engine, args, format)?;
            Ok(exit_codes::SUCCESS)
        },
        Commands::Entry {
            evidence_id,
            entry_id,
        } => {
            commands::list::entry(&engine, evidence_id, entry_id, format)?;
            Ok(exit_codes::SUCCESS)
        },
        Commands::Pending { evidence_id } => {
            commands::list::pending(&engine, evidence_id.as_ref(), format)?;
            Ok(exit_codes::SUCCESS)
        },
        Commands::Approve(args) => {
            commands::decide::approve(&engine, args, format)?;
            Ok(exit_codes::SUCCESS)
        },
        Commands::Reject(args) => {
            commands::decide::reject(&engine, args, format)?;
            Ok(exit_codes::SUCCESS)
        },
        Commands::Validate { evidence_id } => {
            commands::validate::continuity(&engine, evidence_id, format)
        },
        Commands::Verify { evidence_id } => commands::verify::run(&engine, evidence_id, format),
        Commands::VerifyChain { evidence_id } => {
            commands::validate::chain(&engine, evidence_id, format)
        },
        Commands::SideRecords { evidence_id } => {
            commands::list::side_records(&engine, evidence_id, format)?;
            Ok(exit_codes::SUCCESS)
        },
        Commands::DeleteEntry(args) => {
            commands::admin::delete_entry(&engine, args, format)?;
            Ok(exit_codes::SUCCESS)
        },
        Commands::Dispose(args) => {
            commands::admin::dispose(&engine, args, format)?;
            Ok(exit_codes::SUCCESS)
        },
        Commands::Stats => {
            commands::list::stats(&engine, format)?;
            Ok(exit_codes::SUCCESS)
        },
    }
}
