//! Read-side listings and lookups.

use anyhow::Result;
use clap::Args;
use custodia_core::CustodyEngine;
use uuid::Uuid;

use crate::output::{self, OutputFormat};

/// Arguments for `custodia list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Evidence item whose entries to list
    pub evidence_id: Uuid,

    /// Include entries awaiting approval
    #[arg(long)]
    pub pending: bool,

    /// Include rejected entries
    #[arg(long)]
    pub rejected: bool,
}

/// Lists an item's custody entries in record order.
pub fn entries(engine: &CustodyEngine, args: &ListArgs, format: OutputFormat) -> Result<()> {
    let entries = engine.list_entries(&args.evidence_id, args.pending, args.rejected)?;
    match format {
        OutputFormat::Text => output::print_entry_table(&entries),
        OutputFormat::Json => output::print_json(&entries)?,
    }
    Ok(())
}

/// Lists registered evidence items, most recent first.
pub fn items(engine: &CustodyEngine, format: OutputFormat) -> Result<()> {
    let items = engine.list_evidence()?;
    match format {
        OutputFormat::Text => output::print_item_table(&items),
        OutputFormat::Json => output::print_json(&items)?,
    }
    Ok(())
}

/// Shows one evidence item.
pub fn show(engine: &CustodyEngine, evidence_id: &Uuid, format: OutputFormat) -> Result<()> {
    let item = engine.get_evidence(evidence_id)?;
    match format {
        OutputFormat::Text => output::print_item(&item),
        OutputFormat::Json => output::print_json(&item)?,
    }
    Ok(())
}

/// Shows one custody entry in full, record hashes included in JSON.
pub fn entry(
    engine: &CustodyEngine,
    evidence_id: &Uuid,
    entry_id: &Uuid,
    format: OutputFormat,
) -> Result<()> {
    let entry = engine.get_entry(evidence_id, entry_id)?;
    match format {
        OutputFormat::Text => output::print_entry(&entry),
        OutputFormat::Json => output::print_json(&entry)?,
    }
    Ok(())
}

/// Lists entries awaiting approval, oldest first.
pub fn pending(
    engine: &CustodyEngine,
    evidence_id: Option<&Uuid>,
    format: OutputFormat,
) -> Result<()> {
    let entries = engine.list_pending(evidence_id)?;
    match format {
        OutputFormat::Text => output::print_pending_table(&entries),
        OutputFormat::Json => output::print_json(&entries)?,
    }
    Ok(())
}

/// Lists the audit side-records of an item.
pub fn side_records(
    engine: &CustodyEngine,
    evidence_id: &Uuid,
    format: OutputFormat,
) -> Result<()> {
    let records = engine.side_records(evidence_id)?;
    match format {
        OutputFormat::Text => output::print_side_records(&records),
        OutputFormat::Json => output::print_json(&records)?,
    }
    Ok(())
}

/// Prints ledger statistics.
pub fn stats(engine: &CustodyEngine, format: OutputFormat) -> Result<()> {
    let stats = engine.stats()?;
    match format {
        OutputFormat::Text => {
            println!("Evidence items:  {}", stats.evidence_count);
            println!("Custody entries: {}", stats.entry_count);
            println!("Pending:         {}", stats.pending_count);
            println!("Side records:    {}", stats.side_record_count);
            println!("Database size:   {} bytes", stats.db_size_bytes);
        },
        OutputFormat::Json => output::print_json(&stats)?,
    }
    Ok(())
}
