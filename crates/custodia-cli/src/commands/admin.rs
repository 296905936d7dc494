//! Administrative operations: entry deletion and disposal marking.
//!
//! Both require an elevated role (`elevated_roles` in the configuration)
//! and both leave an audit trail. Deletion snapshots the removed entry
//! into the item's side-records before the row goes; the hole it leaves
//! in the record hash chain stays detectable by `verify-chain`.

use anyhow::Result;
use clap::Args;
use custodia_core::CustodyEngine;
use uuid::Uuid;

use crate::output::{self, OutputFormat};

/// Arguments for `custodia delete-entry`.
#[derive(Args, Debug)]
pub struct DeleteEntryArgs {
    /// Evidence item the entry belongs to
    pub evidence_id: Uuid,

    /// Entry to delete
    pub entry_id: Uuid,

    /// Operator performing the deletion; must hold an elevated role
    #[arg(long = "by")]
    pub actor: String,

    /// Why the entry is being deleted
    #[arg(long)]
    pub reason: String,
}

/// Administratively deletes a custody entry.
pub fn delete_entry(
    engine: &CustodyEngine,
    args: &DeleteEntryArgs,
    format: OutputFormat,
) -> Result<()> {
    let entry = engine.delete_entry(&args.evidence_id, &args.entry_id, &args.actor, &args.reason)?;

    match format {
        OutputFormat::Text => {
            println!("Deleted entry {} (sequence {})", entry.id, entry.sequence_no);
            println!("The removed entry is preserved in the item's side records");
        },
        OutputFormat::Json => output::print_json(&entry)?,
    }
    Ok(())
}

/// Arguments for `custodia dispose`.
#[derive(Args, Debug)]
pub struct DisposeArgs {
    /// Evidence item to mark disposed
    pub evidence_id: Uuid,

    /// Operator recording the disposal; must hold an elevated role
    #[arg(long = "by")]
    pub actor: String,
}

/// Marks an item disposed.
///
/// Disposal is a soft mark: the history stays readable and verifiable,
/// but plain appends are refused from here on. Corrective appends stay
/// open for after-the-fact record repair.
pub fn dispose(engine: &CustodyEngine, args: &DisposeArgs, format: OutputFormat) -> Result<()> {
    let item = engine.mark_disposed(&args.evidence_id, &args.actor)?;

    match format {
        OutputFormat::Text => println!("Marked evidence {} disposed", item.id),
        OutputFormat::Json => output::print_json(&item)?,
    }
    Ok(())
}
