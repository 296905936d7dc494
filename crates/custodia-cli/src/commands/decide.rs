//! Approval decisions on pending entries.
//!
//! Sensitive custody actions park as `PENDING` and must be decided by a
//! second operator. The engine refuses self-decisions and re-decisions;
//! those surface here as ordinary errors with the conflict spelled out.

use anyhow::Result;
use clap::Args;
use custodia_core::CustodyEngine;
use uuid::Uuid;

use crate::output::{self, OutputFormat};

/// Arguments for `custodia approve`.
#[derive(Args, Debug)]
pub struct ApproveArgs {
    /// Evidence item the entry belongs to
    pub evidence_id: Uuid,

    /// Entry to approve
    pub entry_id: Uuid,

    /// Deciding operator; must differ from the recording operator
    #[arg(long = "by")]
    pub approver: String,
}

/// Approves a pending entry; it joins the active chain on success.
pub fn approve(engine: &CustodyEngine, args: &ApproveArgs, format: OutputFormat) -> Result<()> {
    let entry = engine.approve_entry(&args.evidence_id, &args.entry_id, &args.approver)?;

    match format {
        OutputFormat::Text => {
            let chain_no = entry
                .chain_no
                .map_or_else(|| "-".to_string(), |n| n.to_string());
            println!("Approved entry {} (chain position {chain_no})", entry.id);
        },
        OutputFormat::Json => output::print_json(&entry)?,
    }
    Ok(())
}

/// Arguments for `custodia reject`.
#[derive(Args, Debug)]
pub struct RejectArgs {
    /// Evidence item the entry belongs to
    pub evidence_id: Uuid,

    /// Entry to reject
    pub entry_id: Uuid,

    /// Deciding operator; must differ from the recording operator
    #[arg(long = "by")]
    pub approver: String,

    /// Why the entry is rejected
    #[arg(long)]
    pub reason: String,
}

/// Rejects a pending entry; it stays on record but never joins the chain.
pub fn reject(engine: &CustodyEngine, args: &RejectArgs, format: OutputFormat) -> Result<()> {
    let entry = engine.reject_entry(
        &args.evidence_id,
        &args.entry_id,
        &args.approver,
        &args.reason,
    )?;

    match format {
        OutputFormat::Text => println!("Rejected entry {}", entry.id),
        OutputFormat::Json => output::print_json(&entry)?,
    }
    Ok(())
}
