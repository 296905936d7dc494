//! Output rendering for command results.
//!
//! Every command prints either human-readable text or pretty JSON. Findings
//! (continuity gaps, fingerprint mismatches, broken hash chains) indicate
//! potential evidentiary compromise and are kept apart from ordinary
//! errors: they render as a block on stderr and carry a dedicated exit
//! code, so scripted callers cannot lose them in ordinary failure handling.

use anyhow::Result;
use clap::ValueEnum;
use custodia_core::{CustodyEntry, CustodyError, EvidenceItem, SideRecord};

/// Process exit codes shared by all custodia commands.
pub mod exit_codes {
    /// Success; clean result.
    pub const SUCCESS: u8 = 0;

    /// Operational error (bad input, missing records, storage failure).
    pub const ERROR: u8 = 1;

    /// Integrity or continuity finding.
    pub const FINDING: u8 = 2;
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,

    /// Pretty-printed JSON.
    Json,
}

/// Maps an engine error to the process exit code.
///
/// A refused out-of-sequence append and a broken record hash chain are
/// findings; every other kind is an operational error.
#[must_use]
pub fn exit_code_for(err: &CustodyError) -> u8 {
    match err {
        CustodyError::SequenceViolation { .. } | CustodyError::ChainBroken { .. } => {
            exit_codes::FINDING
        },
        _ => exit_codes::ERROR,
    }
}

/// Prints a value as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Renders a finding block on stderr.
pub fn print_finding(title: &str, details: &[(&str, String)]) {
    eprintln!("FINDING: {title}");
    let width = details.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    for (key, value) in details {
        eprintln!("  {key:<width$}  {value}");
    }
}

/// Prints an evidence item as aligned key-value text.
pub fn print_item(item: &EvidenceItem) {
    println!("Evidence:    {}", item.id);
    println!("Label:       {}", item.label);
    println!("Category:    {}", item.category);
    println!("Location:    {}", item.storage_location);
    if !item.retention_policy.is_empty() {
        println!("Retention:   {}", item.retention_policy);
    }
    match &item.registered_fingerprint {
        Some(fingerprint) => println!("Fingerprint: {fingerprint}"),
        None => println!("Fingerprint: (none)"),
    }
    println!(
        "Registered:  {} by {}",
        item.registered_at.to_rfc3339(),
        item.registered_by
    );
    if item.disposed {
        println!("Disposed:    yes");
    }
}

/// Prints a single custody entry as aligned key-value text.
pub fn print_entry(entry: &CustodyEntry) {
    println!("Entry:     {}", entry.id);
    println!("Evidence:  {}", entry.evidence_id);
    println!("Sequence:  {}", entry.sequence_no);
    println!("Chain:     {}", chain_cell(entry));
    println!("Action:    {}", entry.action);
    println!(
        "From:      {}",
        stop_cell(entry.from_custodian.as_deref(), entry.from_location.as_deref())
    );
    println!("To:        {} @ {}", entry.to_custodian, entry.to_location);
    if !entry.purpose.is_empty() {
        println!("Purpose:   {}", entry.purpose);
    }
    println!("Status:    {}", entry.approval_status);
    if let Some(approved_by) = &entry.approved_by {
        let decided_at = entry
            .decided_at
            .map_or_else(|| "-".to_string(), |at| at.to_rfc3339());
        println!("Decided:   {decided_at} by {approved_by}");
    }
    if let Some(reason) = &entry.decision_reason {
        println!("Reason:    {reason}");
    }
    println!(
        "Recorded:  {} by {}",
        entry.recorded_at.to_rfc3339(),
        entry.performed_by
    );
}

/// Prints custody entries as a table, one row per entry.
pub fn print_entry_table(entries: &[CustodyEntry]) {
    if entries.is_empty() {
        println!("No custody entries");
        return;
    }

    println!(
        "{:>4} {:>5}  {:<15} {:<26} {:<26} {:<9} {}",
        "SEQ", "CHAIN", "ACTION", "FROM", "TO", "STATUS", "RECORDED"
    );
    println!("{}", "-".repeat(116));

    for entry in entries {
        println!(
            "{:>4} {:>5}  {:<15} {:<26} {:<26} {:<9} {}",
            entry.sequence_no,
            chain_cell(entry),
            entry.action.as_str(),
            stop_cell(entry.from_custodian.as_deref(), entry.from_location.as_deref()),
            format!("{} @ {}", entry.to_custodian, entry.to_location),
            entry.approval_status.as_str(),
            entry.recorded_at.to_rfc3339(),
        );
    }
}

/// Prints the approval queue, one row per pending entry.
///
/// Shows the entry id in full; it is the handle an approver passes to
/// `approve` or `reject`.
pub fn print_pending_table(entries: &[CustodyEntry]) {
    if entries.is_empty() {
        println!("No entries awaiting approval");
        return;
    }

    println!(
        "{:<36} {:<36} {:>4}  {:<15} {:<12} {}",
        "ENTRY", "EVIDENCE", "SEQ", "ACTION", "RECORDED BY", "RECORDED"
    );
    println!("{}", "-".repeat(133));

    for entry in entries {
        println!(
            "{:<36} {:<36} {:>4}  {:<15} {:<12} {}",
            entry.id,
            entry.evidence_id,
            entry.sequence_no,
            entry.action.as_str(),
            entry.performed_by,
            entry.recorded_at.to_rfc3339(),
        );
    }
}

/// Prints registered evidence items as a table.
pub fn print_item_table(items: &[EvidenceItem]) {
    if items.is_empty() {
        println!("No registered evidence");
        return;
    }

    println!(
        "{:<36} {:<11} {:<28} {:<20} {}",
        "ID", "CATEGORY", "LABEL", "LOCATION", "REGISTERED"
    );
    println!("{}", "-".repeat(124));

    for item in items {
        let label = if item.disposed {
            format!("{} (disposed)", item.label)
        } else {
            item.label.clone()
        };
        println!(
            "{:<36} {:<11} {:<28} {:<20} {}",
            item.id,
            item.category.as_str(),
            label,
            item.storage_location,
            item.registered_at.to_rfc3339(),
        );
    }
}

/// Prints the audit side-records of an item.
pub fn print_side_records(records: &[SideRecord]) {
    if records.is_empty() {
        println!("No side records");
        return;
    }

    for record in records {
        let id = record
            .id
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        let entry = record
            .entry_id
            .map_or_else(|| "-".to_string(), |e| e.to_string());
        println!(
            "#{id} {} entry {entry} by {} at {}",
            record.kind.as_str(),
            record.actor,
            record.recorded_at.to_rfc3339(),
        );
        println!("    reason: {}", record.reason);
    }
}

fn chain_cell(entry: &CustodyEntry) -> String {
    entry
        .chain_no
        .map_or_else(|| "-".to_string(), |n| n.to_string())
}

fn stop_cell(custodian: Option<&str>, location: Option<&str>) -> String {
    match (custodian, location) {
        (Some(custodian), Some(location)) => format!("{custodian} @ {location}"),
        _ => "-".to_string(),
    }
}
