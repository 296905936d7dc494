//! Custody entry appends.

use anyhow::Result;
use clap::Args;
use custodia_core::{AppendRequest, CustodyAction, CustodyEngine, CustodyError};
use uuid::Uuid;

use crate::output::{self, exit_codes, OutputFormat};

/// Arguments for `custodia append`.
#[derive(Args, Debug)]
pub struct AppendArgs {
    /// Evidence item to append to
    pub evidence_id: Uuid,

    /// Action: COLLECTED, SEIZED, TRANSFERRED, ANALYZED, PRESENTED_COURT,
    /// RETURNED, or DISPOSED
    #[arg(short, long)]
    pub action: String,

    /// Custodian the item is taken over from (omit on the first entry)
    #[arg(long)]
    pub from: Option<String>,

    /// Location the item is moved from (omit on the first entry)
    #[arg(long)]
    pub from_location: Option<String>,

    /// Custodian taking the item over
    #[arg(long)]
    pub to: String,

    /// Location the item is moved to
    #[arg(long)]
    pub to_location: String,

    /// Purpose or notes for the action
    #[arg(short, long, default_value = "")]
    pub purpose: String,

    /// Operator recording the entry
    #[arg(long = "by")]
    pub performed_by: String,

    /// Record the entry despite a custody discontinuity, documenting why
    #[arg(long, value_name = "REASON")]
    pub corrective: Option<String>,
}

/// Appends a custody entry, strict by default.
///
/// A strict append refused by the continuity gate is a finding, not a
/// crash: both sides of the broken hand-over are printed, nothing is
/// recorded, and the process exits with code 2.
pub fn run(engine: &CustodyEngine, args: &AppendArgs, format: OutputFormat) -> Result<u8> {
    let action = CustodyAction::parse(&args.action)?;
    let req = AppendRequest {
        evidence_id: args.evidence_id,
        action,
        from_custodian: args.from.clone(),
        to_custodian: args.to.clone(),
        from_location: args.from_location.clone(),
        to_location: args.to_location.clone(),
        purpose: args.purpose.clone(),
        performed_by: args.performed_by.clone(),
    };

    let result = match &args.corrective {
        Some(reason) => engine.append_corrective(&req, reason),
        None => engine.append_entry(&req),
    };

    let entry = match result {
        Ok(entry) => entry,
        Err(CustodyError::SequenceViolation {
            expected_custodian,
            expected_location,
            found_custodian,
            found_location,
            ..
        }) => {
            output::print_finding(
                "custody discontinuity, nothing recorded",
                &[
                    (
                        "chain tail",
                        format!("{expected_custodian} @ {expected_location}"),
                    ),
                    (
                        "claimed source",
                        match (found_custodian, found_location) {
                            (Some(custodian), Some(location)) => {
                                format!("{custodian} @ {location}")
                            },
                            _ => "(none)".to_string(),
                        },
                    ),
                ],
            );
            eprintln!("record the gap deliberately with --corrective <REASON>");
            return Ok(exit_codes::FINDING);
        },
        Err(err) => return Err(err.into()),
    };

    match format {
        OutputFormat::Text => {
            if entry.requires_approval {
                println!(
                    "Recorded pending entry {} (sequence {}); a second operator must approve it",
                    entry.id, entry.sequence_no
                );
            } else {
                println!("Recorded entry {} (sequence {})", entry.id, entry.sequence_no);
            }
        },
        OutputFormat::Json => output::print_json(&entry)?,
    }
    Ok(exit_codes::SUCCESS)
}
