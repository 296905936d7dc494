//! Continuity validation and record hash chain verification.
//!
//! Two different chains, two different checks. `continuity` walks the
//! active chain and reports hand-over gaps; `chain` walks every stored
//! record and checks the append-time hash links. Both print findings on
//! stderr regardless of output format and exit with code 2 when something
//! is wrong, so a scripted caller cannot mistake a broken chain for a
//! clean one.

use anyhow::Result;
use custodia_core::{CustodyEngine, CustodyError};
use uuid::Uuid;

use crate::output::{self, exit_codes, OutputFormat};

/// Validates hand-over continuity across an item's active chain.
pub fn continuity(engine: &CustodyEngine, evidence_id: &Uuid, format: OutputFormat) -> Result<u8> {
    let report = engine.validate_continuity(evidence_id)?;

    for gap in &report.gaps {
        output::print_finding(
            "custody discontinuity",
            &[
                ("after sequence", gap.after_sequence_no.to_string()),
                (
                    "chain tail",
                    format!("{} @ {}", gap.expected_custodian, gap.expected_location),
                ),
                (
                    "claimed source",
                    match (&gap.found_custodian, &gap.found_location) {
                        (Some(custodian), Some(location)) => format!("{custodian} @ {location}"),
                        _ => "(none)".to_string(),
                    },
                ),
            ],
        );
    }

    match format {
        OutputFormat::Text => {
            if report.ok {
                println!(
                    "Continuity clean: {} active entries, no gaps",
                    report.entries_checked
                );
            } else {
                println!(
                    "Continuity broken: {} gap(s) across {} active entries",
                    report.gaps.len(),
                    report.entries_checked
                );
            }
        },
        OutputFormat::Json => output::print_json(&report)?,
    }

    Ok(if report.ok {
        exit_codes::SUCCESS
    } else {
        exit_codes::FINDING
    })
}

/// Verifies the item's append-time record hash chain.
pub fn chain(engine: &CustodyEngine, evidence_id: &Uuid, format: OutputFormat) -> Result<u8> {
    match engine.verify_chain(evidence_id) {
        Ok(count) => {
            match format {
                OutputFormat::Text => println!("Record hash chain intact: {count} entries"),
                OutputFormat::Json => output::print_json(&serde_json::json!({
                    "ok": true,
                    "entries_checked": count,
                }))?,
            }
            Ok(exit_codes::SUCCESS)
        },
        Err(CustodyError::ChainBroken {
            evidence_id,
            sequence_no,
            details,
        }) => {
            output::print_finding(
                "record hash chain broken",
                &[
                    ("evidence", evidence_id.clone()),
                    ("at sequence", sequence_no.to_string()),
                    ("details", details.clone()),
                ],
            );
            match format {
                OutputFormat::Text => println!("Record hash chain BROKEN at sequence {sequence_no}"),
                OutputFormat::Json => output::print_json(&serde_json::json!({
                    "ok": false,
                    "sequence_no": sequence_no,
                    "details": details,
                }))?,
            }
            Ok(exit_codes::FINDING)
        },
        Err(err) => Err(err.into()),
    }
}
