//! Content fingerprint verification.

use anyhow::Result;
use custodia_core::{CancelFlag, CustodyEngine, Fingerprint, VerificationOutcome};
use uuid::Uuid;

use crate::output::{self, exit_codes, OutputFormat};

/// Recomputes the stored content's SHA-256 digest and compares it against
/// the fingerprint fixed at registration.
///
/// A mismatch is a verdict, not an error: it prints as a finding and the
/// process exits with code 2. An item with no registered fingerprint
/// reports `NOT_APPLICABLE` and exits clean. Transient storage faults exit
/// with code 1 and may be retried.
pub fn run(engine: &CustodyEngine, evidence_id: &Uuid, format: OutputFormat) -> Result<u8> {
    let report = engine.verify_integrity(evidence_id, &CancelFlag::new())?;

    if report.outcome == VerificationOutcome::Mismatch {
        output::print_finding(
            "evidence content does not match its registered fingerprint",
            &[
                ("registered", render(report.registered.as_ref())),
                ("recomputed", render(report.recomputed.as_ref())),
                ("bytes hashed", report.bytes_hashed.to_string()),
            ],
        );
    }

    match format {
        OutputFormat::Text => match report.outcome {
            VerificationOutcome::Match => println!(
                "Integrity verified: fingerprint matches ({} bytes hashed)",
                report.bytes_hashed
            ),
            VerificationOutcome::Mismatch => println!("Integrity verification FAILED"),
            VerificationOutcome::NotApplicable => {
                println!("No registered fingerprint; nothing to verify");
            },
        },
        OutputFormat::Json => output::print_json(&report)?,
    }

    Ok(if report.outcome == VerificationOutcome::Mismatch {
        exit_codes::FINDING
    } else {
        exit_codes::SUCCESS
    })
}

fn render(fingerprint: Option<&Fingerprint>) -> String {
    fingerprint.map_or_else(|| "-".to_string(), ToString::to_string)
}
