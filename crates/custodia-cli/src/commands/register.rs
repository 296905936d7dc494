//! Evidence registration.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use custodia_core::{CustodyEngine, EvidenceCategory, NewEvidence};

use crate::output::{self, OutputFormat};

/// Arguments for `custodia register`.
#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Human-readable label for the item
    pub label: String,

    /// Category: DIGITAL, PHYSICAL, DOCUMENT, or TESTIMONIAL
    #[arg(short = 'c', long)]
    pub category: String,

    /// Authoritative storage location of the asset
    #[arg(short = 'l', long)]
    pub location: String,

    /// Opaque retention policy tag
    #[arg(long, default_value = "")]
    pub retention: String,

    /// Operator registering the item
    #[arg(long = "by")]
    pub registered_by: String,

    /// File whose bytes become the stored content; its SHA-256 digest is
    /// fixed as the item's registered fingerprint
    #[arg(long)]
    pub content: Option<PathBuf>,
}

/// Registers a new evidence item, optionally ingesting content bytes.
pub fn run(engine: &CustodyEngine, args: &RegisterArgs, format: OutputFormat) -> Result<()> {
    let category = EvidenceCategory::parse(&args.category)?;
    let new = NewEvidence {
        label: args.label.clone(),
        category,
        storage_location: args.location.clone(),
        retention_policy: args.retention.clone(),
        registered_by: args.registered_by.clone(),
    };

    let item = match &args.content {
        Some(path) => {
            let mut file = File::open(path)
                .with_context(|| format!("failed to open content file {}", path.display()))?;
            engine.register_evidence(new, Some(&mut file))?
        },
        None => engine.register_evidence(new, None)?,
    };

    match format {
        OutputFormat::Text => output::print_item(&item),
        OutputFormat::Json => output::print_json(&item)?,
    }
    Ok(())
}
