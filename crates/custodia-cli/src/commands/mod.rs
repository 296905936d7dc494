//! Command implementations for the custodia binary.

pub mod admin;
pub mod append;
pub mod decide;
pub mod list;
pub mod register;
pub mod validate;
pub mod verify;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use custodia_core::{CustodyEngine, CustodyLedger, EngineConfig, TracingSink};

use crate::fs_vault::FsVault;

/// Loads the engine configuration.
///
/// A missing file is not an error: the defaults stand in, so `custodia`
/// works out of the box in the current directory.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if path.exists() {
        EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))
    } else {
        Ok(EngineConfig::default())
    }
}

/// Opens the engine over the configured ledger, vault, and operator
/// directory, with lifecycle events mirrored into the log.
pub fn open_engine(config: &EngineConfig) -> Result<CustodyEngine> {
    let ledger = CustodyLedger::open(&config.db_path)
        .with_context(|| format!("failed to open ledger at {}", config.db_path.display()))?;
    let vault = FsVault::open(&config.vault_dir, config.max_content_size);
    let directory = config.identity.build_directory();

    Ok(CustodyEngine::new(
        ledger,
        Arc::new(vault),
        Arc::new(directory),
        config.clone(),
    )
    .with_event_sink(Arc::new(TracingSink)))
}
