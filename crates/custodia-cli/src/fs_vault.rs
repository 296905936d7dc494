//! Directory-backed evidence vault.
//!
//! Stores one file per evidence item under a root directory, named
//! `<evidence-id>.bin`. Content is streamed to a `.tmp` sibling and renamed
//! into place once fully written, so a crash mid-copy never leaves a
//! half-written payload under the final name. The SHA-256 fingerprint is
//! computed during the copy, covering exactly the bytes that landed on
//! disk.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;

use custodia_core::{EvidenceVault, FingerprintHasher, StoredContent, VaultError};
use tracing::info;
use uuid::Uuid;

/// Copy buffer size for streaming content to disk.
const COPY_BUF_SIZE: usize = 64 * 1024;

/// Filesystem-backed [`EvidenceVault`].
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
    max_content_size: u64,
}

impl FsVault {
    /// Creates a vault rooted at `root`.
    ///
    /// The directory is created on first write, not here, so pointing the
    /// vault at a read-only location only fails once content arrives.
    #[must_use]
    pub fn open(root: impl Into<PathBuf>, max_content_size: u64) -> Self {
        Self {
            root: root.into(),
            max_content_size,
        }
    }

    fn content_path(&self, evidence_id: &Uuid) -> PathBuf {
        self.root.join(format!("{evidence_id}.bin"))
    }

    fn temp_path(&self, evidence_id: &Uuid) -> PathBuf {
        self.root.join(format!("{evidence_id}.tmp"))
    }
}

impl EvidenceVault for FsVault {
    fn put_content(
        &self,
        evidence_id: &Uuid,
        reader: &mut dyn Read,
    ) -> Result<StoredContent, VaultError> {
        fs::create_dir_all(&self.root)?;

        let final_path = self.content_path(evidence_id);
        if final_path.exists() {
            return Err(VaultError::AlreadyStored {
                evidence_id: evidence_id.to_string(),
            });
        }

        // A leftover .tmp from an interrupted copy is overwritten here;
        // only the rename below makes content visible.
        let temp_path = self.temp_path(evidence_id);
        let mut file = File::create(&temp_path)?;

        // Read one byte past the cap so oversize content is detected
        // without copying an unbounded stream.
        let mut limited = reader.take(self.max_content_size + 1);
        let mut hasher = FingerprintHasher::new();
        let mut buf = vec![0u8; COPY_BUF_SIZE];
        let mut size: u64 = 0;

        loop {
            let n = match limited.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) => {
                    let _ = fs::remove_file(&temp_path);
                    return Err(err.into());
                },
            };
            if let Err(err) = file.write_all(&buf[..n]) {
                let _ = fs::remove_file(&temp_path);
                return Err(err.into());
            }
            hasher.update(&buf[..n]);
            size += n as u64;
        }

        if size == 0 {
            let _ = fs::remove_file(&temp_path);
            return Err(VaultError::EmptyContent);
        }
        if size > self.max_content_size {
            let _ = fs::remove_file(&temp_path);
            return Err(VaultError::ContentTooLarge {
                size,
                max_size: self.max_content_size,
            });
        }

        drop(file);
        fs::rename(&temp_path, &final_path)?;

        let fingerprint = hasher.finalize();
        info!(%evidence_id, size, "stored evidence content");
        Ok(StoredContent { fingerprint, size })
    }

    fn open_content(&self, evidence_id: &Uuid) -> Result<Box<dyn Read + Send>, VaultError> {
        match File::open(self.content_path(evidence_id)) {
            Ok(file) => Ok(Box::new(file)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(VaultError::NotFound {
                evidence_id: evidence_id.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn exists(&self, evidence_id: &Uuid) -> Result<bool, VaultError> {
        Ok(self.content_path(evidence_id).is_file())
    }

    fn content_size(&self, evidence_id: &Uuid) -> Result<u64, VaultError> {
        match fs::metadata(self.content_path(evidence_id)) {
            Ok(meta) => Ok(meta.len()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(VaultError::NotFound {
                evidence_id: evidence_id.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }
}
