//! JSON snapshot persistence
//!
//! The whole book (engine state, in-memory ledger, posted lines, reported
//! scores and consumer state) is written as one JSON document. Saves go to a
//! sibling temp file that is renamed over the target, so a crash mid-write
//! leaves the previous snapshot intact.

use crate::config::{BookieConfig, StorageConfig};
use crate::consumers::{ReceiptIssuer, RewardsMinter};
use crate::engine::BookState;
use crate::errors::{BookieResult, StorageError};
use crate::memory::{LineBoard, MemoryLedger, ScoreBoard};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub state: BookState,
    pub ledger: MemoryLedger,
    pub lines: LineBoard,
    pub scores: ScoreBoard,
    pub receipts: ReceiptIssuer,
    pub rewards: RewardsMinter,
}

impl Snapshot {
    pub fn empty(reward_basis_points: u32) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            state: BookState::default(),
            ledger: MemoryLedger::new(),
            lines: LineBoard::new(),
            scores: ScoreBoard::new(),
            receipts: ReceiptIssuer::new(),
            rewards: RewardsMinter::new(reward_basis_points),
        }
    }

    /// Brings settings that live in config onto the restored consumers
    pub fn apply_config(&mut self, config: &BookieConfig) {
        let basis_points = config.rewards.basis_points;
        if self.rewards.basis_points() != basis_points {
            tracing::info!(
                from = self.rewards.basis_points(),
                to = basis_points,
                "Reward rate changed by configuration"
            );
            self.rewards.set_basis_points(basis_points);
        }
    }
}

pub struct SnapshotStore {
    path: PathBuf,
    pretty: bool,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            pretty: true,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            path: PathBuf::from(&config.state_file),
            pretty: config.pretty,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads the snapshot, `None` when no file has been written yet
    pub fn load(&self) -> BookieResult<Option<Snapshot>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                ))
                .into())
            }
        };

        let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(StorageError::from)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StorageError::CorruptedData(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            ))
            .into());
        }
        tracing::debug!(
            path = %self.path.display(),
            games = snapshot.state.registry.len(),
            wagers = snapshot.state.wagers.len(),
            "Loaded snapshot"
        );
        Ok(Some(snapshot))
    }

    pub fn save(&self, snapshot: &Snapshot) -> BookieResult<()> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(snapshot)
        } else {
            serde_json::to_vec(snapshot)
        }
        .map_err(|e| StorageError::WriteFailed(format!("Failed to encode snapshot: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(StorageError::from)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, &bytes).map_err(StorageError::from)?;
        fs::rename(&tmp, &self.path).map_err(StorageError::from)?;

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "Saved snapshot");
        Ok(())
    }
}
