//! Persisted progress of a full benchmark run.

use crate::error::BenchError;
use crate::variant::TableVariant;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Parameters a saved state must match to be resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParams {
    pub table: TableVariant,
    pub record_max: u64,
    pub batch_size: u64,
    pub fill_batch: u64,
}

/// Steps completed in the current round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundFlags {
    pub create: bool,
    pub fill: bool,
    /// Logging mode restore and index rebuild after the fill
    #[serde(default)]
    pub maintenance: bool,
    pub read: bool,
    pub queries: bool,
}

impl fmt::Display for RoundFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "create={} fill={} maintenance={} read={} queries={}",
            self.create, self.fill, self.maintenance, self.read, self.queries
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchRunState {
    pub table: TableVariant,
    pub record_max: u64,
    pub batch_size: u64,
    pub fill_batch: u64,
    /// 1-based
    pub current_round: u32,
    /// Last row count read from the table
    pub total_rows: u64,
    pub completed_this_round: RoundFlags,
}

impl BenchRunState {
    pub fn fresh(params: RunParams) -> Self {
        Self {
            table: params.table,
            record_max: params.record_max,
            batch_size: params.batch_size,
            fill_batch: params.fill_batch,
            current_round: 1,
            total_rows: 0,
            completed_this_round: RoundFlags::default(),
        }
    }

    pub fn matches(&self, params: &RunParams) -> bool {
        self.table == params.table
            && self.record_max == params.record_max
            && self.batch_size == params.batch_size
            && self.fill_batch == params.fill_batch
    }

    /// Rows the current round should add.
    pub fn rows_to_add(&self) -> u64 {
        self.record_max
            .saturating_sub(self.total_rows)
            .min(self.batch_size)
    }

    pub fn target_reached(&self) -> bool {
        self.total_rows >= self.record_max
    }

    /// Advance the round counter and clear every flag except `create`.
    pub fn next_round(&mut self) {
        self.current_round += 1;
        self.completed_this_round = RoundFlags {
            create: true,
            ..RoundFlags::default()
        };
    }
}

/// Single-record store for run progress.
pub trait StateStore: Send + Sync {
    /// `None` when nothing usable is stored.
    fn load(&self) -> Result<Option<BenchRunState>, BenchError>;
    fn save(&self, state: &BenchRunState) -> Result<(), BenchError>;
}

/// JSON file replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<Option<BenchRunState>, BenchError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(path = %self.path.display(), "Ignoring unreadable run state: {}", e);
                Ok(None)
            }
        }
    }

    fn save(&self, state: &BenchRunState) -> Result<(), BenchError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(state)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
