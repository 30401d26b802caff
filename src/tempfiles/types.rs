//! Temp-file records, configuration, and errors

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Configuration
// ============================================================================

/// Staging-area settings
#[derive(Debug, Clone)]
pub struct TempFileConfig {
    /// Directory all staged artifacts live under (owner-only permissions)
    pub dir: PathBuf,

    /// Age after which the orphan sweep reclaims an active artifact
    pub ttl: Duration,

    /// How often the background sweep runs
    pub sweep_interval: Duration,
}

impl Default for TempFileConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir().join("pdf-gate"),
            ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// Tracking entry for one staged artifact
///
/// Ownership is immutable once created; only the owning process may delete
/// the file.
#[derive(Debug, Clone)]
pub struct TempFileRecord {
    /// Secure identifier (also the file name within the staging dir)
    pub id: String,

    /// Absolute path of the staged file
    pub path: PathBuf,

    /// Process that created the artifact
    pub owner_pid: u32,

    /// Wall-clock creation time, for operational visibility
    pub created_at: DateTime<Utc>,

    /// Monotonic creation instant, used for TTL age checks
    pub created: Instant,

    /// False once cleanup has removed the file
    pub active: bool,
}

impl TempFileRecord {
    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Snapshot of the registry for health/ops visibility
#[derive(Debug, Clone, Serialize)]
pub struct TempFileStats {
    /// Currently tracked active artifacts
    pub active: usize,

    /// Active artifact count per owning process id
    pub by_owner: HashMap<u32, usize>,

    /// Age of the oldest active artifact, in seconds
    pub oldest_age_secs: Option<u64>,
}

// ============================================================================
// Errors
// ============================================================================

/// Staging failures
///
/// Cleanup never errors; only creation does. A failed cleanup is logged and
/// left for the orphan sweep to retry.
#[derive(Debug, Error)]
pub enum TempFileError {
    #[error("failed to prepare staging directory {dir}: {source}")]
    Prepare {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write staged file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
