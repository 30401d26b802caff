//! Gate types: tokens, configuration, stats, batch options

use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Configuration
// ============================================================================

/// Sizing for a task gate
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Maximum simultaneously outstanding tokens
    pub max_concurrent: usize,

    /// Maximum queued admission requests; the next one fails immediately
    pub max_queue_size: usize,

    /// How long a queued request may wait before resolving with `Timeout`
    pub acquire_timeout: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            max_queue_size: 32,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// Resource Token
// ============================================================================

/// Proof of a granted execution slot
///
/// Exclusively owned by the caller that received it; must be handed back to
/// `TaskGate::release` exactly once (extra releases are no-ops).
#[derive(Debug, Clone)]
pub struct ResourceToken {
    /// Unique token id
    pub id: String,

    /// Operation name this slot was granted for
    pub operation: String,

    /// When the slot was granted
    pub granted_at: Instant,
}

// ============================================================================
// Stats
// ============================================================================

/// Read-only snapshot of gate load
#[derive(Debug, Clone, Serialize)]
pub struct GateStats {
    /// Currently outstanding tokens
    pub running: usize,

    /// Currently queued admission requests
    pub queued: usize,

    /// Free slots
    pub available: usize,

    /// running / max_concurrent, as a percentage
    pub load_pct: f64,

    /// Average time granted requests spent queued
    pub avg_queue_wait_ms: f64,

    /// Average processing time of completed `execute` calls
    pub avg_processing_ms: f64,

    /// Completed `execute` calls
    pub processed: u64,

    /// Failed `execute` calls
    pub failed: u64,
}

// ============================================================================
// Batch execution
// ============================================================================

/// Options for `TaskGate::execute_batch`
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum items per chunk
    pub batch_size: usize,

    /// When true, chunks run strictly one after another, bounding in-flight
    /// work to `batch_size`. When false, all chunks are dispatched at once
    /// and the gate's `max_concurrent` is the true concurrency bound.
    pub progressive: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            progressive: false,
        }
    }
}

/// One failed batch item
#[derive(Debug)]
pub struct BatchItemError<E> {
    /// Position of the item in the submitted batch
    pub index: usize,
    pub error: E,
}

/// Outcome of a batch: successes in submission order plus collected failures
///
/// One item's failure never aborts its siblings.
#[derive(Debug)]
pub struct BatchOutcome<T, E> {
    pub results: Vec<T>,
    pub errors: Vec<BatchItemError<E>>,
}

impl<T, E> BatchOutcome<T, E> {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Admission failures reported by the gate
///
/// The gate never retries on the caller's behalf; retry policy belongs to
/// the caller.
#[derive(Debug, Error)]
pub enum GateError {
    /// Queue at capacity; reported immediately, without waiting
    #[error("admission queue full for {operation} (max {max})")]
    QueueFull { operation: String, max: usize },

    /// Waited too long for a slot
    #[error("timed out after {waited_ms}ms waiting for a {operation} slot")]
    Timeout { operation: String, waited_ms: u64 },

    /// Gate is draining; no new grants
    #[error("gate is shutting down")]
    ShuttingDown,
}
