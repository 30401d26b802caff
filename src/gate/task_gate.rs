//! Bounded-concurrency task gate
//!
//! Admits, queues, times out, and releases heavy operations:
//! - at most `max_concurrent` tokens are outstanding at any instant
//! - admission is strict FIFO; a timed-out entry is removed and never granted
//! - the queue is bounded; the next waiter past the bound is rejected
//!   immediately with `QueueFull`
//! - `release` advances the queue head under the same lock that freed the
//!   slot, so grant latency after a release is one wakeup
//!
//! All queue/slot transitions happen under a single mutex; critical sections
//! are O(queue advance) and never await.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use uuid::Uuid;

use super::types::{
    BatchItemError, BatchOptions, BatchOutcome, GateConfig, GateError, GateStats, ResourceToken,
};

// ============================================================================
// Internal state
// ============================================================================

/// A queued admission request waiting for a slot
struct Waiter {
    entry_id: u64,
    operation: String,
    enqueued_at: Instant,
    tx: oneshot::Sender<ResourceToken>,
}

/// Slot bookkeeping for an outstanding token
struct RunningSlot {
    #[allow(dead_code)]
    operation: String,
    granted_at: Instant,
}

#[derive(Default)]
struct StatsAccum {
    processed: u64,
    failed: u64,
    total_queue_wait: Duration,
    wait_samples: u64,
    total_processing: Duration,
    processing_samples: u64,
}

struct GateState {
    running: HashMap<String, RunningSlot>,
    queue: VecDeque<Waiter>,
    next_entry_id: u64,
    shutting_down: bool,
    stats: StatsAccum,
}

struct GateInner {
    config: GateConfig,
    state: Mutex<GateState>,
    /// Signalled on every release so a draining shutdown can re-check
    drained: Notify,
}

// ============================================================================
// Task Gate
// ============================================================================

/// Admission-controlled execution gate
#[derive(Clone)]
pub struct TaskGate {
    inner: Arc<GateInner>,
}

impl TaskGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            inner: Arc::new(GateInner {
                config,
                state: Mutex::new(GateState {
                    running: HashMap::new(),
                    queue: VecDeque::new(),
                    next_entry_id: 0,
                    shutting_down: false,
                    stats: StatsAccum::default(),
                }),
                drained: Notify::new(),
            }),
        }
    }

    // ========================================================================
    // Admission
    // ========================================================================

    /// Acquire an execution slot for `operation`
    ///
    /// Grants immediately when a slot is free and nobody is queued ahead.
    /// Fails with `QueueFull` without waiting when the queue is at capacity,
    /// or with `Timeout` when no slot frees within the configured window.
    pub async fn acquire(&self, operation: &str) -> Result<ResourceToken, GateError> {
        let (entry_id, mut rx) = {
            let mut state = self.inner.state.lock();

            if state.shutting_down {
                return Err(GateError::ShuttingDown);
            }

            // Fast path: free slot and empty queue (FIFO would otherwise be
            // violated by jumping ahead of waiters).
            if state.running.len() < self.inner.config.max_concurrent && state.queue.is_empty() {
                let token = Self::grant(&mut state, operation, Instant::now());
                tracing::debug!(token_id = %token.id, operation, "slot granted immediately");
                return Ok(token);
            }

            if state.queue.len() >= self.inner.config.max_queue_size {
                tracing::warn!(
                    operation,
                    queued = state.queue.len(),
                    "admission queue full"
                );
                return Err(GateError::QueueFull {
                    operation: operation.to_string(),
                    max: self.inner.config.max_queue_size,
                });
            }

            let (tx, rx) = oneshot::channel();
            let entry_id = state.next_entry_id;
            state.next_entry_id += 1;
            state.queue.push_back(Waiter {
                entry_id,
                operation: operation.to_string(),
                enqueued_at: Instant::now(),
                tx,
            });
            tracing::debug!(operation, queued = state.queue.len(), "queued for a slot");
            (entry_id, rx)
        };

        let timeout = tokio::time::sleep(self.inner.config.acquire_timeout);
        tokio::pin!(timeout);

        tokio::select! {
            granted = &mut rx => match granted {
                Ok(token) => Ok(token),
                // Sender dropped: shutdown force-rejected this entry.
                Err(_) => Err(GateError::ShuttingDown),
            },
            _ = &mut timeout => {
                // Remove our entry under the lock. If it is already gone, a
                // grant dequeued it first and the token is in the channel;
                // the grant wins and the timeout is discarded.
                let removed = {
                    let mut state = self.inner.state.lock();
                    let before = state.queue.len();
                    state.queue.retain(|w| w.entry_id != entry_id);
                    state.queue.len() != before
                };

                if removed {
                    tracing::debug!(operation, "admission timed out");
                    return Err(GateError::Timeout {
                        operation: operation.to_string(),
                        waited_ms: self.inner.config.acquire_timeout.as_millis() as u64,
                    });
                }

                match rx.await {
                    Ok(token) => Ok(token),
                    Err(_) => Err(GateError::ShuttingDown),
                }
            }
        }
    }

    /// Release a token, returning the slot to the free pool
    ///
    /// Idempotent: releasing an unknown or already-released token is a no-op
    /// returning false. Immediately advances the FIFO queue head.
    pub fn release(&self, token_id: &str) -> bool {
        let released = {
            let mut state = self.inner.state.lock();
            match state.running.remove(token_id) {
                Some(slot) => {
                    tracing::debug!(
                        token_id,
                        held_ms = slot.granted_at.elapsed().as_millis() as u64,
                        "token released"
                    );
                    Self::process_queue(&self.inner, &mut state);
                    true
                }
                None => {
                    tracing::debug!(token_id, "release of unknown token ignored");
                    false
                }
            }
        };

        if released {
            self.inner.drained.notify_one();
        }
        released
    }

    /// Mint a token and record the slot. Caller holds the state lock.
    fn grant(state: &mut GateState, operation: &str, granted_at: Instant) -> ResourceToken {
        let token = ResourceToken {
            id: Uuid::new_v4().to_string(),
            operation: operation.to_string(),
            granted_at,
        };
        state.running.insert(
            token.id.clone(),
            RunningSlot {
                operation: operation.to_string(),
                granted_at,
            },
        );
        token
    }

    /// Grant queued entries while slots are free, preserving FIFO order.
    /// Caller holds the state lock.
    fn process_queue(inner: &GateInner, state: &mut GateState) {
        if state.shutting_down {
            // Effective capacity is zero while draining.
            return;
        }

        while state.running.len() < inner.config.max_concurrent {
            let Some(waiter) = state.queue.pop_front() else {
                break;
            };

            let waited = waiter.enqueued_at.elapsed();
            let token = Self::grant(state, &waiter.operation, Instant::now());
            state.stats.total_queue_wait += waited;
            state.stats.wait_samples += 1;

            if let Err(unclaimed) = waiter.tx.send(token) {
                // The waiter gave up (future dropped); free the slot again.
                state.running.remove(&unclaimed.id);
                state.stats.wait_samples -= 1;
                state.stats.total_queue_wait -= waited;
            }
        }
    }

    // ========================================================================
    // Composition helpers
    // ========================================================================

    /// Acquire a token, run `work`, and always release
    ///
    /// The token is released even if `work`'s future panics or is cancelled.
    /// Aggregate stats (processed/failed counts, queue wait, processing time)
    /// are recorded here.
    pub async fn execute<T, E, F, Fut>(&self, operation: &str, work: F) -> Result<T, E>
    where
        E: From<GateError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let token = self.acquire(operation).await.map_err(E::from)?;
        let started = Instant::now();

        let guard = ReleaseGuard {
            gate: self,
            token_id: token.id.clone(),
        };
        let result = work().await;
        drop(guard);

        let mut state = self.inner.state.lock();
        state.stats.total_processing += started.elapsed();
        state.stats.processing_samples += 1;
        match result {
            Ok(value) => {
                state.stats.processed += 1;
                Ok(value)
            }
            Err(error) => {
                state.stats.failed += 1;
                Err(error)
            }
        }
    }

    /// Run `work` over `items` in bounded chunks
    ///
    /// Each item independently acquires and releases a token through
    /// `execute`; per-item failures are collected, never fail-fast. In
    /// progressive mode chunks run strictly one after another; otherwise all
    /// chunks are dispatched concurrently and the gate's own capacity is the
    /// true concurrency bound.
    pub async fn execute_batch<I, T, E, F, Fut>(
        &self,
        operation: &str,
        items: Vec<I>,
        options: BatchOptions,
        work: F,
    ) -> BatchOutcome<T, E>
    where
        E: From<GateError>,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let batch_size = options.batch_size.max(1);

        let mut remaining: Vec<(usize, I)> = items.into_iter().enumerate().collect();
        let mut chunks: Vec<Vec<(usize, I)>> = Vec::new();
        while !remaining.is_empty() {
            let rest = remaining.split_off(batch_size.min(remaining.len()));
            chunks.push(std::mem::replace(&mut remaining, rest));
        }

        let work = &work;
        let run_chunk = |chunk: Vec<(usize, I)>| async move {
            join_all(chunk.into_iter().map(|(index, item)| async move {
                (index, self.execute(operation, || work(item)).await)
            }))
            .await
        };

        let mut settled: Vec<(usize, Result<T, E>)> = Vec::new();
        if options.progressive {
            for chunk in chunks {
                settled.extend(run_chunk(chunk).await);
            }
        } else {
            for chunk_results in join_all(chunks.into_iter().map(&run_chunk)).await {
                settled.extend(chunk_results);
            }
        }
        settled.sort_by_key(|(index, _)| *index);

        let mut outcome = BatchOutcome {
            results: Vec::new(),
            errors: Vec::new(),
        };
        for (index, result) in settled {
            match result {
                Ok(value) => outcome.results.push(value),
                Err(error) => outcome.errors.push(BatchItemError { index, error }),
            }
        }
        outcome
    }

    // ========================================================================
    // Observability
    // ========================================================================

    /// Read-only load snapshot
    pub fn stats(&self) -> GateStats {
        let state = self.inner.state.lock();
        let max = self.inner.config.max_concurrent;
        let running = state.running.len();
        let stats = &state.stats;

        GateStats {
            running,
            queued: state.queue.len(),
            available: max.saturating_sub(running),
            load_pct: if max == 0 {
                100.0
            } else {
                running as f64 / max as f64 * 100.0
            },
            avg_queue_wait_ms: if stats.wait_samples == 0 {
                0.0
            } else {
                stats.total_queue_wait.as_secs_f64() * 1000.0 / stats.wait_samples as f64
            },
            avg_processing_ms: if stats.processing_samples == 0 {
                0.0
            } else {
                stats.total_processing.as_secs_f64() * 1000.0 / stats.processing_samples as f64
            },
            processed: stats.processed,
            failed: stats.failed,
        }
    }

    /// Advisory health predicate: unhealthy at >= 90% load or a queue at
    /// >= 80% of its bound. Never alters gate behavior.
    pub fn is_healthy(&self) -> bool {
        let state = self.inner.state.lock();
        let load_ok = state.running.len() * 10 < self.inner.config.max_concurrent * 9;
        let queue_ok = state.queue.len() * 10 < self.inner.config.max_queue_size * 8;
        load_ok && queue_ok
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Drain the gate: stop admitting, wait up to `timeout` for outstanding
    /// tokens, then force-reject everything still queued
    ///
    /// Returns true when all tokens were released in time.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        {
            let mut state = self.inner.state.lock();
            state.shutting_down = true;
        }
        tracing::info!("gate draining: no new grants");

        let drained = tokio::time::timeout(timeout, async {
            loop {
                if self.inner.state.lock().running.is_empty() {
                    break;
                }
                self.inner.drained.notified().await;
            }
        })
        .await
        .is_ok();

        let rejected = {
            let mut state = self.inner.state.lock();
            let rejected = state.queue.len();
            // Dropping the waiters' senders resolves their acquire calls
            // with ShuttingDown.
            state.queue.clear();
            rejected
        };

        if drained {
            tracing::info!(rejected, "gate drained");
        } else {
            let still_running = self.inner.state.lock().running.len();
            tracing::warn!(still_running, rejected, "gate shutdown timed out");
        }
        drained
    }
}

/// Releases the held token when dropped, so `execute` frees its slot even on
/// panic or cancellation.
struct ReleaseGuard<'a> {
    gate: &'a TaskGate,
    token_id: String,
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        self.gate.release(&self.token_id);
    }
}

// ============================================================================
// Tests
// ============================================================================
