//! Secure temp-file lifecycle manager
//!
//! Issues collision-free staged-file paths, tracks ownership and age, and
//! guarantees eventual removal: explicit `cleanup_file`, a periodic orphan
//! sweep for artifacts whose request crashed before cleaning up, and a
//! best-effort sweep of everything this process owns on shutdown.
//!
//! Identifiers embed the owning process id so that, in a multi-process
//! deployment sharing one staging directory, a process only ever deletes
//! files it created.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::types::{TempFileConfig, TempFileError, TempFileRecord, TempFileStats};

/// Extension used when the original name has none
const DEFAULT_EXTENSION: &str = "bin";

// ============================================================================
// Manager
// ============================================================================

/// Temp-file lifecycle manager
#[derive(Clone)]
pub struct TempFileManager {
    inner: Arc<TempFileManagerInner>,
}

struct TempFileManagerInner {
    config: TempFileConfig,

    /// Pid stamped into records created by this manager
    owner_pid: u32,

    /// Active artifact registry, keyed by secure identifier
    records: Mutex<HashMap<String, TempFileRecord>>,

    /// Handle of the background sweep, if started
    sweep_task: Mutex<Option<JoinHandle<()>>>,
}

impl TempFileManager {
    pub fn new(config: TempFileConfig) -> Self {
        Self::with_owner_pid(config, std::process::id())
    }

    /// Create a manager that stamps records with an explicit owner pid
    ///
    /// Used to simulate a second process sharing the staging directory.
    pub fn with_owner_pid(config: TempFileConfig, owner_pid: u32) -> Self {
        Self {
            inner: Arc::new(TempFileManagerInner {
                config,
                owner_pid,
                records: Mutex::new(HashMap::new()),
                sweep_task: Mutex::new(None),
            }),
        }
    }

    // ========================================================================
    // Identifier generation
    // ========================================================================

    /// Generate a collision-free identifier for a staged artifact
    ///
    /// Combines the owning pid, a monotonic high-resolution timestamp, and a
    /// v4 UUID (OS CSPRNG), keeping the original file's extension. The
    /// random component dominates the namespace, so two calls never collide
    /// even concurrently or across process restarts within the same instant.
    pub fn secure_identifier(&self, original_name: &str) -> String {
        let ext: String = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(DEFAULT_EXTENSION)
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_lowercase();
        let ext = if ext.is_empty() {
            DEFAULT_EXTENSION.to_string()
        } else {
            ext
        };

        format!(
            "{}-{}-{}.{}",
            self.inner.owner_pid,
            monotonic_nanos(),
            Uuid::new_v4().simple(),
            ext
        )
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a staged file, optionally writing `data` into it
    ///
    /// The staging directory is created with owner-only permissions if
    /// absent; the file itself is created owner-readable/writable only.
    pub async fn create_temp_file(
        &self,
        original_name: &str,
        data: Option<&[u8]>,
    ) -> Result<StagedFile, TempFileError> {
        self.ensure_dir().await?;

        let id = self.secure_identifier(original_name);
        let path = self.inner.config.dir.join(&id);

        {
            let mut records = self.inner.records.lock();
            records.insert(
                id.clone(),
                TempFileRecord {
                    id: id.clone(),
                    path: path.clone(),
                    owner_pid: self.inner.owner_pid,
                    created_at: Utc::now(),
                    created: Instant::now(),
                    active: true,
                },
            );
        }

        if let Err(source) = self.write_file(&path, data).await {
            self.inner.records.lock().remove(&id);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(TempFileError::Write { path, source });
        }

        tracing::debug!(id = %id, path = %path.display(), "staged file created");
        Ok(StagedFile {
            id,
            path,
            manager: self.clone(),
        })
    }

    async fn ensure_dir(&self) -> Result<(), TempFileError> {
        let dir = &self.inner.config.dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| TempFileError::Prepare {
                dir: dir.clone(),
                source,
            })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
                .await
                .map_err(|source| TempFileError::Prepare {
                    dir: dir.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    async fn write_file(&self, path: &Path, data: Option<&[u8]>) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await?;
        }

        if let Some(bytes) = data {
            file.write_all(bytes).await?;
            file.flush().await?;
        }
        Ok(())
    }

    /// Remove a staged file and its record
    ///
    /// Returns false for unknown identifiers and for files owned by another
    /// process (logged, never deleted). A file that is already gone counts
    /// as cleaned. Deletion errors are logged and the record retained so the
    /// sweep can retry; this never fails the operation it was attached to.
    pub async fn cleanup_file(&self, id: &str) -> bool {
        let record = { self.inner.records.lock().get(id).cloned() };
        let Some(record) = record else {
            tracing::debug!(id, "cleanup of unknown or already-cleaned file ignored");
            return false;
        };

        if record.owner_pid != std::process::id() {
            tracing::warn!(
                id,
                owner_pid = record.owner_pid,
                our_pid = std::process::id(),
                "refusing to delete file owned by another process"
            );
            return false;
        }

        match tokio::fs::remove_file(&record.path).await {
            Ok(()) => {
                self.inner.records.lock().remove(id);
                tracing::debug!(id, "staged file removed");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.inner.records.lock().remove(id);
                tracing::debug!(id, "staged file already gone");
                true
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "failed to remove staged file; sweep will retry");
                false
            }
        }
    }

    // ========================================================================
    // Orphan sweep
    // ========================================================================

    /// Remove every active artifact older than the TTL
    ///
    /// Safety net for requests that crashed before calling cleanup. Returns
    /// the number of artifacts reclaimed.
    pub async fn sweep_orphans(&self) -> usize {
        let ttl = self.inner.config.ttl;
        let expired: Vec<String> = {
            let records = self.inner.records.lock();
            records
                .values()
                .filter(|r| r.active && r.age() >= ttl)
                .map(|r| r.id.clone())
                .collect()
        };

        let mut cleaned = 0;
        for id in expired {
            if self.cleanup_file(&id).await {
                cleaned += 1;
            }
        }

        if cleaned > 0 {
            tracing::info!(count = cleaned, "swept orphaned staged files");
        }
        cleaned
    }

    /// Start the periodic background sweep
    pub fn start_sweep_task(&self) {
        let mut slot = self.inner.sweep_task.lock();
        if slot.is_some() {
            tracing::debug!("sweep task already running");
            return;
        }

        let manager = self.clone();
        let interval = self.inner.config.sweep_interval;
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                manager.sweep_orphans().await;
            }
        }));
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Stop the sweep and best-effort clean every artifact this process owns
    ///
    /// Individual failures are logged by `cleanup_file` and never abort the
    /// rest of the shutdown.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.inner.sweep_task.lock().take() {
            handle.abort();
        }

        let own_pid = std::process::id();
        let ids: Vec<String> = {
            let records = self.inner.records.lock();
            records
                .values()
                .filter(|r| r.owner_pid == own_pid)
                .map(|r| r.id.clone())
                .collect()
        };

        let total = ids.len();
        let cleaned: usize = join_all(ids.iter().map(|id| self.cleanup_file(id)))
            .await
            .into_iter()
            .filter(|ok| *ok)
            .count();
        tracing::info!(cleaned, total, "temp-file manager shut down");
    }

    // ========================================================================
    // Observability
    // ========================================================================

    /// Registry snapshot for health/ops endpoints
    pub fn stats(&self) -> TempFileStats {
        let records = self.inner.records.lock();
        let mut by_owner: HashMap<u32, usize> = HashMap::new();
        let mut oldest: Option<std::time::Duration> = None;

        for record in records.values().filter(|r| r.active) {
            *by_owner.entry(record.owner_pid).or_default() += 1;
            let age = record.age();
            if oldest.map_or(true, |o| age > o) {
                oldest = Some(age);
            }
        }

        TempFileStats {
            active: records.values().filter(|r| r.active).count(),
            by_owner,
            oldest_age_secs: oldest.map(|d| d.as_secs()),
        }
    }
}

/// Nanoseconds since process start; strictly non-decreasing
fn monotonic_nanos() -> u128 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_nanos()
}

// ============================================================================
// Staged file handle
// ============================================================================

/// Handle to a staged artifact, bound to the manager that issued it
#[derive(Clone)]
pub struct StagedFile {
    id: String,
    path: PathBuf,
    manager: TempFileManager,
}

impl StagedFile {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file and drop its record; see `TempFileManager::cleanup_file`
    pub async fn cleanup(&self) -> bool {
        self.manager.cleanup_file(&self.id).await
    }
}

impl fmt::Debug for StagedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagedFile")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    fn manager_in(dir: &Path) -> TempFileManager {
        TempFileManager::new(TempFileConfig {
            dir: dir.to_path_buf(),
            ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(300),
        })
    }

    #[test]
    fn identifiers_are_pairwise_distinct_across_processes() {
        let config = TempFileConfig::default();
        let local = TempFileManager::new(config.clone());
        let foreign = TempFileManager::with_owner_pid(config, std::process::id().wrapping_add(1));

        let mut seen = HashSet::new();
        for _ in 0..5_000 {
            assert!(seen.insert(local.secure_identifier("doc.pdf")));
            assert!(seen.insert(foreign.secure_identifier("doc.pdf")));
        }
        assert_eq!(seen.len(), 10_000);
    }

    #[test]
    fn identifier_keeps_extension_and_defaults() {
        let manager = TempFileManager::new(TempFileConfig::default());
        assert!(manager.secure_identifier("scan.PDF").ends_with(".pdf"));
        assert!(manager.secure_identifier("photo.jpeg").ends_with(".jpeg"));
        assert!(manager.secure_identifier("noext").ends_with(".bin"));
        // Hostile extensions are stripped to alphanumerics.
        assert!(manager.secure_identifier("doc.p d$f").ends_with(".pdf"));
    }

    #[tokio::test]
    async fn create_write_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());

        let staged = manager
            .create_temp_file("doc.pdf", Some(b"%PDF-1.4"))
            .await
            .unwrap();
        assert!(staged.path().exists());
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"%PDF-1.4");
        assert_eq!(manager.stats().active, 1);

        assert!(staged.cleanup().await);
        assert!(!staged.path().exists());
        assert_eq!(manager.stats().active, 0);

        // Second cleanup is a no-op, never an error.
        assert!(!staged.cleanup().await);
    }

    #[tokio::test]
    async fn cleanup_tolerates_file_already_gone() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());

        let staged = manager.create_temp_file("doc.pdf", None).await.unwrap();
        std::fs::remove_file(staged.path()).unwrap();

        // Already gone counts as cleaned and drops the record.
        assert!(staged.cleanup().await);
        assert_eq!(manager.stats().active, 0);
    }

    #[tokio::test]
    async fn foreign_owner_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let foreign = TempFileManager::with_owner_pid(
            TempFileConfig {
                dir: dir.path().to_path_buf(),
                ..TempFileConfig::default()
            },
            std::process::id().wrapping_add(1),
        );

        let staged = foreign
            .create_temp_file("doc.pdf", Some(b"data"))
            .await
            .unwrap();

        assert!(!foreign.cleanup_file(staged.id()).await);
        assert!(staged.path().exists());
        assert_eq!(foreign.stats().active, 1);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_records() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::new(TempFileConfig {
            dir: dir.path().to_path_buf(),
            ttl: Duration::from_millis(50),
            sweep_interval: Duration::from_secs(300),
        });

        let old_a = manager.create_temp_file("a.pdf", Some(b"a")).await.unwrap();
        let old_b = manager.create_temp_file("b.pdf", Some(b"b")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        let young = manager.create_temp_file("c.pdf", Some(b"c")).await.unwrap();

        assert_eq!(manager.sweep_orphans().await, 2);
        assert!(!old_a.path().exists());
        assert!(!old_b.path().exists());
        assert!(young.path().exists());
        assert_eq!(manager.stats().active, 1);
    }

    #[tokio::test]
    async fn shutdown_cleans_owned_records() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());

        let a = manager.create_temp_file("a.pdf", Some(b"a")).await.unwrap();
        let b = manager.create_temp_file("b.pdf", Some(b"b")).await.unwrap();

        manager.shutdown().await;
        assert!(!a.path().exists());
        assert!(!b.path().exists());
        assert_eq!(manager.stats().active, 0);
    }

    #[tokio::test]
    async fn stats_break_down_by_owner() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());

        manager.create_temp_file("a.pdf", Some(b"a")).await.unwrap();
        manager.create_temp_file("b.pdf", Some(b"b")).await.unwrap();

        let stats = manager.stats();
        assert_eq!(stats.active, 2);
        assert_eq!(stats.by_owner.get(&std::process::id()), Some(&2));
        assert!(stats.oldest_age_secs.is_some());
    }
}
