//! Configuration management for the PDF gate server

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub gate: GateSettings,
    pub temp_files: TempFileSettings,
    pub upload: UploadSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Concurrency gate sizing
#[derive(Debug, Clone, Deserialize)]
pub struct GateSettings {
    /// Maximum simultaneously running heavy operations
    pub max_concurrent: usize,
    /// Maximum queued admission requests before QUEUE_FULL
    pub max_queue_size: usize,
    /// How long an admission request may wait for a slot
    pub acquire_timeout_ms: u64,
    /// How long shutdown waits for in-flight tokens before force-rejecting
    pub shutdown_timeout_ms: u64,
}

/// Temp-file staging area
#[derive(Debug, Clone, Deserialize)]
pub struct TempFileSettings {
    pub dir: PathBuf,
    /// Age after which the orphan sweep deletes an unclaimed artifact
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

/// Upload limits applied by the streaming boundary
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    /// Per-file byte limit
    pub max_file_size: u64,
    /// Maximum files accepted in one multipart request
    pub max_files: usize,
    /// Files above this size are staged to disk instead of buffered
    pub spool_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5034,
            },
            gate: GateSettings {
                max_concurrent: 4,
                max_queue_size: 32,
                acquire_timeout_ms: 30_000,
                shutdown_timeout_ms: 10_000,
            },
            temp_files: TempFileSettings {
                dir: env::temp_dir().join("pdf-gate"),
                ttl_secs: 3600,
                sweep_interval_secs: 300,
            },
            upload: UploadSettings {
                max_file_size: 50 * 1024 * 1024,
                max_files: 20,
                spool_threshold: 4 * 1024 * 1024,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_env("SERVER_PORT", defaults.server.port),
            },
            gate: GateSettings {
                max_concurrent: parse_env("GATE_MAX_CONCURRENT", defaults.gate.max_concurrent),
                max_queue_size: parse_env("GATE_MAX_QUEUE_SIZE", defaults.gate.max_queue_size),
                acquire_timeout_ms: parse_env(
                    "GATE_ACQUIRE_TIMEOUT_MS",
                    defaults.gate.acquire_timeout_ms,
                ),
                shutdown_timeout_ms: parse_env(
                    "GATE_SHUTDOWN_TIMEOUT_MS",
                    defaults.gate.shutdown_timeout_ms,
                ),
            },
            temp_files: TempFileSettings {
                dir: env::var("TEMP_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.temp_files.dir),
                ttl_secs: parse_env("TEMP_TTL_SECS", defaults.temp_files.ttl_secs),
                sweep_interval_secs: parse_env(
                    "TEMP_SWEEP_INTERVAL_SECS",
                    defaults.temp_files.sweep_interval_secs,
                ),
            },
            upload: UploadSettings {
                max_file_size: parse_env("UPLOAD_MAX_FILE_SIZE", defaults.upload.max_file_size),
                max_files: parse_env("UPLOAD_MAX_FILES", defaults.upload.max_files),
                spool_threshold: parse_env(
                    "UPLOAD_SPOOL_THRESHOLD",
                    defaults.upload.spool_threshold,
                ),
            },
        }
    }
}

impl GateSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl TempFileSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Parse an env var, falling back to the default on absence or parse failure
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert!(config.gate.max_concurrent > 0);
        assert!(config.gate.max_queue_size >= config.gate.max_concurrent);
        assert!(config.upload.spool_threshold <= config.upload.max_file_size);
    }

    #[test]
    fn duration_helpers() {
        let config = Config::default();
        assert_eq!(
            config.gate.acquire_timeout(),
            Duration::from_millis(config.gate.acquire_timeout_ms)
        );
        assert_eq!(
            config.temp_files.ttl(),
            Duration::from_secs(config.temp_files.ttl_secs)
        );
    }
}
