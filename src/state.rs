//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::gate::{GateConfig, TaskGate};
use crate::processor::{PdfProcessor, StubProcessor};
use crate::tempfiles::{TempFileConfig, TempFileManager};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pub config: Config,
    pub gate: TaskGate,
    pub temp_files: TempFileManager,
    pub processor: Arc<dyn PdfProcessor>,
}

impl AppState {
    /// Create the application state and start the temp-file sweeper
    pub fn new(config: Config) -> Self {
        Self::with_processor(config, Arc::new(StubProcessor))
    }

    pub fn with_processor(config: Config, processor: Arc<dyn PdfProcessor>) -> Self {
        let gate = TaskGate::new(GateConfig {
            max_concurrent: config.gate.max_concurrent,
            max_queue_size: config.gate.max_queue_size,
            acquire_timeout: config.gate.acquire_timeout(),
        });

        let temp_files = TempFileManager::new(TempFileConfig {
            dir: config.temp_files.dir.clone(),
            ttl: config.temp_files.ttl(),
            sweep_interval: config.temp_files.sweep_interval(),
        });
        temp_files.start_sweep_task();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                gate,
                temp_files,
                processor,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the task gate
    pub fn gate(&self) -> &TaskGate {
        &self.inner.gate
    }

    /// Get the temp-file manager
    pub fn temp_files(&self) -> &TempFileManager {
        &self.inner.temp_files
    }

    /// Get the document processor
    pub fn processor(&self) -> &Arc<dyn PdfProcessor> {
        &self.inner.processor
    }

    /// Drain in-flight work, then remove this process's staged files
    ///
    /// Called after the HTTP listener stops accepting connections.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down application state...");

        let drained = self
            .inner
            .gate
            .shutdown(self.inner.config.gate.shutdown_timeout())
            .await;
        if !drained {
            tracing::warn!("gate shutdown timed out with work still running");
        }

        self.inner.temp_files.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn state_wires_config_into_gate() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.gate.max_concurrent = 2;
        config.temp_files.dir = dir.path().to_path_buf();

        let state = AppState::new(config);
        assert_eq!(state.gate().stats().available, 2);

        state.shutdown().await;
    }
}
