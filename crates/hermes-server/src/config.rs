//! Service configuration.
//!
//! All knobs are set through the
//! [`HttpServiceBuilder`](crate::HttpServiceBuilder); this module holds the
//! resolved settings and their defaults.

use std::time::Duration;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port; `0` asks the OS for an ephemeral port.
pub const DEFAULT_PORT: u16 = 0;

/// Default cap on an aggregated request body, in bytes.
pub const DEFAULT_HTTP_CHUNK_LIMIT: usize = 150 * 1024 * 1024;

/// Default accept (boss) pool size.
pub const DEFAULT_BOSS_THREAD_POOL_SIZE: usize = 1;

/// Default I/O worker pool size.
pub const DEFAULT_WORKER_THREAD_POOL_SIZE: usize = 10;

/// Default handler-execution pool size. `0` runs handlers on the I/O
/// worker instead.
pub const DEFAULT_EXEC_THREAD_POOL_SIZE: usize = 60;

/// Default grace period for draining connections during `stop()`.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

/// Resolved service settings.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Service name; used for thread naming and handler contexts.
    pub(crate) service_name: String,
    /// Bind host.
    pub(crate) host: String,
    /// Bind port.
    pub(crate) port: u16,
    /// Cap on an aggregated request body.
    pub(crate) http_chunk_limit: usize,
    /// Accept pool size. The accept loop runs as a single runtime task;
    /// the value is kept for configuration parity and validated only.
    pub(crate) boss_thread_pool_size: usize,
    /// I/O worker pool size (runtime worker threads).
    pub(crate) worker_thread_pool_size: usize,
    /// Handler-execution pool size (blocking threads); `0` runs handlers
    /// inline on the I/O worker.
    pub(crate) exec_thread_pool_size: usize,
    /// Grace period for draining connections during `stop()`.
    pub(crate) shutdown_grace: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "hermes".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            http_chunk_limit: DEFAULT_HTTP_CHUNK_LIMIT,
            boss_thread_pool_size: DEFAULT_BOSS_THREAD_POOL_SIZE,
            worker_thread_pool_size: DEFAULT_WORKER_THREAD_POOL_SIZE,
            exec_thread_pool_size: DEFAULT_EXEC_THREAD_POOL_SIZE,
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
        }
    }
}

impl ServiceConfig {
    /// Service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Bind host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Bind port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Aggregation cap in bytes.
    #[must_use]
    pub fn http_chunk_limit(&self) -> usize {
        self.http_chunk_limit
    }

    /// Handler-execution pool size.
    #[must_use]
    pub fn exec_thread_pool_size(&self) -> usize {
        self.exec_thread_pool_size
    }

    /// Shutdown grace period.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.host(), "0.0.0.0");
        assert_eq!(config.port(), 0);
        assert_eq!(config.http_chunk_limit(), 150 * 1024 * 1024);
        assert_eq!(config.boss_thread_pool_size, 1);
        assert_eq!(config.worker_thread_pool_size, 10);
        assert_eq!(config.exec_thread_pool_size, 60);
        assert_eq!(config.shutdown_grace(), Duration::from_secs(30));
    }
}
