//! Immutable service configuration.
//!
//! Built once at startup from the command line and shared read-only by every
//! request handler.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default size of one forwarded chunk (100 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 100 * 1024;

/// Default pause between chunks when the artificial delay is turned on.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

/// Default program used to produce archives.
pub const DEFAULT_ZIP_PROGRAM: &str = "zip";

/// Settings consumed by archive jobs.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Canonical directory holding one sub-directory per archive.
    pub base_dir: PathBuf,
    /// Upper bound on bytes read from the producer per forwarded chunk.
    pub chunk_size: usize,
    /// Sleep after every chunk, used to simulate slow networks.
    pub delay: Option<Duration>,
    /// Give up when the producer writes nothing for this long.
    pub idle_timeout: Option<Duration>,
}

impl ArchiveConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            delay: None,
            idle_timeout: None,
        }
    }
}

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub index_page: PathBuf,
    pub logging: bool,
    pub zip_program: String,
    pub archive: ArchiveConfig,
}
