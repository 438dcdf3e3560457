use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{
    ArchiveConfig, DEFAULT_CHUNK_SIZE, DEFAULT_ZIP_PROGRAM, ServerConfig,
};
use crate::error::ConfigError;

#[derive(Parser, Debug)]
#[command(name = "zipstream")]
#[command(version)]
#[command(about = "Microservice for streaming directories as ZIP downloads", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipstream -p test_photos            serve archives from ./test_photos\n  \
  zipstream -l -d -p test_photos      log every chunk and pause between them")]
pub struct Cli {
    /// Turn on logging
    #[arg(short = 'l', long)]
    pub logging: bool,

    /// Turn on delay between chunks
    #[arg(short = 'd', long)]
    pub delay: bool,

    /// Path to catalog with folders
    #[arg(short = 'p', long, value_name = "DIR")]
    pub path: PathBuf,

    /// Delay length in seconds (with -d)
    #[arg(long, value_name = "SECS", default_value_t = 3)]
    pub delay_secs: u64,

    /// Bytes sent per chunk
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Abort a download when the archiver is silent this long
    #[arg(long, value_name = "SECS")]
    pub idle_timeout: Option<u64>,

    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Index page served at /
    #[arg(long, value_name = "FILE", default_value = "index.html")]
    pub index: PathBuf,

    /// Archiver program
    #[arg(long, value_name = "PROGRAM", default_value = DEFAULT_ZIP_PROGRAM)]
    pub zip_program: String,
}

impl Cli {
    pub fn delay(&self) -> Option<Duration> {
        self.delay.then(|| Duration::from_secs(self.delay_secs))
    }

    /// Validate the arguments and build the service configuration.
    pub fn config(&self) -> Result<ServerConfig, ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }

        let base_dir = self
            .path
            .canonicalize()
            .map_err(|_| ConfigError::BaseDirMissing(self.path.clone()))?;
        if !base_dir.is_dir() {
            return Err(ConfigError::BaseDirNotDirectory(self.path.clone()));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.host.clone()))?;

        Ok(ServerConfig {
            bind: SocketAddr::new(ip, self.port),
            index_page: self.index.clone(),
            logging: self.logging,
            zip_program: self.zip_program.clone(),
            archive: ArchiveConfig {
                base_dir,
                chunk_size: self.chunk_size,
                delay: self.delay(),
                idle_timeout: self.idle_timeout.map(Duration::from_secs),
            },
        })
    }
}
