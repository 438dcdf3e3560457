//! # zipstream
//!
//! An HTTP microservice that streams directories as ZIP archives.
//!
//! A request for `/archive/{identifier}/` resolves `identifier` to a directory
//! under the configured base directory, runs `zip` inside it, and relays the
//! archiver's output to the client chunk by chunk as it is produced. Archives
//! are never written to disk or held in memory as a whole.
//!
//! ## Features
//!
//! - Streaming downloads with backpressure from the client connection
//! - Prompt cleanup of the archiver when a client disconnects
//! - Identifiers are confined to the base directory
//! - Optional per-chunk delay for testing slow clients
//!
//! ## Example
//!
//! ```no_run
//! use zipstream::config::{ArchiveConfig, ServerConfig};
//! use zipstream::server::{self, AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig {
//!         bind: "127.0.0.1:8080".parse()?,
//!         index_page: "index.html".into(),
//!         logging: false,
//!         zip_program: "zip".to_string(),
//!         archive: ArchiveConfig::new("test_photos"),
//!     };
//!
//!     let listener = tokio::net::TcpListener::bind(config.bind).await?;
//!     let state = AppState::new(&config)?;
//!     server::serve(listener, state, std::future::pending()).await?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod server;

pub use archive::{ArchiveJob, ArchiveProducer, ArchiveResolver, CommandProducer};
pub use cli::Cli;
pub use error::{ArchiveError, ConfigError};
pub use io::{ChunkSink, SinkClosed};
