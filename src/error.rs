//! Error types for archive streaming and startup configuration.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Message returned to clients that ask for an archive that isn't there.
pub const NOT_FOUND_MESSAGE: &str = "Архив не существует или был удален";

/// Errors that can occur while validating, producing or streaming an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// No directory corresponds to the requested identifier.
    #[error("archive `{identifier}` not found")]
    NotFound { identifier: String },

    /// The compression process could not be started.
    #[error("failed to start archive producer `{program}`: {source}")]
    ProducerUnavailable {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The client went away mid-transfer.
    #[error("download was interrupted")]
    StreamInterrupted,

    /// Reading the producer's output pipe failed.
    #[error("failed to read producer output: {0}")]
    ProducerRead(#[source] io::Error),

    /// The producer wrote nothing for longer than the configured idle timeout.
    #[error("producer stalled: no output for {0:?}")]
    ProducerStalled(Duration),
}

impl ArchiveError {
    pub fn not_found(identifier: &str) -> Self {
        ArchiveError::NotFound {
            identifier: identifier.to_string(),
        }
    }

    /// HTTP status used when the error is reported before streaming starts.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ArchiveError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ArchiveError {
    fn into_response(self) -> Response {
        match self {
            ArchiveError::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                NOT_FOUND_MESSAGE,
            )
                .into_response(),
            other => {
                tracing::error!(error = %other, "archive request failed");
                other.status_code().into_response()
            }
        }
    }
}

/// Errors raised while turning command-line arguments into a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("archive directory {} does not exist", .0.display())]
    BaseDirMissing(PathBuf),

    #[error("archive path {} is not a directory", .0.display())]
    BaseDirNotDirectory(PathBuf),

    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("invalid listen address `{0}`")]
    InvalidBindAddress(String),
}
