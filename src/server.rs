//! HTTP surface: the archive route and the index page.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;

use crate::archive::{
    ArchiveJob, ArchiveProducer, ArchiveResolver, CommandProducer, ForwardOptions,
};
use crate::config::ServerConfig;
use crate::error::ArchiveError;
use crate::io::response_channel;

/// Content type kept for compatibility with existing download clients.
const ARCHIVE_CONTENT_TYPE: &str = "multipart/form-data";
const ARCHIVE_DISPOSITION: &str = r#"attachment; filename="photos.zip""#;

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    resolver: Arc<ArchiveResolver>,
    producer: Arc<dyn ArchiveProducer>,
    options: ForwardOptions,
    index_page: Arc<PathBuf>,
}

impl AppState {
    /// Build the state for a configuration, producing archives with the
    /// configured zip program.
    pub fn new(config: &ServerConfig) -> std::io::Result<Self> {
        let producer = CommandProducer::zip(config.zip_program.clone());
        Self::with_producer(config, Arc::new(producer))
    }

    pub fn with_producer(
        config: &ServerConfig,
        producer: Arc<dyn ArchiveProducer>,
    ) -> std::io::Result<Self> {
        Ok(Self {
            resolver: Arc::new(ArchiveResolver::new(&config.archive.base_dir)?),
            producer,
            options: ForwardOptions::from(&config.archive),
            index_page: Arc::new(config.index_page.clone()),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/archive/:identifier/", get(archive))
        .with_state(state)
}

/// Serve `router(state)` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Start streaming the archive for `identifier`.
///
/// Validation and producer start-up happen before the response exists, so
/// their failures map to a status code. Once the headers go out the job runs
/// on its own task and owns the producer until it is reaped.
async fn archive(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Response, ArchiveError> {
    let job = ArchiveJob::start(
        &identifier,
        &state.resolver,
        state.producer.as_ref(),
        state.options,
    )?;

    let (mut sink, body) = response_channel();
    tokio::spawn(async move {
        job.run(&mut sink).await;
    });

    let mut response = body.into_body().into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(ARCHIVE_CONTENT_TYPE),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static(ARCHIVE_DISPOSITION),
    );
    Ok(response)
}

/// Serve the index page, read from disk on every request.
async fn index_page(State(state): State<AppState>) -> Response {
    match tokio::fs::read_to_string(state.index_page.as_path()).await {
        Ok(contents) => Html(contents).into_response(),
        Err(e) => {
            tracing::warn!(path = %state.index_page.display(), error = %e, "failed to read index page");
            (StatusCode::NOT_FOUND, "index page not found").into_response()
        }
    }
}
