//! One archive download from validation to cleanup.
//!
//! A job moves through
//! `Created → Validating → Producing → Streaming → {Completed | Interrupted | Failed}`.
//! Validation and spawning happen in [`ArchiveJob::start`], before any response
//! is committed, so their failures can still become HTTP status codes.
//! [`ArchiveJob::run`] streams the archive and then reaps the producer on
//! every exit path.

use std::fmt;
use std::process::ExitStatus;
use std::time::Duration;

use crate::error::ArchiveError;
use crate::io::ChunkSink;

use super::forwarder::{ForwardOptions, ForwardStats, forward};
use super::producer::{ArchiveProducer, ProducerHandle};
use super::resolver::{ArchiveRequest, ArchiveResolver};

/// How long a producer that finished its output may take to exit by itself.
const EXIT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Validating,
    Producing,
    Streaming,
    Completed,
    Interrupted,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Interrupted | JobState::Failed
        )
    }
}

/// How a job ended.
#[derive(Debug)]
pub enum JobOutcome {
    /// The whole archive was delivered.
    Completed,
    /// The client disconnected.
    Interrupted,
    /// The producer failed mid-stream; the client got a truncated body.
    Failed(ArchiveError),
}

impl JobOutcome {
    fn state(&self) -> JobState {
        match self {
            JobOutcome::Completed => JobState::Completed,
            JobOutcome::Interrupted => JobState::Interrupted,
            JobOutcome::Failed(_) => JobState::Failed,
        }
    }
}

/// Summary of a finished job.
#[derive(Debug)]
pub struct JobReport {
    pub identifier: String,
    pub outcome: JobOutcome,
    pub stats: ForwardStats,
    /// Producer exit status, when there was a process to reap.
    pub exit: Option<ExitStatus>,
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "archive {}: {:?}, {} chunks, {} bytes",
            self.identifier,
            self.outcome.state(),
            self.stats.chunks,
            self.stats.bytes
        )
    }
}

/// An archive request whose producer is running.
#[derive(Debug)]
pub struct ArchiveJob {
    request: ArchiveRequest,
    handle: ProducerHandle,
    options: ForwardOptions,
    state: JobState,
}

impl ArchiveJob {
    /// Validate `identifier` and start its producer.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::NotFound`] if the identifier does not resolve; the
    ///   producer is not started
    /// - [`ArchiveError::ProducerUnavailable`] if the producer fails to start
    pub fn start(
        identifier: &str,
        resolver: &ArchiveResolver,
        producer: &dyn ArchiveProducer,
        options: ForwardOptions,
    ) -> Result<Self, ArchiveError> {
        let mut state = JobState::Created;
        transition(identifier, &mut state, JobState::Validating);
        let request = resolver.resolve(identifier).inspect_err(|_| {
            transition(identifier, &mut state, JobState::Failed);
        })?;

        transition(identifier, &mut state, JobState::Producing);
        let handle = producer.start(&request.path).inspect_err(|_| {
            transition(identifier, &mut state, JobState::Failed);
        })?;

        Ok(Self {
            request,
            handle,
            options,
            state,
        })
    }

    pub fn request(&self) -> &ArchiveRequest {
        &self.request
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Stream the archive into `sink`, then terminate and reap the producer.
    pub async fn run<S>(mut self, sink: &mut S) -> JobReport
    where
        S: ChunkSink + ?Sized,
    {
        self.advance(JobState::Streaming);

        let mut stats = ForwardStats::default();
        let result = forward(self.handle.output(), sink, &self.options, &mut stats).await;

        let outcome = match result {
            Ok(()) => JobOutcome::Completed,
            Err(ArchiveError::StreamInterrupted) => {
                tracing::debug!(identifier = %self.request.identifier, "Download was interrupted");
                JobOutcome::Interrupted
            }
            Err(e) => {
                tracing::warn!(identifier = %self.request.identifier, error = %e, "archive stream failed");
                JobOutcome::Failed(e)
            }
        };

        // A producer that closed its output is expected to exit by itself;
        // anything else is killed straight away.
        let grace = match outcome {
            JobOutcome::Completed => EXIT_GRACE,
            _ => Duration::ZERO,
        };
        let exit = self.handle.shutdown(grace).await;

        if let (JobOutcome::Completed, Some(status)) = (&outcome, exit)
            && !status.success()
        {
            tracing::warn!(identifier = %self.request.identifier, %status, "archive producer exited with an error");
        }

        self.advance(outcome.state());
        let report = JobReport {
            identifier: self.request.identifier,
            outcome,
            stats,
            exit,
        };
        tracing::info!("{report}");
        report
    }

    fn advance(&mut self, next: JobState) {
        transition(&self.request.identifier, &mut self.state, next);
    }
}

fn transition(identifier: &str, state: &mut JobState, next: JobState) {
    debug_assert!(!state.is_terminal(), "job {identifier} already finished");
    tracing::trace!(identifier, from = ?*state, to = ?next, "archive job state");
    *state = next;
}
