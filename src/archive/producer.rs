//! Child processes that write ZIP archives to a pipe.
//!
//! An [`ArchiveProducer`] starts a producer for a directory and returns a
//! [`ProducerHandle`], which owns both the child process and its output pipe.
//! The handle is the only way to reach the child, so whoever holds it is
//! responsible for calling [`ProducerHandle::terminate`].

use std::fmt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::process::{Child, Command};

use crate::config::DEFAULT_ZIP_PROGRAM;
use crate::error::ArchiveError;

/// Arguments that make `zip` archive the current directory recursively to
/// stdout without printing anything else.
const ZIP_ARGS: [&str; 4] = ["-r", "-qq", "-", "."];

/// Starts archive producers.
///
/// Implemented by [`CommandProducer`] for real use; tests substitute stubs.
pub trait ArchiveProducer: Send + Sync {
    /// Start producing an archive of `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::ProducerUnavailable`] if the producer cannot be
    /// started.
    fn start(&self, dir: &Path) -> Result<ProducerHandle, ArchiveError>;
}

/// Producer backed by an external program run inside the target directory.
#[derive(Debug, Clone)]
pub struct CommandProducer {
    program: String,
    args: Vec<String>,
}

impl CommandProducer {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `zip -r -qq - .` using the given program name or path.
    pub fn zip(program: impl Into<String>) -> Self {
        Self::new(program, ZIP_ARGS)
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for CommandProducer {
    fn default() -> Self {
        Self::zip(DEFAULT_ZIP_PROGRAM)
    }
}

impl ArchiveProducer for CommandProducer {
    fn start(&self, dir: &Path) -> Result<ProducerHandle, ArchiveError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ArchiveError::ProducerUnavailable {
                program: self.program.clone(),
                source,
            })?;

        tracing::debug!(pid = ?child.id(), dir = %dir.display(), "started archive producer");
        ProducerHandle::from_child(child).map_err(|source| ArchiveError::ProducerUnavailable {
            program: self.program.clone(),
            source,
        })
    }
}

type Output = Box<dyn AsyncRead + Send + Unpin>;

/// Exclusive owner of one producer's output and, if any, its child process.
///
/// The child is spawned with kill-on-drop, so a handle dropped without
/// [`terminate`](Self::terminate) (a panicking or aborted task) still kills it
/// and leaves the reaping to the runtime.
pub struct ProducerHandle {
    output: Output,
    child: Option<Child>,
    exit: Option<ExitStatus>,
}

impl ProducerHandle {
    /// Take ownership of a spawned child whose stdout is piped.
    pub fn from_child(mut child: Child) -> std::io::Result<Self> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("producer stdout is not piped"))?;
        Ok(Self {
            output: Box::new(stdout),
            child: Some(child),
            exit: None,
        })
    }

    /// A producer with no process behind it.
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            output: Box::new(reader),
            child: None,
            exit: None,
        }
    }

    /// The producer's output stream.
    pub fn output(&mut self) -> &mut (dyn AsyncRead + Send + Unpin) {
        &mut *self.output
    }

    /// OS process id, while the child is still owned.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Kill the child if it is still running and reap it.
    ///
    /// Idempotent: later calls return the status collected by the first one.
    pub async fn terminate(&mut self) -> Option<ExitStatus> {
        self.shutdown(Duration::ZERO).await
    }

    /// Give the child up to `grace` to exit on its own, then terminate it.
    pub async fn shutdown(&mut self, grace: Duration) -> Option<ExitStatus> {
        let Some(mut child) = self.child.take() else {
            return self.exit;
        };

        if !grace.is_zero()
            && let Ok(Ok(status)) = tokio::time::timeout(grace, child.wait()).await
        {
            self.exit = Some(status);
            return self.exit;
        }

        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!("producer has exited already");
                self.exit = Some(status);
                return self.exit;
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "failed to poll producer status"),
        }

        tracing::debug!(pid = ?child.id(), "killing producer");
        if let Err(e) = child.start_kill() {
            tracing::debug!(error = %e, "producer has exited already");
        }
        match child.wait().await {
            Ok(status) => {
                tracing::debug!(%status, "producer was killed");
                self.exit = Some(status);
            }
            Err(e) => tracing::debug!(error = %e, "failed to reap producer"),
        }
        self.exit
    }
}

impl fmt::Debug for ProducerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerHandle")
            .field("pid", &self.id())
            .field("exit", &self.exit)
            .finish_non_exhaustive()
    }
}
