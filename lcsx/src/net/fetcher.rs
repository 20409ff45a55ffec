//! Resilient download of a single remote resource to a local path.

use super::retry::RetryPolicy;
use super::transport::{DefaultTransport, Transport};
use crate::errors::{FetchError, TransportError};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Suffix of the in-flight file; it is renamed over the destination on success.
const PARTIAL_SUFFIX: &str = ".part";

/// One fetch in progress. Lives only for the duration of a call to [`Fetcher::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub url: String,
    pub destination: PathBuf,
    pub attempts_remaining: u32,
}

/// Receives download lifecycle notifications.
///
/// Observers are best-effort reporting hooks: they cannot fail and
/// therefore cannot abort a transfer.
pub trait FetchObserver: Send + Sync {
    fn started(&self, _job: &DownloadJob) {}
    fn progress(&self, _bytes_so_far: u64, _total_bytes: Option<u64>) {}
    fn finished(&self, _job: &DownloadJob) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl FetchObserver for SilentObserver {}

/// Downloads with bounded retries and no partial files left behind.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    observer: Arc<dyn FetchObserver>,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self {
            transport,
            retry,
            observer: Arc::new(SilentObserver),
        }
    }

    /// Fetcher over HTTP(S) and `file://` with the default retry policy.
    pub fn with_defaults() -> Result<Self, TransportError> {
        Ok(Self::new(
            Arc::new(DefaultTransport::new()?),
            RetryPolicy::default(),
        ))
    }

    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Fetch `url` into `destination`.
    ///
    /// A stale file at the destination (for example from an interrupted
    /// previous run) is discarded first. Each failed attempt deletes its
    /// partial output before the next one starts.
    pub fn fetch(&self, url: &str, destination: &Path) -> Result<PathBuf, FetchError> {
        let partial = partial_path(destination);
        let fail = |attempts, cause| FetchError {
            url: url.to_string(),
            attempts,
            cause,
        };

        discard(destination).map_err(|e| fail(0, e.into()))?;
        discard(&partial).map_err(|e| fail(0, e.into()))?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| fail(0, e.into()))?;
        }

        let max_attempts = self.retry.max_attempts();
        let mut job = DownloadJob {
            url: url.to_string(),
            destination: destination.to_path_buf(),
            attempts_remaining: max_attempts,
        };

        tracing::info!(url, destination = %destination.display(), "Downloading");
        self.observer.started(&job);

        let outcome = self.retry.run(&format!("download of {url}"), |attempt| {
            job.attempts_remaining = max_attempts - attempt;
            let result = self.attempt(url, &partial);
            if result.is_err()
                && let Err(e) = discard(&partial)
            {
                tracing::warn!(path = %partial.display(), "Failed to remove partial download: {}", e);
            }
            result
        });

        let bytes = match outcome {
            Ok(bytes) => bytes,
            Err(exhausted) => {
                let _ = discard(&partial);
                return Err(fail(exhausted.attempts, exhausted.last));
            }
        };

        if let Err(e) = fs::rename(&partial, destination) {
            let _ = discard(&partial);
            return Err(fail(max_attempts - job.attempts_remaining, e.into()));
        }

        tracing::info!(url, bytes, "Download complete");
        self.observer.finished(&job);
        Ok(destination.to_path_buf())
    }

    fn attempt(&self, url: &str, partial: &Path) -> Result<u64, TransportError> {
        let file = File::create(partial)?;
        let mut writer = BufWriter::new(file);
        let observer = &self.observer;
        let bytes = self
            .transport
            .download(url, &mut writer, &mut |so_far, total| {
                observer.progress(so_far, total)
            })?;
        writer.flush()?;
        Ok(bytes)
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Remove a file if present.
fn discard(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Discarded stale file");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
