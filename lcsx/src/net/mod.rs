//! Network fetching: transports, retry policy and the resilient fetcher.

mod fetcher;
mod retry;
mod transport;

pub use fetcher::{DownloadJob, FetchObserver, Fetcher, SilentObserver};
pub use retry::{Exhausted, RetryPolicy};
pub use transport::{DefaultTransport, FileTransport, HttpTransport, ProgressFn, Transport};
