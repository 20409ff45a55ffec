//! Byte transports used by the fetcher.
//!
//! A transport performs exactly one transfer attempt. Retries, partial-file
//! cleanup and atomic placement are the fetcher's job.

use crate::errors::TransportError;
use crate::runtime::constants::network;
use reqwest::Url;
use std::fs::File;
use std::io::{BufReader, Read, Write};

/// Progress callback: `(bytes_so_far, total_bytes)`.
///
/// `total_bytes` is `None` when the source does not announce a length.
pub type ProgressFn<'a> = &'a mut dyn FnMut(u64, Option<u64>);

const CHUNK_SIZE: usize = 64 * 1024;

/// One attempt at streaming `url` into `sink`.
pub trait Transport: Send + Sync {
    /// Returns the number of bytes written.
    fn download(
        &self,
        url: &str,
        sink: &mut dyn Write,
        progress: ProgressFn<'_>,
    ) -> Result<u64, TransportError>;
}

// ============================================================================
// HTTP(S)
// ============================================================================

/// Blocking HTTP(S) transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(network::CONNECT_TIMEOUT)
            .timeout(network::DOWNLOAD_TIMEOUT)
            .user_agent(concat!("lcsx/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn download(
        &self,
        url: &str,
        sink: &mut dyn Write,
        progress: ProgressFn<'_>,
    ) -> Result<u64, TransportError> {
        let response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let total = response.content_length();
        tracing::debug!(url, ?total, "HTTP transfer started");
        copy_with_progress(response, sink, total, progress)
    }
}

// ============================================================================
// file://
// ============================================================================

/// Copies from a local `file://` URL. Useful for offline mirrors.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransport;

impl Transport for FileTransport {
    fn download(
        &self,
        url: &str,
        sink: &mut dyn Write,
        progress: ProgressFn<'_>,
    ) -> Result<u64, TransportError> {
        let parsed = parse_url(url)?;
        let path = parsed
            .to_file_path()
            .map_err(|_| TransportError::InvalidUrl {
                url: url.to_string(),
                reason: "not a local path".to_string(),
            })?;

        let file = File::open(&path)?;
        let total = file.metadata().ok().map(|m| m.len());
        copy_with_progress(BufReader::new(file), sink, total, progress)
    }
}

// ============================================================================
// Scheme dispatch
// ============================================================================

/// Routes `http`/`https` to [`HttpTransport`] and `file` to [`FileTransport`].
#[derive(Debug, Clone)]
pub struct DefaultTransport {
    http: HttpTransport,
    file: FileTransport,
}

impl DefaultTransport {
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self {
            http: HttpTransport::new()?,
            file: FileTransport,
        })
    }
}

impl Transport for DefaultTransport {
    fn download(
        &self,
        url: &str,
        sink: &mut dyn Write,
        progress: ProgressFn<'_>,
    ) -> Result<u64, TransportError> {
        match parse_url(url)?.scheme() {
            "http" | "https" => self.http.download(url, sink, progress),
            "file" => self.file.download(url, sink, progress),
            other => Err(TransportError::UnsupportedScheme(other.to_string())),
        }
    }
}

fn parse_url(url: &str) -> Result<Url, TransportError> {
    Url::parse(url).map_err(|e| TransportError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn copy_with_progress<R: Read>(
    mut reader: R,
    sink: &mut dyn Write,
    total: Option<u64>,
    progress: ProgressFn<'_>,
) -> Result<u64, TransportError> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut so_far = 0u64;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n])?;
        so_far += n as u64;
        progress(so_far, total);
    }

    sink.flush()?;
    Ok(so_far)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_transport_reports_progress() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("blob.bin");
        std::fs::write(&src, vec![7u8; CHUNK_SIZE + 10]).unwrap();

        let url = Url::from_file_path(&src).unwrap();
        let mut sink = Vec::new();
        let mut calls = Vec::new();
        let written = FileTransport
            .download(url.as_str(), &mut sink, &mut |n, total| calls.push((n, total)))
            .unwrap();

        assert_eq!(written, (CHUNK_SIZE + 10) as u64);
        assert_eq!(sink.len(), CHUNK_SIZE + 10);
        assert_eq!(
            calls.last().copied(),
            Some(((CHUNK_SIZE + 10) as u64, Some((CHUNK_SIZE + 10) as u64)))
        );
    }

    #[test]
    fn test_default_transport_rejects_unknown_scheme() {
        let transport = DefaultTransport::new().unwrap();
        let err = transport
            .download("ftp://mirror.example/rootfs.tar.xz", &mut Vec::new(), &mut |_, _| {})
            .unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedScheme(s) if s == "ftp"));
    }

    #[test]
    fn test_invalid_url() {
        let err = FileTransport
            .download("not a url", &mut Vec::new(), &mut |_, _| {})
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl { .. }));
    }
}
