//! Offline fixtures shared by unit tests.

use crate::errors::TransportError;
use crate::net::{Fetcher, ProgressFn, RetryPolicy, Transport};
use flate2::write::GzEncoder;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tar::{Builder, EntryType, Header};

/// Serves fixed bodies by URL and records every request.
#[derive(Default)]
pub struct MemoryTransport {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: impl Into<String>, body: Vec<u8>) -> Self {
        self.bodies.insert(url.into(), body);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for MemoryTransport {
    fn download(
        &self,
        url: &str,
        sink: &mut dyn Write,
        progress: ProgressFn<'_>,
    ) -> Result<u64, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        let body = self.bodies.get(url).ok_or(TransportError::Status(404))?;
        sink.write_all(body)?;
        progress(body.len() as u64, Some(body.len() as u64));
        Ok(body.len() as u64)
    }
}

pub fn fetcher(transport: Arc<MemoryTransport>) -> Fetcher {
    Fetcher::new(transport, RetryPolicy::immediate(2))
}

/// Tar stream of `(path, contents, mode)` regular files. A path ending in
/// `/` becomes a directory; a `->` in the contents makes a symlink.
pub fn tarball(entries: &[(&str, &str, u32)]) -> Vec<u8> {
    let mut builder = Builder::new(Vec::new());
    for (path, contents, mode) in entries {
        let mut header = Header::new_gnu();
        header.set_mode(*mode);
        if path.ends_with('/') {
            header.set_entry_type(EntryType::Directory);
            header.set_size(0);
            builder
                .append_data(&mut header, path, std::io::empty())
                .unwrap();
        } else if let Some(target) = contents.strip_prefix("->") {
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            builder.append_link(&mut header, path, target).unwrap();
        } else {
            header.set_entry_type(EntryType::Regular);
            header.set_size(contents.len() as u64);
            builder
                .append_data(&mut header, path, contents.as_bytes())
                .unwrap();
        }
    }
    builder.into_inner().unwrap()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn xz(data: &[u8]) -> Vec<u8> {
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 1);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
