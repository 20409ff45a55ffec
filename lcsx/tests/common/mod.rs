//! Offline fixtures for the integration tests.

#![allow(dead_code)]

use lcsx::errors::TransportError;
use lcsx::net::{Fetcher, ProgressFn, RetryPolicy, Transport};
use lcsx::runtime::LcsxContext;
use lcsx::{Architecture, DataLayout};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

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

pub fn context(data_dir: &Path, transport: Arc<MemoryTransport>) -> LcsxContext {
    LcsxContext::new(
        DataLayout::new(data_dir),
        Fetcher::new(transport, RetryPolicy::immediate(2)),
        Architecture::X86_64,
    )
}

/// xz-compressed tar of `(path, contents)` regular files with mode 0755.
pub fn rootfs_tarball(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_mode(0o755);
        header.set_size(contents.len() as u64);
        header.set_entry_type(tar::EntryType::Regular);
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .unwrap();
    }
    let tar = builder.into_inner().unwrap();

    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 1);
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

/// gzip-compressed tar holding a single executable named `binary`.
pub fn packaged_binary(binary: &str) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let body = format!("#!{binary}");
    let mut header = tar::Header::new_gnu();
    header.set_mode(0o644);
    header.set_size(body.len() as u64);
    builder
        .append_data(&mut header, binary, body.as_bytes())
        .unwrap();
    let tar = builder.into_inner().unwrap();

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}
