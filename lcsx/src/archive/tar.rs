//! Unprivileged tarball extraction.
//!
//! Rootfs tarballs carry device nodes and files owned by other users. Neither
//! can be recreated without privileges, so device entries are skipped up front
//! and permission failures on individual entries are tolerated.

use crate::errors::ExtractError;
use flate2::read::MultiGzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::{debug, trace, warn};
use xz2::read::XzDecoder;

/// Entries below this top-level directory are never materialized.
const DEVICE_TREE: &str = "dev";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const XZ_MAGIC: [u8; 6] = [0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];
const USTAR_MAGIC: &[u8] = b"ustar";
const USTAR_OFFSET: usize = 257;
const HEADER_PROBE: usize = 512;

/// Compression wrapped around a tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Xz,
    None,
}

/// Counters reported once extraction finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractStats {
    pub unpacked: u64,
    pub skipped_devices: u64,
    pub skipped_denied: u64,
}

/// Sniff the compression format from the leading magic bytes.
pub fn detect_compression(archive: &Path) -> Result<Compression, ExtractError> {
    let file = File::open(archive).map_err(|e| ExtractError::Open {
        path: archive.to_path_buf(),
        source: e,
    })?;

    let mut header = Vec::with_capacity(HEADER_PROBE);
    file.take(HEADER_PROBE as u64)
        .read_to_end(&mut header)
        .map_err(|e| ExtractError::io(archive, e))?;

    if header.starts_with(&GZIP_MAGIC) {
        Ok(Compression::Gzip)
    } else if header.starts_with(&XZ_MAGIC) {
        Ok(Compression::Xz)
    } else if header.len() >= USTAR_OFFSET + USTAR_MAGIC.len()
        && &header[USTAR_OFFSET..USTAR_OFFSET + USTAR_MAGIC.len()] == USTAR_MAGIC
    {
        Ok(Compression::None)
    } else {
        Err(ExtractError::UnsupportedFormat {
            path: archive.to_path_buf(),
        })
    }
}

/// Extract `archive` into `dest`, delete the archive, and return the
/// effective content root.
///
/// The content root is the single top-level directory when the archive
/// wraps its tree in one (`dist-1.0/...`), otherwise `dest` itself.
pub fn extract(archive: &Path, dest: &Path) -> Result<PathBuf, ExtractError> {
    let compression = detect_compression(archive)?;
    debug!(
        archive = %archive.display(),
        ?compression,
        "Detected archive compression"
    );

    let file = File::open(archive).map_err(|e| ExtractError::Open {
        path: archive.to_path_buf(),
        source: e,
    })?;
    let buffered = BufReader::new(file);
    let reader: Box<dyn Read> = match compression {
        Compression::Gzip => Box::new(MultiGzDecoder::new(buffered)),
        Compression::Xz => Box::new(XzDecoder::new(buffered)),
        Compression::None => Box::new(buffered),
    };

    fs::create_dir_all(dest).map_err(|e| ExtractError::io(dest, e))?;
    let stats = unpack(reader, archive, dest)?;

    debug!(
        archive = %archive.display(),
        unpacked = stats.unpacked,
        skipped_devices = stats.skipped_devices,
        skipped_denied = stats.skipped_denied,
        "Extraction complete"
    );

    if let Err(e) = fs::remove_file(archive) {
        warn!(archive = %archive.display(), "Failed to remove archive after extraction: {}", e);
    }

    content_root(dest).map_err(|e| ExtractError::io(dest, e))
}

/// Single top-level directory of `dir`, or `dir` itself.
///
/// A lone symlink does not count: a wrapped tree is always a real directory.
pub fn content_root(dir: &Path) -> io::Result<PathBuf> {
    let mut entries = fs::read_dir(dir)?;
    let Some(first) = entries.next().transpose()? else {
        return Ok(dir.to_path_buf());
    };
    if entries.next().is_some() {
        return Ok(dir.to_path_buf());
    }

    if first.file_type()?.is_dir() {
        Ok(first.path())
    } else {
        Ok(dir.to_path_buf())
    }
}

fn unpack<R: Read>(reader: R, archive: &Path, dest: &Path) -> Result<ExtractStats, ExtractError> {
    let mut tar = Archive::new(reader);
    tar.set_preserve_permissions(true);
    tar.set_overwrite(true);
    tar.set_unpack_xattrs(false);

    let corrupt = |e: io::Error| ExtractError::Corrupt {
        path: archive.to_path_buf(),
        source: e,
    };

    let mut stats = ExtractStats::default();
    for entry in tar.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        let path = entry.path().map_err(corrupt)?.into_owned();

        if is_device_entry(entry.header().entry_type()) || in_device_tree(&path) {
            trace!(entry = %path.display(), "Skipping device entry");
            stats.skipped_devices += 1;
            continue;
        }

        match entry.unpack_in(dest) {
            Ok(true) => stats.unpacked += 1,
            // Refused by tar because it would escape dest
            Ok(false) => warn!(entry = %path.display(), "Skipping entry outside destination"),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warn!(entry = %path.display(), "Permission denied, skipping entry");
                stats.skipped_denied += 1;
            }
            Err(e) => {
                return Err(ExtractError::Entry {
                    entry: path,
                    source: e,
                });
            }
        }
    }

    Ok(stats)
}

fn is_device_entry(kind: EntryType) -> bool {
    matches!(kind, EntryType::Block | EntryType::Char | EntryType::Fifo)
}

/// True for `dev/...` and `./dev/...`.
fn in_device_tree(path: &Path) -> bool {
    path.components()
        .find(|c| !matches!(c, Component::CurDir))
        .is_some_and(|c| c.as_os_str() == DEVICE_TREE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression as GzLevel;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tar::{Builder, Header};

    fn file_header(size: u64, mode: u32) -> Header {
        let mut header = Header::new_gnu();
        header.set_size(size);
        header.set_mode(mode);
        header.set_entry_type(EntryType::Regular);
        header.set_cksum();
        header
    }

    fn device_header(kind: EntryType) -> Header {
        let mut header = Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o666);
        header.set_entry_type(kind);
        header.set_device_major(1).unwrap();
        header.set_device_minor(3).unwrap();
        header.set_cksum();
        header
    }

    fn tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = Builder::new(Vec::new());
        for (path, data) in files {
            let mut header = file_header(data.len() as u64, 0o644);
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), GzLevel::fast());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn xz(data: &[u8]) -> Vec<u8> {
        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 1);
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_single_top_level_dir_is_content_root() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("dist.tar.gz");
        fs::write(
            &archive,
            gzip(&tarball(&[
                ("dist-1.0/bin/bash", b"#!bash"),
                ("dist-1.0/etc/os-release", b"ID=dist"),
            ])),
        )
        .unwrap();

        let dest = temp.path().join("rootfs");
        let root = extract(&archive, &dest).unwrap();

        assert_eq!(root, dest.join("dist-1.0"));
        assert!(root.join("bin/bash").is_file());
        assert!(!archive.exists(), "archive is deleted after extraction");
    }

    #[test]
    fn test_multiple_top_level_entries_keep_dest() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("flat.tar.xz");
        fs::write(
            &archive,
            xz(&tarball(&[("bin/sh", b"#!sh"), ("etc/hostname", b"alpine")])),
        )
        .unwrap();

        let dest = temp.path().join("rootfs");
        let root = extract(&archive, &dest).unwrap();

        assert_eq!(root, dest);
        assert_eq!(fs::read(dest.join("etc/hostname")).unwrap(), b"alpine");
    }

    #[test]
    fn test_device_entries_are_skipped() {
        let mut builder = Builder::new(Vec::new());
        let mut header = file_header(4, 0o644);
        builder
            .append_data(&mut header, "dev/console.txt", &b"nope"[..])
            .unwrap();
        let mut header = device_header(EntryType::Char);
        builder
            .append_data(&mut header, "lib/udev/null", io::empty())
            .unwrap();
        let mut header = device_header(EntryType::Fifo);
        builder
            .append_data(&mut header, "run/initctl", io::empty())
            .unwrap();
        let mut header = file_header(2, 0o644);
        builder
            .append_data(&mut header, "etc/motd", &b"hi"[..])
            .unwrap();
        let data = builder.into_inner().unwrap();

        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("rootfs.tar");
        fs::write(&archive, data).unwrap();
        let dest = temp.path().join("out");

        extract(&archive, &dest).unwrap();

        assert!(dest.join("etc/motd").is_file());
        assert!(!dest.join("dev").exists());
        assert!(!dest.join("lib/udev/null").exists());
        assert!(!dest.join("run/initctl").exists());
    }

    #[test]
    fn test_detect_compression() {
        let temp = tempfile::tempdir().unwrap();
        let plain = tarball(&[("a", b"1")]);

        let cases = [
            ("a.tar.gz", gzip(&plain), Compression::Gzip),
            ("a.tar.xz", xz(&plain), Compression::Xz),
            ("a.tar", plain.clone(), Compression::None),
        ];
        for (name, bytes, expected) in cases {
            let path = temp.path().join(name);
            fs::write(&path, bytes).unwrap();
            assert_eq!(detect_compression(&path).unwrap(), expected, "{name}");
        }
    }

    #[test]
    fn test_unsupported_format() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("rootfs.zip");
        fs::write(&archive, b"PK\x03\x04 definitely not a tarball").unwrap();

        let err = extract(&archive, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat { .. }));
        assert!(archive.exists(), "archive is kept when nothing was extracted");
    }

    #[test]
    fn test_truncated_archive_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let noise: Vec<u8> = (0u32..16 * 1024)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8)
            .collect();
        let full = gzip(&tarball(&[("bin/bash", &noise)]));
        let archive = temp.path().join("cut.tar.gz");
        fs::write(&archive, &full[..full.len() / 2]).unwrap();

        assert!(extract(&archive, &temp.path().join("out")).is_err());
    }

    #[test]
    fn test_permission_denied_entry_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();

        // Mode bits do not stop root, so nothing would be refused
        let sealed = temp.path().join("sealed");
        fs::create_dir(&sealed).unwrap();
        fs::set_permissions(&sealed, fs::Permissions::from_mode(0o555)).unwrap();
        let privileged = fs::write(sealed.join("x"), b"").is_ok();
        fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755)).unwrap();
        if privileged {
            return;
        }

        let mut builder = Builder::new(Vec::new());
        let mut header = Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o555);
        header.set_entry_type(EntryType::Directory);
        header.set_cksum();
        builder.append_data(&mut header, "ro/", io::empty()).unwrap();
        let mut header = file_header(3, 0o644);
        builder
            .append_data(&mut header, "ro/file", &b"abc"[..])
            .unwrap();
        let mut header = file_header(2, 0o644);
        builder
            .append_data(&mut header, "etc/motd", &b"hi"[..])
            .unwrap();
        let data = builder.into_inner().unwrap();

        let dest = temp.path().join("out");
        fs::create_dir_all(&dest).unwrap();
        let stats = unpack(io::Cursor::new(data), Path::new("ro.tar"), &dest).unwrap();

        assert_eq!(stats.skipped_denied, 1);
        assert_eq!(stats.unpacked, 2);
        assert!(!dest.join("ro/file").exists());
        assert_eq!(fs::read(dest.join("etc/motd")).unwrap(), b"hi");

        fs::set_permissions(dest.join("ro"), fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_in_device_tree() {
        assert!(in_device_tree(Path::new("dev/null")));
        assert!(in_device_tree(Path::new("./dev/pts")));
        assert!(!in_device_tree(Path::new("devices/x")));
        assert!(!in_device_tree(Path::new("usr/dev/x")));
    }

    #[test]
    fn test_content_root_ignores_lone_file() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("only-file"), b"x").unwrap();
        assert_eq!(content_root(temp.path()).unwrap(), temp.path());
    }
}
