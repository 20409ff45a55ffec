//! Archive extraction for rootfs tarballs and packaged helper binaries.

mod tar;

pub use self::tar::{Compression, ExtractStats, content_root, detect_compression, extract};
