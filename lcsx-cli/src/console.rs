//! Operator-facing status lines, separate from the log file.

use lcsx::net::{DownloadJob, FetchObserver};
use std::io::{self, Write};
use std::sync::Mutex;

const STATUS_PREFIX: &str = "[!]";
const ERROR_PREFIX: &str = "[⨯]";

pub fn status(message: impl AsRef<str>) {
    println!("{} {}", STATUS_PREFIX, message.as_ref());
}

pub fn error(message: impl AsRef<str>) {
    eprintln!("{} {}", ERROR_PREFIX, message.as_ref());
}

/// Prints a single self-overwriting progress line per download.
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    last: Mutex<Option<u64>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn render(bytes: u64, total: Option<u64>) -> (u64, String) {
        match total {
            Some(total) if total > 0 => {
                let percent = (bytes.min(total) * 100) / total;
                (
                    percent,
                    format!("{percent:>3}% ({} / {})", human(bytes), human(total)),
                )
            }
            // Unknown length: redraw every MiB
            _ => (bytes >> 20, human(bytes)),
        }
    }
}

impl FetchObserver for ConsoleProgress {
    fn started(&self, job: &DownloadJob) {
        if let Ok(mut last) = self.last.lock() {
            *last = None;
        }
        status(format!("Downloading {}", job.url));
    }

    fn progress(&self, bytes_so_far: u64, total_bytes: Option<u64>) {
        let (step, line) = Self::render(bytes_so_far, total_bytes);
        let Ok(mut last) = self.last.lock() else {
            return;
        };
        if *last == Some(step) {
            return;
        }
        *last = Some(step);

        let mut out = io::stdout().lock();
        let _ = write!(out, "\r    {line}");
        let _ = out.flush();
    }

    fn finished(&self, job: &DownloadJob) {
        println!();
        status(format!("Saved {}", job.destination.display()));
    }
}

fn human(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
