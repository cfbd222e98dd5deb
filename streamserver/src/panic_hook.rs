//! Panic reporting.
//!
//! Release builds abort on panic, which can kill the non-blocking log writer
//! before it flushes. The hook therefore writes the record straight into the
//! current log file as well as through `tracing`.

use std::backtrace::Backtrace;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::panic::{self, PanicHookInfo};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::logging;

/// What gets written for one panic.
struct PanicRecord {
    at: DateTime<Local>,
    thread: String,
    location: String,
    message: String,
    backtrace: Backtrace,
}

impl PanicRecord {
    fn capture(info: &PanicHookInfo<'_>) -> Self {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&'static str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| info.to_string());

        Self {
            at: Local::now(),
            thread: std::thread::current()
                .name()
                .unwrap_or("<unnamed>")
                .to_string(),
            location: info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_else(|| "<unknown>".to_string()),
            message,
            backtrace: Backtrace::force_capture(),
        }
    }
}

impl fmt::Display for PanicRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} PANIC streamserver {} thread={} location={} message={}",
            self.at.format("%Y-%m-%dT%H:%M:%S%.3f%:z"),
            env!("CARGO_PKG_VERSION"),
            self.thread,
            self.location,
            self.message,
        )?;
        write!(f, "Backtrace:\n{}", self.backtrace)
    }
}

/// Install the hook. The previously installed hook still runs afterwards.
pub fn install(log_dir: impl AsRef<Path>) {
    let log_dir: PathBuf = log_dir.as_ref().to_path_buf();
    let previous = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // A panic inside the hook would abort without the default output.
        let _ = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            let record = PanicRecord::capture(info).to_string();
            tracing::error!(target: "streamserver::panic", "{record}");
            if cfg!(panic = "abort") {
                let _ = append_panic_record(&log_dir, &record);
            }
        }));
        previous(info);
    }));
}

fn append_panic_record(log_dir: &Path, record: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(logging::current_log_file(log_dir))?;
    writeln!(file, "{record}")?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_panic_record() {
        let dir = tempfile::tempdir().unwrap();
        append_panic_record(dir.path(), "first").unwrap();
        append_panic_record(dir.path(), "second").unwrap();

        let content = std::fs::read_to_string(logging::current_log_file(dir.path())).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_record_display() {
        let record = PanicRecord {
            at: Local::now(),
            thread: "orchestrator".into(),
            location: "src/main.rs:1:1".into(),
            message: "boom".into(),
            backtrace: Backtrace::disabled(),
        };
        let text = record.to_string();

        assert!(text.contains("PANIC streamserver"));
        assert!(text.contains("thread=orchestrator"));
        assert!(text.contains("location=src/main.rs:1:1 message=boom"));
        assert!(text.contains("Backtrace:"));
    }
}
