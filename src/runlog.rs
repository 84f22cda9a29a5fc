//! Append-only benchmark log mirrored to standard output.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Timestamp used in log and results file names.
pub fn file_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H-%M-%S").to_string()
}

/// `<dir>/<prefix>-<table>-<timestamp>.<ext>`, creating `dir` if needed.
pub fn timestamped_path(dir: &Path, prefix: &str, table: &str, ext: &str) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    Ok(dir.join(format!("{}-{}-{}.{}", prefix, table, file_timestamp(), ext)))
}

/// Every line is written to the file (if any) and to stdout in call order.
///
/// After the first failed file write the file is dropped and every later
/// line goes to stdout, quiet or not.
#[derive(Debug)]
pub struct RunLog {
    path: Option<PathBuf>,
    file: Mutex<Option<File>>,
    echo: bool,
}

impl RunLog {
    /// Open `path` for appending, creating parent directories.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path: Some(path),
            file: Mutex::new(Some(file)),
            echo: true,
        })
    }

    /// New timestamped log under `dir`.
    pub fn create(dir: &Path, prefix: &str, table: &str) -> io::Result<Self> {
        Self::open(timestamped_path(dir, prefix, table, "log")?)
    }

    /// Log that only writes to stdout.
    pub fn stdout() -> Self {
        Self {
            path: None,
            file: Mutex::new(None),
            echo: true,
        }
    }

    /// Stop mirroring to stdout; the file still receives every line.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// False once a file write has failed, or for a stdout-only log.
    pub fn file_active(&self) -> bool {
        self.lock_file().is_some()
    }

    pub fn line(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        let mut file = self.lock_file();
        let result = file
            .as_mut()
            .map(|f| writeln!(f, "{}", msg).and_then(|_| f.flush()));
        let written = match result {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                tracing::warn!(
                    path = ?self.path,
                    "Run log write failed, continuing on stdout only: {}",
                    e
                );
                *file = None;
                false
            }
            None => false,
        };
        if self.echo || !written {
            println!("{}", msg);
        }
    }

    fn lock_file(&self) -> std::sync::MutexGuard<'_, Option<File>> {
        match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// `[ERROR] <message>` followed by the full error chain and backtrace.
    pub fn error(&self, err: &anyhow::Error) {
        self.line(format!("[ERROR] {:#}", err));
        self.line(format!("{:?}", err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_append_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.log");
        let log = RunLog::open(&path).unwrap().quiet();
        log.line("first");
        log.line(String::from("second"));
        log.error(&anyhow::anyhow!("boom").context("fill step"));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "first");
        assert_eq!(lines[1], "second");
        assert_eq!(lines[2], "[ERROR] fill step: boom");
        assert!(lines.len() > 3);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_write_disables_file() {
        let log = RunLog::open("/dev/full").unwrap().quiet();
        assert!(log.file_active());
        log.line("first");
        assert!(!log.file_active());
        log.line("second");
        assert!(!log.file_active());
        assert!(!RunLog::stdout().file_active());
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        RunLog::open(&path).unwrap().quiet().line("a");
        RunLog::open(&path).unwrap().quiet().line("b");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_timestamped_path_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = timestamped_path(&dir.path().join("results"), "read-benchmark", "bonus_registry_idx", "txt").unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("read-benchmark-bonus_registry_idx-"));
        assert!(name.ends_with(".txt"));
        assert!(!name.contains(':'));
        assert!(dir.path().join("results").is_dir());
    }
}
