//! Append-only run log for audit.
//!
//! One line per event, `[<local timestamp>] <message>`. The file is opened
//! in append mode on every write so concurrent runs of *other* tools can at
//! worst interleave lines, never truncate history.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::Local;

/// Local-time stamp used for log lines.
pub fn now_tag() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Handle on the append-only log file.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Log writing to `path`; parent directories are created on first write.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one stamped message line.
    pub fn append(&self, msg: &str) -> io::Result<()> {
        self.write_line(&format!("[{}] {}", now_tag(), msg.trim_end()))
    }

    /// Append a visual separator between runs.
    pub fn separator(&self) -> io::Result<()> {
        self.write_line(&"=".repeat(60))
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{line}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_stamped_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = RunLog::new(dir.path().join("sub").join("run.log"));
        log.append("first").unwrap();
        log.separator().unwrap();
        log.append("second\n").unwrap();

        let body = fs::read_to_string(dir.path().join("sub").join("run.log")).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('[') && lines[0].ends_with("first"));
        assert_eq!(lines[1], "=".repeat(60));
        assert!(lines[2].ends_with("second"));
    }
}
