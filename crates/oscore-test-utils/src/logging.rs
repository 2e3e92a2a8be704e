// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Per-test log files
//!
//! Each test writes its diagnostics to a file of its own. A passing test
//! prints a single line; a failing one prints where its log lives and how
//! large it is.

use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during test logging operations
#[derive(Error, Debug)]
pub enum TestLogError {
    #[error("Failed to create test log: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write to test log file: {path}")]
    WriteError { path: PathBuf },

    #[error("Invalid test name: {name}")]
    InvalidTestName { name: String },
}

/// Log file owned by a single test
pub struct TestLogger {
    log_path: PathBuf,
    writer: BufWriter<File>,
    test_name: String,
    start_time: DateTime<Utc>,
}

impl TestLogger {
    /// Create a logger writing to a fresh file named after `test_name`
    ///
    /// ```rust
    /// use oscore_test_utils::TestLogger;
    ///
    /// let mut logger = TestLogger::new("test_example").unwrap();
    /// logger.log("starting").unwrap();
    /// logger.finish_success().unwrap();
    /// ```
    pub fn new(test_name: &str) -> Result<Self, TestLogError> {
        validate_test_name(test_name)?;

        let log_path = create_unique_test_log(test_name)?;
        let file = OpenOptions::new().create(true).write(true).truncate(true).open(&log_path)?;

        let mut logger = Self {
            log_path,
            writer: BufWriter::new(file),
            test_name: test_name.to_string(),
            start_time: Utc::now(),
        };
        logger.write_header()?;
        Ok(logger)
    }

    pub fn log(&mut self, message: &str) -> Result<(), TestLogError> {
        let timestamp = Utc::now().format("%H:%M:%S%.3f");
        writeln!(self.writer, "[{}] {}", timestamp, message).map_err(|_| self.write_error())?;
        self.writer.flush().map_err(|_| self.write_error())?;
        Ok(())
    }

    /// Log structured data as JSON
    pub fn log_json<T: serde::Serialize>(&mut self, label: &str, data: &T) -> Result<(), TestLogError> {
        let json = serde_json::to_string_pretty(data).map_err(|_| self.write_error())?;
        self.log(&format!("{}: {}", label, json))
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Close the log and print a one-line success marker
    pub fn finish_success(mut self) -> Result<PathBuf, TestLogError> {
        let elapsed = self.elapsed_seconds();
        self.log(&format!("Test completed successfully in {:.3}s", elapsed))?;
        self.writer.flush().map_err(|_| self.write_error())?;

        println!("✅ {} passed", self.test_name);
        Ok(self.log_path)
    }

    /// Close the log and print its location for investigation
    pub fn finish_failure(mut self, error_message: &str) -> Result<PathBuf, TestLogError> {
        let elapsed = self.elapsed_seconds();
        self.log(&format!("Test failed after {:.3}s: {}", elapsed, error_message))?;
        self.writer.flush().map_err(|_| self.write_error())?;

        match fs::metadata(&self.log_path) {
            Ok(metadata) => println!(
                "❌ {} failed - Log: {} ({} bytes)",
                self.test_name,
                self.log_path.display(),
                metadata.len()
            ),
            Err(_) => println!("❌ {} failed - Log: {}", self.test_name, self.log_path.display()),
        }
        Ok(self.log_path)
    }

    fn elapsed_seconds(&self) -> f64 {
        Utc::now().signed_duration_since(self.start_time).num_milliseconds() as f64 / 1000.0
    }

    fn write_error(&self) -> TestLogError {
        TestLogError::WriteError {
            path: self.log_path.clone(),
        }
    }

    fn write_header(&mut self) -> Result<(), TestLogError> {
        writeln!(self.writer, "=== oscore test log ===")?;
        writeln!(self.writer, "Test: {}", self.test_name)?;
        writeln!(self.writer, "Started: {}", self.start_time.format("%Y-%m-%d %H:%M:%S%.3f UTC"))?;
        writeln!(self.writer, "Process: {}", std::process::id())?;
        if let Some(thread_name) = std::thread::current().name() {
            writeln!(self.writer, "Thread: {}", thread_name)?;
        }
        writeln!(self.writer, "=== Log Output ===")?;
        writeln!(self.writer)?;
        self.writer.flush().map_err(|_| self.write_error())?;
        Ok(())
    }
}

/// Reserve a unique log path under `<workspace>/target/test-logs`
///
/// Logs are grouped by date. Names combine the sanitized test name, the
/// time of day and a random UUID, so forked children and parallel tests
/// never collide.
pub fn create_unique_test_log(test_name: &str) -> Result<PathBuf, TestLogError> {
    let now = Utc::now();
    let log_dir = find_workspace_root()
        .join("target")
        .join("test-logs")
        .join(now.format("%Y-%m-%d").to_string());
    fs::create_dir_all(&log_dir)?;

    let filename = format!(
        "{}-{}-{}.log",
        sanitize_filename(test_name),
        now.format("%H-%M-%S"),
        Uuid::new_v4()
    );
    Ok(log_dir.join(filename))
}

/// Nearest ancestor whose Cargo.toml declares a `[workspace]`
fn find_workspace_root() -> PathBuf {
    let start = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    start
        .ancestors()
        .find(|dir| {
            fs::read_to_string(dir.join("Cargo.toml"))
                .map(|content| content.contains("[workspace]"))
                .unwrap_or(false)
        })
        .map(Path::to_path_buf)
        .unwrap_or(start)
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' => c,
            _ => '_',
        })
        .collect()
}

fn validate_test_name(name: &str) -> Result<(), TestLogError> {
    if name.is_empty() {
        return Err(TestLogError::InvalidTestName {
            name: name.to_string(),
        });
    }
    if name.len() > 200 {
        return Err(TestLogError::InvalidTestName {
            name: format!("Name too long: {} chars", name.len()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test_normal"), "test_normal");
        assert_eq!(sanitize_filename("test with spaces"), "test_with_spaces");
        assert_eq!(sanitize_filename("exec::swap/stdio"), "exec__swap_stdio");
    }

    #[test]
    fn test_validate_test_name() {
        assert!(validate_test_name("valid_test").is_ok());
        assert!(validate_test_name("").is_err());
        assert!(validate_test_name(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_unique_paths_differ() {
        let first = create_unique_test_log("same_name").unwrap();
        let second = create_unique_test_log("same_name").unwrap();
        assert_ne!(first, second);
        assert!(first.parent().unwrap().exists());
    }

    #[test]
    fn test_logger_writes_header_and_messages() {
        let mut logger = TestLogger::new("test_logger_writes_header_and_messages").unwrap();
        logger.log("first step").unwrap();
        logger.log_json("fds", &vec![0, 1, 2]).unwrap();
        let path = logger.finish_success().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("=== oscore test log ==="));
        assert!(content.contains("Started: "));
        let step = content.lines().find(|line| line.ends_with("first step")).unwrap();
        // [HH:MM:SS.mmm] prefix
        assert_eq!(step.find(']'), Some(13));
        assert_eq!(step.as_bytes()[3], b':');
        assert!(content.contains("Test completed successfully"));
        fs::remove_file(path).unwrap();
    }
}
