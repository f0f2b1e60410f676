//! Size-based rotating file sink
//!
//! Writes JSONL to a single active file and rotates it into numbered
//! backups (`app.log.1` is the newest backup) once the active file would
//! exceed the size cap. Missing parent directories are created on
//! construction, so a fresh checkout or container can log immediately.

use crate::core::{JsonFormatter, PipelineError, Record, Result, Severity, Sink, SinkFilter};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Size cap and backup retention for a rotating file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Rotate before the active file would exceed this many bytes.
    pub max_bytes: u64,
    /// How many rotated backups to keep. Zero means the active file is
    /// simply truncated on rotation.
    pub backup_count: usize,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            backup_count: 5,
        }
    }
}

pub struct RotatingFileSink {
    path: PathBuf,
    policy: RotationPolicy,
    formatter: JsonFormatter,
    min_level: Severity,
    filter: Option<SinkFilter>,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    name: String,
}

impl RotatingFileSink {
    /// Open (or create) the log file at `path` with the default policy,
    /// creating any missing parent directories.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    pub fn with_policy(path: impl Into<PathBuf>, policy: RotationPolicy) -> Result<Self> {
        let path = path.into();

        if policy.max_bytes == 0 {
            return Err(PipelineError::config(
                "rotating_file",
                "max_bytes must be greater than zero",
            ));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    PipelineError::io_operation(
                        "creating log directory",
                        parent.display().to_string(),
                        e,
                    )
                })?;
            }
        }

        let writer = Self::open_writer(&path)?;
        let current_size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let name = format!("file:{}", path.display());

        Ok(Self {
            path,
            policy,
            formatter: JsonFormatter::new(),
            min_level: Severity::Debug,
            filter: None,
            writer: Some(writer),
            current_size,
            name,
        })
    }

    #[must_use]
    pub fn with_min_level(mut self, min_level: Severity) -> Self {
        self.min_level = min_level;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: SinkFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: JsonFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    /// Bytes written to the active file so far.
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    fn open_writer(path: &Path) -> Result<BufWriter<File>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                PipelineError::file_sink(path.display().to_string(), e.to_string())
            })?;
        Ok(BufWriter::new(file))
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(format!(".{}", index));
        PathBuf::from(os)
    }

    /// Shift backups up by one index, move the active file to `.1`, and
    /// reopen a fresh active file.
    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().ok();
        }

        if self.policy.backup_count == 0 {
            fs::remove_file(&self.path).map_err(|e| {
                PipelineError::file_rotation(self.path.display().to_string(), e.to_string())
            })?;
        } else {
            let oldest = self.backup_path(self.policy.backup_count);
            if oldest.exists() {
                fs::remove_file(&oldest).map_err(|e| {
                    PipelineError::file_rotation(oldest.display().to_string(), e.to_string())
                })?;
            }

            for i in (1..self.policy.backup_count).rev() {
                let src = self.backup_path(i);
                if src.exists() {
                    let dst = self.backup_path(i + 1);
                    if let Err(e) = fs::rename(&src, &dst) {
                        // Windows refuses to rename over an existing file.
                        fs::remove_file(&dst).ok();
                        fs::rename(&src, &dst).map_err(|_| {
                            PipelineError::file_rotation(
                                src.display().to_string(),
                                e.to_string(),
                            )
                        })?;
                    }
                }
            }

            fs::rename(&self.path, self.backup_path(1)).map_err(|e| {
                PipelineError::file_rotation(self.path.display().to_string(), e.to_string())
            })?;
        }

        self.writer = Some(Self::open_writer(&self.path)?);
        self.current_size = 0;
        Ok(())
    }

    /// Rotation failures must not take the sink down: log, reopen the
    /// active file, and keep appending past the size cap.
    fn recover_after_failed_rotation(&mut self) {
        if self.writer.is_none() {
            match Self::open_writer(&self.path) {
                Ok(writer) => {
                    self.writer = Some(writer);
                    self.current_size = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
                }
                Err(e) => {
                    eprintln!(
                        "[PIPELINE ERROR] failed to reopen {} after rotation failure: {}",
                        self.path.display(),
                        e
                    );
                }
            }
        }
    }
}

impl Sink for RotatingFileSink {
    fn write(&mut self, record: &Record) -> Result<()> {
        let line = self.formatter.format(record);
        let pending = line.len() as u64 + 1;

        if self.current_size > 0 && self.current_size + pending > self.policy.max_bytes {
            if let Err(e) = self.rotate() {
                eprintln!(
                    "[PIPELINE ERROR] rotation of {} failed, continuing on active file: {}",
                    self.path.display(),
                    e
                );
                self.recover_after_failed_rotation();
            }
        }

        let writer = self.writer.as_mut().ok_or_else(|| {
            PipelineError::file_sink(self.path.display().to_string(), "writer unavailable")
        })?;
        writeln!(writer, "{}", line)?;
        self.current_size += pending;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, severity: Severity) -> bool {
        severity >= self.min_level && self.filter.map_or(true, |f| f.accept(severity))
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        if let Some(ref mut writer) = self.writer {
            writer.flush().ok();
        }
    }
}
