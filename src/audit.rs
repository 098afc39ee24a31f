// Audit trail for sqlprobe
// Append-only request/response log, truncated when a session opens it and
// flushed when the session closes or drops it.

use crate::error::ProbeError;
use crate::events::to_json;
use crate::models::{ExecutionResult, MutatedQuery};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::warn;

pub struct AuditLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    opened_at: Instant,
    entries: usize,
}

impl AuditLog {
    /// Open (and clear) the log at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, ProbeError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
            opened_at: Instant::now(),
            entries: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of request/response pairs written so far.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Append one `[Request]` and one `[Response]` line for an executed query.
    pub fn record(&mut self, query: &MutatedQuery, result: &ExecutionResult) -> Result<(), ProbeError> {
        let offset_ms = self.opened_at.elapsed().as_secs_f64() * 1000.0;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "audit log already closed"))?;

        writeln!(
            writer,
            "[Request]: +{:.0}ms time:{:.3} - {} - {} - {} - {} - {}",
            offset_ms,
            result.elapsed_ms,
            query.url,
            query.method,
            to_json(&query.params),
            to_json(&query.body),
            query.payload
        )?;
        writeln!(
            writer,
            "[Response]: +{:.0}ms {} - {}",
            offset_ms + result.elapsed_ms,
            result.status_message,
            query.payload
        )?;
        writer.flush()?;
        self.entries += 1;
        Ok(())
    }

    /// Flush and release the file.
    pub fn close(mut self) -> Result<PathBuf, ProbeError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(self.path.clone())
    }
}

impl Drop for AuditLog {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                warn!(path = %self.path.display(), "failed to flush audit log: {}", e);
            }
        }
    }
}
