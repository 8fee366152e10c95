//! Session log
//!
//! Human-readable, append-only log of one batch run: a header, one line per
//! processed image, and a trailing summary. The sink is passed explicitly into
//! the extraction engine (no process-wide output capture) and its lifecycle is
//! scoped to a single run. An optional in-memory mirror feeds the UI log pane.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use parking_lot::Mutex;
use tracing::debug;

/// Shared line buffer the UI reads while a batch is running.
pub type LogMirror = Arc<Mutex<Vec<String>>>;

pub struct SessionLog {
    file: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    mirror: Option<LogMirror>,
}

impl SessionLog {
    /// Create a log file at `<output_dir>/logs/scan_log_<timestamp>.txt`.
    pub fn create(output_dir: &Path) -> Result<Self> {
        let logs_dir = output_dir.join("logs");
        fs::create_dir_all(&logs_dir)
            .with_context(|| format!("failed to create log directory {}", logs_dir.display()))?;

        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let path = logs_dir.join(format!("scan_log_{timestamp}.txt"));
        let file = File::create(&path)
            .with_context(|| format!("failed to create session log {}", path.display()))?;

        Ok(Self {
            file: Some(BufWriter::new(file)),
            path: Some(path),
            mirror: None,
        })
    }

    /// A log with no backing file; lines go to the mirror (and tests) only.
    pub fn in_memory() -> Self {
        Self {
            file: None,
            path: None,
            mirror: Some(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Attach a shared mirror that receives every line as it is written.
    pub fn with_mirror(mut self, mirror: LogMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Path of the log file, when file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one line. Write failures are demoted to tracing output; a log
    /// hiccup must never abort a batch.
    pub fn line(&mut self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        if let Some(file) = &mut self.file {
            if writeln!(file, "{msg}").and_then(|_| file.flush()).is_err() {
                debug!(line = msg, "session log write failed");
            }
        }
        if let Some(mirror) = &self.mirror {
            mirror.lock().push(msg.to_string());
        }
    }

    /// Snapshot of the mirrored lines, for tests and the UI.
    pub fn lines(&self) -> Vec<String> {
        self.mirror
            .as_ref()
            .map(|m| m.lock().clone())
            .unwrap_or_default()
    }
}
