//! Run output files

use crate::blackboard::Blackboard;
use crate::error::Result;
use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const BLACKBOARD_FILE: &str = "blackboard.json";
pub const EXPLANATION_FILE: &str = "final_explanation.md";
pub const RUN_LOG_FILE: &str = "run.log";

/// Paths written by a run
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub blackboard: PathBuf,
    pub explanation: PathBuf,
    pub run_log: Option<PathBuf>,
}

struct RunLogState {
    file: File,
    /// Blackboard log entries already copied
    mirrored: usize,
    failed: bool,
}

/// Append-only audit trail of one run, one timestamped record per line.
///
/// Write failures are reported once and never abort the run.
pub struct RunLog {
    path: PathBuf,
    state: Mutex<RunLogState>,
}

impl std::fmt::Debug for RunLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLog").field("path", &self.path).finish()
    }
}

impl RunLog {
    pub fn create(outdir: &Path) -> Result<Self> {
        std::fs::create_dir_all(outdir)?;
        let path = outdir.join(RUN_LOG_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            state: Mutex::new(RunLogState {
                file,
                mirrored: 0,
                failed: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line(&self, message: &str) {
        self.write_at(Utc::now(), message);
    }

    /// A labelled JSON record
    pub fn json(&self, label: &str, data: &impl Serialize) {
        let payload = serde_json::json!({ "label": label, "data": data });
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => self.line(&text),
            Err(e) => tracing::warn!(label, error = %e, "cannot serialize run log record"),
        }
    }

    /// Copy blackboard log entries not written yet, keeping their timestamps.
    pub fn mirror(&self, bb: &Blackboard) {
        let start = self.state.lock().mirrored;
        for entry in bb.log_entries().iter().skip(start) {
            self.write_at(entry.at, &entry.message);
        }
        let mut state = self.state.lock();
        state.mirrored = state.mirrored.max(bb.log_entries().len());
    }

    fn write_at(&self, at: DateTime<Utc>, message: &str) {
        let stamp = at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
        let mut state = self.state.lock();
        if let Err(e) = writeln!(state.file, "[{}] {}", stamp, message) {
            if !state.failed {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot append to run log");
                state.failed = true;
            }
        }
    }
}

/// Write the blackboard as pretty JSON, replacing any earlier snapshot.
pub fn write_snapshot(outdir: &Path, bb: &Blackboard) -> Result<PathBuf> {
    std::fs::create_dir_all(outdir)?;
    let path = outdir.join(BLACKBOARD_FILE);
    let json = serde_json::to_string_pretty(bb)?;
    // Readers never observe a partial snapshot.
    let tmp = outdir.join(format!("{}.tmp", BLACKBOARD_FILE));
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, &path)?;
    Ok(path)
}

pub fn write_artifacts(outdir: &Path, bb: &Blackboard, document: &str) -> Result<RunArtifacts> {
    let blackboard = write_snapshot(outdir, bb)?;
    let explanation = outdir.join(EXPLANATION_FILE);
    std::fs::write(&explanation, document)?;
    Ok(RunArtifacts {
        blackboard,
        explanation,
        run_log: None,
    })
}
