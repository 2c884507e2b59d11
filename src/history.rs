use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::stats::RecordOutcome;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
}

/// Append-only CSV log of completed attempts
#[derive(Debug, Clone)]
pub struct AttemptLog {
    path: PathBuf,
}

impl AttemptLog {
    pub const HEADER: [&'static str; 4] = ["date", "time_ms", "rating", "best_ms"];

    pub fn open_default() -> Option<Self> {
        AppDirs::history_path().map(Self::with_path)
    }

    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, outcome: &RecordOutcome) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // a new or empty file needs a header row
        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut writer = csv::Writer::from_writer(file);
        if needs_header {
            writer.write_record(Self::HEADER)?;
        }

        let best = if outcome.is_new_best {
            Some(outcome.attempt.time_ms)
        } else {
            outcome.previous_best_ms
        };

        writer.write_record([
            outcome.attempt.timestamp.to_rfc3339(),
            outcome.attempt.time_ms.to_string(),
            outcome.attempt.category.clone(),
            best.map(|b| b.to_string()).unwrap_or_default(),
        ])?;
        writer.flush()?;
        Ok(())
    }

    /// Log without failing the caller
    pub fn record(&self, outcome: &RecordOutcome) {
        if let Err(e) = self.append(outcome) {
            tracing::warn!(%e, path = %self.path.display(), "failed to write attempt history");
        }
    }
}
