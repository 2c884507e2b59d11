use chrono::{DateTime, Local};

use crate::rating::Rating;
use crate::stats::Attempt;

/// Change against the chronologically previous attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    Better,
    Slower,
    Equal,
}

impl Delta {
    fn between(current_ms: u64, previous_ms: u64) -> Self {
        match current_ms.cmp(&previous_ms) {
            std::cmp::Ordering::Less => Delta::Better,
            std::cmp::Ordering::Greater => Delta::Slower,
            std::cmp::Ordering::Equal => Delta::Equal,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            Delta::Better => "▼ BETTER",
            Delta::Slower => "▲ SLOWER",
            Delta::Equal => "=",
        }
    }
}

/// One line of the records dialog
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    /// Lifetime attempt number, 1-based
    pub serial: u64,
    pub time_ms: u64,
    pub rating: Rating,
    /// `None` for the oldest attempt in the window
    pub delta: Option<Delta>,
    pub timestamp: DateTime<Local>,
}

impl RecordRow {
    pub fn serial_label(&self) -> String {
        format!("{:02}", self.serial)
    }

    pub fn seconds_label(&self) -> String {
        format_seconds(self.time_ms)
    }
}

/// Build display rows from newest-first attempts. Each row is compared with
/// the next (older) one.
pub fn records_view(attempts: &[Attempt], total_attempts: u64) -> Vec<RecordRow> {
    attempts
        .iter()
        .enumerate()
        .map(|(idx, attempt)| RecordRow {
            serial: total_attempts.saturating_sub(idx as u64),
            time_ms: attempt.time_ms,
            rating: attempt.rating(),
            delta: attempts
                .get(idx + 1)
                .map(|previous| Delta::between(attempt.time_ms, previous.time_ms)),
            timestamp: attempt.timestamp,
        })
        .collect()
}

pub fn average_ms(attempts: &[Attempt]) -> Option<f64> {
    match attempts.len() {
        0 => None,
        count => Some(attempts.iter().map(|a| a.time_ms as f64).sum::<f64>() / count as f64),
    }
}

/// `187` -> `0.187`
pub fn format_seconds(ms: u64) -> String {
    format!("{:.3}", ms as f64 / 1000.0)
}
