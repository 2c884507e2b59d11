use chrono::{DateTime, Local};

use crate::rating::{rate, Rating};
use crate::store::{get_u64, PersistentStore, BEST_TIME_KEY, TOTAL_ATTEMPTS_KEY};

/// How many completed attempts the session keeps for the records view
pub const RECENT_CAPACITY: usize = 5;

/// One completed reaction
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub id: String,
    pub timestamp: DateTime<Local>,
    pub time_ms: u64,
    pub category: String,
}

impl Attempt {
    pub fn new(id: String, timestamp: DateTime<Local>, time_ms: u64) -> Self {
        Self {
            id,
            timestamp,
            time_ms,
            category: rate(time_ms).label().to_string(),
        }
    }

    pub fn rating(&self) -> Rating {
        rate(self.time_ms)
    }
}

/// What recording an attempt changed
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub attempt: Attempt,
    /// Best time before this attempt was recorded
    pub previous_best_ms: Option<u64>,
    pub is_new_best: bool,
}

/// Best time, attempt count and the latest attempts for this install
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    best_time_ms: Option<u64>,
    total_attempts: u64,
    recent: Vec<Attempt>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load persisted best/total. Recent attempts always start empty.
    pub fn load(store: &dyn PersistentStore) -> Self {
        Self {
            best_time_ms: get_u64(store, BEST_TIME_KEY),
            total_attempts: get_u64(store, TOTAL_ATTEMPTS_KEY).unwrap_or(0),
            recent: Vec::with_capacity(RECENT_CAPACITY + 1),
        }
    }

    pub fn best_time_ms(&self) -> Option<u64> {
        self.best_time_ms
    }

    pub fn total_attempts(&self) -> u64 {
        self.total_attempts
    }

    /// Newest first, at most [`RECENT_CAPACITY`] entries
    pub fn recent_attempts(&self) -> &[Attempt] {
        &self.recent
    }

    /// Book a completed attempt: improve the best time if beaten, bump the
    /// counter, persist both and push the attempt onto the recent window.
    pub fn record(
        &mut self,
        time_ms: u64,
        now: DateTime<Local>,
        store: &mut dyn PersistentStore,
    ) -> RecordOutcome {
        let previous_best_ms = self.best_time_ms;
        let is_new_best = previous_best_ms.map_or(true, |best| time_ms < best);

        if is_new_best {
            self.best_time_ms = Some(time_ms);
            if let Err(e) = store.set(BEST_TIME_KEY, &time_ms.to_string()) {
                tracing::warn!(%e, time_ms, "failed to persist best time");
            }
        }

        self.total_attempts += 1;
        if let Err(e) = store.set(TOTAL_ATTEMPTS_KEY, &self.total_attempts.to_string()) {
            tracing::warn!(%e, total = self.total_attempts, "failed to persist attempt count");
        }

        let id = format!("{}-{}", now.timestamp_millis(), self.total_attempts);
        let attempt = Attempt::new(id, now, time_ms);

        self.recent.insert(0, attempt.clone());
        self.recent.truncate(RECENT_CAPACITY);

        RecordOutcome {
            attempt,
            previous_best_ms,
            is_new_best,
        }
    }
}
