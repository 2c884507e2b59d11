// Records written by one run must be visible to the next run opening the
// same database file.

use rand::{rngs::StdRng, SeedableRng};
use tempfile::tempdir;

use reflx::clock::ManualClock;
use reflx::delay::DelayRange;
use reflx::engine::{Phase, PressOutcome, ReactionEngine, SequenceTiming};
use reflx::history::AttemptLog;
use reflx::store::{clear_records, PersistentStore, SqliteStore};

fn instant_timing() -> SequenceTiming {
    SequenceTiming {
        light_count: 5,
        pre_sequence_delay_ms: 0,
        light_interval: DelayRange::fixed(0),
        lights_out_wait: DelayRange::fixed(0),
    }
}

fn engine_on(store: SqliteStore, clock: &ManualClock) -> ReactionEngine<ManualClock, StdRng> {
    ReactionEngine::new(
        clock.clone(),
        StdRng::seed_from_u64(11),
        instant_timing(),
        Box::new(store),
    )
}

fn attempt(
    engine: &mut ReactionEngine<ManualClock, StdRng>,
    clock: &ManualClock,
    reaction: f64,
) -> PressOutcome {
    engine.press();
    engine.poll();
    assert_eq!(engine.phase(), Phase::Reaction);
    clock.advance(reaction);
    engine.press()
}

#[test]
fn best_and_total_survive_restart() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("state").join("reflx.db");
    let clock = ManualClock::new(0.0);

    {
        let mut engine = engine_on(SqliteStore::open(&db).unwrap(), &clock);
        for reaction in [260.0, 231.0, 305.0] {
            attempt(&mut engine, &clock, reaction);
        }
        assert_eq!(engine.stats().best_time_ms(), Some(231));
    }

    let mut engine = engine_on(SqliteStore::open(&db).unwrap(), &clock);
    assert_eq!(engine.stats().best_time_ms(), Some(231));
    assert_eq!(engine.stats().total_attempts(), 3);
    // recent attempts are session-only
    assert!(engine.stats().recent_attempts().is_empty());

    let outcome = attempt(&mut engine, &clock, 240.0);
    match outcome {
        PressOutcome::Completed { record, feedback } => {
            assert!(!record.is_new_best);
            assert_eq!(record.previous_best_ms, Some(231));
            assert_eq!(feedback.best_time_ms, 231);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(engine.stats().total_attempts(), 4);
}

#[test]
fn reset_records_clears_database() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("reflx.db");
    let clock = ManualClock::new(0.0);

    {
        let mut engine = engine_on(SqliteStore::open(&db).unwrap(), &clock);
        attempt(&mut engine, &clock, 199.0);
    }

    let mut store = SqliteStore::open(&db).unwrap();
    clear_records(&mut store).unwrap();
    assert_eq!(store.get("apx_best"), None);

    let engine = engine_on(store, &clock);
    assert_eq!(engine.stats().best_time_ms(), None);
    assert_eq!(engine.stats().total_attempts(), 0);
}

#[test]
fn history_log_follows_completed_attempts() {
    let dir = tempdir().unwrap();
    let log = AttemptLog::with_path(dir.path().join("history.csv"));
    let clock = ManualClock::new(0.0);
    let mut engine = engine_on(SqliteStore::in_memory().unwrap(), &clock);

    for reaction in [280.0, 190.0] {
        if let PressOutcome::Completed { record, .. } = attempt(&mut engine, &clock, reaction) {
            log.append(&record).unwrap();
        }
    }

    let mut reader = csv::Reader::from_path(log.path()).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][1], "280");
    assert_eq!(&rows[0][2], "AVERAGE");
    assert_eq!(&rows[1][1], "190");
    assert_eq!(&rows[1][3], "190");
}
