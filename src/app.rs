use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::Rng;

use crate::clock::Clock;
use crate::engine::{PressOutcome, ReactionEngine};
use crate::feedback::FeedbackWorker;
use crate::history::AttemptLog;
use crate::runtime::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Cockpit,
    Records,
}

/// The engine plus everything around it: which screen is up, where feedback
/// requests go and where completed attempts are logged.
pub struct App<C: Clock, R: Rng> {
    pub engine: ReactionEngine<C, R>,
    pub view: View,
    feedback: Option<FeedbackWorker>,
    history: Option<AttemptLog>,
    quit: bool,
}

impl<C: Clock, R: Rng> App<C, R> {
    pub fn new(engine: ReactionEngine<C, R>) -> Self {
        Self {
            engine,
            view: View::Cockpit,
            feedback: None,
            history: None,
            quit: false,
        }
    }

    pub fn with_feedback(mut self, worker: FeedbackWorker) -> Self {
        self.feedback = Some(worker);
        self
    }

    pub fn with_history(mut self, log: AttemptLog) -> Self {
        self.history = Some(log);
        self
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// The single game button
    pub fn action(&mut self) {
        if let PressOutcome::Completed { record, feedback } = self.engine.press() {
            if let Some(log) = &self.history {
                log.record(&record);
            }
            if let Some(worker) = &self.feedback {
                worker.dispatch(feedback);
            }
        }
    }

    pub fn clear(&mut self) {
        self.engine.reset();
    }

    pub fn toggle_records(&mut self) {
        self.view = match self.view {
            View::Cockpit => View::Records,
            View::Records => View::Cockpit,
        };
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit = true;
            return;
        }

        match (self.view, key.code) {
            (_, KeyCode::Char('q')) => self.quit = true,
            (View::Records, KeyCode::Esc | KeyCode::Char('r') | KeyCode::Enter) => {
                self.view = View::Cockpit
            }
            (View::Records, _) => {}
            (View::Cockpit, KeyCode::Esc) => self.quit = true,
            (View::Cockpit, KeyCode::Char(' ') | KeyCode::Enter) => self.action(),
            (View::Cockpit, KeyCode::Char('c') | KeyCode::Backspace) => self.clear(),
            (View::Cockpit, KeyCode::Char('r')) => self.toggle_records(),
            _ => {}
        }
    }

    /// Apply one runtime event. Keys are judged against the phase on screen
    /// before any due timers are fired.
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Feedback(reply) => {
                self.engine.apply_feedback(reply);
            }
            AppEvent::Resize | AppEvent::Tick => {}
        }
        self.engine.poll();
        self.engine.on_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::delay::DelayRange;
    use crate::engine::{Phase, SequenceTiming};
    use crate::feedback::FeedbackReply;
    use crate::store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::tempdir;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn test_app() -> (App<ManualClock, StdRng>, ManualClock) {
        let clock = ManualClock::new(0.0);
        let timing = SequenceTiming {
            light_count: 5,
            pre_sequence_delay_ms: 0,
            light_interval: DelayRange::fixed(0),
            lights_out_wait: DelayRange::fixed(0),
        };
        let engine = ReactionEngine::new(
            clock.clone(),
            StdRng::seed_from_u64(5),
            timing,
            Box::new(MemoryStore::new()),
        );
        (App::new(engine), clock)
    }

    #[test]
    fn space_starts_then_reacts() {
        let (mut app, clock) = test_app();

        app.handle_event(key(KeyCode::Char(' ')));
        // lights out happens on the same poll with instant timing
        assert_eq!(app.engine.phase(), Phase::Reaction);

        clock.advance(230.0);
        app.handle_event(key(KeyCode::Enter));
        assert_eq!(app.engine.phase(), Phase::Result);
        assert_eq!(app.engine.current_result().unwrap().time_ms, 230);
    }

    #[test]
    fn clear_key_resets() {
        let (mut app, _) = test_app();
        app.handle_event(key(KeyCode::Char(' ')));
        app.handle_event(key(KeyCode::Char('c')));
        assert_eq!(app.engine.phase(), Phase::Idle);

        app.handle_event(key(KeyCode::Char(' ')));
        app.handle_event(key(KeyCode::Backspace));
        assert_eq!(app.engine.phase(), Phase::Idle);
    }

    #[test]
    fn records_view_swallows_action_keys() {
        let (mut app, _) = test_app();
        app.handle_event(key(KeyCode::Char('r')));
        assert_eq!(app.view, View::Records);

        app.handle_event(key(KeyCode::Char(' ')));
        assert_eq!(app.engine.phase(), Phase::Idle);

        app.handle_event(key(KeyCode::Esc));
        assert_eq!(app.view, View::Cockpit);
        assert!(!app.should_quit());
    }

    #[test]
    fn quit_keys() {
        let (mut app, _) = test_app();
        app.handle_event(key(KeyCode::Esc));
        assert!(app.should_quit());

        let (mut app, _) = test_app();
        app.handle_event(AppEvent::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )));
        assert!(app.should_quit());
        assert_eq!(app.engine.phase(), Phase::Idle);

        let (mut app, _) = test_app();
        app.toggle_records();
        app.handle_event(key(KeyCode::Char('q')));
        assert!(app.should_quit());
    }

    #[test]
    fn feedback_event_reaches_engine() {
        let (mut app, clock) = test_app();
        app.handle_event(key(KeyCode::Char(' ')));
        clock.advance(180.0);
        app.handle_event(key(KeyCode::Char(' ')));

        app.handle_event(AppEvent::Feedback(FeedbackReply {
            seq: 1,
            text: Some("Purple launch.".into()),
        }));
        assert_eq!(app.engine.feedback(), Some("Purple launch."));
    }

    #[test]
    fn completed_attempts_are_logged() {
        let dir = tempdir().unwrap();
        let log = AttemptLog::with_path(dir.path().join("history.csv"));
        let (app, clock) = test_app();
        let mut app = app.with_history(log.clone());

        app.handle_event(key(KeyCode::Char(' ')));
        clock.advance(300.0);
        app.handle_event(key(KeyCode::Char(' ')));

        let mut reader = csv::Reader::from_path(log.path()).unwrap();
        assert_eq!(reader.records().count(), 1);
    }

    #[test]
    fn false_start_is_not_logged() {
        let dir = tempdir().unwrap();
        let log = AttemptLog::with_path(dir.path().join("history.csv"));
        let clock = ManualClock::new(0.0);
        let engine = ReactionEngine::new(
            clock,
            StdRng::seed_from_u64(5),
            SequenceTiming::default(),
            Box::new(MemoryStore::new()),
        );
        let mut app = App::new(engine).with_history(log.clone());

        app.handle_event(key(KeyCode::Char(' ')));
        app.handle_event(key(KeyCode::Char(' ')));
        assert_eq!(app.engine.phase(), Phase::FalseStart);
        assert!(!log.path().exists());
    }
}
