//! Start-lights reaction timing state machine.
//!
//! The engine owns every piece of mutable game state and a [`TimerQueue`].
//! It never runs on its own: the caller forwards user actions
//! ([`ReactionEngine::press`], [`ReactionEngine::reset`]), polls due timers
//! with [`ReactionEngine::poll`] and drives the live display with
//! [`ReactionEngine::on_frame`]. Leaving a phase always cancels the timers
//! that phase scheduled, so nothing scheduled earlier can fire into a later
//! attempt.

use chrono::Local;
use rand::Rng;

use crate::clock::Clock;
use crate::delay::{random_delay, DelayRange};
use crate::feedback::{FeedbackReply, FeedbackRequest};
use crate::scheduler::{TimerEvent, TimerHandle, TimerQueue};
use crate::stats::{Attempt, RecordOutcome, SessionStats};
use crate::store::PersistentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Phase {
    Idle,
    Sequencing,
    WaitingForGo,
    Reaction,
    Result,
    FalseStart,
}

impl Phase {
    /// Lights are still coming on or holding; pressing now is a jump start
    pub fn is_armed(&self) -> bool {
        matches!(self, Phase::Sequencing | Phase::WaitingForGo)
    }

    /// A press in this phase starts a new attempt
    pub fn starts_attempt(&self) -> bool {
        matches!(self, Phase::Idle | Phase::Result | Phase::FalseStart)
    }
}

/// Timing parameters of one start sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceTiming {
    pub light_count: u8,
    /// Pause between the user starting and the first light
    pub pre_sequence_delay_ms: u64,
    pub light_interval: DelayRange,
    /// Hold with all lights lit before lights out
    pub lights_out_wait: DelayRange,
}

impl Default for SequenceTiming {
    fn default() -> Self {
        Self {
            light_count: 5,
            pre_sequence_delay_ms: 600,
            light_interval: DelayRange::new(800, 1000),
            lights_out_wait: DelayRange::new(200, 3200),
        }
    }
}

/// What a user action did
#[derive(Debug, Clone, PartialEq)]
pub enum PressOutcome {
    Started,
    FalseStart { lights_lit: u8 },
    Completed {
        record: RecordOutcome,
        feedback: FeedbackRequest,
    },
}

pub struct ReactionEngine<C: Clock, R: Rng> {
    clock: C,
    rng: R,
    timing: SequenceTiming,
    store: Box<dyn PersistentStore>,
    timers: TimerQueue,
    sequence_timer: Option<TimerHandle>,
    live_timer: Option<TimerHandle>,

    phase: Phase,
    lights_lit: u8,
    lights_out: bool,
    started_at_ms: Option<f64>,
    live_elapsed_ms: f64,
    current_result: Option<Attempt>,
    feedback: Option<String>,
    feedback_seq: u64,
    stats: SessionStats,
}

impl<C: Clock, R: Rng> ReactionEngine<C, R> {
    pub fn new(clock: C, rng: R, timing: SequenceTiming, store: Box<dyn PersistentStore>) -> Self {
        let stats = SessionStats::load(store.as_ref());
        Self {
            clock,
            rng,
            timing,
            store,
            timers: TimerQueue::new(),
            sequence_timer: None,
            live_timer: None,
            phase: Phase::Idle,
            lights_lit: 0,
            lights_out: true,
            started_at_ms: None,
            live_elapsed_ms: 0.0,
            current_result: None,
            feedback: None,
            feedback_seq: 0,
            stats,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn timing(&self) -> &SequenceTiming {
        &self.timing
    }

    pub fn lights_lit(&self) -> u8 {
        self.lights_lit
    }

    /// Whether lamp `idx` (0-based) is currently lit
    pub fn lamp_on(&self, idx: u8) -> bool {
        !self.lights_out && idx < self.lights_lit
    }

    pub fn live_elapsed_ms(&self) -> f64 {
        self.live_elapsed_ms
    }

    pub fn current_result(&self) -> Option<&Attempt> {
        self.current_result.as_ref()
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Number of outstanding timers and frame subscriptions
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn next_deadline_ms(&self) -> Option<f64> {
        self.timers.next_deadline()
    }

    /// The user action: start, jump start, or reaction, depending on phase
    pub fn press(&mut self) -> PressOutcome {
        match self.phase {
            Phase::Idle | Phase::Result | Phase::FalseStart => {
                self.start_sequence();
                PressOutcome::Started
            }
            Phase::Sequencing | Phase::WaitingForGo => {
                self.false_start();
                PressOutcome::FalseStart {
                    lights_lit: self.lights_lit,
                }
            }
            Phase::Reaction => self.complete(),
        }
    }

    /// Abandon whatever is going on and return to `Idle`
    pub fn reset(&mut self) {
        self.cancel_timers();
        self.lights_lit = 0;
        self.lights_out = true;
        self.started_at_ms = None;
        self.live_elapsed_ms = 0.0;
        self.current_result = None;
        self.feedback = None;
        tracing::info!(from = %self.phase, "reset");
        self.transition(Phase::Idle);
    }

    /// Fire every timer that is due, in deadline order
    pub fn poll(&mut self) {
        while let Some((handle, event)) = self.timers.pop_due(self.clock.now_ms()) {
            self.fire(handle, event);
        }
    }

    /// Per-frame tick for the live elapsed display
    pub fn on_frame(&mut self) {
        for (handle, event) in self.timers.frame_subscriptions() {
            if event != TimerEvent::LiveTimer {
                continue;
            }
            match (self.phase, self.started_at_ms) {
                (Phase::Reaction, Some(start)) => {
                    self.live_elapsed_ms = (self.clock.now_ms() - start).max(0.0);
                }
                _ => {
                    // outlived its phase
                    self.timers.cancel(handle);
                    if self.live_timer == Some(handle) {
                        self.live_timer = None;
                    }
                }
            }
        }
    }

    /// Show a feedback reply if it answers the latest completed attempt and
    /// that result is still on screen. Returns whether it was applied.
    pub fn apply_feedback(&mut self, reply: FeedbackReply) -> bool {
        if reply.seq != self.feedback_seq || self.phase != Phase::Result {
            tracing::debug!(
                reply_seq = reply.seq,
                current_seq = self.feedback_seq,
                phase = %self.phase,
                "discarding stale feedback"
            );
            return false;
        }

        match reply.text.filter(|t| !t.trim().is_empty()) {
            Some(text) => {
                self.feedback = Some(text);
                true
            }
            None => false,
        }
    }

    fn transition(&mut self, to: Phase) {
        tracing::debug!(from = %self.phase, %to, "phase transition");
        self.phase = to;
    }

    fn cancel_timers(&mut self) {
        self.timers.cancel_all();
        self.sequence_timer = None;
        self.live_timer = None;
    }

    fn schedule(&mut self, delay_ms: u64, event: TimerEvent) {
        let now = self.clock.now_ms();
        self.sequence_timer = Some(self.timers.after(now, delay_ms, event));
    }

    fn start_sequence(&mut self) {
        self.cancel_timers();
        self.lights_lit = 0;
        self.lights_out = false;
        self.started_at_ms = None;
        self.live_elapsed_ms = 0.0;
        self.current_result = None;
        self.feedback = None;
        self.transition(Phase::Sequencing);
        self.schedule(self.timing.pre_sequence_delay_ms, TimerEvent::NextLight);
    }

    fn fire(&mut self, handle: TimerHandle, event: TimerEvent) {
        if self.sequence_timer != Some(handle) {
            tracing::debug!(?handle, ?event, "ignoring timer not owned by current phase");
            return;
        }
        self.sequence_timer = None;

        match (self.phase, event) {
            (Phase::Sequencing, TimerEvent::NextLight) => self.next_light(),
            (Phase::WaitingForGo, TimerEvent::LightsOut) => self.lights_out(),
            (phase, event) => {
                tracing::debug!(%phase, ?event, "timer does not apply to phase");
            }
        }
    }

    fn next_light(&mut self) {
        self.lights_lit = (self.lights_lit + 1).min(self.timing.light_count);
        if self.lights_lit < self.timing.light_count {
            let delay = random_delay(&mut self.rng, self.timing.light_interval);
            self.schedule(delay, TimerEvent::NextLight);
        } else {
            // all lit: the hold starts now
            self.transition(Phase::WaitingForGo);
            let wait = random_delay(&mut self.rng, self.timing.lights_out_wait);
            self.schedule(wait, TimerEvent::LightsOut);
        }
    }

    fn lights_out(&mut self) {
        self.lights_out = true;
        self.started_at_ms = Some(self.clock.now_ms());
        self.live_elapsed_ms = 0.0;
        self.transition(Phase::Reaction);
        self.live_timer = Some(self.timers.every_frame(TimerEvent::LiveTimer));
    }

    fn false_start(&mut self) {
        self.cancel_timers();
        tracing::info!(phase = %self.phase, lights_lit = self.lights_lit, "false start");
        self.transition(Phase::FalseStart);
    }

    fn complete(&mut self) -> PressOutcome {
        let now = self.clock.now_ms();
        let start = self.started_at_ms.unwrap_or(now);
        let time_ms = (now - start).max(0.0).round() as u64;

        self.cancel_timers();
        self.live_elapsed_ms = time_ms as f64;
        self.transition(Phase::Result);

        let record = self.stats.record(time_ms, Local::now(), self.store.as_mut());
        self.current_result = Some(record.attempt.clone());

        self.feedback_seq += 1;
        let feedback = FeedbackRequest {
            seq: self.feedback_seq,
            last_time_ms: time_ms,
            best_time_ms: record.previous_best_ms.unwrap_or(time_ms),
            first_benchmark: record.previous_best_ms.is_none(),
        };

        tracing::info!(
            time_ms,
            rating = %record.attempt.category,
            new_best = record.is_new_best,
            total = self.stats.total_attempts(),
            "attempt completed"
        );

        PressOutcome::Completed { record, feedback }
    }
}
