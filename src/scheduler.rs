/// Identity of a scheduled timer or frame subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// What a timer means to the engine once it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Turn on the next light, or move on to the lights-out wait
    NextLight,
    /// Extinguish all lights and open the reaction window
    LightsOut,
    /// Refresh the live elapsed display
    LiveTimer,
}

#[derive(Debug, Clone)]
struct OneShot {
    handle: TimerHandle,
    deadline_ms: f64,
    event: TimerEvent,
}

/// Single-threaded scheduler for delayed one-shot timers and per-frame
/// subscriptions. Nothing fires on its own: the owner polls with the current
/// time and reacts to whatever is due.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    one_shots: Vec<OneShot>,
    frames: Vec<(TimerHandle, TimerEvent)>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handle(&mut self) -> TimerHandle {
        self.next_id += 1;
        TimerHandle(self.next_id)
    }

    /// Schedule `event` to fire once, `delay_ms` after `now_ms`.
    pub fn after(&mut self, now_ms: f64, delay_ms: u64, event: TimerEvent) -> TimerHandle {
        let handle = self.next_handle();
        self.one_shots.push(OneShot {
            handle,
            deadline_ms: now_ms + delay_ms as f64,
            event,
        });
        tracing::debug!(?handle, ?event, delay_ms, "timer scheduled");
        handle
    }

    /// Subscribe `event` to every frame until canceled.
    pub fn every_frame(&mut self, event: TimerEvent) -> TimerHandle {
        let handle = self.next_handle();
        self.frames.push((handle, event));
        handle
    }

    /// Cancel a timer or frame subscription. Unknown, fired or already
    /// canceled handles are ignored. Returns whether anything was removed.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.one_shots.len() + self.frames.len();
        self.one_shots.retain(|t| t.handle != handle);
        self.frames.retain(|(h, _)| *h != handle);
        let removed = before != self.one_shots.len() + self.frames.len();
        if removed {
            tracing::debug!(?handle, "timer canceled");
        }
        removed
    }

    pub fn cancel_all(&mut self) {
        self.one_shots.clear();
        self.frames.clear();
    }

    /// Remove and return the earliest one-shot whose deadline has passed.
    /// Ties go to the timer scheduled first.
    pub fn pop_due(&mut self, now_ms: f64) -> Option<(TimerHandle, TimerEvent)> {
        let idx = self
            .one_shots
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline_ms <= now_ms)
            .min_by(|(_, a), (_, b)| {
                a.deadline_ms
                    .total_cmp(&b.deadline_ms)
                    .then(a.handle.cmp(&b.handle))
            })
            .map(|(idx, _)| idx)?;

        let timer = self.one_shots.remove(idx);
        Some((timer.handle, timer.event))
    }

    /// Current frame subscriptions, in subscription order
    pub fn frame_subscriptions(&self) -> Vec<(TimerHandle, TimerEvent)> {
        self.frames.clone()
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.one_shots.iter().any(|t| t.handle == handle)
            || self.frames.iter().any(|(h, _)| *h == handle)
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.one_shots
            .iter()
            .map(|t| t.deadline_ms)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Number of outstanding one-shots and frame subscriptions
    pub fn len(&self) -> usize {
        self.one_shots.len() + self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_due_before_deadline() {
        let mut q = TimerQueue::new();
        q.after(0.0, 600, TimerEvent::NextLight);

        assert_eq!(q.pop_due(599.9), None);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_due_at_deadline() {
        let mut q = TimerQueue::new();
        let h = q.after(100.0, 600, TimerEvent::NextLight);

        assert_eq!(q.pop_due(700.0), Some((h, TimerEvent::NextLight)));
        assert!(q.is_empty());
        assert!(!q.is_active(h));
    }

    #[test]
    fn test_pop_due_earliest_first() {
        let mut q = TimerQueue::new();
        let late = q.after(0.0, 900, TimerEvent::LightsOut);
        let early = q.after(0.0, 300, TimerEvent::NextLight);

        assert_eq!(q.pop_due(1_000.0), Some((early, TimerEvent::NextLight)));
        assert_eq!(q.pop_due(1_000.0), Some((late, TimerEvent::LightsOut)));
        assert_eq!(q.pop_due(1_000.0), None);
    }

    #[test]
    fn test_ties_fire_in_schedule_order() {
        let mut q = TimerQueue::new();
        let first = q.after(0.0, 0, TimerEvent::NextLight);
        let second = q.after(0.0, 0, TimerEvent::LightsOut);

        assert_eq!(q.pop_due(0.0).map(|(h, _)| h), Some(first));
        assert_eq!(q.pop_due(0.0).map(|(h, _)| h), Some(second));
    }

    #[test]
    fn test_cancel_before_fire() {
        let mut q = TimerQueue::new();
        let h = q.after(0.0, 100, TimerEvent::LightsOut);

        assert!(q.cancel(h));
        assert_eq!(q.pop_due(10_000.0), None);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut q = TimerQueue::new();
        let h = q.after(0.0, 100, TimerEvent::LightsOut);

        assert!(q.cancel(h));
        assert!(!q.cancel(h));

        let fired = q.after(0.0, 0, TimerEvent::NextLight);
        q.pop_due(0.0);
        assert!(!q.cancel(fired));
    }

    #[test]
    fn test_frame_subscription_repeats_until_canceled() {
        let mut q = TimerQueue::new();
        let h = q.every_frame(TimerEvent::LiveTimer);

        assert_eq!(q.frame_subscriptions(), vec![(h, TimerEvent::LiveTimer)]);
        assert_eq!(q.frame_subscriptions(), vec![(h, TimerEvent::LiveTimer)]);
        // frames are never returned by pop_due
        assert_eq!(q.pop_due(f64::MAX), None);

        assert!(q.cancel(h));
        assert!(q.frame_subscriptions().is_empty());
    }

    #[test]
    fn test_cancel_all() {
        let mut q = TimerQueue::new();
        q.after(0.0, 10, TimerEvent::NextLight);
        q.every_frame(TimerEvent::LiveTimer);

        q.cancel_all();
        assert!(q.is_empty());
        assert_eq!(q.next_deadline(), None);
    }

    #[test]
    fn test_handles_are_unique() {
        let mut q = TimerQueue::new();
        let a = q.after(0.0, 10, TimerEvent::NextLight);
        q.cancel(a);
        let b = q.after(0.0, 10, TimerEvent::NextLight);
        assert_ne!(a, b);
    }

    #[test]
    fn test_next_deadline() {
        let mut q = TimerQueue::new();
        q.after(50.0, 1_000, TimerEvent::LightsOut);
        q.after(50.0, 200, TimerEvent::NextLight);
        assert_eq!(q.next_deadline(), Some(250.0));
    }
}
