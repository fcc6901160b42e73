//! GEX history slider state and its debounce timer.

use chrono::NaiveDateTime;
use std::{fmt, time::Duration};
use tokio::task::JoinHandle;

/// Default quiet period before a slider position is committed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// A point on the history slider: a captured snapshot time, or the live view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Selection {
    At(NaiveDateTime),
    Now,
}

impl Selection {
    pub fn is_now(&self) -> bool {
        matches!(self, Selection::Now)
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Selection::At(at) => Some(*at),
            Selection::Now => None,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::At(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M")),
            Selection::Now => write!(f, "Now"),
        }
    }
}

/// Slider positions plus the pending (follows the thumb) and committed (fetched) selections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeScrubState {
    available: Vec<NaiveDateTime>,
    pub pending: Selection,
    pub committed: Selection,
}

impl Default for TimeScrubState {
    fn default() -> Self {
        Self {
            available: Vec::new(),
            pending: Selection::Now,
            committed: Selection::Now,
        }
    }
}

impl TimeScrubState {
    /// Replace the capture timestamps. The fetched sequence is copied and sorted ascending.
    pub fn set_available(&mut self, timestamps: &[NaiveDateTime]) {
        let mut sorted = timestamps.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        self.available = sorted;
    }

    pub fn available(&self) -> &[NaiveDateTime] {
        &self.available
    }

    /// Slider positions in order: every capture, then `Now` as the right-most stop.
    pub fn options(&self) -> Vec<Selection> {
        self.available
            .iter()
            .copied()
            .map(Selection::At)
            .chain(std::iter::once(Selection::Now))
            .collect()
    }

    /// Index of the pending selection among [`TimeScrubState::options`].
    pub fn pending_index(&self) -> usize {
        match self.pending {
            Selection::Now => self.available.len(),
            Selection::At(at) => self
                .available
                .binary_search(&at)
                .unwrap_or_else(|insert| insert.min(self.available.len())),
        }
    }

    /// Selection `delta` stops away from the pending one, clamped to the slider ends.
    pub fn step(&self, delta: isize) -> Selection {
        let last = self.available.len() as isize;
        let index = (self.pending_index() as isize + delta).clamp(0, last) as usize;
        self.available
            .get(index)
            .copied()
            .map(Selection::At)
            .unwrap_or(Selection::Now)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Cancellable one-shot timer; re-scheduling aborts the previous task.
///
/// Each schedule gets a fresh token. A firing is only honoured via [`DebounceTimer::accept`]
/// when its token is the latest one, so a task that fired just before being aborted is ignored.
#[derive(Debug)]
pub struct DebounceTimer {
    delay: Duration,
    handle: Option<JoinHandle<()>>,
    token: u64,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            handle: None,
            token: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the quiet period; `on_fire` runs with the schedule token once it elapses.
    pub fn schedule<F>(&mut self, on_fire: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel();
        self.token += 1;

        let token = self.token;
        let delay = self.delay;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire(token);
        }));

        token
    }

    /// Consume a firing. Returns `false` for stale tokens.
    pub fn accept(&mut self, token: u64) -> bool {
        if self.handle.is_some() && token == self.token {
            self.handle = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.handle.is_some()
    }
}

impl Default for DebounceTimer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 5)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_set_available_sorts_copy() {
        let fetched = vec![at(10, 30), at(9, 30), at(10, 0), at(9, 30)];
        let mut state = TimeScrubState::default();
        state.set_available(&fetched);

        assert_eq!(state.available(), &[at(9, 30), at(10, 0), at(10, 30)]);
        // the fetched sequence is untouched
        assert_eq!(fetched[0], at(10, 30));
    }

    #[test]
    fn test_options_end_with_now() {
        let mut state = TimeScrubState::default();
        assert_eq!(state.options(), vec![Selection::Now]);

        state.set_available(&[at(9, 30), at(10, 0)]);
        assert_eq!(
            state.options(),
            vec![Selection::At(at(9, 30)), Selection::At(at(10, 0)), Selection::Now]
        );
        assert_eq!(state.pending_index(), 2);
    }

    #[test]
    fn test_step_clamps_to_ends() {
        let mut state = TimeScrubState::default();
        state.set_available(&[at(9, 30), at(10, 0)]);

        assert_eq!(state.step(1), Selection::Now);
        assert_eq!(state.step(-1), Selection::At(at(10, 0)));
        assert_eq!(state.step(-5), Selection::At(at(9, 30)));

        state.pending = Selection::At(at(9, 30));
        assert_eq!(state.step(-1), Selection::At(at(9, 30)));
        assert_eq!(state.step(1), Selection::At(at(10, 0)));
        assert_eq!(state.step(2), Selection::Now);
    }

    #[test]
    fn test_selection_display() {
        assert_eq!(Selection::Now.to_string(), "Now");
        assert_eq!(Selection::At(at(9, 5)).to_string(), "2025-03-05 09:05");
        assert_eq!(Selection::At(at(9, 5)).timestamp(), Some(at(9, 5)));
        assert!(Selection::Now.timestamp().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_fires_once_after_quiet_period() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = DebounceTimer::default();

        for _ in 0..3 {
            let fired = Arc::clone(&fired);
            timer.schedule(move |_| {
                fired.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::advance(Duration::from_millis(200)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_accepts_latest_token_only() {
        let mut timer = DebounceTimer::default();
        let first = timer.schedule(|_| {});
        let second = timer.schedule(|_| {});

        assert!(timer.is_pending());
        assert!(!timer.accept(first));
        assert!(timer.accept(second));
        assert!(!timer.is_pending());
        assert!(!timer.accept(second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_timer_never_fires() {
        let fired = Arc::new(AtomicUsize::new(0));
        {
            let mut timer = DebounceTimer::default();
            let fired = Arc::clone(&fired);
            timer.schedule(move |_| {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
