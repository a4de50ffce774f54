use std::time::{Duration, Instant};

/// Trailing-edge throttle around an expensive computation.
///
/// The first call computes immediately. Calls inside the window return the
/// cached output and remember only the latest input; once the window has
/// elapsed, the next [`Throttle::call`] computes from the newest input.
#[derive(Debug)]
pub struct Throttle<I, O> {
    window: Duration,
    last: Option<(Instant, O)>,
    pending: Option<I>,
}

impl<I, O> Throttle<I, O> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: None,
            pending: None,
        }
    }

    pub fn call<F>(&mut self, now: Instant, input: I, compute: F) -> &O
    where
        F: FnOnce(&I) -> O,
    {
        let within_window = matches!(
            &self.last,
            Some((at, _)) if now.saturating_duration_since(*at) < self.window
        );
        if within_window {
            self.pending = Some(input);
            let (_, output) = self.last.as_ref().expect("checked above");
            output
        } else {
            self.pending = None;
            let (_, output) = self.last.insert((now, compute(&input)));
            output
        }
    }
}
