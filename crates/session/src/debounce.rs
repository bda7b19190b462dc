//! Cancelable trailing-edge deadline.

use std::future;

use tokio::time::{sleep_until, Duration, Instant};

/// Holds at most one pending value and the instant it becomes due.
/// Scheduling again replaces both.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Arm (or re-arm) with `value`, due one window from now.
    pub fn schedule(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.window));
    }

    /// Disarm, returning the value that was pending.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Resolves with the pending value once its deadline passes. Never
    /// resolves while disarmed. Dropping the future before the deadline
    /// leaves the value armed.
    pub async fn fired(&mut self) -> T {
        let Some(deadline) = self.deadline() else {
            return future::pending().await;
        };
        sleep_until(deadline).await;
        match self.pending.take() {
            Some((value, _)) => value,
            None => future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_quiet_window() {
        let mut d = Debouncer::new(Duration::from_millis(250));
        let start = Instant::now();
        d.schedule(1);
        assert_eq!(d.fired().await, 1);
        assert!(start.elapsed() >= Duration::from_millis(250));
        assert!(!d.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_replaces_value_and_deadline() {
        let mut d = Debouncer::new(Duration::from_millis(250));
        let start = Instant::now();
        d.schedule("a");
        tokio::time::advance(Duration::from_millis(200)).await;
        d.schedule("b");
        assert_eq!(d.fired().await, "b");
        assert!(start.elapsed() >= Duration::from_millis(450));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_disarms() {
        let mut d = Debouncer::new(Duration::from_millis(10));
        d.schedule(7);
        assert_eq!(d.cancel(), Some(7));
        assert!(!d.is_armed());
        let res = tokio::time::timeout(Duration::from_secs(1), d.fired()).await;
        assert!(res.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_wait_keeps_value_armed() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        d.schedule(3);
        let res = tokio::time::timeout(Duration::from_millis(50), d.fired()).await;
        assert!(res.is_err());
        assert!(d.is_armed());
        assert_eq!(d.fired().await, 3);
    }
}
