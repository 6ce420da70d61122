//! Switching guard
//!
//! Transient flag raised while a track transition is in flight. It always
//! comes back down: either something definitive releases it, or its deadline
//! passes.

use std::time::Duration;
use tokio::time::Instant;

/// Default guard timeout
pub const DEFAULT_SWITCH_TIMEOUT: Duration = Duration::from_millis(3000);

/// Bounded-lifetime boolean guard
#[derive(Debug, Clone)]
pub struct SwitchGuard {
    /// Deadline while engaged, `None` when released
    deadline: Option<Instant>,

    /// How long an engagement may last
    timeout: Duration,
}

impl SwitchGuard {
    /// Create a released guard
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadline: None,
            timeout,
        }
    }

    /// Raise the guard (or extend it) from `now`
    pub fn engage(&mut self, now: Instant) {
        self.deadline = Some(now + self.timeout);
    }

    /// Lower the guard; returns whether it was raised
    pub fn release(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Whether the guard is raised
    pub fn is_active(&self) -> bool {
        self.deadline.is_some()
    }

    /// When the guard force-releases
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the guard is raised and past its deadline
    pub fn expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SwitchGuard {
    fn default() -> Self {
        Self::new(DEFAULT_SWITCH_TIMEOUT)
    }
}

/// Sleep until `deadline`, or forever when there is none
///
/// Used as a `tokio::select!` branch so a released guard never wakes the loop.
pub(crate) async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engage_and_release() {
        let now = Instant::now();
        let mut guard = SwitchGuard::new(Duration::from_millis(100));
        assert!(!guard.is_active());
        assert!(!guard.release());

        guard.engage(now);
        assert!(guard.is_active());
        assert_eq!(guard.deadline(), Some(now + Duration::from_millis(100)));
        assert!(guard.release());
        assert!(!guard.is_active());
    }

    #[test]
    fn expiry() {
        let now = Instant::now();
        let mut guard = SwitchGuard::new(Duration::from_millis(100));
        assert!(!guard.expired(now + Duration::from_secs(10)));

        guard.engage(now);
        assert!(!guard.expired(now + Duration::from_millis(99)));
        assert!(guard.expired(now + Duration::from_millis(100)));
    }

    #[test]
    fn re_engage_extends_deadline() {
        let now = Instant::now();
        let mut guard = SwitchGuard::new(Duration::from_millis(100));
        guard.engage(now);
        guard.engage(now + Duration::from_millis(50));
        assert_eq!(guard.deadline(), Some(now + Duration::from_millis(150)));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_until_deadline_wakes_at_deadline() {
        let start = Instant::now();
        sleep_until_deadline(Some(start + Duration::from_millis(250))).await;
        assert!(Instant::now() >= start + Duration::from_millis(250));
    }
}
