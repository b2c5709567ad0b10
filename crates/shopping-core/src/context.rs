//! Cancellation and deadline plumbing for blocking store calls.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{Result, StoreError};

/// Longest single sleep between cancellation checks.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Carries a cancellation token and an optional deadline into the
/// connector, the init gate and the transaction executor.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    /// Enclosing token, e.g. the owning store's shutdown token.
    scope: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::default().deadline(Instant::now() + timeout)
    }

    /// Replaces the deadline.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Ties this context to an existing token, e.g. one cancelled on shutdown.
    pub fn cancelled_by(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Also fails once `scope` is cancelled, keeping this context's own
    /// token and deadline.
    pub fn within(mut self, scope: &CancellationToken) -> Self {
        self.scope = Some(scope.clone());
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Time left before the deadline, if there is one.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fails when the caller has given up on this operation.
    pub fn check(&self) -> Result<()> {
        let scope_cancelled = self.scope.as_ref().is_some_and(CancellationToken::is_cancelled);
        if self.cancel.is_cancelled() || scope_cancelled {
            return Err(StoreError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(StoreError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Blocks for `duration`, waking early to report cancellation or an
    /// expired deadline.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let until = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= until {
                return Ok(());
            }
            let mut nap = (until - now).min(POLL_INTERVAL);
            if let Some(deadline) = self.deadline {
                nap = nap.min(deadline.saturating_duration_since(now));
            }
            std::thread::sleep(nap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_never_fails() {
        let ctx = CallContext::background();
        assert!(ctx.check().is_ok());
        assert!(ctx.sleep(Duration::from_millis(1)).is_ok());
    }

    #[test]
    fn test_cancelled_token_fails_check() {
        let token = CancellationToken::new();
        let ctx = CallContext::background().cancelled_by(token.clone());
        token.cancel();
        assert!(matches!(ctx.check(), Err(StoreError::Cancelled)));
        assert!(matches!(
            ctx.sleep(Duration::from_secs(60)),
            Err(StoreError::Cancelled)
        ));
    }

    #[test]
    fn test_cancelled_scope_fails_check() {
        let scope = CancellationToken::new();
        let ctx = CallContext::with_timeout(Duration::from_secs(60)).within(&scope);
        assert!(ctx.check().is_ok());

        scope.cancel();
        assert!(matches!(ctx.check(), Err(StoreError::Cancelled)));
        assert!(!ctx.token().is_cancelled());
    }

    #[test]
    fn test_deadline_interrupts_sleep() {
        let ctx = CallContext::with_timeout(Duration::from_millis(20));
        let started = Instant::now();
        assert!(matches!(
            ctx.sleep(Duration::from_secs(60)),
            Err(StoreError::DeadlineExceeded)
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_background_has_no_remaining_time() {
        assert_eq!(CallContext::background().remaining(), None);
    }
}
