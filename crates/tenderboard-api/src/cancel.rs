// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Aborted,
    TimedOut,
}

/// One-way cancellation flag shared between the party that owns an operation
/// and everything awaiting it. Only the first trigger's reason is kept.
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<Option<CancelReason>>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state: Arc::new(state),
        }
    }

    /// Returns `true` when this call was the one that cancelled the token.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        self.state.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn reason(&self) -> Option<CancelReason> {
        *self.state.borrow()
    }

    pub async fn cancelled(&self) -> CancelReason {
        let mut rx = self.state.subscribe();
        loop {
            if let Some(reason) = *rx.borrow_and_update() {
                return reason;
            }
            // The sender lives in `self`, so the channel cannot close here.
            if rx.changed().await.is_err() {
                return CancelReason::Aborted;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelReason, CancelToken};
    use std::time::Duration;

    #[test]
    fn first_reason_wins() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert_eq!(token.reason(), None);

        assert!(token.cancel(CancelReason::TimedOut));
        assert!(!token.cancel(CancelReason::Aborted));
        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some(CancelReason::TimedOut));
    }

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let observer = token.clone();
        token.cancel(CancelReason::Aborted);
        assert!(observer.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_when_already_triggered() {
        let token = CancelToken::new();
        token.cancel(CancelReason::Aborted);
        assert_eq!(token.cancelled().await, CancelReason::Aborted);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_wakes_waiters_on_later_trigger() {
        let token = CancelToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel(CancelReason::TimedOut);
        });

        assert_eq!(token.cancelled().await, CancelReason::TimedOut);
    }
}
