//! Single-flight token refresh.
//!
//! [`RefreshCoordinator`] is the explicit state machine behind the client's
//! 401 handling:
//!
//! ```text
//!            join() while Idle                settle(outcome)
//!   ┌──────┐ ─────────────────> ┌────────────┐ ──────────────> ┌──────┐
//!   │ Idle │                    │ Refreshing │                 │ Idle │
//!   └──────┘ <───────────────── └────────────┘                 └──────┘
//!              lease dropped       │    ▲
//!              (waiters failed)    └────┘ join() while Refreshing
//!                                         queues a waiter
//! ```
//!
//! The first request that needs a refresh receives the [`RefreshLease`] and
//! performs the refresh call; every request that fails while the lease is out
//! is queued as a [`Waiter`] and released with the lease's outcome. At most one
//! refresh call is ever in flight.
//!
//! The mutex guarding the state is never held across an `.await`.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;

use crate::tokens::TokenStore;

/// Result of a shared refresh, handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The new access token.
    Refreshed(String),
    /// Why the refresh failed.
    Failed(String),
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<State>,
}

/// What a request that just received a 401 should do next.
#[derive(Debug)]
pub enum RefreshTicket<'a> {
    /// The stored access token already differs from the one the request
    /// carried; replay with this token without refreshing.
    Rotated(String),
    /// A refresh is in flight; wait for its outcome.
    Follower(Waiter),
    /// No refresh is in flight; the holder must perform it and settle.
    Leader(RefreshLease<'a>),
}

/// A queued request waiting on somebody else's refresh.
#[derive(Debug)]
pub struct Waiter {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl Waiter {
    pub async fn wait(self) -> RefreshOutcome {
        self.rx
            .await
            .unwrap_or_else(|_| RefreshOutcome::Failed("token refresh was abandoned".to_string()))
    }
}

/// Exclusive right to perform the refresh.
///
/// Must be settled with the refresh outcome. Dropping it unsettled (for
/// example when the owning future is cancelled) fails every waiter and
/// returns the coordinator to idle.
#[derive(Debug)]
pub struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshLease<'_> {
    /// Release every queued waiter with `outcome`. Returns how many waited.
    pub fn settle(mut self, outcome: RefreshOutcome) -> usize {
        self.settled = true;
        self.coordinator.release(outcome)
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.release(RefreshOutcome::Failed(
                "token refresh was abandoned".to_string(),
            ));
        }
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide how a request that failed with `stale_token` proceeds.
    pub fn join(&self, stale_token: Option<&str>, tokens: &dyn TokenStore) -> RefreshTicket<'_> {
        let mut state = self.lock();

        if let State::Refreshing { waiters } = &mut *state {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            debug!(queued = waiters.len(), "Queued request behind in-flight token refresh");
            return RefreshTicket::Follower(Waiter { rx });
        }

        if let Some(current) = tokens.access_token() {
            if stale_token != Some(current.as_str()) {
                return RefreshTicket::Rotated(current);
            }
        }

        *state = State::Refreshing {
            waiters: Vec::new(),
        };
        RefreshTicket::Leader(RefreshLease {
            coordinator: self,
            settled: false,
        })
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock(), State::Refreshing { .. })
    }

    /// Number of requests currently queued behind the refresh.
    pub fn waiting(&self) -> usize {
        match &*self.lock() {
            State::Refreshing { waiters } => waiters.len(),
            State::Idle => 0,
        }
    }

    fn release(&self, outcome: RefreshOutcome) -> usize {
        let waiters = match std::mem::take(&mut *self.lock()) {
            State::Refreshing { waiters } => waiters,
            State::Idle => Vec::new(),
        };

        let count = waiters.len();
        for waiter in waiters {
            // A waiter whose request was dropped no longer listens.
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::MemoryTokenStore;

    #[tokio::test]
    async fn test_first_join_leads_and_later_joins_follow() {
        let tokens = MemoryTokenStore::with_tokens("stale", "r1");
        let coordinator = RefreshCoordinator::new();

        let lease = match coordinator.join(Some("stale"), &tokens) {
            RefreshTicket::Leader(lease) => lease,
            other => panic!("expected leader, got {other:?}"),
        };
        assert!(coordinator.is_refreshing());

        let mut waiters = Vec::new();
        for _ in 0..3 {
            match coordinator.join(Some("stale"), &tokens) {
                RefreshTicket::Follower(waiter) => waiters.push(waiter),
                other => panic!("expected follower, got {other:?}"),
            }
        }
        assert_eq!(coordinator.waiting(), 3);

        assert_eq!(lease.settle(RefreshOutcome::Refreshed("fresh".into())), 3);
        assert!(!coordinator.is_refreshing());

        for waiter in waiters {
            assert_eq!(waiter.wait().await, RefreshOutcome::Refreshed("fresh".into()));
        }
    }

    #[tokio::test]
    async fn test_failure_reaches_every_waiter() {
        let tokens = MemoryTokenStore::with_tokens("stale", "r1");
        let coordinator = RefreshCoordinator::new();

        let RefreshTicket::Leader(lease) = coordinator.join(Some("stale"), &tokens) else {
            panic!("expected leader");
        };
        let RefreshTicket::Follower(a) = coordinator.join(Some("stale"), &tokens) else {
            panic!("expected follower");
        };
        let RefreshTicket::Follower(b) = coordinator.join(Some("stale"), &tokens) else {
            panic!("expected follower");
        };

        lease.settle(RefreshOutcome::Failed("expired".into()));
        assert_eq!(a.wait().await, RefreshOutcome::Failed("expired".into()));
        assert_eq!(b.wait().await, RefreshOutcome::Failed("expired".into()));
    }

    #[tokio::test]
    async fn test_dropped_lease_fails_waiters_and_resets() {
        let tokens = MemoryTokenStore::with_tokens("stale", "r1");
        let coordinator = RefreshCoordinator::new();

        let waiter = {
            let RefreshTicket::Leader(_lease) = coordinator.join(Some("stale"), &tokens) else {
                panic!("expected leader");
            };
            let RefreshTicket::Follower(waiter) = coordinator.join(Some("stale"), &tokens) else {
                panic!("expected follower");
            };
            waiter
        };

        assert!(!coordinator.is_refreshing());
        assert!(matches!(waiter.wait().await, RefreshOutcome::Failed(_)));
        assert!(matches!(
            coordinator.join(Some("stale"), &tokens),
            RefreshTicket::Leader(_)
        ));
    }

    #[test]
    fn test_rotated_token_skips_refresh() {
        let tokens = MemoryTokenStore::with_tokens("fresh", "r2");
        let coordinator = RefreshCoordinator::new();

        match coordinator.join(Some("stale"), &tokens) {
            RefreshTicket::Rotated(token) => assert_eq!(token, "fresh"),
            other => panic!("expected rotated, got {other:?}"),
        }
        assert!(!coordinator.is_refreshing());
    }

    #[test]
    fn test_missing_access_token_still_leads() {
        let tokens = MemoryTokenStore::new();
        let coordinator = RefreshCoordinator::new();
        assert!(matches!(coordinator.join(None, &tokens), RefreshTicket::Leader(_)));
    }
}
