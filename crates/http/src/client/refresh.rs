//! Single-flight coordination of credential refreshes
//!
//! At most one refresh runs per coordinator. The first caller becomes the
//! leader and runs the refresh; everyone arriving while it is in flight
//! registers a one-shot waiter and receives a clone of the leader's outcome.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{oneshot, watch};
use tracing::debug;

use super::error::{ClientError, RefreshFailure};

/// Result of one refresh, shared by the leader and all of its waiters
pub(crate) type Outcome = Result<String, SharedFailure>;

/// Cloneable form of the ways a refresh can end without a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SharedFailure {
    /// No refresh token was stored
    Unavailable,
    /// The refresh endpoint failed or could not be reached
    Failed(RefreshFailure),
    /// The leader was dropped before it settled
    Abandoned,
}

impl From<SharedFailure> for ClientError {
    fn from(failure: SharedFailure) -> Self {
        match failure {
            SharedFailure::Unavailable => Self::RefreshUnavailable,
            SharedFailure::Failed(failure) => Self::Refresh(failure),
            SharedFailure::Abandoned => Self::RefreshAbandoned,
        }
    }
}

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<Outcome>>,
}

enum Ticket<'a> {
    Leader(LeaderGuard<'a>),
    Waiter(oneshot::Receiver<Outcome>),
}

/// Settles the refresh when the leader finishes or is dropped
struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl LeaderGuard<'_> {
    fn settle(mut self, outcome: &Outcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!("Refresh leader dropped before completion");
            self.coordinator.settle(&Err(SharedFailure::Abandoned));
        }
    }
}

/// Refresh state owned by one session
pub(crate) struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    refreshing: watch::Sender<bool>,
}

impl RefreshCoordinator {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(RefreshState::default()),
            refreshing: watch::Sender::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        // Every mutation completes under the lock, poisoned or not
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join(&self) -> Ticket<'_> {
        let mut state = self.lock();
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            debug!(waiters = state.waiters.len(), "Queued behind in-flight refresh");
            return Ticket::Waiter(rx);
        }

        state.in_flight = true;
        drop(state);
        self.refreshing.send_replace(true);

        Ticket::Leader(LeaderGuard {
            coordinator: self,
            settled: false,
        })
    }

    fn settle(&self, outcome: &Outcome) {
        let waiters = {
            let mut state = self.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        self.refreshing.send_replace(false);

        if !waiters.is_empty() {
            debug!(count = waiters.len(), "Releasing queued requests");
        }
        for waiter in waiters {
            // A waiter whose request was dropped has nobody left to tell
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Run `refresh` unless one is already in flight, in which case wait for
    /// that one instead
    pub(crate) async fn run<F, Fut>(&self, refresh: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        match self.join() {
            Ticket::Waiter(rx) => rx.await.unwrap_or(Err(SharedFailure::Abandoned)),
            Ticket::Leader(guard) => {
                let outcome = refresh().await;
                guard.settle(&outcome);
                outcome
            }
        }
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.refreshing.subscribe()
    }
}
