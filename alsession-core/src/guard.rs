//! Reusable completion signal with rescind support
//!
//! A `Guard` starts out pending. `resolve`/`reject` settle the current epoch
//! exactly once and wake every waiter attached to it. `rescind` starts a new
//! epoch: the stored outcome is dropped, and settle attempts tagged with an
//! older epoch are ignored from then on. Waiters that were still pending when
//! the guard was rescinded stay attached and settle with the newer epoch's
//! outcome, so nothing computed for a superseded epoch can ever reach them.

use std::convert::Infallible;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::trace;

/// Epoch counter value identifying one Pending -> Fulfilled cycle
pub type Epoch = u64;

struct GuardState<T, E> {
    epoch: Epoch,
    outcome: Option<Result<T, E>>,
    waiters: Vec<oneshot::Sender<Result<T, E>>>,
}

/// Settable, re-armable future
pub struct Guard<T, E = Infallible> {
    name: &'static str,
    state: Mutex<GuardState<T, E>>,
}

impl<T, E> Guard<T, E>
where
    T: Clone,
    E: Clone,
{
    /// Create a pending guard; `name` only shows up in trace output
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(GuardState {
                epoch: 0,
                outcome: None,
                waiters: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GuardState<T, E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current epoch
    pub fn epoch(&self) -> Epoch {
        self.lock().epoch
    }

    /// True once the current epoch has been resolved (or rejected)
    pub fn is_fulfilled(&self) -> bool {
        self.lock().outcome.is_some()
    }

    /// Synchronously inspect the current epoch's outcome
    pub fn peek(&self) -> Option<Result<T, E>> {
        self.lock().outcome.clone()
    }

    /// Resolve the current epoch. Returns false if it was already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(None, Ok(value))
    }

    /// Reject the current epoch. Returns false if it was already settled.
    pub fn reject(&self, error: E) -> bool {
        self.settle(None, Err(error))
    }

    /// Resolve `epoch` if it is still the current one
    pub fn resolve_epoch(&self, epoch: Epoch, value: T) -> bool {
        self.settle(Some(epoch), Ok(value))
    }

    /// Reject `epoch` if it is still the current one
    pub fn reject_epoch(&self, epoch: Epoch, error: E) -> bool {
        self.settle(Some(epoch), Err(error))
    }

    /// Settle `target`, or whatever epoch is current when the lock is taken
    fn settle(&self, target: Option<Epoch>, outcome: Result<T, E>) -> bool {
        let (epoch, waiters) = {
            let mut state = self.lock();
            let epoch = target.unwrap_or(state.epoch);
            if state.epoch != epoch {
                trace!(
                    guard = self.name,
                    epoch,
                    current = state.epoch,
                    "Ignoring settle for superseded epoch"
                );
                return false;
            }
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome.clone());
            (epoch, std::mem::take(&mut state.waiters))
        };

        trace!(
            guard = self.name,
            epoch,
            waiters = waiters.len(),
            "Guard settled"
        );
        for waiter in waiters {
            // Receiver gone means the waiting future was dropped
            let _ = waiter.send(outcome.clone());
        }
        true
    }

    /// Start a new epoch and return it. Any stored outcome is discarded;
    /// pending waiters carry over to the new epoch.
    pub fn rescind(&self) -> Epoch {
        let mut state = self.lock();
        state.epoch += 1;
        state.outcome = None;
        trace!(guard = self.name, epoch = state.epoch, "Guard rescinded");
        state.epoch
    }

    /// Start a new pending epoch and reject everyone currently waiting with
    /// `error`. The guard itself stays pending afterwards.
    pub fn abandon(&self, error: E) -> Epoch {
        let (epoch, waiters) = {
            let mut state = self.lock();
            state.epoch += 1;
            state.outcome = None;
            (state.epoch, std::mem::take(&mut state.waiters))
        };
        trace!(
            guard = self.name,
            epoch,
            waiters = waiters.len(),
            "Guard abandoned"
        );
        for waiter in waiters {
            let _ = waiter.send(Err(error.clone()));
        }
        epoch
    }

    /// Wait for the guard to settle. Returns immediately if the current
    /// epoch is already settled.
    pub async fn wait(&self) -> Result<T, E> {
        let receiver = {
            let mut state = self.lock();
            if let Some(outcome) = &state.outcome {
                return outcome.clone();
            }
            // Waits cancelled by their caller leave closed senders behind
            state.waiters.retain(|waiter| !waiter.is_closed());
            let (sender, receiver) = oneshot::channel();
            state.waiters.push(sender);
            receiver
        };

        match receiver.await {
            Ok(outcome) => outcome,
            // Senders only disappear with the guard itself; a dropped guard never settles
            Err(_) => std::future::pending().await,
        }
    }
}

impl<T, E> std::fmt::Debug for Guard<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Guard")
            .field("name", &self.name)
            .field("epoch", &state.epoch)
            .field("fulfilled", &state.outcome.is_some())
            .field("waiters", &state.waiters.len())
            .finish()
    }
}
