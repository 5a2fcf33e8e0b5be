//! Debounced, cancellable recomputation.
//!
//! Each submission supersedes whatever was pending: the earlier input's
//! token is cancelled and can never produce an observable effect. Callers
//! pass the clock in, so firing is deterministic and owned entirely by the
//! store's single writer.

use std::time::{Duration, Instant};

/// The recommended search debounce window.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(120);

#[derive(Debug)]
struct Pending<T> {
    input: T,
    due: Instant,
    token: u64,
}

/// Holds at most one pending input and releases it once its delay elapses.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    next_token: u64,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_token: 0,
            pending: None,
        }
    }

    /// Schedules `input`, cancelling any pending submission. Returns the
    /// new submission's token.
    pub fn submit(&mut self, input: T, now: Instant) -> u64 {
        self.next_token += 1;
        self.pending = Some(Pending {
            input,
            due: now + self.delay,
            token: self.next_token,
        });
        self.next_token
    }

    /// Releases the pending input once due. Fires at most once per
    /// submission.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.as_ref()?.due > now {
            return None;
        }
        self.pending.take().map(|pending| pending.input)
    }

    /// Drops the pending submission without firing it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Token of the pending submission, if any.
    pub fn pending_token(&self) -> Option<u64> {
        self.pending.as_ref().map(|pending| pending.token)
    }
}
