//! The shared queue of solicited responses.
//!
//! The protocol has no transaction id, so a reply is matched to its request
//! by shape alone: a waiter takes the first queued response its [`Expect`]
//! accepts and leaves everything else in place, in arrival order.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use mchost_protocol::{Response, ResponseKind};
use parking_lot::{Condvar, Mutex};

use crate::cancel::CancelToken;

/// Longest a waiter sleeps before re-checking its cancel token.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Which responses satisfy a waiter. An `Err` response satisfies every waiter.
///
/// Responses that no waiter takes stay queued only until the next command
/// starts; they never answer a later command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Any solicited response.
    Any,
    Kind(ResponseKind),
    OneOf(&'static [ResponseKind]),
}

impl Expect {
    pub fn matches(&self, response: &Response) -> bool {
        let kind = response.kind();
        if kind == ResponseKind::Err {
            return true;
        }
        match self {
            Expect::Any => true,
            Expect::Kind(expected) => kind == *expected,
            Expect::OneOf(kinds) => kinds.contains(&kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitError {
    Timeout,
    Cancelled,
    Disconnected,
}

#[derive(Debug, Default)]
struct QueueState {
    responses: VecDeque<Response>,
    disconnected: bool,
}

/// Filled by the receive loop, drained by whichever caller holds the command gate.
#[derive(Debug, Default)]
pub(crate) struct ResponseQueue {
    state: Mutex<QueueState>,
    arrived: Condvar,
}

impl ResponseQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, response: Response) {
        self.state.lock().responses.push_back(response);
        self.arrived.notify_all();
    }

    /// Drop everything queued, returning how many responses were discarded.
    pub(crate) fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let discarded = state.responses.len();
        state.responses.clear();
        discarded
    }

    /// Empty the queue and accept waiters again after a disconnect.
    pub(crate) fn reset(&self) {
        let mut state = self.state.lock();
        state.responses.clear();
        state.disconnected = false;
    }

    /// Fail current and future waits with [`WaitError::Disconnected`] until `reset`.
    pub(crate) fn disconnect(&self) {
        self.state.lock().disconnected = true;
        self.arrived.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.state.lock().responses.len()
    }

    /// Block until a response satisfying `expect` is queued, then take it.
    pub(crate) fn wait_for(
        &self,
        expect: Expect,
        timeout: Duration,
        cancel: Option<&CancelToken>,
    ) -> Result<Response, WaitError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(pos) = state.responses.iter().position(|r| expect.matches(r)) {
                if let Some(response) = state.responses.remove(pos) {
                    return Ok(response);
                }
            }
            if state.disconnected {
                return Err(WaitError::Disconnected);
            }
            if cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(WaitError::Cancelled);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(WaitError::Timeout);
            }
            self.arrived
                .wait_until(&mut state, deadline.min(now + CANCEL_POLL_INTERVAL));
        }
    }
}
