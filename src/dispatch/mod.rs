//! Parallel geometry dispatch.
//!
//! A [`Dispatcher`] owns a fixed pool of background workers and farms out
//! per-interval transform solving: interval `k` always goes to worker
//! `k % worker_count`, so every instance slot has exactly one producer and
//! no locking is needed. Results come back over a channel and are written
//! into the session's [`InstanceAttributeBuffer`](crate::instance::InstanceAttributeBuffer)
//! on the polling thread, which never blocks.
//!
//! Each [`Dispatcher::dispatch`] call starts a new session. Results tagged
//! with an older session id are dropped, so loading a new dataset mid-flight
//! cannot corrupt the freshly sized buffer.

mod dispatcher;
mod worker;

pub use dispatcher::{DispatchStatus, Dispatcher};
pub use worker::solve_interval;

/// Identifier of one dispatch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Raw session counter value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}
