//! Background worker: solves chunks of intervals into instance records.
//!
//! Workers are stateless apart from the width policy and jitter settings.
//! A worker that receives nothing for the idle timeout retires itself, but
//! only after winning a compare-exchange of its pending count from zero to
//! [`RETIRED`]. The dispatcher increments the same count before every send,
//! so a chunk can never be queued to a worker that has decided to exit.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::SessionId;
use crate::data::Interval;
use crate::geometry::{SegmentTransform, WidthPolicy};
use crate::instance::InstanceRecord;

/// Pending-count sentinel of a retired worker.
const RETIRED: usize = usize::MAX;

/// Intervals for one worker, tagged with their ordinal index.
pub(crate) struct WorkChunk {
    pub session: SessionId,
    pub items: Vec<(usize, Interval)>,
}

/// Records solved from one [`WorkChunk`].
pub(crate) struct SolvedChunk {
    pub session: SessionId,
    pub records: Vec<(usize, InstanceRecord)>,
}

/// Settings every worker in a pool shares.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub results: mpsc::Sender<SolvedChunk>,
    pub current_session: Arc<AtomicU64>,
    pub policy: WidthPolicy,
    pub jitter: f32,
    pub idle_timeout: Duration,
}

/// Dispatcher-side handle of one worker thread.
pub(crate) struct WorkerHandle {
    tx: Option<mpsc::Sender<WorkChunk>>,
    pending: Arc<AtomicUsize>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Spawn worker `index`.
    pub fn spawn(
        index: usize,
        context: WorkerContext,
    ) -> Result<Self, std::io::Error> {
        let (tx, rx) = mpsc::channel::<WorkChunk>();
        let pending = Arc::new(AtomicUsize::new(0));
        let worker_pending = Arc::clone(&pending);

        let thread = std::thread::Builder::new()
            .name(format!("interval-worker-{index}"))
            .spawn(move || {
                run(index, &rx, &worker_pending, &context);
            })?;
        log::debug!("spawned interval worker {index}");

        Ok(Self {
            tx: Some(tx),
            pending,
            thread: Some(thread),
        })
    }

    /// Reserve a slot for one chunk. Fails once the worker has retired.
    #[must_use]
    pub fn try_claim(&self) -> bool {
        let mut current = self.pending.load(Ordering::Acquire);
        loop {
            if current == RETIRED {
                return false;
            }
            match self.pending.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Send a claimed chunk. On failure the claim is released and the
    /// chunk handed back.
    pub fn send(&self, chunk: WorkChunk) -> Result<(), WorkChunk> {
        let Some(tx) = self.tx.as_ref() else {
            self.release();
            return Err(chunk);
        };
        tx.send(chunk).map_err(|mpsc::SendError(chunk)| {
            self.release();
            chunk
        })
    }

    /// Whether the worker has retired after an idle period.
    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.pending.load(Ordering::Acquire) == RETIRED
    }

    fn release(&self) {
        let _ = self.pending.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        // Disconnect first so the worker exits instead of idling out.
        drop(self.tx.take());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn run(
    index: usize,
    rx: &mpsc::Receiver<WorkChunk>,
    pending: &AtomicUsize,
    context: &WorkerContext,
) {
    loop {
        match rx.recv_timeout(context.idle_timeout) {
            Ok(chunk) => {
                let delivered = process(&chunk, context);
                let _ = pending.fetch_sub(1, Ordering::AcqRel);
                if !delivered {
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if pending
                    .compare_exchange(
                        0,
                        RETIRED,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
                {
                    log::debug!("interval worker {index} retired after idle");
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Solve and deliver one chunk. Returns `false` once the dispatcher is gone.
fn process(chunk: &WorkChunk, context: &WorkerContext) -> bool {
    if context.current_session.load(Ordering::Acquire) != chunk.session.0 {
        log::debug!(
            "skipping {} intervals from stale session {}",
            chunk.items.len(),
            chunk.session.0
        );
        return true;
    }
    let seed = chunk.items.first().map_or(0, |&(k, _)| k as u64);
    let mut rng = StdRng::seed_from_u64(chunk.session.0.rotate_left(32) ^ seed);
    let records = chunk
        .items
        .iter()
        .map(|&(k, interval)| {
            (
                k,
                solve_interval(
                    &interval,
                    &context.policy,
                    context.jitter,
                    &mut rng,
                ),
            )
        })
        .collect();

    context
        .results
        .send(SolvedChunk {
            session: chunk.session,
            records,
        })
        .is_ok()
}

/// Solve one interval into its record.
///
/// Invalid values and degenerate segments degrade to a hidden record
/// instead of failing the dispatch.
pub fn solve_interval(
    interval: &Interval,
    policy: &WidthPolicy,
    jitter: f32,
    rng: &mut impl Rng,
) -> InstanceRecord {
    let width = match policy.width_of(interval.value) {
        Ok(width) => width,
        Err(e) => {
            log::debug!("interval {}: {e}; hiding", interval.id);
            return InstanceRecord::hidden(interval.id);
        }
    };
    match SegmentTransform::solve(interval.start, interval.end, width) {
        Ok(mut transform) => {
            transform.jitter(rng, jitter);
            InstanceRecord::from_transform(&transform, interval.id)
        }
        Err(degenerate) => {
            log::debug!(
                "interval {} is degenerate (length {}); hiding",
                interval.id,
                degenerate.length
            );
            InstanceRecord::hidden(interval.id)
        }
    }
}
