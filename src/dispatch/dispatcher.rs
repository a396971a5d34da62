use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use web_time::Instant;

use super::worker::{SolvedChunk, WorkChunk, WorkerContext, WorkerHandle};
use super::SessionId;
use crate::data::Interval;
use crate::error::DrillscopeError;
use crate::geometry::WidthPolicy;
use crate::instance::InstanceAttributeBuffer;
use crate::options::{DispatchOptions, Options};

/// Outcome of polling a [`Dispatcher`].
#[derive(Debug)]
pub enum DispatchStatus {
    /// No session in flight.
    Idle,
    /// A session is accumulating results.
    Pending {
        /// Session being filled.
        session: SessionId,
        /// Records written so far.
        completed: usize,
        /// Records expected.
        total: usize,
    },
    /// Every record of the session has been written. Reported once.
    Complete {
        /// Session that finished.
        session: SessionId,
        /// The fully populated buffer.
        buffer: InstanceAttributeBuffer,
    },
}

/// The session currently being filled.
struct ActiveSession {
    id: SessionId,
    buffer: InstanceAttributeBuffer,
    completed: usize,
    started: Instant,
}

/// Owns the worker pool and the current dispatch session.
pub struct Dispatcher {
    options: DispatchOptions,
    policy: WidthPolicy,
    jitter: f32,
    workers: Vec<Option<WorkerHandle>>,
    results_tx: mpsc::Sender<SolvedChunk>,
    results_rx: mpsc::Receiver<SolvedChunk>,
    current_session: Arc<AtomicU64>,
    next_session: u64,
    session: Option<ActiveSession>,
}

impl Dispatcher {
    /// Dispatcher configured from the top-level options.
    ///
    /// Workers are spawned lazily by the first dispatch.
    #[must_use]
    pub fn new(options: &Options) -> Self {
        Self::with_settings(
            options.dispatch.clone(),
            WidthPolicy {
                min_width: options.geometry.min_width,
                max_width: options.geometry.max_width,
            },
            options.geometry.jitter(),
        )
    }

    /// Dispatcher with explicit pool, width policy and jitter settings.
    #[must_use]
    pub fn with_settings(
        options: DispatchOptions,
        policy: WidthPolicy,
        jitter: f32,
    ) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        Self {
            options,
            policy,
            jitter,
            workers: Vec::new(),
            results_tx,
            results_rx,
            current_session: Arc::new(AtomicU64::new(0)),
            next_session: 0,
            session: None,
        }
    }

    /// Start a session for `intervals`, superseding any session in flight.
    ///
    /// Interval `k` is sent to worker `k % worker_count`. Retired workers
    /// are respawned on demand.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::ThreadSpawn`] if a worker thread cannot be
    /// started.
    pub fn dispatch(
        &mut self,
        intervals: &[Interval],
    ) -> Result<SessionId, DrillscopeError> {
        self.next_session += 1;
        let id = SessionId(self.next_session);
        self.current_session.store(id.0, Ordering::Release);
        if let Some(stale) = self.session.take() {
            log::debug!(
                "session {} superseded at {}/{} records",
                stale.id.0,
                stale.completed,
                stale.buffer.capacity()
            );
        }
        self.session = Some(ActiveSession {
            id,
            buffer: InstanceAttributeBuffer::new(intervals.len()),
            completed: 0,
            started: Instant::now(),
        });

        if let Err(e) = self.send_session(id, intervals) {
            self.abandon_session();
            return Err(e);
        }
        Ok(id)
    }

    fn send_session(
        &mut self,
        id: SessionId,
        intervals: &[Interval],
    ) -> Result<(), DrillscopeError> {
        let worker_count = self.options.workers();
        let chunk_size = self.options.chunk_size();
        self.workers.resize_with(worker_count, || None);

        let mut pending: Vec<Vec<(usize, Interval)>> =
            vec![Vec::new(); worker_count];
        for (k, interval) in intervals.iter().enumerate() {
            let w = k % worker_count;
            pending[w].push((k, *interval));
            if pending[w].len() == chunk_size {
                let items = std::mem::take(&mut pending[w]);
                self.send_chunk(w, WorkChunk { session: id, items })?;
            }
        }
        for (w, items) in pending.into_iter().enumerate() {
            if !items.is_empty() {
                self.send_chunk(w, WorkChunk { session: id, items })?;
            }
        }

        log::debug!(
            "session {} dispatched {} intervals across {worker_count} workers",
            id.0,
            intervals.len()
        );
        Ok(())
    }

    /// Drop the session in flight and retag the pool so chunks already
    /// queued for it are skipped.
    fn abandon_session(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.next_session += 1;
        self.current_session
            .store(self.next_session, Ordering::Release);
        log::warn!(
            "session {} abandoned at {}/{} records",
            session.id.0,
            session.completed,
            session.buffer.capacity()
        );
    }

    /// Drain finished chunks without blocking.
    pub fn poll(&mut self) -> DispatchStatus {
        while let Ok(solved) = self.results_rx.try_recv() {
            self.accept(solved);
        }
        self.status()
    }

    /// Block until the current session completes or `timeout` elapses.
    pub fn wait(&mut self, timeout: Duration) -> DispatchStatus {
        let deadline = Instant::now() + timeout;
        loop {
            match self.poll() {
                DispatchStatus::Pending { .. } => {}
                done => return done,
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return self.status();
            }
            match self.results_rx.recv_timeout(remaining) {
                Ok(solved) => self.accept(solved),
                Err(mpsc::RecvTimeoutError::Timeout) => return self.poll(),
                // Unreachable while `results_tx` is held; treat as timeout.
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return self.status();
                }
            }
        }
    }

    /// Session currently being filled.
    #[must_use]
    pub fn current_session(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// `(completed, total)` of the session in flight.
    #[must_use]
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.session
            .as_ref()
            .map(|s| (s.completed, s.buffer.capacity()))
    }

    /// Workers spawned and not yet retired.
    #[must_use]
    pub fn live_workers(&self) -> usize {
        self.workers
            .iter()
            .flatten()
            .filter(|w| !w.is_retired())
            .count()
    }

    /// Stop and join every worker. The next dispatch respawns the pool.
    pub fn shutdown(&mut self) {
        self.workers.clear();
    }

    fn send_chunk(
        &mut self,
        w: usize,
        mut chunk: WorkChunk,
    ) -> Result<(), DrillscopeError> {
        for _ in 0..2 {
            if let Some(handle) =
                self.workers[w].as_ref().filter(|h| h.try_claim())
            {
                match handle.send(chunk) {
                    Ok(()) => return Ok(()),
                    Err(returned) => chunk = returned,
                }
            }
            self.respawn(w)?;
        }
        Err(DrillscopeError::ThreadSpawn(std::io::Error::other(format!(
            "interval worker {w} rejected work after respawn"
        ))))
    }

    fn respawn(&mut self, w: usize) -> Result<(), DrillscopeError> {
        if let Some(old) = self.workers[w].take() {
            log::debug!("respawning interval worker {w}");
            drop(old);
        }
        let context = WorkerContext {
            results: self.results_tx.clone(),
            current_session: Arc::clone(&self.current_session),
            policy: self.policy,
            jitter: self.jitter,
            idle_timeout: self.options.idle_timeout(),
        };
        let handle = WorkerHandle::spawn(w, context)
            .map_err(DrillscopeError::ThreadSpawn)?;
        self.workers[w] = Some(handle);
        Ok(())
    }

    fn accept(&mut self, solved: SolvedChunk) {
        let Some(session) =
            self.session.as_mut().filter(|s| s.id == solved.session)
        else {
            log::debug!(
                "dropping {} results from stale session {}",
                solved.records.len(),
                solved.session.0
            );
            return;
        };
        for (index, record) in &solved.records {
            if session.buffer.write(*index, record).is_ok() {
                session.completed += 1;
            }
        }
    }

    fn status(&mut self) -> DispatchStatus {
        let Some(session) = self.session.as_ref() else {
            return DispatchStatus::Idle;
        };
        if session.completed < session.buffer.capacity() {
            return DispatchStatus::Pending {
                session: session.id,
                completed: session.completed,
                total: session.buffer.capacity(),
            };
        }
        let Some(session) = self.session.take() else {
            return DispatchStatus::Idle;
        };
        let hidden = session.buffer.hidden_count();
        if hidden > 0 {
            log::warn!(
                "session {}: {hidden} of {} intervals hidden (degenerate or \
                 invalid)",
                session.id.0,
                session.buffer.capacity()
            );
        }
        log::info!(
            "session {} complete: {} instances in {:.1?}",
            session.id.0,
            session.buffer.capacity(),
            session.started.elapsed()
        );
        DispatchStatus::Complete {
            session: session.id,
            buffer: session.buffer,
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::instance::{decode_pick_color, RenderFlag};

    const WAIT: Duration = Duration::from_secs(20);

    fn dispatcher(workers: usize, chunk_size: usize) -> Dispatcher {
        Dispatcher::with_settings(
            DispatchOptions {
                worker_count: workers,
                idle_timeout_ms: 5_000,
                chunk_size,
            },
            WidthPolicy::default(),
            0.0,
        )
    }

    fn intervals(n: usize, id_base: u32, value: f32) -> Vec<Interval> {
        (0..n)
            .map(|k| {
                let x = k as f32;
                Interval::new(
                    [x, 0.0, 0.0],
                    [x, 0.0, 1.0 + x * 0.01],
                    value,
                    id_base + k as u32,
                )
            })
            .collect()
    }

    fn expect_complete(status: DispatchStatus) -> (SessionId, InstanceAttributeBuffer) {
        match status {
            DispatchStatus::Complete { session, buffer } => (session, buffer),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    fn pick_id(buffer: &InstanceAttributeBuffer, k: usize) -> Option<u32> {
        let color = buffer.pick_ids()[k];
        decode_pick_color(color.map(|c| (c * 255.0).round() as u8))
    }

    #[test]
    fn end_to_end_single_interval() {
        let mut d = dispatcher(2, 16);
        let input =
            [Interval::new([0.0, 0.0, 0.0], [0.0, 0.0, 10.0], 9.0, 0)];
        let _ = d.dispatch(&input).unwrap();
        let (_, buffer) = expect_complete(d.wait(WAIT));
        let record = buffer.record(0).unwrap();
        assert_eq!(record.height, 10.0);
        assert!((record.width - 2.0).abs() < 1e-5);
        assert_eq!(record.dynamic_bits.raw(), 0.0);
        let axis = crate::geometry::transform::rotate_packed(
            glam::Vec4::from_array(record.orientation),
            Vec3::Y,
        );
        assert!((axis - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn partition_is_complete_for_all_shapes() {
        for workers in [1, 2, 3, 7] {
            for n in [0, 1, 5, 64, 257] {
                let mut d = dispatcher(workers, 10);
                let input = intervals(n, 0, 1.0);
                let _ = d.dispatch(&input).unwrap();
                let (_, buffer) = expect_complete(d.wait(WAIT));
                assert_eq!(buffer.capacity(), n);
                assert_eq!(buffer.written_count(), n);
                for k in 0..n {
                    assert_eq!(pick_id(&buffer, k), Some(k as u32));
                    let expected = input[k].length();
                    assert!((buffer.extents()[k][0] - expected).abs() < 1e-4);
                }
            }
        }
    }

    #[test]
    fn completion_reported_once() {
        let mut d = dispatcher(2, 4);
        let _ = d.dispatch(&intervals(9, 0, 2.0)).unwrap();
        let _ = expect_complete(d.wait(WAIT));
        assert!(matches!(d.poll(), DispatchStatus::Idle));
        assert!(d.current_session().is_none());
    }

    #[test]
    fn empty_dispatch_completes_immediately() {
        let mut d = dispatcher(3, 4);
        let id = d.dispatch(&[]).unwrap();
        let (session, buffer) = expect_complete(d.poll());
        assert_eq!(session, id);
        assert!(buffer.is_empty());
    }

    #[test]
    fn stale_session_results_are_discarded() {
        let mut d = dispatcher(4, 8);
        let first = intervals(20_000, 0, 1.0);
        let second = intervals(37, 1_000_000, 500.0);
        let one = d.dispatch(&first).unwrap();
        let two = d.dispatch(&second).unwrap();
        assert!(two > one);

        let (session, buffer) = expect_complete(d.wait(WAIT));
        assert_eq!(session, two);
        assert_eq!(buffer.capacity(), second.len());
        for k in 0..second.len() {
            assert_eq!(pick_id(&buffer, k), Some(1_000_000 + k as u32));
            assert!(!buffer.dynamic_bits(k).unwrap().has(RenderFlag::ForceHidden));
        }
        // Late session-1 chunks must not resurrect anything.
        std::thread::sleep(Duration::from_millis(50));
        assert!(matches!(d.poll(), DispatchStatus::Idle));
    }

    #[test]
    fn abandoned_session_goes_idle() {
        let mut d = dispatcher(2, 8);
        let abandoned = d.dispatch(&intervals(20_000, 0, 1.0)).unwrap();
        d.abandon_session();
        assert!(d.current_session().is_none());
        assert!(matches!(d.poll(), DispatchStatus::Idle));
        std::thread::sleep(Duration::from_millis(50));
        assert!(matches!(d.poll(), DispatchStatus::Idle));

        let next = d.dispatch(&intervals(5, 100, 1.0)).unwrap();
        assert!(next.get() > abandoned.get() + 1);
        let (session, buffer) = expect_complete(d.wait(WAIT));
        assert_eq!(session, next);
        assert_eq!(pick_id(&buffer, 4), Some(104));
    }

    #[test]
    fn degenerate_intervals_do_not_stall_completion() {
        let mut d = dispatcher(2, 2);
        let mut input = intervals(6, 0, 1.0);
        input[3].end = input[3].start;
        input[4].value = -1.0;
        let _ = d.dispatch(&input).unwrap();
        let (_, buffer) = expect_complete(d.wait(WAIT));
        assert_eq!(buffer.written_count(), 6);
        assert_eq!(buffer.hidden_count(), 2);
        assert!(buffer.record(3).unwrap().is_hidden());
        assert!(buffer.record(4).unwrap().is_hidden());
    }

    #[test]
    fn idle_workers_retire_and_respawn() {
        let mut d = Dispatcher::with_settings(
            DispatchOptions {
                worker_count: 3,
                idle_timeout_ms: 10,
                chunk_size: 4,
            },
            WidthPolicy::default(),
            0.0,
        );
        let _ = d.dispatch(&intervals(12, 0, 1.0)).unwrap();
        let _ = expect_complete(d.wait(WAIT));

        let deadline = Instant::now() + Duration::from_secs(5);
        while d.live_workers() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(d.live_workers(), 0);

        let _ = d.dispatch(&intervals(12, 0, 1.0)).unwrap();
        let (_, buffer) = expect_complete(d.wait(WAIT));
        assert_eq!(buffer.written_count(), 12);
    }

    /// Dispatch repeatedly right around the idle deadline so claims race
    /// retirement; no chunk may be lost.
    #[test]
    fn retirement_never_loses_work() {
        let mut d = Dispatcher::with_settings(
            DispatchOptions {
                worker_count: 2,
                idle_timeout_ms: 1,
                chunk_size: 3,
            },
            WidthPolicy::default(),
            0.0,
        );
        for round in 0..50 {
            let _ = d.dispatch(&intervals(7, 0, 1.0)).unwrap();
            let (_, buffer) = expect_complete(d.wait(WAIT));
            assert_eq!(buffer.written_count(), 7, "round {round}");
            std::thread::sleep(Duration::from_micros(500 + round * 20));
        }
    }

    #[test]
    fn independent_dispatchers_coexist() {
        let mut a = dispatcher(2, 8);
        let mut b = dispatcher(2, 8);
        let _ = a.dispatch(&intervals(30, 0, 1.0)).unwrap();
        let _ = b.dispatch(&intervals(40, 500, 1.0)).unwrap();
        let (_, buf_b) = expect_complete(b.wait(WAIT));
        let (_, buf_a) = expect_complete(a.wait(WAIT));
        assert_eq!(buf_a.capacity(), 30);
        assert_eq!(buf_b.capacity(), 40);
        assert_eq!(pick_id(&buf_b, 0), Some(500));
    }
}
