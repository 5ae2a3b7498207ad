//! Runtime supervisor.
//!
//! Every run request spawns one worker thread owning a detached copy of the
//! stored procedure. The supervisor caps concurrency, tracks live workers
//! behind a single mutex and reclaims them on completion or cancellation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use proc_asm::Procedure;
use tracing::{debug, warn};

use crate::analyze::analyze;
use crate::config::RuntimeConfig;
use crate::consts::STOP_ALL_ITERATION_LIMIT;
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::param::ParamSpace;
use crate::store::ProcStore;

/// Cooperative cancellation flag shared between a worker and its supervisor.
///
/// Observed at every instruction boundary and at each blocking-guard poll,
/// the natural cancellation points of a procedure.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Ask the worker to stop at its next cancellation point.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Identifier of one worker run.
pub type RunId = u64;

#[derive(Debug)]
struct Worker {
    id: RunId,
    slot: u8,
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

// Completed run outcomes kept for `wait`; old entries age out.
const FINISHED_BACKLOG: usize = 32;

// Non-tail call chains recurse on the worker stack; sized so the recursion
// depth bound fits with room to spare.
const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Spawns, tracks and reclaims procedure workers.
#[derive(Debug)]
pub struct Runtime<P> {
    store: Arc<ProcStore>,
    params: Arc<P>,
    config: RuntimeConfig,
    workers: Mutex<Vec<Worker>>,
    finished: Mutex<VecDeque<(RunId, Result<(), RuntimeError>)>>,
    next_id: AtomicU64,
}

impl<P: ParamSpace + 'static> Runtime<P> {
    /// Supervisor over a slot store and a parameter space.
    pub fn new(store: Arc<ProcStore>, params: Arc<P>, config: RuntimeConfig) -> Arc<Self> {
        Arc::new(Self {
            store,
            params,
            config,
            workers: Mutex::new(Vec::new()),
            finished: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(0),
        })
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<Worker>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_finished(&self) -> MutexGuard<'_, VecDeque<(RunId, Result<(), RuntimeError>)>> {
        self.finished.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live workers.
    pub fn live_workers(&self) -> usize {
        self.lock_workers().len()
    }

    /// `(id, slot)` of every live worker.
    pub fn workers(&self) -> Vec<(RunId, u8)> {
        self.lock_workers().iter().map(|w| (w.id, w.slot)).collect()
    }

    /// Execute the procedure stored in `slot` on a fresh worker.
    ///
    /// The worker runs a detached copy; deleting or overwriting the slot
    /// afterwards can't reach the running procedure. The worker list lock is
    /// taken before the spawn so the worker can't race its own cleanup
    /// against insertion.
    pub fn run(self: &Arc<Self>, slot: u8) -> Result<RunId, RuntimeError> {
        debug!(slot, "run request");
        let proc = self.store.get(slot).ok_or(RuntimeError::SlotEmpty(slot))?;

        let mut workers = self.lock_workers();
        if workers.len() >= self.config.max_concurrent {
            warn!(slot, "maximum number of concurrent procedures reached");
            return Err(RuntimeError::WorkerCapReached);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancelToken::default();
        let runtime = Arc::clone(self);
        let token = cancel.clone();
        let handle = thread::Builder::new()
            .name(format!("proc-worker-{id}"))
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || runtime.worker(id, proc, token))?;

        workers.push(Worker {
            id,
            slot,
            cancel,
            handle,
        });
        Ok(id)
    }

    fn worker(self: Arc<Self>, id: RunId, proc: Procedure, cancel: CancelToken) {
        let result = analyze(proc, &self.store).and_then(|graph| {
            Interpreter::new(&graph, self.params.as_ref(), &self.config, &cancel).run()
        });

        match &result {
            Ok(()) => debug!(id, "procedure finished"),
            Err(e) => warn!(id, error = %e, "procedure failed"),
        }

        {
            let mut finished = self.lock_finished();
            if finished.len() >= FINISHED_BACKLOG {
                finished.pop_front();
            }
            finished.push_back((id, result));
        }

        let mut workers = self.lock_workers();
        if let Some(pos) = workers.iter().position(|w| w.id == id) {
            workers.remove(pos);
        }
    }

    /// Outcome of a recent run, waiting up to `timeout` for it to finish.
    ///
    /// Returns `None` when the run neither finished in time nor is known to
    /// the backlog any more.
    pub fn wait(&self, id: RunId, timeout: Duration) -> Option<Result<(), RuntimeError>> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut finished = self.lock_finished();
                if let Some(pos) = finished.iter().position(|(fid, _)| *fid == id) {
                    return finished.remove(pos).map(|(_, result)| result);
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Cancel one worker and reclaim its resources.
    pub fn stop(&self, id: RunId) {
        let worker = {
            let mut workers = self.lock_workers();
            workers
                .iter()
                .position(|w| w.id == id)
                .map(|pos| workers.remove(pos))
        };
        if let Some(worker) = worker {
            worker.cancel.cancel();
            let _ = worker.handle.join();
            debug!(id, "worker stopped");
        }
    }

    /// Cancel every live worker. The teardown loop is bounded so a
    /// misbehaving worker can't turn shutdown into a livelock.
    pub fn stop_all(&self) {
        for _ in 0..STOP_ALL_ITERATION_LIMIT {
            let worker = {
                let mut workers = self.lock_workers();
                if workers.is_empty() {
                    return;
                }
                workers.remove(0)
            };
            worker.cancel.cancel();
            let _ = worker.handle.join();
        }
    }
}
