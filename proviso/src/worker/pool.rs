//! Orchestrating side of the worker protocol.
//!
//! Each registered predicate gets its own lane of worker threads, and each worker its
//! own request channel, so distinct predicates never share a channel. Every worker is
//! paired with a collector thread that routes its responses to the pending run with
//! the same run id, enforces the run timeout from the moment the worker starts a run,
//! and notices when the worker goes away.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, warn};

use super::message::{Payload, PredicateId, ResultMessage, RunId, RunMessage, WorkerEvent};
use super::runner::WorkerRunner;
use crate::config::WorkerConfig;
use crate::error::{PoolError, PropertyError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Identity of one incarnation of one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WorkerRef {
    predicate_id: PredicateId,
    slot: usize,
    generation: u64,
}

struct Slot<T> {
    requests: Sender<RunMessage<T>>,
    stop: Arc<AtomicBool>,
    generation: u64,
}

struct Lane<T, O> {
    runner: WorkerRunner<T, O>,
    slots: Vec<Slot<T>>,
    next: usize,
}

struct InFlight<O> {
    worker: WorkerRef,
    completion: Sender<ResultMessage<O>>,
}

/// Snapshot of the pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Runs handed to a worker
    pub dispatched: usize,
    /// Runs answered by their worker
    pub completed: usize,
    /// Runs resolved as timeouts
    pub timeouts: usize,
    /// Runs resolved as worker crashes
    pub crashes: usize,
    /// Responses that arrived after their run was resolved
    pub late_responses: usize,
    /// Workers replaced after a timeout or an unexpected exit
    pub respawns: usize,
}

#[derive(Default)]
struct Counters {
    dispatched: AtomicUsize,
    completed: AtomicUsize,
    timeouts: AtomicUsize,
    crashes: AtomicUsize,
    late_responses: AtomicUsize,
    respawns: AtomicUsize,
}

struct Shared<T, O> {
    config: WorkerConfig,
    this: Weak<Shared<T, O>>,
    lanes: Mutex<HashMap<PredicateId, Lane<T, O>>>,
    in_flight: Mutex<HashMap<RunId, InFlight<O>>>,
    next_run_id: AtomicU64,
    counters: Counters,
}

impl<T, O> Shared<T, O> {
    fn shutdown(&self) {
        let lanes: Vec<_> = lock(&self.lanes).drain().collect();
        for (predicate_id, lane) in &lanes {
            for slot in &lane.slots {
                slot.stop.store(true, Ordering::Release);
            }
            debug!(%predicate_id, "stopping workers");
        }
        // Dropping the lanes closes the request channels
        drop(lanes);

        let outstanding: Vec<_> = lock(&self.in_flight).drain().collect();
        for (run_id, entry) in outstanding {
            self.counters.crashes.fetch_add(1, Ordering::Relaxed);
            let _ = entry.completion.send(ResultMessage::new(
                run_id,
                Err(PropertyError::WorkerCrash {
                    run_id,
                    reason: "pool shut down".to_string(),
                }),
            ));
        }
    }
}

impl<T, O> Shared<T, O>
where
    T: Send + 'static,
    O: Send + 'static,
{
    /// Start one worker thread and its collector
    fn spawn_worker(&self, runner: &WorkerRunner<T, O>, worker: WorkerRef) -> Result<Slot<T>, PoolError> {
        let (request_tx, request_rx) = channel::unbounded::<RunMessage<T>>();
        let (event_tx, event_rx) = channel::unbounded::<WorkerEvent<O>>();
        let stop = Arc::new(AtomicBool::new(false));

        let worker_runner = runner.clone();
        let worker_stop = Arc::clone(&stop);
        thread::Builder::new()
            .name(format!(
                "proviso-worker-{}-{}",
                worker.predicate_id, worker.slot
            ))
            .spawn(move || worker_runner.serve(&request_rx, &event_tx, &worker_stop))?;

        let shared = self.this.clone();
        let run_timeout = self.config.run_timeout;
        thread::Builder::new()
            .name(format!(
                "proviso-collector-{}-{}",
                worker.predicate_id, worker.slot
            ))
            .spawn(move || collect(shared, worker, event_rx, run_timeout))?;

        debug!(
            predicate_id = %worker.predicate_id,
            slot = worker.slot,
            generation = worker.generation,
            "worker started"
        );
        Ok(Slot {
            requests: request_tx,
            stop,
            generation: worker.generation,
        })
    }

    /// Replace the worker in `slot`, abandoning the current one
    fn respawn(&self, lane: &mut Lane<T, O>, worker: WorkerRef) -> Result<WorkerRef, PoolError> {
        let replacement = WorkerRef {
            generation: worker.generation + 1,
            ..worker
        };
        let slot = self.spawn_worker(&lane.runner, replacement)?;
        let old = std::mem::replace(&mut lane.slots[worker.slot], slot);
        old.stop.store(true, Ordering::Release);
        self.counters.respawns.fetch_add(1, Ordering::Relaxed);
        Ok(replacement)
    }

    /// Route a worker response to its pending run
    fn complete(&self, response: ResultMessage<O>) {
        let entry = lock(&self.in_flight).remove(&response.run_id);
        match entry {
            Some(entry) => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                // The pending run may have been dropped; nobody is waiting then
                let _ = entry.completion.send(response);
            }
            None => {
                self.counters.late_responses.fetch_add(1, Ordering::Relaxed);
                warn!(run_id = %response.run_id, "discarding late response");
            }
        }
    }

    /// Resolve every in-flight run of `worker` as a crash
    fn fail_runs_of(
        &self,
        in_flight: &mut HashMap<RunId, InFlight<O>>,
        worker: WorkerRef,
        reason: &str,
    ) {
        let run_ids: Vec<RunId> = in_flight
            .iter()
            .filter(|(_, entry)| entry.worker == worker)
            .map(|(run_id, _)| *run_id)
            .collect();
        for run_id in run_ids {
            if let Some(entry) = in_flight.remove(&run_id) {
                self.counters.crashes.fetch_add(1, Ordering::Relaxed);
                warn!(%run_id, predicate_id = %worker.predicate_id, reason, "run lost with its worker");
                let _ = entry.completion.send(ResultMessage::new(
                    run_id,
                    Err(PropertyError::WorkerCrash {
                        run_id,
                        reason: reason.to_string(),
                    }),
                ));
            }
        }
    }

    /// Resolve a run that exceeded its allotted duration and recycle its worker
    ///
    /// Runs queued behind it on the same worker are resolved as crashes.
    fn expire(&self, run_id: RunId, elapsed: Duration) {
        let mut lanes = lock(&self.lanes);
        let mut in_flight = lock(&self.in_flight);
        let Some(entry) = in_flight.remove(&run_id) else {
            return;
        };
        self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
        let worker = entry.worker;
        warn!(%run_id, predicate_id = %worker.predicate_id, ?elapsed, "run timed out, recycling its worker");
        let _ = entry.completion.send(ResultMessage::new(
            run_id,
            Err(PropertyError::Timeout { run_id, elapsed }),
        ));

        // The worker may stay busy forever; everything queued behind the run is lost
        self.fail_runs_of(&mut in_flight, worker, "worker recycled after a timeout");
        drop(in_flight);

        let Some(lane) = lanes.get_mut(&worker.predicate_id) else {
            return;
        };
        if lane.slots[worker.slot].generation != worker.generation {
            return;
        }
        if let Err(err) = self.respawn(lane, worker) {
            error!(predicate_id = %worker.predicate_id, error = %err, "failed to recycle worker");
        }
    }

    /// Called by a collector once its worker thread has gone away
    fn worker_exited(&self, worker: WorkerRef) {
        let mut lanes = lock(&self.lanes);
        let mut in_flight = lock(&self.in_flight);
        self.fail_runs_of(&mut in_flight, worker, "worker terminated unexpectedly");
        drop(in_flight);

        let Some(lane) = lanes.get_mut(&worker.predicate_id) else {
            return;
        };
        if lane.slots[worker.slot].generation != worker.generation {
            // Already replaced
            return;
        }
        warn!(
            predicate_id = %worker.predicate_id,
            slot = worker.slot,
            "worker exited unexpectedly, respawning"
        );
        if let Err(err) = self.respawn(lane, worker) {
            error!(predicate_id = %worker.predicate_id, error = %err, "failed to respawn worker");
        }
    }
}

/// Collector loop of one worker
///
/// At most one run executes on a worker at a time, so a single deadline is tracked: it
/// is armed by [`WorkerEvent::Started`] and cleared by [`WorkerEvent::Finished`].
fn collect<T, O>(
    shared: Weak<Shared<T, O>>,
    worker: WorkerRef,
    events: Receiver<WorkerEvent<O>>,
    run_timeout: Duration,
) where
    T: Send + 'static,
    O: Send + 'static,
{
    let mut running: Option<(RunId, Instant)> = None;
    loop {
        let event = match running {
            Some((_, started)) => {
                let deadline = started + run_timeout;
                events.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
            None => events.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        let Some(pool) = shared.upgrade() else {
            return;
        };
        match event {
            Ok(WorkerEvent::Started { run_id, at }) => running = Some((run_id, at)),
            Ok(WorkerEvent::Finished(response)) => {
                running = None;
                pool.complete(response);
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Some((run_id, started)) = running.take() {
                    pool.expire(run_id, started.elapsed());
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                pool.worker_exited(worker);
                return;
            }
        }
    }
}

/// A dispatched run awaiting its result
///
/// The pool resolves every dispatched run exactly once: with the worker's response, as
/// a [`PropertyError::Timeout`] once the run has executed longer than the pool's run
/// timeout, or as a [`PropertyError::WorkerCrash`]. Time spent queued behind other runs
/// does not count against the timeout.
#[must_use = "a pending run does nothing unless waited on"]
pub struct PendingRun<O> {
    run_id: RunId,
    receiver: Receiver<ResultMessage<O>>,
}

impl<O> PendingRun<O> {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Result if it already arrived
    pub fn try_wait(&self) -> Option<ResultMessage<O>> {
        self.receiver.try_recv().ok()
    }

    /// Block until the run resolves
    pub fn wait(self) -> ResultMessage<O> {
        self.receiver.recv().unwrap_or_else(|_| self.lost())
    }

    /// Block for at most `timeout`; the run stays pending if it has not resolved by then
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ResultMessage<O>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(response) => Some(response),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.lost()),
        }
    }

    fn lost(&self) -> ResultMessage<O> {
        ResultMessage::new(
            self.run_id,
            Err(PropertyError::WorkerCrash {
                run_id: self.run_id,
                reason: "result channel closed".to_string(),
            }),
        )
    }
}

/// Dispatches runs to isolated workers and resolves them as results, timeouts or crashes
///
/// Each worker executes one run at a time; runs for the same predicate are spread
/// round-robin over the lane's workers, so independent runs overlap. Responses may
/// arrive in any order, each is matched to its pending run by run id.
pub struct WorkerPool<T, O> {
    shared: Arc<Shared<T, O>>,
}

impl<T, O> WorkerPool<T, O>
where
    T: Send + 'static,
    O: Send + 'static,
{
    /// Create an empty pool
    pub fn new(config: WorkerConfig) -> Result<Self, PoolError> {
        config.validate()?;
        let shared = Arc::new_cyclic(|this| Shared {
            config,
            this: this.clone(),
            lanes: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            next_run_id: AtomicU64::new(1),
            counters: Counters::default(),
        });
        Ok(Self { shared })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.shared.config
    }

    /// Start a lane of workers for the runner's predicate
    pub fn register(&self, runner: WorkerRunner<T, O>) -> Result<(), PoolError> {
        let predicate_id = runner.predicate_id();
        let mut lanes = lock(&self.shared.lanes);
        if lanes.contains_key(&predicate_id) {
            return Err(PoolError::DuplicatePredicate(predicate_id));
        }

        let slots = (0..self.shared.config.workers_per_predicate)
            .map(|slot| {
                self.shared.spawn_worker(
                    &runner,
                    WorkerRef {
                        predicate_id,
                        slot,
                        generation: 0,
                    },
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        info!(%predicate_id, workers = slots.len(), "registered predicate");
        lanes.insert(
            predicate_id,
            Lane {
                runner,
                slots,
                next: 0,
            },
        );
        Ok(())
    }

    /// Whether a lane exists for `predicate_id`
    pub fn is_registered(&self, predicate_id: PredicateId) -> bool {
        lock(&self.shared.lanes).contains_key(&predicate_id)
    }

    /// A run id never handed out by this pool before
    pub fn next_run_id(&self) -> RunId {
        RunId(self.shared.next_run_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Send a run to a worker of `predicate_id`
    ///
    /// Fails if the predicate is unknown or `run_id` is still in flight.
    pub fn dispatch(
        &self,
        predicate_id: PredicateId,
        run_id: RunId,
        payload: Payload<T>,
    ) -> Result<PendingRun<O>, PoolError> {
        let mut lanes = lock(&self.shared.lanes);
        let lane = lanes
            .get_mut(&predicate_id)
            .ok_or(PoolError::UnknownPredicate(predicate_id))?;
        let (completion, receiver) = channel::bounded(1);

        let slot = lane.next % lane.slots.len();
        lane.next = lane.next.wrapping_add(1);
        let mut worker = WorkerRef {
            predicate_id,
            slot,
            generation: lane.slots[slot].generation,
        };

        {
            let mut in_flight = lock(&self.shared.in_flight);
            if in_flight.contains_key(&run_id) {
                return Err(PoolError::DuplicateRunId(run_id));
            }
            in_flight.insert(run_id, InFlight { worker, completion });
        }

        let message = RunMessage::new(predicate_id, run_id, payload);
        if let Err(channel::SendError(message)) = lane.slots[slot].requests.send(message) {
            // The worker died and its collector has not replaced it yet
            warn!(%predicate_id, slot, "worker channel closed, respawning before dispatch");
            let resent = match self.shared.respawn(lane, worker) {
                Ok(replacement) => {
                    worker = replacement;
                    if let Some(entry) = lock(&self.shared.in_flight).get_mut(&run_id) {
                        entry.worker = replacement;
                    }
                    lane.slots[slot].requests.send(message).is_ok()
                }
                Err(err) => {
                    error!(%predicate_id, error = %err, "failed to respawn worker");
                    false
                }
            };
            if !resent {
                lock(&self.shared.in_flight).remove(&run_id);
                return Err(PoolError::Disconnected(predicate_id));
            }
        }

        self.shared.counters.dispatched.fetch_add(1, Ordering::Relaxed);
        debug!(%predicate_id, %run_id, slot = worker.slot, "dispatched run");
        Ok(PendingRun { run_id, receiver })
    }

    /// Dispatch a run and wait for its result
    pub fn execute(
        &self,
        predicate_id: PredicateId,
        payload: Payload<T>,
    ) -> Result<ResultMessage<O>, PoolError> {
        let run_id = self.next_run_id();
        Ok(self.dispatch(predicate_id, run_id, payload)?.wait())
    }

    /// Abandon every worker of `predicate_id` and start fresh ones
    ///
    /// Runs in flight on the abandoned workers resolve as crashes.
    pub fn recycle(&self, predicate_id: PredicateId) -> Result<(), PoolError> {
        let mut lanes = lock(&self.shared.lanes);
        let lane = lanes
            .get_mut(&predicate_id)
            .ok_or(PoolError::UnknownPredicate(predicate_id))?;
        for slot in 0..lane.slots.len() {
            let worker = WorkerRef {
                predicate_id,
                slot,
                generation: lane.slots[slot].generation,
            };
            self.shared
                .fail_runs_of(&mut lock(&self.shared.in_flight), worker, "worker recycled");
            self.shared.respawn(lane, worker)?;
        }
        info!(%predicate_id, "recycled workers");
        Ok(())
    }

    /// Counter snapshot
    pub fn stats(&self) -> PoolStats {
        let counters = &self.shared.counters;
        PoolStats {
            dispatched: counters.dispatched.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            timeouts: counters.timeouts.load(Ordering::Relaxed),
            crashes: counters.crashes.load(Ordering::Relaxed),
            late_responses: counters.late_responses.load(Ordering::Relaxed),
            respawns: counters.respawns.load(Ordering::Relaxed),
        }
    }

    /// Number of runs dispatched but not resolved yet
    pub fn in_flight(&self) -> usize {
        lock(&self.shared.in_flight).len()
    }

    /// Stop every worker and resolve outstanding runs as crashes
    ///
    /// Workers finish the run they are executing, if any, and then exit.
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }
}

impl<T, O> Drop for WorkerPool<T, O> {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}
