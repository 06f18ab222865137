//! Isolated side of the worker protocol.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam::channel::{Receiver, Sender};
use tracing::{debug, trace};

use super::message::{
    GenerationState, Payload, PredicateId, ResultMessage, RunMessage, WorkerEvent,
};
use crate::arbitrary::{Arbitrary, Value, replay};
use crate::error::PropertyError;
use crate::property::{Property, guarded_test};

type SharedProperty<T, O> = Arc<dyn Property<T, Output = O> + Send + Sync>;
type Rebuild<T> = Arc<dyn Fn(&GenerationState) -> Result<T, PropertyError> + Send + Sync>;

/// Executes one predicate for every message addressed to its predicate id
///
/// State payloads are turned back into inputs by the rebuild function, which must
/// reproduce what the orchestrator generated. The rebuild runs outside the guarded
/// scope: if it panics, the worker dies and the run is reported as a crash rather
/// than as a predicate failure.
pub struct WorkerRunner<T, O> {
    predicate_id: PredicateId,
    property: SharedProperty<T, O>,
    rebuild: Rebuild<T>,
}

impl<T, O> Clone for WorkerRunner<T, O> {
    fn clone(&self) -> Self {
        Self {
            predicate_id: self.predicate_id,
            property: Arc::clone(&self.property),
            rebuild: Arc::clone(&self.rebuild),
        }
    }
}

impl<T, O> fmt::Debug for WorkerRunner<T, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRunner")
            .field("predicate_id", &self.predicate_id)
            .finish_non_exhaustive()
    }
}

impl<T: 'static, O: 'static> WorkerRunner<T, O> {
    /// Create a runner with an explicit input reconstruction function
    pub fn new<P, F>(predicate_id: PredicateId, property: P, rebuild: F) -> Self
    where
        P: Property<T, Output = O> + Send + Sync + 'static,
        F: Fn(&GenerationState) -> Result<T, PropertyError> + Send + Sync + 'static,
    {
        Self {
            predicate_id,
            property: Arc::new(property),
            rebuild: Arc::new(rebuild),
        }
    }

    /// Create a runner that rebuilds inputs by replaying `arbitrary`
    pub fn for_arbitrary<A, P>(predicate_id: PredicateId, arbitrary: A, property: P) -> Self
    where
        A: Arbitrary<T> + Send + Sync + 'static,
        P: Property<T, Output = O> + Send + Sync + 'static,
    {
        Self::new(predicate_id, property, move |state: &GenerationState| {
            replay(&arbitrary, state).map(Value::into_inner)
        })
    }

    pub fn predicate_id(&self) -> PredicateId {
        self.predicate_id
    }

    /// Whether a message is addressed to this runner
    pub fn accepts(&self, message: &RunMessage<T>) -> bool {
        message.predicate_id == self.predicate_id
    }

    /// Execute one run
    ///
    /// Returns `None` for messages addressed to another predicate; those are ignored,
    /// not answered with an error.
    pub fn handle(&self, message: RunMessage<T>) -> Option<ResultMessage<O>> {
        if !self.accepts(&message) {
            trace!(
                predicate_id = %message.predicate_id,
                registered = %self.predicate_id,
                "ignoring message for another predicate"
            );
            return None;
        }

        let run_id = message.run_id;
        let input = match message.payload {
            Payload::Main { value } => Ok(value),
            Payload::State(state) => (self.rebuild)(&state),
        };
        let outcome = input.and_then(|input| guarded_test(self.property.as_ref(), input));
        debug!(%run_id, success = outcome.is_ok(), "run finished");
        Some(ResultMessage::new(run_id, outcome))
    }

    /// Serve requests until the request channel closes or `stop` is raised
    ///
    /// Runs are executed one at a time, in arrival order. Each accepted run is announced
    /// with [`WorkerEvent::Started`] before its input is rebuilt, then answered with
    /// [`WorkerEvent::Finished`].
    pub fn serve(
        &self,
        requests: &Receiver<RunMessage<T>>,
        events: &Sender<WorkerEvent<O>>,
        stop: &AtomicBool,
    ) {
        for message in requests.iter() {
            if stop.load(Ordering::Acquire) {
                break;
            }
            if self.accepts(&message) {
                let started = WorkerEvent::Started {
                    run_id: message.run_id,
                    at: Instant::now(),
                };
                if events.send(started).is_err() {
                    break;
                }
            }
            if let Some(response) = self.handle(message) {
                if events.send(WorkerEvent::Finished(response)).is_err() {
                    break;
                }
            }
            if stop.load(Ordering::Acquire) {
                break;
            }
        }
        trace!(predicate_id = %self.predicate_id, "worker loop exited");
    }
}
