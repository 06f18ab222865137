//! Isolated execution of predicates.
//!
//! The orchestrating side ([`WorkerPool`]) sends [`RunMessage`]s to worker threads
//! running a [`WorkerRunner`] and matches the [`ResultMessage`]s coming back by
//! [`RunId`]. Workers also report when they start a run, which is when its timeout
//! starts counting. Inputs cross over either as values or as the [`GenerationState`] that
//! rebuilds them, see [`Payload`].

mod message;
mod pool;
mod runner;

pub use message::{
    GenerationState, Payload, PredicateId, ResultMessage, RunId, RunMessage, WorkerEvent,
};
pub use pool::{PendingRun, PoolStats, WorkerPool};
pub use runner::WorkerRunner;
