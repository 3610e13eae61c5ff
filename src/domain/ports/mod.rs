//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that infrastructure adapters implement, keeping the
//! delegation core independent of how agents are actually executed.

pub mod worker_runtime;

pub use worker_runtime::WorkerRuntime;
