//! Background worker processing insert tasks.
//!
//! A single worker per deployment sweeps the task store on an interval,
//! claims pending tasks by moving them to `processing`, and runs them
//! through the enrichment pipeline and index with bounded concurrency.

pub mod config;
pub mod error;
pub mod worker;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use worker::{Inserter, Worker};
