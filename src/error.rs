//! Error types for Worksteal.
//!
//! This module defines the error types used throughout the scheduler and its
//! runtime. Structural errors (a bad worker id, a stray completion signal)
//! are reported synchronously to the caller and never leave the scheduler in
//! a partially modified state.

use crate::scheduler::{TaskId, WorkerId};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Worksteal operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Worksteal.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Scheduling Errors
    // ========================================================================
    /// A worker id outside the configured pool was supplied.
    #[error("Invalid worker id {worker_id}: pool has {pool_size} workers")]
    InvalidWorkerId {
        /// The offending worker id
        worker_id: WorkerId,
        /// Number of workers in the pool
        pool_size: usize,
    },

    /// A completion signal arrived for a task the worker is not running.
    #[error("Worker {worker_id} received completion for task {task_id} but is running {current}")]
    UnexpectedCompletion {
        /// Worker that received the signal
        worker_id: WorkerId,
        /// Task id carried by the signal
        task_id: TaskId,
        /// What the worker is actually running
        current: String,
    },

    /// The scheduler was asked to run with an empty pool.
    #[error("Worker pool must contain at least one worker")]
    EmptyPool,

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// The execution unit reported a failure for a task.
    #[error("Task {task_id} failed on worker {worker_id}: {message}")]
    ExecutionFailed {
        /// Failed task
        task_id: TaskId,
        /// Worker that dispatched it
        worker_id: WorkerId,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Runtime Errors
    // ========================================================================
    /// The runtime has already been shut down.
    #[error("Scheduler runtime is shut down")]
    RuntimeShutdown,

    /// A worker actor panicked or was aborted.
    #[error("Worker actor failed: {0}")]
    WorkerJoin(#[from] tokio::task::JoinError),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration value is out of range.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse config file '{}': {message}", path.display())]
    ConfigParse {
        /// Path to the config file
        path: PathBuf,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create an invalid worker id error.
    pub fn invalid_worker(worker_id: WorkerId, pool_size: usize) -> Self {
        Error::InvalidWorkerId {
            worker_id,
            pool_size,
        }
    }

    /// Create an execution failure error.
    pub fn execution(task_id: TaskId, worker_id: WorkerId, message: impl Into<String>) -> Self {
        Error::ExecutionFailed {
            task_id,
            worker_id,
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether this error was caused by the caller rather than the runtime.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidWorkerId { .. }
                | Error::UnexpectedCompletion { .. }
                | Error::EmptyPool
                | Error::InvalidConfig { .. }
        )
    }
}
