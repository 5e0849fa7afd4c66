//! # Worksteal - A Work-Stealing Task Scheduler
//!
//! Worksteal balances tasks across a fixed pool of workers. Each worker owns
//! a deque; it drains its own work front-first and, once empty, steals from
//! the back of the most loaded peer.
//!
//! ## Core Concepts
//!
//! - **Task**: identity, cost estimate, provenance and a stolen marker
//! - **Deque**: per-worker queue; owner pops the front, thieves pop the back
//! - **WorkerNode**: idle/busy state machine running at most one task at a time
//! - **Scheduler**: admits tasks, wakes idle workers, picks steal victims
//! - **Execution unit**: runs a dispatched task and signals completion
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           CLI Interface                              │
//! │                    (clap-based command parsing)                      │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         SchedulerRuntime                             │
//! │              (one tokio actor per worker mailbox)                    │
//! └─────────────────────────────────────────────────────────────────────┘
//!                    │                                   ▲
//!        TaskDispatch│                                   │TaskComplete
//!                    ▼                                   │
//! ┌──────────────────────────────┐       ┌──────────────────────────────┐
//! │          Scheduler           │       │        Execution Unit        │
//! │  (deques, busy flags,        │       │  (simulated sleep/spin or    │
//! │   victim selection)          │       │   caller-supplied closure)   │
//! └──────────────────────────────┘       └──────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use worksteal::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let runtime = SchedulerRuntime::start(4, Arc::new(SimulatedExecution::default()))?;
//!
//!     for _ in 0..16 {
//!         runtime.add_task(0, 100)?;
//!     }
//!
//!     runtime.wait_for_quiescence().await;
//!     let report = runtime.shutdown(ShutdownPolicy::Drain).await?;
//!     println!("stolen: {}", report.stats.scheduler.tasks_stolen);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use std::sync::Arc;

    // Error handling
    pub use crate::error::{Error, Result};

    // Scheduler core
    pub use crate::scheduler::{
        Scheduler, SchedulerStats, Task, TaskId, WorkerId, WorkerMessage, WorkerSnapshot,
        WorkerStatus,
    };

    // Runtime
    pub use crate::runtime::{RuntimeStats, SchedulerRuntime, ShutdownPolicy, ShutdownReport};

    // Execution units
    pub use crate::execution::{ExecutionUnit, FnExecution, SimulatedExecution};

    // Configuration
    pub use crate::config::Config;
}

pub mod config;
pub mod error;
pub mod execution;
pub mod runtime;
pub mod scheduler;

pub use error::{Error, Result};

/// Version of the Worksteal library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
