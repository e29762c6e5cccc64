//! opensched - Open-workload scheduler for cycle-level multicore simulators.
//!
//! A stream of parallel tasks with known worst-case core requirements
//! arrives over simulated time; the scheduler admits them through a
//! FIFO queue, maps each onto a rectangle of simulated cores with a
//! pluggable spatial policy, pins its threads, and drives quantum-based
//! rescheduling through the host simulator.
//!
//! # Architecture
//!
//! - **Profile**: worst-case core requirements per benchmark and parallelism
//! - **Tasks**: dense task table with a four-state lifecycle machine
//! - **Grid**: rectangular core table with assignment and binding state
//! - **Arrival**: uniform/explicit/poisson arrival-time generation
//! - **Policies**: queue discipline and spatial mapping, selected by name
//! - **Pinned**: per-thread affinity and per-core quantum bookkeeping
//! - **Scheduler**: admission pipeline and the host-facing entry points
//!
//! # Usage
//!
//! ```rust,no_run
//! use opensched::{OpenScheduler, SchedulerConfig, ThreadId};
//! # use opensched::SimulatorHost;
//! # fn demo<H: SimulatorHost>(host: H) -> anyhow::Result<()> {
//! let mut config = SchedulerConfig::new(16, 2);
//! config.benchmarks = "parsec-blackscholes-simsmall-4+splash2-fft-small-2".into();
//!
//! let mut scheduler = OpenScheduler::new(config, host)?;
//! let core = scheduler.thread_create(ThreadId(0))?;
//! # let _ = core;
//! # Ok(())
//! # }
//! ```
//!
//! The host owns the clock, the thread manager, and the per-core
//! performance models; everything the scheduler consumes from it
//! crosses the [`SimulatorHost`] trait.

pub mod arrival;
pub mod config;
pub mod fmt;
pub mod grid;
pub mod host;
pub mod mapping;
pub mod pinned;
pub mod profile;
pub mod queue;
pub mod scheduler;
pub mod stats;
pub mod task;
pub mod types;

// Re-export the main public types for convenience.
pub use arrival::ArrivalDistribution;
pub use config::{preferred_cores_from_raw, SchedulerConfig};
pub use grid::{CoreGrid, CoreSlot};
pub use host::{SimulatorHost, ThreadRunState};
pub use mapping::{FirstUnused, MappingPolicy};
pub use pinned::{Affinity, PinnedCore};
pub use profile::{core_requirement, TaskName};
pub use queue::QueuePolicy;
pub use scheduler::OpenScheduler;
pub use stats::{average_response, task_times, TaskTimes};
pub use task::{Task, TaskState, TaskTable};
pub use types::{CoreId, TaskId, ThreadId, TimeNs};
