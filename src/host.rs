//! Facade over the host simulator.
//!
//! The scheduler never reaches for global simulator state; everything
//! it consumes from the host crosses this trait, injected at
//! construction. Tests drive the scheduler against a scripted fake.

use crate::types::{CoreId, TaskId, ThreadId, TimeNs};

/// Execution state of an application thread as the host sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadRunState {
    Running,
    NotRunning,
}

/// The services the host simulator supplies to the scheduler.
pub trait SimulatorHost {
    /// Current global simulated time (ns).
    fn global_clock(&self) -> TimeNs;

    /// Number of application threads the thread manager has created so
    /// far. Affinity set on a thread at or beyond this count is
    /// recorded but acted on only once the thread exists.
    fn num_threads(&self) -> usize;

    /// The task (application) owning a thread.
    fn task_of_thread(&self, thread: ThreadId) -> TaskId;

    /// Whether the thread currently executes on a core.
    fn thread_state(&self, thread: ThreadId) -> ThreadRunState;

    /// Elapsed time of a core's performance model (ns). May run ahead
    /// of the global clock.
    fn core_elapsed_time(&self, core: CoreId) -> TimeNs;

    /// Ask the host to rotate execution on a core: pick the next
    /// runnable thread allowed there and context-switch at `now`.
    fn reschedule(&mut self, now: TimeNs, core: CoreId, quantum_expired: bool);
}
