//! Newtype wrappers and type aliases for domain concepts.
//!
//! Newtypes for identifiers (task IDs, core IDs, thread IDs) prevent
//! silent index confusion between the three dense tables. A type alias
//! for simulated time keeps signatures readable without arithmetic
//! boilerplate.

use std::fmt;

/// Task identifier. Tasks are dense: `0..num_tasks`.
///
/// The primary thread of a task carries the same numeric id, so
/// `ThreadId(n)` with `n < num_tasks` is the primary thread of
/// `TaskId(n)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub usize);

/// Core identifier within the grid: `0..num_cores`, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoreId(pub usize);

/// Thread identifier assigned by the host simulator's thread manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub usize);

/// Simulated time in nanoseconds.
pub type TimeNs = u64;

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
