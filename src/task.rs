//! Task records and the task lifecycle state machine.

use anyhow::{bail, Result};

use crate::profile::{self, TaskName};
use crate::types::{TaskId, TimeNs};

/// The state a workload task can be in.
///
/// A single tag (not independent flags) so that the states always
/// partition the task set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// The task's synthetic arrival time has not been reached yet.
    PendingArrival,
    /// The task has arrived and waits in the execution queue.
    InQueue,
    /// The task occupies its cores and is executing.
    Active,
    /// The task's primary thread has exited.
    Completed,
}

/// One workload task.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub name: TaskName,
    /// Worst-case number of cores the task occupies while active.
    pub core_requirement: u32,
    /// Synthetic arrival time (ns). Rewritten by the idle fast-forward.
    pub arrival_time: TimeNs,
    /// Set when the task transitions to `Active`.
    pub start_time: Option<TimeNs>,
    /// Set when the task transitions to `Completed`.
    pub departure_time: Option<TimeNs>,
    pub state: TaskState,
}

impl Task {
    pub fn is_pending_arrival(&self) -> bool {
        self.state == TaskState::PendingArrival
    }

    pub fn is_in_queue(&self) -> bool {
        self.state == TaskState::InQueue
    }

    pub fn is_active(&self) -> bool {
        self.state == TaskState::Active
    }

    pub fn is_completed(&self) -> bool {
        self.state == TaskState::Completed
    }
}

/// Dense table of all tasks, indexed by task id. Owns every task
/// record for the life of the scheduler.
#[derive(Debug)]
pub struct TaskTable {
    tasks: Vec<Task>,
}

impl TaskTable {
    /// Build the table from the `+`-joined benchmark list.
    ///
    /// Each composition string is parsed once and translated to a core
    /// requirement through the profile; a requirement of zero marks a
    /// forbidden parallelism level and is rejected here.
    pub fn from_benchmarks(benchmarks: &str, num_tasks: usize) -> Result<Self> {
        let names: Vec<&str> = benchmarks.split('+').filter(|s| !s.is_empty()).collect();
        if names.len() < num_tasks {
            bail!(
                "configuration error: {} tasks configured but only {} benchmark names given",
                num_tasks,
                names.len()
            );
        }
        let mut tasks = Vec::with_capacity(num_tasks);
        for (i, raw) in names.iter().take(num_tasks).enumerate() {
            let name = TaskName::parse(raw)?;
            let core_requirement = profile::core_requirement(&name)?;
            if core_requirement == 0 {
                bail!(
                    "configuration error: parallelism {} is forbidden for {}",
                    name.parallelism,
                    name
                );
            }
            tasks.push(Task {
                id: TaskId(i),
                name,
                core_requirement,
                arrival_time: 0,
                start_time: None,
                departure_time: None,
                state: TaskState::PendingArrival,
            });
        }
        Ok(TaskTable { tasks })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> &Task {
        &self.tasks[id.0]
    }

    pub fn get_mut(&mut self, id: TaskId) -> &mut Task {
        &mut self.tasks[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.tasks.iter_mut()
    }

    pub fn num_pending_arrival(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_pending_arrival()).count()
    }

    pub fn num_in_queue(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_in_queue()).count()
    }

    pub fn num_active(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_active()).count()
    }

    pub fn num_completed(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_completed()).count()
    }

    /// Sum of core requirements over all active tasks.
    pub fn active_core_requirement(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.is_active())
            .map(|t| t.core_requirement as usize)
            .sum()
    }

    /// `PendingArrival` → `InQueue`. No-op for any other state.
    pub fn move_to_queue(&mut self, id: TaskId) {
        let task = &mut self.tasks[id.0];
        if task.state == TaskState::PendingArrival {
            task.state = TaskState::InQueue;
        }
    }

    /// `InQueue` → `Active`, recording the start time.
    pub fn activate(&mut self, id: TaskId, now: TimeNs) {
        let task = &mut self.tasks[id.0];
        task.state = TaskState::Active;
        task.start_time = Some(now);
    }

    /// `Active` → `Completed`, recording the departure time.
    pub fn complete(&mut self, id: TaskId, now: TimeNs) {
        let task = &mut self.tasks[id.0];
        task.state = TaskState::Completed;
        task.departure_time = Some(now);
    }
}
