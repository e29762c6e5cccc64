//! Core table and 2-D grid geometry.

use anyhow::{bail, Result};

use crate::types::{CoreId, TaskId, ThreadId};

/// Per-core assignment state.
#[derive(Debug, Clone)]
pub struct CoreSlot {
    /// Whether the configured core mask includes this core.
    pub in_mask: bool,
    /// The task occupying this core, if any.
    pub task: Option<TaskId>,
    /// The application thread pinned to this core, if any.
    /// A bound thread implies an owning task.
    pub thread: Option<ThreadId>,
}

/// The rectangular grid of simulated cores.
///
/// `rows` is the largest integer not exceeding √`num_cores` that
/// divides `num_cores`; core `c` sits at `(c / columns, c % columns)`.
#[derive(Debug)]
pub struct CoreGrid {
    rows: usize,
    columns: usize,
    slots: Vec<CoreSlot>,
}

impl CoreGrid {
    pub fn new(core_mask: &[bool]) -> Result<Self> {
        let num_cores = core_mask.len();
        if num_cores == 0 {
            bail!("configuration error: invalid system size 0, expected rectangular-shaped system");
        }
        let mut rows = (num_cores as f64).sqrt() as usize;
        while rows > 1 && num_cores % rows != 0 {
            rows -= 1;
        }
        let columns = num_cores / rows;
        if rows * columns != num_cores {
            bail!(
                "configuration error: invalid system size {num_cores}, expected rectangular-shaped system"
            );
        }
        let slots = core_mask
            .iter()
            .map(|&in_mask| CoreSlot {
                in_mask,
                task: None,
                thread: None,
            })
            .collect();
        Ok(CoreGrid {
            rows,
            columns,
            slots,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn num_cores(&self) -> usize {
        self.slots.len()
    }

    /// Core id at grid coordinates `(y, x)`.
    pub fn core_at(&self, y: usize, x: usize) -> CoreId {
        debug_assert!(y < self.rows && x < self.columns);
        CoreId(y * self.columns + x)
    }

    pub fn slot(&self, core: CoreId) -> &CoreSlot {
        &self.slots[core.0]
    }

    pub fn slot_mut(&mut self, core: CoreId) -> &mut CoreSlot {
        &mut self.slots[core.0]
    }

    pub fn is_free(&self, core: CoreId) -> bool {
        self.slots[core.0].task.is_none()
    }

    pub fn is_assigned_to_task(&self, core: CoreId) -> bool {
        self.slots[core.0].task.is_some()
    }

    pub fn is_assigned_to_thread(&self, core: CoreId) -> bool {
        self.slots[core.0].thread.is_some()
    }

    /// Number of cores with no task assigned. Counts the whole grid,
    /// including cores outside the configured mask.
    pub fn free_cores(&self) -> usize {
        self.slots.iter().filter(|s| s.task.is_none()).count()
    }

    /// Per-core "in mask and free" flags, the `availableMask` a mapping
    /// policy receives.
    pub fn available_mask(&self) -> Vec<bool> {
        self.slots
            .iter()
            .map(|s| s.in_mask && s.task.is_none())
            .collect()
    }

    /// Per-core "assigned to some task" flags.
    pub fn active_mask(&self) -> Vec<bool> {
        self.slots.iter().map(|s| s.task.is_some()).collect()
    }

    /// Commit a mapping: assign every listed core to the task.
    pub fn assign_task(&mut self, task: TaskId, cores: &[CoreId]) {
        for &core in cores {
            self.slots[core.0].task = Some(task);
        }
    }

    /// Release all cores assigned to the task. Returns the released
    /// core ids in index order.
    pub fn release_task(&mut self, task: TaskId) -> Vec<CoreId> {
        let mut released = Vec::new();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.task == Some(task) {
                slot.task = None;
                released.push(CoreId(i));
            }
        }
        released
    }

    /// Unbind the thread from every core it is pinned to. Returns the
    /// affected core ids in index order.
    pub fn release_thread(&mut self, thread: ThreadId) -> Vec<CoreId> {
        let mut released = Vec::new();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.thread == Some(thread) {
                slot.thread = None;
                released.push(CoreId(i));
            }
        }
        released
    }

    /// Bind a thread to the lowest-index core that is assigned to the
    /// task but has no thread pinned yet. Returns `None` when the task
    /// holds no such core.
    pub fn bind_thread(&mut self, thread: ThreadId, task: TaskId) -> Option<CoreId> {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.task == Some(task) && slot.thread.is_none() {
                slot.thread = Some(thread);
                return Some(CoreId(i));
            }
        }
        None
    }
}
