//! Admission, dispatch, and the host-facing entry points.
//!
//! The host simulator calls into the scheduler on exactly three
//! occasions — thread creation, thread exit, and the periodic tick —
//! plus construction. Each entry point runs to completion before the
//! host advances simulated time; nothing here suspends or blocks.

use anyhow::{bail, Result};
use tracing::info;

use crate::arrival;
use crate::config::SchedulerConfig;
use crate::fmt::FmtNs;
use crate::grid::CoreGrid;
use crate::host::{SimulatorHost, ThreadRunState};
use crate::mapping::{self, MappingPolicy};
use crate::pinned::{Affinity, PinnedCore};
use crate::queue::QueuePolicy;
use crate::stats;
use crate::task::TaskTable;
use crate::types::{CoreId, TaskId, ThreadId, TimeNs};

/// Interval of the status line and invariant check (ns).
const STATUS_INTERVAL_NS: TimeNs = 1_000_000;

/// The open-workload scheduler.
pub struct OpenScheduler<H: SimulatorHost> {
    host: H,
    num_tasks: usize,
    mapping_epoch_ns: TimeNs,
    tasks: TaskTable,
    grid: CoreGrid,
    queue: QueuePolicy,
    mapping: Box<dyn MappingPolicy>,
    pinned: PinnedCore,
    /// Time of the previous periodic tick, for quantum deltas.
    last_periodic: TimeNs,
    /// Next 1 ms boundary at which the status line and invariant
    /// check fire. Computed as a boundary crossing so the check works
    /// even when the tick cadence does not divide 1 ms.
    next_status_at: TimeNs,
}

impl<H: SimulatorHost> OpenScheduler<H> {
    /// Construct the scheduler from validated configuration.
    ///
    /// All configuration errors surface here, before any simulated
    /// time elapses: bad grid geometry, unknown benchmark profiles,
    /// forbidden parallelism, unknown policy or distribution names.
    /// Arrival times for every task are precomputed.
    pub fn new(config: SchedulerConfig, host: H) -> Result<Self> {
        if config.mapping_epoch_ns == 0 {
            bail!("configuration error: mapping epoch must be at least one tick");
        }
        let grid = CoreGrid::new(&config.core_mask)?;
        info!(
            cores = grid.num_cores(),
            rows = grid.rows(),
            columns = grid.columns(),
            "initialized core grid"
        );

        let mut tasks = TaskTable::from_benchmarks(&config.benchmarks, config.num_tasks)?;
        let arrivals = arrival::arrival_times(&config)?;
        for (task, arrival_time) in tasks.iter_mut().zip(arrivals) {
            task.arrival_time = arrival_time;
            info!(
                task = task.id.0,
                name = %task.name,
                time = %FmtNs(arrival_time),
                "arrival time set"
            );
        }

        let mapping = mapping::policy_from_name(&config, &grid)?;
        let pinned = PinnedCore::new(
            config.quantum_ns,
            config.interleaving,
            config.core_mask.clone(),
        )?;

        Ok(OpenScheduler {
            host,
            num_tasks: config.num_tasks,
            mapping_epoch_ns: config.mapping_epoch_ns,
            tasks,
            grid,
            queue: config.queue_policy,
            mapping,
            pinned,
            last_periodic: 0,
            next_status_at: 0,
        })
    }

    pub fn tasks(&self) -> &TaskTable {
        &self.tasks
    }

    pub fn grid(&self) -> &CoreGrid {
        &self.grid
    }

    /// Mutable access to the core table. Exists so fault-injection
    /// tests can corrupt a slot and watch the invariant check fire.
    pub fn grid_mut(&mut self) -> &mut CoreGrid {
        &mut self.grid
    }

    /// Attempt to admit and map one task.
    ///
    /// Walks the admission pipeline: arrival check, queue entry,
    /// head-of-queue check, free-core check, mapping policy. Returns
    /// `Ok(false)` on any refusal, leaving every table unchanged apart
    /// from the (idempotent) queue entry; the task is retried on a
    /// later event. On success the cores are committed, the start time
    /// recorded, and — except on the initial call, where the host
    /// follows up with `thread_create` — the primary thread is pinned.
    pub fn schedule(&mut self, task: TaskId, initial: bool, now: TimeNs) -> Result<bool> {
        info!(task = task.0, time = %FmtNs(now), "trying to schedule task");

        if self.tasks.get(task).arrival_time > now {
            info!(task = task.0, "task not ready for execution");
            return Ok(false);
        }
        if self.tasks.get(task).is_pending_arrival() {
            info!(task = task.0, "task put into execution queue");
            self.tasks.move_to_queue(task);
        }

        if self.queue.head_of_queue(&self.tasks) != Some(task) {
            info!(task = task.0, "task is not in front of the queue");
            return Ok(false);
        }

        let requirement = self.tasks.get(task).core_requirement;
        let free = self.grid.free_cores();
        if free < requirement as usize {
            info!(
                task = task.0,
                free,
                requirement,
                "not enough free cores to schedule task"
            );
            return Ok(false);
        }

        if !self.execute_mapping_policy(task) {
            return Ok(false);
        }

        if !initial {
            if let Some(core) = self.bind_thread_to_task_core(ThreadId(task.0))? {
                info!(task = task.0, core = core.0, "waking task");
            }
        }
        self.tasks.activate(task, now);
        Ok(true)
    }

    /// Run the mapping policy for a task and commit the result.
    /// Returns false (and commits nothing) when the policy declines.
    fn execute_mapping_policy(&mut self, task: TaskId) -> bool {
        let available = self.grid.available_mask();
        let active = self.grid.active_mask();
        let record = self.tasks.get(task);
        let cores = self
            .mapping
            .map(&record.name, record.core_requirement, &available, &active);
        if cores.len() < record.core_requirement as usize {
            info!(
                task = task.0,
                granted = cores.len(),
                requirement = record.core_requirement,
                "mapping policy returned too few cores, mapping failed"
            );
            return false;
        }
        for &core in &cores {
            info!(core = core.0, task = task.0, "assigning core to task");
        }
        self.grid.assign_task(task, &cores);
        true
    }

    /// Pin a thread to one core of its owning task: the lowest-index
    /// core assigned to the task with no thread bound yet. When the
    /// task holds no unbound core the thread is parked so the host
    /// halts it.
    fn bind_thread_to_task_core(&mut self, thread: ThreadId) -> Result<Option<CoreId>> {
        let task = self.host.task_of_thread(thread);
        match self.grid.bind_thread(thread, task) {
            Some(core) => {
                info!(
                    thread = thread.0,
                    task = task.0,
                    core = core.0,
                    "setting thread affinity"
                );
                self.thread_set_affinity(None, thread, Some(Affinity::single(core)))?;
                Ok(Some(core))
            }
            None => {
                info!(
                    thread = thread.0,
                    task = task.0,
                    "setting thread affinity to parked"
                );
                self.thread_set_affinity(None, thread, Some(Affinity::Parked))?;
                Ok(None)
            }
        }
    }

    /// Set a thread's affinity on behalf of `calling` (or the
    /// scheduler itself, with `None`). See [`PinnedCore::set_affinity`]
    /// for the reaction semantics.
    pub fn thread_set_affinity(
        &mut self,
        calling: Option<ThreadId>,
        thread: ThreadId,
        affinity: Option<Affinity>,
    ) -> Result<()> {
        self.pinned
            .set_affinity(calling, thread, affinity, &mut self.host)
    }

    /// Host entry point: a thread was created.
    ///
    /// Threads `0..num_tasks` are the primary threads of their tasks
    /// and trigger the task's initial scheduling attempt; task 0's
    /// attempt must succeed for the simulation to start at all.
    /// Returns the core the thread starts on, or `None` when it is
    /// put to sleep until its task is mapped.
    pub fn thread_create(&mut self, thread: ThreadId) -> Result<Option<CoreId>> {
        let task = self.host.task_of_thread(thread);
        let now = self.host.global_clock();
        info!(
            thread = thread.0,
            task = task.0,
            time = %FmtNs(now),
            "trying to map thread"
        );

        if thread.0 == 0 {
            if !self.schedule(TaskId(0), true, now)? {
                bail!("bootstrap error: task 0 must be mapped for the simulation to work");
            }
        } else if thread.0 < self.num_tasks {
            self.schedule(TaskId(thread.0), true, now)?;
        }

        self.pinned.mark_runnable(thread);
        if !self.pinned.has_affinity(thread) {
            self.pinned.set_initial_affinity(thread);
        }

        // Kept in source order: bind to a task core (which rewrites the
        // affinity) before searching for a free core within it.
        self.bind_thread_to_task_core(thread)?;
        if let Some(core) = self.pinned.find_free_core_for_thread(thread) {
            self.pinned.start_thread_on(thread, core);
            Ok(Some(core))
        } else {
            if thread.0 >= self.num_tasks {
                bail!(
                    "pinning error: non-initial thread {thread} from task {task} failed to get a core"
                );
            }
            info!(thread = thread.0, task = task.0, "putting thread to sleep");
            self.pinned.put_to_sleep(thread);
            Ok(None)
        }
    }

    /// Host entry point: a thread exited.
    ///
    /// Releases the thread's cores; when the thread is a task's
    /// primary, completes the task, releases all its cores, and emits
    /// the response-time result. If the grid goes fully idle while
    /// work remains, dispatches from the queue or fast-forwards the
    /// pending arrival times so the host neither deadlocks nor
    /// terminates early.
    pub fn thread_exit(&mut self, thread: ThreadId, now: TimeNs) -> Result<()> {
        if let Some(core) = self.pinned.core_running(thread) {
            // Let another thread take the core over.
            self.host.reschedule(now, core, false);
        }
        self.pinned.detach_thread(thread);

        let task = self.host.task_of_thread(thread);
        info!(
            thread = thread.0,
            task = task.0,
            time = %FmtNs(now),
            "thread exiting"
        );

        let released = self.grid.release_thread(thread);
        for &core in &released {
            info!(core = core.0, thread = thread.0, "releasing core from thread");
            // Park the exiting thread so the host halts it.
            self.thread_set_affinity(None, thread, Some(Affinity::Parked))?;
        }

        if thread.0 < self.num_tasks {
            info!(task = task.0, "task finished");
            let task_cores = self.grid.release_task(task);
            for &core in &task_cores {
                info!(core = core.0, task = task.0, "releasing core from task");
            }
            self.tasks.complete(task, now);
            stats::report_task(self.tasks.get(task));
        }

        self.fast_forward_if_idle(now)?;

        if self.tasks.num_completed() == self.num_tasks {
            info!("all tasks finished executing");
            stats::report_average(&self.tasks);
        }
        Ok(())
    }

    /// When the grid is fully idle but unfinished tasks remain,
    /// dispatch the queue head — or, if the queue is empty, shift
    /// every pending arrival time down uniformly so the next arrival
    /// happens now. The uniform shift keeps relative arrivals (and so
    /// the response-time metrics) intact.
    fn fast_forward_if_idle(&mut self, now: TimeNs) -> Result<()> {
        let queued = self.tasks.num_in_queue();
        let pending = self.tasks.num_pending_arrival();
        if self.grid.free_cores() != self.grid.num_cores() || queued + pending == 0 {
            return Ok(());
        }
        info!("system going empty, prefetching tasks");

        if queued != 0 {
            info!("prefetching task from queue");
            if let Some(head) = self.queue.head_of_queue(&self.tasks) {
                self.schedule(head, false, now)?;
            }
            return Ok(());
        }

        let next_arrival = self
            .tasks
            .iter()
            .filter(|t| t.is_pending_arrival())
            .map(|t| t.arrival_time)
            .min()
            .unwrap();
        if next_arrival == 0 {
            bail!("internal error: next arrival time is zero during idle fast-forward");
        }

        // Signed: a task may have arrived since the last fetch pass,
        // in which case the shift moves arrivals forward to now.
        let jump = next_arrival as i64 - now as i64;
        info!(jump, "readjusting pending arrival times");
        for task in self.tasks.iter_mut().filter(|t| t.is_pending_arrival()) {
            task.arrival_time = (task.arrival_time as i64 - jump) as TimeNs;
            info!(
                task = task.id.0,
                time = %FmtNs(task.arrival_time),
                "new arrival time"
            );
        }

        self.fetch_tasks_into_queue(now);
        if let Some(head) = self.queue.head_of_queue(&self.tasks) {
            self.schedule(head, false, now)?;
        }
        Ok(())
    }

    /// Move every pending task whose arrival time has been reached
    /// into the execution queue.
    fn fetch_tasks_into_queue(&mut self, now: TimeNs) {
        let arrived: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|t| t.is_pending_arrival() && t.arrival_time <= now)
            .map(|t| t.id)
            .collect();
        for task in arrived {
            info!(task = task.0, "task put into execution queue");
            self.tasks.move_to_queue(task);
        }
    }

    /// Dispatch from the head of the queue until the first refusal.
    fn drain_queue(&mut self, now: TimeNs) -> Result<()> {
        while let Some(head) = self.queue.head_of_queue(&self.tasks) {
            if !self.schedule(head, false, now)? {
                break;
            }
        }
        Ok(())
    }

    /// Host entry point: the periodic tick.
    ///
    /// Fires the status line and invariant check on 1 ms boundaries,
    /// runs the mapping pass every mapping epoch, and updates per-core
    /// quanta with the time elapsed since the previous tick.
    pub fn periodic(&mut self, now: TimeNs) -> Result<()> {
        if now >= self.next_status_at {
            self.log_status(now);
            self.check_invariants()?;
            self.next_status_at = (now / STATUS_INTERVAL_NS + 1) * STATUS_INTERVAL_NS;
        }

        if now % self.mapping_epoch_ns == 0 {
            info!(time = %FmtNs(now), "mapping pass");
            self.fetch_tasks_into_queue(now);
            self.drain_queue(now)?;
            self.dump_grid();
        }

        let delta = now - self.last_periodic;
        self.pinned.tick_quanta(delta, now, &mut self.host);
        self.last_periodic = now;
        Ok(())
    }

    fn log_status(&self, now: TimeNs) {
        info!(
            time = %FmtNs(now),
            active = self.tasks.num_active(),
            completed = self.tasks.num_completed(),
            queued = self.tasks.num_in_queue(),
            pending = self.tasks.num_pending_arrival(),
            free_cores = self.grid.free_cores(),
            active_requirement = self.tasks.active_core_requirement(),
            "status"
        );
    }

    /// The two global invariants. A violation means scheduler state is
    /// corrupt and downstream metrics would be silently wrong, so it
    /// is fatal.
    fn check_invariants(&self) -> Result<()> {
        let free = self.grid.free_cores();
        let active_requirement = self.tasks.active_core_requirement();
        if free + active_requirement != self.grid.num_cores() {
            bail!(
                "invariant violation: free cores ({free}) plus active core requirements \
                 ({active_requirement}) do not equal the number of cores ({})",
                self.grid.num_cores()
            );
        }
        let counted = self.tasks.num_pending_arrival()
            + self.tasks.num_in_queue()
            + self.tasks.num_active()
            + self.tasks.num_completed();
        if counted != self.num_tasks {
            bail!(
                "invariant violation: task state counts ({counted}) do not sum to the number \
                 of tasks ({})",
                self.num_tasks
            );
        }
        Ok(())
    }

    /// Print the current assignment as a rows × columns grid:
    /// `  . ` free, ` (id)` assigned with no thread, `-id-` thread
    /// sleeping, `*id*` thread running.
    fn dump_grid(&self) {
        println!("[Scheduler]: Current mapping:");
        for y in 0..self.grid.rows() {
            let mut line = String::new();
            for x in 0..self.grid.columns() {
                if x > 0 {
                    line.push(' ');
                }
                let core = self.grid.core_at(y, x);
                let slot = self.grid.slot(core);
                match slot.task {
                    None => line.push_str("  . "),
                    Some(task) => {
                        if task.0 < 10 {
                            line.push(' ');
                        }
                        let (open, close) = match slot.thread {
                            Some(thread) => match self.host.thread_state(thread) {
                                ThreadRunState::Running => ('*', '*'),
                                ThreadRunState::NotRunning => ('-', '-'),
                            },
                            None => ('(', ')'),
                        };
                        line.push(open);
                        line.push_str(&task.0.to_string());
                        line.push(close);
                    }
                }
            }
            println!("{line}");
        }
    }
}
