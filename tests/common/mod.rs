use std::cell::RefCell;
use std::rc::Rc;

use opensched::{CoreId, SimulatorHost, TaskId, ThreadId, ThreadRunState, TimeNs};

/// Initialize tracing from `RUST_LOG`.
///
/// `try_init()` is idempotent: the first call in the process succeeds,
/// subsequent calls are silently ignored.
pub fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Scripted host state, shared between the test and the scheduler
/// through a cloneable handle.
#[derive(Debug, Default)]
pub struct HostState {
    pub clock: TimeNs,
    /// Owning task per created thread; the length is the thread count.
    pub threads: Vec<TaskId>,
    /// Whether each thread currently executes on a core.
    pub running: Vec<bool>,
    pub core_elapsed: Vec<TimeNs>,
    /// Every `reschedule` call the scheduler issued.
    pub reschedules: Vec<(TimeNs, CoreId, bool)>,
}

/// A fake host simulator for driving the scheduler in tests.
#[derive(Clone, Default)]
pub struct FakeHost(pub Rc<RefCell<HostState>>);

impl FakeHost {
    pub fn new(num_cores: usize) -> Self {
        let host = FakeHost::default();
        host.0.borrow_mut().core_elapsed = vec![0; num_cores];
        host
    }

    /// Register a new thread owned by `task` and return its id, the
    /// way the host's thread manager hands out dense thread ids.
    pub fn add_thread(&self, task: TaskId) -> ThreadId {
        let mut state = self.0.borrow_mut();
        state.threads.push(task);
        state.running.push(false);
        ThreadId(state.threads.len() - 1)
    }

    pub fn set_clock(&self, now: TimeNs) {
        self.0.borrow_mut().clock = now;
    }

    pub fn reschedules(&self) -> Vec<(TimeNs, CoreId, bool)> {
        self.0.borrow().reschedules.clone()
    }

    pub fn clear_reschedules(&self) {
        self.0.borrow_mut().reschedules.clear();
    }
}

impl SimulatorHost for FakeHost {
    fn global_clock(&self) -> TimeNs {
        self.0.borrow().clock
    }

    fn num_threads(&self) -> usize {
        self.0.borrow().threads.len()
    }

    fn task_of_thread(&self, thread: ThreadId) -> TaskId {
        self.0.borrow().threads[thread.0]
    }

    fn thread_state(&self, thread: ThreadId) -> ThreadRunState {
        if self.0.borrow().running.get(thread.0).copied().unwrap_or(false) {
            ThreadRunState::Running
        } else {
            ThreadRunState::NotRunning
        }
    }

    fn core_elapsed_time(&self, core: CoreId) -> TimeNs {
        self.0.borrow().core_elapsed[core.0]
    }

    fn reschedule(&mut self, now: TimeNs, core: CoreId, quantum_expired: bool) {
        self.0.borrow_mut().reschedules.push((now, core, quantum_expired));
    }
}
