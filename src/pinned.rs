//! Pinned-core component: thread affinity and quantum bookkeeping.
//!
//! This is the embedded counterpart of the host's pinned scheduling
//! layer. It owns per-thread affinity info, the per-core quantum
//! vector, the core→running-thread map, and the round-robin cursor
//! used for initial affinity. It calls the host's `reschedule`
//! primitive; the host never calls back into it.

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use tracing::debug;

use crate::host::SimulatorHost;
use crate::types::{CoreId, ThreadId, TimeNs};

/// Where a thread is allowed to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Affinity {
    /// Free to run on any core in the system.
    Any,
    /// Restricted to the listed cores.
    Cores(BTreeSet<CoreId>),
    /// Pinned to no core at all; the host halts the thread. Takes the
    /// place of the legacy invalid-core-id sentinel.
    Parked,
}

impl Affinity {
    /// Convenience constructor for a single-core affinity.
    pub fn single(core: CoreId) -> Self {
        Affinity::Cores(BTreeSet::from([core]))
    }

    fn allows(&self, core: CoreId) -> bool {
        match self {
            Affinity::Any => true,
            Affinity::Cores(cores) => cores.contains(&core),
            Affinity::Parked => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ThreadInfo {
    /// `None` until an affinity is first assigned.
    affinity: Option<Affinity>,
    /// The core this thread currently runs on, per our bookkeeping.
    core_running: Option<CoreId>,
    /// True from thread creation until thread exit.
    runnable: bool,
}

/// Affinity and quantum state for every core and thread.
#[derive(Debug)]
pub struct PinnedCore {
    quantum_ns: TimeNs,
    interleaving: usize,
    core_mask: Vec<bool>,
    threads: Vec<ThreadInfo>,
    /// Remaining quantum per core, decremented by the periodic tick.
    quantum_left: Vec<TimeNs>,
    /// Which thread each core is running, per our bookkeeping.
    core_thread_running: Vec<Option<ThreadId>>,
    /// Round-robin cursor for initial affinity placement.
    next_core: usize,
}

impl PinnedCore {
    pub fn new(
        quantum_ns: TimeNs,
        interleaving: usize,
        core_mask: Vec<bool>,
    ) -> Result<Self> {
        if interleaving == 0 {
            bail!("configuration error: interleaving stride must be at least 1");
        }
        if !core_mask.iter().any(|&m| m) {
            bail!("configuration error: core mask excludes every core");
        }
        let num_cores = core_mask.len();
        Ok(PinnedCore {
            quantum_ns,
            interleaving,
            core_mask,
            threads: Vec::new(),
            quantum_left: vec![quantum_ns; num_cores],
            core_thread_running: vec![None; num_cores],
            next_core: 0,
        })
    }

    fn num_cores(&self) -> usize {
        self.core_mask.len()
    }

    fn ensure_thread(&mut self, thread: ThreadId) {
        if self.threads.len() <= thread.0 {
            self.threads.resize(thread.0 + 1, ThreadInfo::default());
        }
    }

    pub fn has_affinity(&self, thread: ThreadId) -> bool {
        self.threads
            .get(thread.0)
            .is_some_and(|t| t.affinity.is_some())
    }

    pub fn core_running(&self, thread: ThreadId) -> Option<CoreId> {
        self.threads.get(thread.0).and_then(|t| t.core_running)
    }

    pub fn thread_on_core(&self, core: CoreId) -> Option<ThreadId> {
        self.core_thread_running[core.0]
    }

    pub fn mark_runnable(&mut self, thread: ThreadId) {
        self.ensure_thread(thread);
        self.threads[thread.0].runnable = true;
    }

    /// Detach an exiting thread: it stops being runnable and its core
    /// (if any) is vacated in our bookkeeping.
    pub fn detach_thread(&mut self, thread: ThreadId) {
        self.ensure_thread(thread);
        let info = &mut self.threads[thread.0];
        info.runnable = false;
        if let Some(core) = info.core_running.take() {
            self.core_thread_running[core.0] = None;
        }
    }

    /// Record that a thread starts running on a core with a fresh
    /// quantum.
    pub fn start_thread_on(&mut self, thread: ThreadId, core: CoreId) {
        self.ensure_thread(thread);
        self.threads[thread.0].core_running = Some(core);
        self.core_thread_running[core.0] = Some(thread);
        self.quantum_left[core.0] = self.quantum_ns;
    }

    /// Record that a thread is not running anywhere (placed in sleep).
    pub fn put_to_sleep(&mut self, thread: ThreadId) {
        self.ensure_thread(thread);
        self.threads[thread.0].core_running = None;
    }

    /// The next core in the interleaved round-robin walk, skipping
    /// cores outside the configured mask. Wrapping past the end moves
    /// to the next interleaving lane.
    fn next_core_after(&self, mut core: usize) -> usize {
        loop {
            core += self.interleaving;
            if core >= self.num_cores() {
                core %= self.num_cores();
                core += 1;
                core %= self.interleaving;
            }
            if self.core_mask[core] {
                return core;
            }
        }
    }

    /// First core from `start` (following the walk) with no running
    /// thread. Falls back to `start` itself when every core is busy.
    fn free_core_from(&self, start: usize) -> usize {
        let mut core = start;
        loop {
            if self.core_thread_running[core].is_none() {
                return core;
            }
            core = self.next_core_after(core);
            if core == start {
                return start;
            }
        }
    }

    /// Give a freshly created thread its initial affinity: the first
    /// free core at or after the round-robin cursor.
    pub fn set_initial_affinity(&mut self, thread: ThreadId) -> CoreId {
        let core = self.free_core_from(self.next_core);
        self.next_core = self.next_core_after(core);
        self.ensure_thread(thread);
        self.threads[thread.0].affinity = Some(Affinity::single(CoreId(core)));
        debug!(thread = thread.0, core, "initial affinity");
        CoreId(core)
    }

    /// Lowest-index core with no running thread that the thread's
    /// affinity allows.
    pub fn find_free_core_for_thread(&self, thread: ThreadId) -> Option<CoreId> {
        let affinity = self.threads.get(thread.0)?.affinity.as_ref()?;
        (0..self.num_cores())
            .map(CoreId)
            .find(|&c| self.core_thread_running[c.0].is_none() && affinity.allows(c))
    }

    /// Set a thread's affinity and react to the move.
    ///
    /// `None` means "any core in the system". For a thread the host has
    /// not created yet only the intent is recorded. A self-retarget
    /// yields the calling thread; a running thread moved off its core
    /// loses its remaining quantum; a runnable non-running thread is
    /// rescheduled right away if a matching core is free.
    pub fn set_affinity<H: SimulatorHost>(
        &mut self,
        calling: Option<ThreadId>,
        thread: ThreadId,
        affinity: Option<Affinity>,
        host: &mut H,
    ) -> Result<()> {
        self.ensure_thread(thread);

        let affinity = affinity.unwrap_or(Affinity::Any);
        if let Affinity::Cores(cores) = &affinity {
            for &core in cores {
                if core.0 >= self.num_cores() {
                    bail!("invalid core {core} in affinity mask for thread {thread}");
                }
            }
        }
        self.threads[thread.0].affinity = Some(affinity);

        // Affinity set before creation: nothing else to do yet.
        if thread.0 >= host.num_threads() {
            return Ok(());
        }

        let info = &self.threads[thread.0];
        if calling == Some(thread) {
            // Yield the calling thread so it can be rescheduled.
            if let Some(core) = info.core_running {
                let when = host.core_elapsed_time(core).max(host.global_clock());
                host.reschedule(when, core, false);
            }
        } else if let Some(core) = info.core_running {
            if !info.affinity.as_ref().is_some_and(|a| a.allows(core)) {
                // Running somewhere it no longer belongs: preempt at
                // the next safe point.
                self.quantum_left[core.0] = 0;
            }
        } else if info.runnable {
            if let Some(core) = self.find_free_core_for_thread(thread) {
                let when = host.core_elapsed_time(core).max(host.global_clock());
                host.reschedule(when, core, false);
            }
        }
        Ok(())
    }

    /// Per-tick quantum accounting: cores whose quantum ran out (or
    /// that run no thread) are handed to the host for rotation and
    /// granted a fresh quantum; the rest are decremented.
    pub fn tick_quanta<H: SimulatorHost>(&mut self, delta: TimeNs, now: TimeNs, host: &mut H) {
        for core in 0..self.num_cores() {
            if self.core_thread_running[core].is_none() || delta > self.quantum_left[core] {
                host.reschedule(now, CoreId(core), true);
                self.quantum_left[core] = self.quantum_ns;
            } else {
                self.quantum_left[core] -= delta;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ThreadRunState;
    use crate::types::TaskId;

    struct StubHost {
        num_threads: usize,
        clock: TimeNs,
        reschedules: Vec<(TimeNs, CoreId, bool)>,
    }

    impl StubHost {
        fn new(num_threads: usize) -> Self {
            StubHost {
                num_threads,
                clock: 0,
                reschedules: Vec::new(),
            }
        }
    }

    impl SimulatorHost for StubHost {
        fn global_clock(&self) -> TimeNs {
            self.clock
        }
        fn num_threads(&self) -> usize {
            self.num_threads
        }
        fn task_of_thread(&self, thread: ThreadId) -> TaskId {
            TaskId(thread.0)
        }
        fn thread_state(&self, _thread: ThreadId) -> ThreadRunState {
            ThreadRunState::NotRunning
        }
        fn core_elapsed_time(&self, _core: CoreId) -> TimeNs {
            0
        }
        fn reschedule(&mut self, now: TimeNs, core: CoreId, quantum_expired: bool) {
            self.reschedules.push((now, core, quantum_expired));
        }
    }

    fn pinned(num_cores: usize) -> PinnedCore {
        PinnedCore::new(1_000, 1, vec![true; num_cores]).unwrap()
    }

    #[test]
    fn rejects_zero_interleaving_and_empty_mask() {
        assert!(PinnedCore::new(1_000, 0, vec![true; 4]).is_err());
        assert!(PinnedCore::new(1_000, 1, vec![false; 4]).is_err());
    }

    #[test]
    fn initial_affinity_round_robins_over_free_cores() {
        let mut p = pinned(4);
        assert_eq!(p.set_initial_affinity(ThreadId(0)), CoreId(0));
        p.start_thread_on(ThreadId(0), CoreId(0));
        assert_eq!(p.set_initial_affinity(ThreadId(1)), CoreId(1));
        p.start_thread_on(ThreadId(1), CoreId(1));
        assert_eq!(p.set_initial_affinity(ThreadId(2)), CoreId(2));
    }

    #[test]
    fn interleaving_stride_walks_lanes() {
        let mut p = PinnedCore::new(1_000, 2, vec![true; 8]).unwrap();
        for thread in 0..4 {
            let core = p.set_initial_affinity(ThreadId(thread));
            assert_eq!(core, CoreId(thread * 2));
            p.start_thread_on(ThreadId(thread), core);
        }
        // Even lane exhausted; the walk rotates to the odd lane.
        assert_eq!(p.set_initial_affinity(ThreadId(4)), CoreId(1));
    }

    #[test]
    fn initial_affinity_skips_masked_out_cores_on_walk() {
        let mut p = PinnedCore::new(1_000, 1, vec![true, false, true, true]).unwrap();
        assert_eq!(p.set_initial_affinity(ThreadId(0)), CoreId(0));
        p.start_thread_on(ThreadId(0), CoreId(0));
        assert_eq!(p.set_initial_affinity(ThreadId(1)), CoreId(2));
    }

    #[test]
    fn find_free_core_honors_affinity() {
        let mut p = pinned(4);
        let mut host = StubHost::new(2);
        p.mark_runnable(ThreadId(0));
        p.set_affinity(None, ThreadId(0), Some(Affinity::single(CoreId(2))), &mut host)
            .unwrap();
        assert_eq!(p.find_free_core_for_thread(ThreadId(0)), Some(CoreId(2)));

        p.start_thread_on(ThreadId(1), CoreId(2));
        assert_eq!(p.find_free_core_for_thread(ThreadId(0)), None);

        p.set_affinity(None, ThreadId(0), None, &mut host).unwrap();
        assert_eq!(p.find_free_core_for_thread(ThreadId(0)), Some(CoreId(0)));
    }

    #[test]
    fn parked_thread_matches_no_core() {
        let mut p = pinned(2);
        let mut host = StubHost::new(1);
        p.set_affinity(None, ThreadId(0), Some(Affinity::Parked), &mut host)
            .unwrap();
        assert_eq!(p.find_free_core_for_thread(ThreadId(0)), None);
    }

    #[test]
    fn affinity_for_uncreated_thread_is_recorded_only() {
        let mut p = pinned(2);
        let mut host = StubHost::new(1);
        p.mark_runnable(ThreadId(5));
        p.set_affinity(None, ThreadId(5), Some(Affinity::single(CoreId(1))), &mut host)
            .unwrap();
        assert!(p.has_affinity(ThreadId(5)));
        assert!(host.reschedules.is_empty());
    }

    #[test]
    fn runnable_thread_is_rescheduled_onto_matching_free_core() {
        let mut p = pinned(2);
        let mut host = StubHost::new(2);
        host.clock = 500;
        p.mark_runnable(ThreadId(1));
        p.set_affinity(None, ThreadId(1), Some(Affinity::single(CoreId(1))), &mut host)
            .unwrap();
        assert_eq!(host.reschedules, vec![(500, CoreId(1), false)]);
    }

    #[test]
    fn running_thread_moved_off_its_core_loses_its_quantum() {
        let mut p = pinned(2);
        let mut host = StubHost::new(2);
        p.mark_runnable(ThreadId(0));
        p.start_thread_on(ThreadId(0), CoreId(0));
        p.set_affinity(None, ThreadId(0), Some(Affinity::single(CoreId(1))), &mut host)
            .unwrap();
        assert_eq!(p.quantum_left[0], 0);
        assert!(host.reschedules.is_empty());
    }

    #[test]
    fn tick_quanta_rotates_expired_and_idle_cores() {
        let mut p = pinned(2);
        let mut host = StubHost::new(2);
        p.mark_runnable(ThreadId(0));
        p.start_thread_on(ThreadId(0), CoreId(0));

        // Core 0 still has quantum; core 1 runs nothing.
        p.tick_quanta(100, 100, &mut host);
        assert_eq!(p.quantum_left[0], 900);
        assert_eq!(host.reschedules, vec![(100, CoreId(1), true)]);

        // Expire core 0.
        host.reschedules.clear();
        p.tick_quanta(950, 1_050, &mut host);
        assert_eq!(
            host.reschedules,
            vec![(1_050, CoreId(0), true), (1_050, CoreId(1), true)]
        );
        assert_eq!(p.quantum_left[0], 1_000);
    }
}
