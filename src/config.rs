//! Scheduler configuration surface.
//!
//! The host simulator parses its own configuration files; this crate
//! receives the result as a plain struct. Stringly-typed values
//! (distribution, queue policy, mapping policy) are validated into
//! closed enums at scheduler construction, so an unknown name fails
//! before any simulated time elapses.

use crate::arrival::ArrivalDistribution;
use crate::queue::QueuePolicy;
use crate::types::{CoreId, TimeNs};

/// All configuration the scheduler consumes.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Per-core quantum before the pinned core rotates threads (ns).
    pub quantum_ns: TimeNs,
    /// Stride of the initial-affinity round-robin walk.
    pub interleaving: usize,
    /// One flag per core: whether the core takes part in scheduling.
    /// The length of this vector defines the system size.
    pub core_mask: Vec<bool>,
    /// Interval of the mapping pass in the periodic tick (ns).
    pub mapping_epoch_ns: TimeNs,
    pub queue_policy: QueuePolicy,
    pub distribution: ArrivalDistribution,
    /// Batch size for the uniform and poisson distributions.
    pub arrival_rate: usize,
    /// Fixed inter-batch gap (uniform) or exponential mean (poisson), ns.
    pub arrival_interval_ns: TimeNs,
    /// Per-task arrival times for the explicit distribution.
    pub explicit_arrival_times: Vec<TimeNs>,
    /// Poisson seed; 0 draws a fresh seed from the host entropy source.
    pub distribution_seed: u64,
    /// Mapping policy name, resolved by the policy factory.
    pub mapping_logic: String,
    /// Preferred core order for the first-unused policy.
    pub preferred_cores: Vec<CoreId>,
    /// `+`-joined composition strings, one per task.
    pub benchmarks: String,
    pub num_tasks: usize,
}

impl SchedulerConfig {
    /// A configuration with workable defaults: full core mask, FIFO
    /// queue, uniform arrivals in batches of one, first-unused mapping
    /// with no preferred order. Hosts overwrite each field from their
    /// own configuration system.
    pub fn new(num_cores: usize, num_tasks: usize) -> Self {
        SchedulerConfig {
            quantum_ns: 1_000_000,
            interleaving: 1,
            core_mask: vec![true; num_cores],
            mapping_epoch_ns: 1_000_000,
            queue_policy: QueuePolicy::Fifo,
            distribution: ArrivalDistribution::Uniform,
            arrival_rate: 1,
            arrival_interval_ns: 1_000,
            explicit_arrival_times: Vec::new(),
            distribution_seed: 42,
            mapping_logic: "first_unused".to_string(),
            preferred_cores: Vec::new(),
            benchmarks: String::new(),
            num_tasks,
        }
    }

    pub fn num_cores(&self) -> usize {
        self.core_mask.len()
    }
}

/// Cut a raw preferred-core array at the first `-1` terminator, the
/// way the configuration file encodes a variable-length list.
pub fn preferred_cores_from_raw(raw: &[i64]) -> Vec<CoreId> {
    raw.iter()
        .take_while(|&&c| c != -1)
        .map(|&c| CoreId(c as usize))
        .collect()
}
