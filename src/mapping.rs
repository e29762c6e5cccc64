//! Spatial mapping policies: which cores a task's threads occupy.

use anyhow::{bail, Result};

use crate::config::SchedulerConfig;
use crate::grid::CoreGrid;
use crate::profile::TaskName;
use crate::types::CoreId;

/// A mapping policy picks cores for a task on the grid.
///
/// `available[c]` means core `c` is inside the configured mask and
/// free; `active[c]` means core `c` is currently assigned to some
/// task. The returned list is ordered: the task's threads bind to the
/// cores in this order. Returning fewer than `core_requirement` cores
/// means the policy declines to map right now; the caller must leave
/// every table untouched and retry later.
pub trait MappingPolicy {
    fn map(
        &self,
        task: &TaskName,
        core_requirement: u32,
        available: &[bool],
        active: &[bool],
    ) -> Vec<CoreId>;
}

/// Instantiate the configured mapping policy. The grid is passed so
/// topology-aware policies can capture its geometry. Unknown names are
/// fatal.
pub fn policy_from_name(cfg: &SchedulerConfig, _grid: &CoreGrid) -> Result<Box<dyn MappingPolicy>> {
    match cfg.mapping_logic.as_str() {
        "first_unused" => Ok(Box::new(FirstUnused::new(cfg.preferred_cores.clone()))),
        other => bail!("configuration error: unknown mapping algorithm {other:?}"),
    }
}

/// Pick the first available cores, honoring a preferred order.
///
/// Cores from `preferred` are taken first, in list order; if those do
/// not cover the requirement the remaining available cores are taken
/// in natural index order. A short result signals refusal.
pub struct FirstUnused {
    preferred: Vec<CoreId>,
}

impl FirstUnused {
    pub fn new(preferred: Vec<CoreId>) -> Self {
        FirstUnused { preferred }
    }
}

impl MappingPolicy for FirstUnused {
    fn map(
        &self,
        _task: &TaskName,
        core_requirement: u32,
        available: &[bool],
        _active: &[bool],
    ) -> Vec<CoreId> {
        let want = core_requirement as usize;
        let mut taken = vec![false; available.len()];
        let mut cores = Vec::with_capacity(want);

        for &core in &self.preferred {
            if cores.len() == want {
                break;
            }
            if available.get(core.0).copied().unwrap_or(false) && !taken[core.0] {
                taken[core.0] = true;
                cores.push(core);
            }
        }
        for (i, &avail) in available.iter().enumerate() {
            if cores.len() == want {
                break;
            }
            if avail && !taken[i] {
                taken[i] = true;
                cores.push(CoreId(i));
            }
        }
        cores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> TaskName {
        TaskName::parse("parsec-blackscholes-simsmall-2").unwrap()
    }

    fn first_unused(preferred: Vec<CoreId>) -> FirstUnused {
        FirstUnused::new(preferred)
    }

    #[test]
    fn takes_preferred_cores_first() {
        let policy = first_unused(vec![CoreId(3), CoreId(1)]);
        let available = vec![true, true, true, true];
        let active = vec![false; 4];
        assert_eq!(
            policy.map(&task(), 3, &available, &active),
            vec![CoreId(3), CoreId(1), CoreId(0)]
        );
    }

    #[test]
    fn falls_back_to_natural_order() {
        let policy = first_unused(Vec::new());
        let available = vec![false, true, false, true];
        let active = vec![true, false, true, false];
        assert_eq!(
            policy.map(&task(), 2, &available, &active),
            vec![CoreId(1), CoreId(3)]
        );
    }

    #[test]
    fn skips_unavailable_preferred_cores() {
        let policy = first_unused(vec![CoreId(0), CoreId(2)]);
        let available = vec![false, true, true, true];
        let active = vec![true, false, false, false];
        assert_eq!(
            policy.map(&task(), 2, &available, &active),
            vec![CoreId(2), CoreId(1)]
        );
    }

    #[test]
    fn short_result_signals_refusal() {
        let policy = first_unused(Vec::new());
        let available = vec![true, false, false, true];
        let active = vec![false, true, true, false];
        let cores = policy.map(&task(), 3, &available, &active);
        assert_eq!(cores, vec![CoreId(0), CoreId(3)]);
    }

    #[test]
    fn duplicate_preferred_entries_are_taken_once() {
        let policy = first_unused(vec![CoreId(1), CoreId(1), CoreId(0)]);
        let available = vec![true, true, false, false];
        let active = vec![false, false, true, true];
        assert_eq!(
            policy.map(&task(), 2, &available, &active),
            vec![CoreId(1), CoreId(0)]
        );
    }

    #[test]
    fn unknown_policy_name_is_fatal() {
        let grid = CoreGrid::new(&[true; 4]).unwrap();
        let mut cfg = SchedulerConfig::new(4, 1);
        cfg.mapping_logic = "hottest_first".to_string();
        assert!(policy_from_name(&cfg, &grid).is_err());
    }
}
