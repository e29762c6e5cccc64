//! Queue discipline: which task sits at the head of the wait queue.

use anyhow::{bail, Result};

use crate::task::TaskTable;
use crate::types::TaskId;

/// Admission-order policy over the execution queue. A pure function of
/// the task table snapshot, so adding a policy is an additive change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    /// Head of queue is the lowest task id in state `InQueue`.
    Fifo,
}

impl QueuePolicy {
    /// Resolve a configured policy name. Unknown names are fatal.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "FIFO" => Ok(QueuePolicy::Fifo),
            _ => bail!("configuration error: unknown queuing policy {name:?}"),
        }
    }

    /// The task id at the head of the queue, or `None` when the queue
    /// is empty.
    pub fn head_of_queue(&self, tasks: &TaskTable) -> Option<TaskId> {
        match self {
            QueuePolicy::Fifo => tasks.iter().find(|t| t.is_in_queue()).map(|t| t.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_policy_names() {
        assert_eq!(QueuePolicy::parse("FIFO").unwrap(), QueuePolicy::Fifo);
        assert!(QueuePolicy::parse("SJF").is_err());
        assert!(QueuePolicy::parse("fifo").is_err());
    }

    #[test]
    fn fifo_head_is_lowest_queued_id() {
        let mut tasks = TaskTable::from_benchmarks(
            "splash2-barnes-small-1+splash2-barnes-small-1+splash2-barnes-small-1+splash2-barnes-small-1",
            4,
        )
        .unwrap();
        let fifo = QueuePolicy::Fifo;
        assert_eq!(fifo.head_of_queue(&tasks), None);

        tasks.move_to_queue(TaskId(2));
        tasks.move_to_queue(TaskId(1));
        tasks.move_to_queue(TaskId(3));
        assert_eq!(fifo.head_of_queue(&tasks), Some(TaskId(1)));

        tasks.activate(TaskId(1), 0);
        assert_eq!(fifo.head_of_queue(&tasks), Some(TaskId(2)));

        tasks.activate(TaskId(2), 0);
        tasks.activate(TaskId(3), 0);
        assert_eq!(fifo.head_of_queue(&tasks), None);
    }
}
