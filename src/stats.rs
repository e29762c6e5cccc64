//! Response-time metrics and `[Result]` reporting.
//!
//! `[Result]` lines go to stdout verbatim; downstream tooling extracts
//! them from the simulation log.

use crate::task::{Task, TaskTable};
use crate::types::TimeNs;

/// Timing breakdown of one completed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTimes {
    /// `departure − arrival`.
    pub response: TimeNs,
    /// `departure − start`.
    pub service: TimeNs,
    /// `start − arrival`.
    pub wait: TimeNs,
}

/// The timing breakdown of a task, once it has started and departed.
pub fn task_times(task: &Task) -> Option<TaskTimes> {
    let start = task.start_time?;
    let departure = task.departure_time?;
    Some(TaskTimes {
        response: departure - task.arrival_time,
        service: departure - start,
        wait: start - task.arrival_time,
    })
}

/// Mean response time over all completed tasks (integer division, like
/// the result consumers expect).
pub fn average_response(tasks: &TaskTable) -> TimeNs {
    if tasks.is_empty() {
        return 0;
    }
    let total: TimeNs = tasks
        .iter()
        .filter_map(|t| task_times(t).map(|times| times.response))
        .sum();
    total / tasks.len() as TimeNs
}

/// Emit the per-task `[Result]` line on completion.
pub fn report_task(task: &Task) {
    if let Some(times) = task_times(task) {
        println!(
            "[Result]: Task {} (Response/Service/Wait) Time (ns) :\t{}\t{}\t{}",
            task.id, times.response, times.service, times.wait
        );
    }
}

/// Emit the final `[Result]` line once every task has completed.
pub fn report_average(tasks: &TaskTable) {
    println!(
        "[Result]: Average Response Time (ns) :\t{}",
        average_response(tasks)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskId;

    #[test]
    fn breaks_down_response_service_and_wait() {
        let mut tasks =
            TaskTable::from_benchmarks("splash2-barnes-small-1+splash2-barnes-small-1", 2).unwrap();
        tasks.get_mut(TaskId(0)).arrival_time = 100;
        tasks.move_to_queue(TaskId(0));
        tasks.activate(TaskId(0), 250);
        tasks.complete(TaskId(0), 1_000);

        let times = task_times(tasks.get(TaskId(0))).unwrap();
        assert_eq!(times.response, 900);
        assert_eq!(times.service, 750);
        assert_eq!(times.wait, 150);

        // The still-pending task contributes nothing yet.
        assert_eq!(average_response(&tasks), 450);
    }

    #[test]
    fn incomplete_tasks_have_no_times() {
        let mut tasks = TaskTable::from_benchmarks("splash2-barnes-small-1", 1).unwrap();
        assert!(task_times(tasks.get(TaskId(0))).is_none());
        tasks.move_to_queue(TaskId(0));
        tasks.activate(TaskId(0), 10);
        assert!(task_times(tasks.get(TaskId(0))).is_none());
    }
}
