use crate::dom::NodeId;
use crate::{Error, Result};

/// What a due task does when it fires. The scheduler itself is engine-agnostic;
/// the page dispatches on this when draining the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TaskKind {
    TimerTick(NodeId),
    AggregateTick(NodeId),
    ElapsedWidgetTick,
    ClockTick,
    PulseClear { node: NodeId, class: String },
    AlertDismiss(NodeId),
    AlertRemove(NodeId),
    AdaptFrame,
    Rescan(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Task {
    pub(crate) id: i64,
    pub(crate) due_at: i64,
    pub(crate) order: i64,
    pub(crate) interval_ms: Option<i64>,
    pub(crate) kind: TaskKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: i64,
    pub due_at: i64,
    pub interval_ms: Option<i64>,
}

#[derive(Debug)]
pub(crate) struct Scheduler {
    tasks: Vec<Task>,
    now_ms: i64,
    step_limit: usize,
    next_timer_id: i64,
    next_order: i64,
    running_id: Option<i64>,
    running_canceled: bool,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            now_ms: 0,
            step_limit: 10_000,
            next_timer_id: 1,
            next_order: 0,
            running_id: None,
            running_canceled: false,
        }
    }
}

impl Scheduler {
    pub(crate) fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub(crate) fn set_now_ms(&mut self, now_ms: i64) {
        self.now_ms = now_ms;
    }

    pub(crate) fn advance_to(&mut self, target_ms: i64) -> Result<()> {
        if target_ms < self.now_ms {
            return Err(Error::Scheduler(format!(
                "advance target must be >= now_ms (target={target_ms}, now_ms={})",
                self.now_ms
            )));
        }
        self.now_ms = target_ms;
        Ok(())
    }

    pub(crate) fn step_limit(&self) -> usize {
        self.step_limit
    }

    pub(crate) fn set_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Scheduler(
                "step limit requires at least 1 step".into(),
            ));
        }
        self.step_limit = max_steps;
        Ok(())
    }

    pub(crate) fn schedule(
        &mut self,
        kind: TaskKind,
        delay_ms: i64,
        interval_ms: Option<i64>,
    ) -> i64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let order = self.next_order;
        self.next_order += 1;
        self.tasks.push(Task {
            id,
            due_at: self.now_ms.saturating_add(delay_ms.max(0)),
            order,
            interval_ms,
            kind,
        });
        id
    }

    pub(crate) fn cancel(&mut self, timer_id: i64) -> bool {
        if self.running_id == Some(timer_id) {
            self.running_canceled = true;
            return true;
        }
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != timer_id);
        before != self.tasks.len()
    }

    pub(crate) fn pending(&self) -> Vec<PendingTimer> {
        let mut timers: Vec<PendingTimer> = self
            .tasks
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                interval_ms: task.interval_ms,
            })
            .collect();
        timers.sort_by_key(|timer| (timer.due_at, timer.id));
        timers
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        let mut best: Option<(usize, i64, i64)> = None;
        for (idx, task) in self.tasks.iter().enumerate() {
            if let Some(limit) = due_limit {
                if task.due_at > limit {
                    continue;
                }
            }
            match best {
                Some((_, due, order)) if (task.due_at, task.order) >= (due, order) => {}
                _ => best = Some((idx, task.due_at, task.order)),
            }
        }
        best.map(|(idx, _, _)| idx)
    }

    /// Removes the next runnable task and marks it as running. The caller must
    /// pair this with `finish_running` so interval tasks re-arm.
    pub(crate) fn take_next(&mut self, due_limit: Option<i64>, advance_clock: bool) -> Option<Task> {
        let idx = self.next_task_index(due_limit)?;
        let task = self.tasks.remove(idx);
        if advance_clock && task.due_at > self.now_ms {
            self.now_ms = task.due_at;
        }
        self.running_id = Some(task.id);
        self.running_canceled = false;
        Some(task)
    }

    pub(crate) fn finish_running(&mut self, task: Task) {
        let canceled = self.running_canceled;
        self.running_id = None;
        self.running_canceled = false;
        if canceled {
            return;
        }
        if let Some(interval) = task.interval_ms {
            let order = self.next_order;
            self.next_order += 1;
            self.tasks.push(Task {
                id: task.id,
                due_at: self.now_ms.saturating_add(interval.max(1)),
                order,
                interval_ms: Some(interval),
                kind: task.kind,
            });
        }
    }
}
