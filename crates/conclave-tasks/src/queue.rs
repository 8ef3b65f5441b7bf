use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{TaskError, TaskResult};
use crate::task::{Delivery, Task, TaskId};

/// Receiving half of the push channel, consumed by a
/// [`TaskWorker`](crate::TaskWorker).
pub type TaskReceiver = mpsc::Receiver<Task>;

/// Background task queue.
///
/// `enqueue` never blocks: a full push channel is reported as
/// [`TaskError::QueueFull`] so request handlers stay responsive.
pub trait TaskQueue: Send + Sync {
    /// Accept a task for delivery.
    fn enqueue(&self, task: Task) -> TaskResult<TaskId>;

    /// Lease up to `max` tasks from a pull queue, oldest first.
    ///
    /// Leased tasks stay hidden for `lease_for`. A task that is not
    /// [acked](TaskQueue::ack) before its lease runs out becomes visible
    /// again at the head of the queue.
    fn lease(&self, queue: &str, max: usize, lease_for: Duration) -> TaskResult<Vec<Task>>;

    /// Mark a leased task as done. Returns `false` when `id` is not leased
    /// on `queue`, including when its lease already ran out.
    fn ack(&self, queue: &str, id: &TaskId) -> TaskResult<bool>;
}

#[derive(Default)]
struct PullQueue {
    ready: VecDeque<Task>,
    leased: Vec<(Instant, Task)>,
}

impl PullQueue {
    /// Move tasks whose lease ran out back to the head of the queue, keeping
    /// their original order.
    fn reclaim(&mut self, now: Instant) {
        let (expired, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.leased)
            .into_iter()
            .partition(|(deadline, _)| *deadline <= now);
        self.leased = live;
        let mut expired: Vec<Task> = expired.into_iter().map(|(_, task)| task).collect();
        if expired.is_empty() {
            return;
        }
        expired.sort_by_key(|t| t.enqueued_at);
        for task in expired.into_iter().rev() {
            info!(task = %task.id, attempts = task.attempts, "lease expired, task requeued");
            self.ready.push_front(task);
        }
    }

    fn visible(&self, now: Instant) -> usize {
        self.ready.len() + self.leased.iter().filter(|(d, _)| *d <= now).count()
    }
}

/// In-process task queue.
///
/// Push tasks travel over a bounded tokio channel; pull tasks sit in
/// per-queue FIFOs behind a `RwLock`, with leased tasks held aside until
/// they are acked or their lease runs out.
pub struct InMemoryTaskQueue {
    push: mpsc::Sender<Task>,
    pull: RwLock<HashMap<String, PullQueue>>,
}

impl InMemoryTaskQueue {
    /// Create a queue whose push channel holds at most `capacity` tasks.
    /// Returns the queue and the receiver to hand to a worker.
    pub fn new(capacity: usize) -> (Self, TaskReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queue = Self {
            push: tx,
            pull: RwLock::new(HashMap::new()),
        };
        (queue, rx)
    }

    /// Number of tasks a lease on `queue` could return right now.
    pub fn pending(&self, queue: &str) -> usize {
        let now = Instant::now();
        self.pull
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(queue)
            .map_or(0, |q| q.visible(now))
    }

    /// Number of tasks on `queue` under a lease that has not run out.
    pub fn in_flight(&self, queue: &str) -> usize {
        let now = Instant::now();
        self.pull
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(queue)
            .map_or(0, |q| q.leased.iter().filter(|(d, _)| *d > now).count())
    }

    fn pull_queues(&self) -> TaskResult<RwLockWriteGuard<'_, HashMap<String, PullQueue>>> {
        self.pull
            .write()
            .map_err(|_| TaskError::Unavailable("pull queue lock poisoned".into()))
    }
}

impl TaskQueue for InMemoryTaskQueue {
    fn enqueue(&self, task: Task) -> TaskResult<TaskId> {
        let id = task.id;
        match &task.delivery {
            Delivery::Push => {
                let name = task.name.clone();
                self.push.try_send(task).map_err(|e| match e {
                    mpsc::error::TrySendError::Full(_) => TaskError::QueueFull,
                    mpsc::error::TrySendError::Closed(_) => TaskError::Closed,
                })?;
                debug!(task = %id, name = %name, "push task enqueued");
            }
            Delivery::Pull { queue } => {
                let queue = queue.clone();
                let mut pull = self.pull_queues()?;
                debug!(task = %id, name = %task.name, queue = %queue, "pull task enqueued");
                pull.entry(queue).or_default().ready.push_back(task);
            }
        }
        Ok(id)
    }

    fn lease(&self, queue: &str, max: usize, lease_for: Duration) -> TaskResult<Vec<Task>> {
        let mut pull = self.pull_queues()?;
        let Some(pending) = pull.get_mut(queue) else {
            return Ok(Vec::new());
        };
        let now = Instant::now();
        pending.reclaim(now);
        let deadline = now + lease_for;
        let take = max.min(pending.ready.len());
        let leased: Vec<Task> = pending
            .ready
            .drain(..take)
            .map(|mut task| {
                task.attempts += 1;
                task
            })
            .collect();
        pending
            .leased
            .extend(leased.iter().map(|task| (deadline, task.clone())));
        debug!(queue, count = leased.len(), "pull tasks leased");
        Ok(leased)
    }

    fn ack(&self, queue: &str, id: &TaskId) -> TaskResult<bool> {
        let mut pull = self.pull_queues()?;
        let Some(pending) = pull.get_mut(queue) else {
            return Ok(false);
        };
        let now = Instant::now();
        pending.reclaim(now);
        let before = pending.leased.len();
        pending.leased.retain(|(_, task)| task.id != *id);
        let acked = pending.leased.len() < before;
        if acked {
            debug!(task = %id, queue, "pull task acked");
        }
        Ok(acked)
    }
}

impl std::fmt::Debug for InMemoryTaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queues = self
            .pull
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("InMemoryTaskQueue")
            .field("push_capacity", &self.push.max_capacity())
            .field("pull_queues", &queues)
            .finish()
    }
}
