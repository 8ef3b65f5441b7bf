//! Background tasks for Conclave.
//!
//! Request handlers enqueue follow-up work (notification mail, organiser
//! review) without waiting for it. Two delivery styles exist:
//!
//! - **Push** tasks are delivered over a bounded channel to a [`TaskWorker`],
//!   which dispatches each one to the [`TaskHandler`] registered for its name.
//! - **Pull** tasks are parked on a named queue until a consumer leases them
//!   with [`TaskQueue::lease`]. A lease hides the task for a while; the
//!   consumer acks it with [`TaskQueue::ack`] or it becomes visible again.
//!
//! Delivery is at-least-once: `enqueue` returns once the task is accepted,
//! failed push tasks are retried per the worker's [`RetryPolicy`], and
//! unacked pull tasks come back after their lease. Every task counts its
//! deliveries in [`Task::attempts`].

pub mod error;
pub mod queue;
pub mod task;
pub mod worker;

pub use error::{TaskError, TaskResult};
pub use queue::{InMemoryTaskQueue, TaskQueue, TaskReceiver};
pub use task::{Delivery, Task, TaskId};
pub use worker::{RetryPolicy, TaskHandler, TaskWorker};
