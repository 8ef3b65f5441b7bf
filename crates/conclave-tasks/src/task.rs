use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::TaskResult;

/// Unique identifier of an enqueued task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task:{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    /// Accepts the bare uuid or the `task:` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("task:").unwrap_or(s);
        Ok(Self(Uuid::parse_str(raw)?))
    }
}

/// How a task reaches its consumer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Delivery {
    /// Delivered to the worker channel.
    Push,
    /// Parked on the named queue until leased.
    Pull { queue: String },
}

/// A unit of background work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub delivery: Delivery,
    pub payload: Value,
    pub enqueued_at: DateTime<Utc>,
    /// Deliveries so far: worker dispatches for push tasks, leases for
    /// pull tasks.
    #[serde(default)]
    pub attempts: u32,
}

impl Task {
    /// A push task with a JSON payload.
    pub fn push(name: impl Into<String>, payload: &impl Serialize) -> TaskResult<Self> {
        Self::build(name.into(), Delivery::Push, payload)
    }

    /// A pull task parked on `queue`.
    pub fn pull(
        name: impl Into<String>,
        queue: impl Into<String>,
        payload: &impl Serialize,
    ) -> TaskResult<Self> {
        Self::build(
            name.into(),
            Delivery::Pull {
                queue: queue.into(),
            },
            payload,
        )
    }

    fn build(name: String, delivery: Delivery, payload: &impl Serialize) -> TaskResult<Self> {
        Ok(Self {
            id: TaskId::new(),
            name,
            delivery,
            payload: serde_json::to_value(payload)?,
            enqueued_at: Utc::now(),
            attempts: 0,
        })
    }

    /// Decode the payload into `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> TaskResult<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}
