use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use conclave_store::{Entity, EntityStore, EntityStoreExt};
use conclave_tasks::{Task, TaskError, TaskHandler, TaskResult};
use conclave_types::{ConferenceId, DATE_FORMAT};

use crate::conference::Conference;
use crate::error::{CoreError, CoreResult};
use crate::profile::ProfileService;

/// Push task sent after a conference is scheduled.
pub const NOTIFY_TASK: &str = "notify-interested-users";
/// Pull task left for organisers to review a new conference.
pub const REVIEW_TASK: &str = "review-conference";
/// Pull queue holding [`REVIEW_TASK`] tasks.
pub const REVIEW_QUEUE: &str = "review-conference-queue";

/// A plain-text email.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub sender: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Outbound mail transport.
pub trait Mailer: Send + Sync {
    fn send(&self, message: &MailMessage) -> CoreResult<()>;
}

/// Writes every message to the log instead of delivering it.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: &MailMessage) -> CoreResult<()> {
        info!(
            from = %message.sender,
            to = ?message.to,
            subject = %message.subject,
            "mail sent"
        );
        Ok(())
    }
}

/// Keeps sent messages in memory.
#[derive(Debug, Default)]
pub struct InMemoryMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Mailer for InMemoryMailer {
    fn send(&self, message: &MailMessage) -> CoreResult<()> {
        self.sent
            .lock()
            .map_err(|_| CoreError::Mail("mailbox lock poisoned".into()))?
            .push(message.clone());
        Ok(())
    }
}

/// Tells attendees about new conferences on topics they follow.
pub struct Notifier {
    store: Arc<dyn EntityStore>,
    profiles: ProfileService,
    mailer: Arc<dyn Mailer>,
    sender: String,
}

impl Notifier {
    pub fn new(
        store: Arc<dyn EntityStore>,
        profiles: ProfileService,
        mailer: Arc<dyn Mailer>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            store,
            profiles,
            mailer,
            sender: sender.into(),
        }
    }

    /// Mail everyone interested in the conference's topic. Returns the number
    /// of recipients; no mail is sent when there are none.
    pub fn notify_interested_users(&self, conference_id: &ConferenceId) -> CoreResult<usize> {
        let conference = self
            .store
            .load::<Conference>(&Conference::key_for(conference_id))?
            .ok_or_else(|| CoreError::not_found("conference", conference_id))?;

        let recipients: BTreeSet<String> = self
            .profiles
            .interested_in(&conference.topic)?
            .iter()
            .map(|profile| profile.notify_address().to_string())
            .collect();
        if recipients.is_empty() {
            debug!(conference = %conference.id, topic = %conference.topic, "no interested users");
            return Ok(0);
        }

        let message = MailMessage {
            sender: self.sender.clone(),
            to: recipients.into_iter().collect(),
            subject: format!("Conference you might be interested in: {}", conference.name),
            body: format!(
                "Hi!\nWe want to let you know that a conference called {} has been scheduled \
                 to start on {} in {}. We thought you would like to know because you are \
                 interested in conferences about {}.",
                conference.name,
                conference.start_date.format(DATE_FORMAT),
                conference.city,
                conference.topic,
            ),
        };
        self.mailer.send(&message)?;
        info!(
            conference = %conference.id,
            recipients = message.to.len(),
            "interested users notified"
        );
        Ok(message.to.len())
    }
}

/// Runs [`NOTIFY_TASK`] tasks, whose payload is the conference id.
pub struct NotifyHandler {
    notifier: Arc<Notifier>,
}

impl NotifyHandler {
    pub fn new(notifier: Arc<Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl TaskHandler for NotifyHandler {
    async fn handle(&self, task: &Task) -> TaskResult<()> {
        let conference_id: ConferenceId = task.payload_as()?;
        self.notifier
            .notify_interested_users(&conference_id)
            .map(|_| ())
            .map_err(|e| TaskError::HandlerFailed {
                name: task.name.clone(),
                reason: e.to_string(),
            })
    }
}
