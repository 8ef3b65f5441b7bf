use std::sync::Arc;
use std::time::Duration;

use conclave_cache::KeyValueCache;
use conclave_store::{AtomicPolicy, EntityStore};
use conclave_tasks::{RetryPolicy, TaskQueue, TaskReceiver, TaskWorker};

use crate::announcement::{AnnouncementService, DEFAULT_ANNOUNCEMENT_TTL};
use crate::notify::{Mailer, NotifyHandler, Notifier, NOTIFY_TASK};
use crate::profile::ProfileService;
use crate::sale::TicketSale;
use crate::service::ConferenceService;

/// Tunables shared by the services.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub policy: AtomicPolicy,
    pub announcement_ttl: Duration,
    /// `From` address of notification mail.
    pub sender: String,
    /// Retries of failed push tasks such as notification mail.
    pub task_retry: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            policy: AtomicPolicy::default(),
            announcement_ttl: DEFAULT_ANNOUNCEMENT_TTL,
            sender: "noreply@conclave.local".into(),
            task_retry: RetryPolicy::default(),
        }
    }
}

/// Every Conclave service wired to one set of backends.
pub struct Conclave {
    pub conferences: ConferenceService,
    pub sales: TicketSale,
    pub profiles: ProfileService,
    pub announcements: Arc<AnnouncementService>,
    pub notifier: Arc<Notifier>,
    task_retry: RetryPolicy,
}

impl Conclave {
    pub fn new(
        store: Arc<dyn EntityStore>,
        cache: Arc<dyn KeyValueCache>,
        tasks: Arc<dyn TaskQueue>,
        mailer: Arc<dyn Mailer>,
        settings: Settings,
    ) -> Self {
        let policy = settings.policy;
        let announcements = Arc::new(AnnouncementService::new(
            store.clone(),
            cache,
            settings.announcement_ttl,
        ));
        let notifier = Arc::new(Notifier::new(
            store.clone(),
            ProfileService::new(store.clone(), policy),
            mailer,
            settings.sender,
        ));
        Self {
            conferences: ConferenceService::new(
                store.clone(),
                tasks,
                announcements.clone(),
                policy,
            ),
            sales: TicketSale::new(store.clone(), policy),
            profiles: ProfileService::new(store, policy),
            announcements,
            notifier,
            task_retry: settings.task_retry,
        }
    }

    /// A worker that runs this instance's push tasks.
    pub fn worker(&self, receiver: TaskReceiver) -> TaskWorker {
        TaskWorker::new(receiver)
            .with_retry(self.task_retry)
            .register(NOTIFY_TASK, Arc::new(NotifyHandler::new(self.notifier.clone())))
    }
}
