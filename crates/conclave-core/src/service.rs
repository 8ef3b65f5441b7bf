use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use conclave_store::{
    run_atomic, AtomicPolicy, Entity, EntityStore, EntityStoreExt, FilterOp, Query,
};
use conclave_tasks::{Task, TaskQueue, TaskResult};
use conclave_types::{ConferenceId, Email, TicketState};

use crate::announcement::AnnouncementService;
use crate::conference::{Conference, ConferenceParams};
use crate::error::{CoreError, CoreResult};
use crate::notify::{NOTIFY_TASK, REVIEW_QUEUE, REVIEW_TASK};
use crate::ticket::Ticket;

/// Criteria for [`ConferenceService::list`]. Unset fields do not filter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceFilter {
    pub city: Option<String>,
    pub topic: Option<String>,
    pub organizer: Option<Email>,
    /// Only conferences with strictly more seats than this.
    pub min_attendees: Option<u32>,
    #[serde(default)]
    pub order_by_name: bool,
}

impl ConferenceFilter {
    fn to_query(&self) -> Query {
        let mut query = Query::new(Conference::KIND);
        if let Some(city) = &self.city {
            query = query.eq("city", city.as_str());
        }
        if let Some(topic) = &self.topic {
            query = query.eq("topic", topic.as_str());
        }
        if let Some(organizer) = &self.organizer {
            query = query.eq("organizer", organizer.as_str());
        }
        if let Some(min) = self.min_attendees {
            query = query.filter("max_attendees", FilterOp::Gt, min);
        }
        if self.order_by_name {
            query = query.order_by("name");
        }
        query
    }
}

/// A titled conference listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConferenceList {
    pub title: String,
    pub conferences: Vec<Conference>,
}

/// Schedules and lists conferences.
pub struct ConferenceService {
    store: Arc<dyn EntityStore>,
    tasks: Arc<dyn TaskQueue>,
    announcements: Arc<AnnouncementService>,
    policy: AtomicPolicy,
}

impl ConferenceService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        tasks: Arc<dyn TaskQueue>,
        announcements: Arc<AnnouncementService>,
        policy: AtomicPolicy,
    ) -> Self {
        Self {
            store,
            tasks,
            announcements,
            policy,
        }
    }

    /// Validate and persist a conference together with all of its tickets,
    /// then announce it and queue the follow-up tasks.
    ///
    /// The conference and its tickets become visible in one commit. The
    /// announcement and the tasks are best effort.
    pub fn schedule(&self, organizer: &Email, params: ConferenceParams) -> CoreResult<Conference> {
        let conference = Conference::create(params, organizer.clone())?;
        let tickets = Ticket::create_batch(&conference, conference.max_attendees);
        let key = conference.key();

        run_atomic(self.store.as_ref(), &self.policy, |tx| {
            if tx.get::<Conference>(&key)?.is_some() {
                return Err(CoreError::Validation(format!(
                    "conference {} already exists",
                    conference.id
                )));
            }
            tx.put(&conference)?;
            for ticket in &tickets {
                tx.put(ticket)?;
            }
            Ok::<_, CoreError>(())
        })
        .map_err(|e| match e {
            CoreError::Store(inner) => CoreError::TransactionFailed(inner.to_string()),
            other => other,
        })?;

        info!(
            conference = %conference.id,
            organizer = %organizer,
            tickets = tickets.len(),
            "conference scheduled"
        );

        let message = format!(
            "A new conference has just been scheduled! {} in {}. Don't wait; book now!",
            conference.name, conference.city
        );
        if let Err(e) = self.announcements.post(message) {
            warn!(conference = %conference.id, error = %e, "announcement failed");
        }
        self.enqueue(Task::push(NOTIFY_TASK, &conference.id), &conference.id);
        self.enqueue(
            Task::pull(REVIEW_TASK, REVIEW_QUEUE, &conference.id),
            &conference.id,
        );

        Ok(conference)
    }

    fn enqueue(&self, task: TaskResult<Task>, conference: &ConferenceId) {
        if let Err(e) = task.and_then(|task| self.tasks.enqueue(task)) {
            warn!(conference = %conference, error = %e, "follow-up task not queued");
        }
    }

    pub fn get(&self, id: &ConferenceId) -> CoreResult<Conference> {
        self.store
            .load::<Conference>(&Conference::key_for(id))?
            .ok_or_else(|| CoreError::not_found("conference", id))
    }

    pub fn list(&self, filter: &ConferenceFilter) -> CoreResult<Vec<Conference>> {
        Ok(self.store.find(&filter.to_query())?)
    }

    /// The fixed set of listings shown on the conference overview, plus one
    /// restricted to conferences organised by `viewer`.
    pub fn standard_lists(&self, viewer: &Email) -> CoreResult<Vec<ConferenceList>> {
        let london = || ConferenceFilter {
            city: Some("London".into()),
            ..Default::default()
        };
        let medical_in_london = || ConferenceFilter {
            topic: Some("Medical Innovations".into()),
            ..london()
        };
        let lists = [
            ("All Conferences".to_string(), ConferenceFilter::default()),
            (
                "All Conferences Sorted Alphabetically".to_string(),
                ConferenceFilter {
                    order_by_name: true,
                    ..Default::default()
                },
            ),
            (
                "All Conferences In London sorted Alphabetically".to_string(),
                ConferenceFilter {
                    order_by_name: true,
                    ..london()
                },
            ),
            (
                "All Conferences About Medical Innovations In London".to_string(),
                medical_in_london(),
            ),
            (
                "All conferences With 50 or more attendees".to_string(),
                ConferenceFilter {
                    min_attendees: Some(50),
                    ..Default::default()
                },
            ),
            (
                format!("All conferences About Medical Innovations in London with {viewer}"),
                ConferenceFilter {
                    organizer: Some(viewer.clone()),
                    ..medical_in_london()
                },
            ),
        ];

        lists
            .into_iter()
            .map(|(title, filter)| {
                Ok(ConferenceList {
                    title,
                    conferences: self.list(&filter)?,
                })
            })
            .collect()
    }

    /// Unsold tickets of a conference, by seat number.
    pub fn available_tickets(&self, id: &ConferenceId) -> CoreResult<Vec<Ticket>> {
        let conference = self.get(id)?;
        let query = Query::new(Ticket::KIND)
            .ancestor(conference.key())
            .eq("state", TicketState::Available.as_str())
            .order_by("number");
        Ok(self.store.find(&query)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::announcement::DEFAULT_ANNOUNCEMENT_TTL;
    use crate::conference::tests::params;
    use crate::sale::TicketSale;
    use crate::testing::FailingStore;
    use conclave_cache::InMemoryCache;
    use conclave_store::InMemoryEntityStore;
    use conclave_tasks::{Delivery, InMemoryTaskQueue, TaskReceiver};

    struct Fixture {
        store: Arc<InMemoryEntityStore>,
        queue: Arc<InMemoryTaskQueue>,
        receiver: TaskReceiver,
        announcements: Arc<AnnouncementService>,
        service: ConferenceService,
    }

    fn fixture_on(
        store: Arc<dyn EntityStore>,
        inner: Arc<InMemoryEntityStore>,
        capacity: usize,
    ) -> Fixture {
        let (queue, receiver) = InMemoryTaskQueue::new(capacity);
        let queue = Arc::new(queue);
        let announcements = Arc::new(AnnouncementService::new(
            inner.clone(),
            Arc::new(InMemoryCache::new()),
            DEFAULT_ANNOUNCEMENT_TTL,
        ));
        let service = ConferenceService::new(
            store,
            queue.clone(),
            announcements.clone(),
            AtomicPolicy::default(),
        );
        Fixture {
            store: inner,
            queue,
            receiver,
            announcements,
            service,
        }
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryEntityStore::new());
        fixture_on(store.clone(), store, 16)
    }

    fn email(raw: &str) -> Email {
        Email::parse(raw).unwrap()
    }

    fn schedule(
        f: &Fixture,
        name: &str,
        city: &str,
        topic: &str,
        max: i64,
        by: &str,
    ) -> Conference {
        let mut p = params(name, max);
        p.city = city.into();
        p.topic = topic.into();
        f.service.schedule(&email(by), p).unwrap()
    }

    // ---- Scheduling ----

    #[test]
    fn schedule_creates_conference_with_full_ticket_set() {
        let f = fixture();
        let conf = f
            .service
            .schedule(&email("org@example.com"), params("RustConf", 5))
            .unwrap();

        let stored = f.service.get(&conf.id).unwrap();
        assert_eq!(stored.tickets_available(), 5);

        let tickets = f.service.available_tickets(&conf.id).unwrap();
        let numbers: Vec<u32> = tickets.iter().map(|t| t.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(f.store.count(Ticket::KIND), 5);
    }

    #[test]
    fn schedule_announces_and_queues_follow_up_work() {
        let mut f = fixture();
        let conf = f
            .service
            .schedule(&email("org@example.com"), params("RustConf", 1))
            .unwrap();

        let latest = f.announcements.latest().unwrap().unwrap();
        assert_eq!(
            latest.message,
            "A new conference has just been scheduled! RustConf in London. Don't wait; book now!"
        );

        let pushed = f.receiver.try_recv().unwrap();
        assert_eq!(pushed.name, NOTIFY_TASK);
        assert_eq!(pushed.payload_as::<ConferenceId>().unwrap(), conf.id);

        let review = f
            .queue
            .lease(REVIEW_QUEUE, 10, Duration::from_secs(60))
            .unwrap();
        assert_eq!(review.len(), 1);
        assert_eq!(review[0].name, REVIEW_TASK);
        assert_eq!(
            review[0].delivery,
            Delivery::Pull {
                queue: REVIEW_QUEUE.into()
            }
        );
    }

    #[test]
    fn schedule_rejects_invalid_input_without_writing() {
        let f = fixture();
        let err = f
            .service
            .schedule(&email("org@example.com"), params("Bad", -3))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(f.store.is_empty());
    }

    #[test]
    fn failed_commit_leaves_nothing_visible() {
        let inner = Arc::new(InMemoryEntityStore::new());
        let failing = Arc::new(FailingStore::new(inner.clone()));
        let mut f = fixture_on(failing, inner, 16);

        let err = f
            .service
            .schedule(&email("org@example.com"), params("Ghost", 5))
            .unwrap_err();
        assert!(matches!(err, CoreError::TransactionFailed(_)));
        assert_eq!(f.store.count(Conference::KIND), 0);
        assert_eq!(f.store.count(Ticket::KIND), 0);
        assert!(f.announcements.latest().unwrap().is_none());
        assert!(f.receiver.try_recv().is_err());
    }

    #[test]
    fn full_task_queue_does_not_fail_scheduling() {
        let store = Arc::new(InMemoryEntityStore::new());
        let f = fixture_on(store.clone(), store, 1);
        schedule(&f, "One", "London", "Movie Making", 1, "org@example.com");
        schedule(&f, "Two", "London", "Movie Making", 1, "org@example.com");
        assert_eq!(f.store.count(Conference::KIND), 2);
        assert_eq!(f.queue.pending(REVIEW_QUEUE), 2);
    }

    // ---- Queries ----

    #[test]
    fn unknown_conference_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.service.get(&ConferenceId::new()),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            f.service.available_tickets(&ConferenceId::new()),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn list_applies_every_filter() {
        let f = fixture();
        schedule(&f, "Beta", "London", "Medical Innovations", 60, "a@example.com");
        schedule(&f, "Alpha", "London", "Movie Making", 10, "b@example.com");
        schedule(&f, "Gamma", "Paris", "Medical Innovations", 51, "a@example.com");

        let names = |filter: ConferenceFilter| -> Vec<String> {
            f.service
                .list(&filter)
                .unwrap()
                .into_iter()
                .map(|c| c.name)
                .collect()
        };

        assert_eq!(
            names(ConferenceFilter {
                city: Some("London".into()),
                order_by_name: true,
                ..Default::default()
            }),
            vec!["Alpha", "Beta"]
        );
        assert_eq!(
            names(ConferenceFilter {
                topic: Some("Medical Innovations".into()),
                order_by_name: true,
                ..Default::default()
            }),
            vec!["Beta", "Gamma"]
        );
        assert_eq!(
            names(ConferenceFilter {
                organizer: Some(email("b@example.com")),
                ..Default::default()
            }),
            vec!["Alpha"]
        );
        assert_eq!(
            names(ConferenceFilter {
                min_attendees: Some(51),
                ..Default::default()
            }),
            vec!["Beta"]
        );
    }

    #[test]
    fn standard_lists_match_overview() {
        let f = fixture();
        schedule(&f, "Heart", "London", "Medical Innovations", 60, "me@example.com");
        schedule(&f, "Lungs", "London", "Medical Innovations", 20, "you@example.com");
        schedule(&f, "Film", "Paris", "Movie Making", 50, "me@example.com");

        let lists = f.service.standard_lists(&email("me@example.com")).unwrap();
        let titles: Vec<&str> = lists.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "All Conferences",
                "All Conferences Sorted Alphabetically",
                "All Conferences In London sorted Alphabetically",
                "All Conferences About Medical Innovations In London",
                "All conferences With 50 or more attendees",
                "All conferences About Medical Innovations in London with me@example.com",
            ]
        );

        let names = |i: usize| -> Vec<&str> {
            lists[i].conferences.iter().map(|c| c.name.as_str()).collect()
        };
        assert_eq!(names(0).len(), 3);
        assert_eq!(names(1), vec!["Film", "Heart", "Lungs"]);
        assert_eq!(names(2), vec!["Heart", "Lungs"]);
        assert_eq!(names(3).len(), 2);
        assert_eq!(names(4), vec!["Heart"]);
        assert_eq!(names(5), vec!["Heart"]);
    }

    #[test]
    fn available_tickets_exclude_sold_seats() {
        let f = fixture();
        let conf = schedule(&f, "RustConf", "London", "Movie Making", 3, "org@example.com");
        let tickets = f.service.available_tickets(&conf.id).unwrap();

        TicketSale::new(f.store.clone(), AtomicPolicy::default())
            .execute(&tickets[1].id, &email("alice@example.com"))
            .unwrap();

        let left: Vec<u32> = f
            .service
            .available_tickets(&conf.id)
            .unwrap()
            .iter()
            .map(|t| t.number)
            .collect();
        assert_eq!(left, vec![1, 3]);
        assert_eq!(f.service.get(&conf.id).unwrap().tickets_available(), 2);
    }

    #[test]
    fn tickets_of_other_conferences_are_not_listed() {
        let f = fixture();
        let a = schedule(&f, "A", "London", "Movie Making", 2, "org@example.com");
        schedule(&f, "B", "London", "Movie Making", 4, "org@example.com");
        let tickets = f.service.available_tickets(&a.id).unwrap();
        assert_eq!(tickets.len(), 2);
        assert!(tickets.iter().all(|t| t.conference_id == a.id));
    }
}
