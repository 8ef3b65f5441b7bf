use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use conclave_store::{run_atomic, AtomicPolicy, Entity, EntityStore, EntityStoreExt, Query};
use conclave_types::Email;

use crate::error::{CoreError, CoreResult};
use crate::ticket::Ticket;

/// A registered attendee.
///
/// The profile document stores only what the attendee edits. Owned tickets
/// are not stored here; [`ProfileService`] attaches them from a ticket query
/// on every load, and the sale transaction attaches the ticket it just sold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub main_email: Email,
    pub name: String,
    /// Where notifications go. Empty means "use the main email".
    pub notification_email: String,
    pub topics: Vec<String>,
    #[serde(skip)]
    tickets: Vec<Ticket>,
}

impl UserProfile {
    /// An empty profile keyed by `email`.
    pub fn new(email: Email) -> Self {
        Self {
            main_email: email,
            name: String::new(),
            notification_email: String::new(),
            topics: Vec::new(),
            tickets: Vec::new(),
        }
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    /// Record `ticket` as owned. A ticket already present is replaced.
    pub fn add_ticket(&mut self, ticket: Ticket) {
        match self.tickets.iter_mut().find(|t| t.id == ticket.id) {
            Some(existing) => *existing = ticket,
            None => self.tickets.push(ticket),
        }
    }

    pub fn interested_in(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t == topic)
    }

    /// Distinct names of conferences this attendee holds tickets for.
    pub fn attending(&self) -> Vec<String> {
        self.tickets
            .iter()
            .map(|t| t.conference_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Address notifications should be sent to.
    pub fn notify_address(&self) -> &str {
        if self.notification_email.trim().is_empty() {
            self.main_email.as_str()
        } else {
            self.notification_email.trim()
        }
    }

    pub(crate) fn with_tickets(mut self, tickets: Vec<Ticket>) -> Self {
        self.tickets = tickets;
        self
    }
}

impl Entity for UserProfile {
    const KIND: &'static str = "UserProfile";

    fn id(&self) -> String {
        self.main_email.to_string()
    }
}

/// Editable profile fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub notification_email: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Loads and saves user profiles.
pub struct ProfileService {
    store: Arc<dyn EntityStore>,
    policy: AtomicPolicy,
}

impl ProfileService {
    pub fn new(store: Arc<dyn EntityStore>, policy: AtomicPolicy) -> Self {
        Self { store, policy }
    }

    /// Return the profile for `email`, creating and persisting an empty one
    /// on first access.
    pub fn load_or_create(&self, email: &Email) -> CoreResult<UserProfile> {
        let key = UserProfile::key_for(email);
        let profile = run_atomic(self.store.as_ref(), &self.policy, |tx| {
            if let Some(existing) = tx.get::<UserProfile>(&key)? {
                return Ok::<_, CoreError>(existing);
            }
            let fresh = UserProfile::new(email.clone());
            tx.put(&fresh)?;
            debug!(user = %email, "profile created");
            Ok(fresh)
        })?;
        let tickets = self.owned_tickets(email)?;
        Ok(profile.with_tickets(tickets))
    }

    /// Overwrite the editable fields of `email`'s profile.
    pub fn save(&self, email: &Email, form: ProfileForm) -> CoreResult<UserProfile> {
        let notification_email = match form.notification_email.trim() {
            "" => String::new(),
            raw => Email::parse(raw)?.to_string(),
        };
        let mut topics: Vec<String> = Vec::with_capacity(form.topics.len());
        for topic in form.topics {
            let topic = topic.trim().to_string();
            if !topic.is_empty() && !topics.contains(&topic) {
                topics.push(topic);
            }
        }

        let profile = UserProfile {
            main_email: email.clone(),
            name: form.name.trim().to_string(),
            notification_email,
            topics,
            tickets: Vec::new(),
        };
        self.store.save(&profile)?;
        info!(user = %email, topics = profile.topics.len(), "profile saved");

        let tickets = self.owned_tickets(email)?;
        Ok(profile.with_tickets(tickets))
    }

    /// Profiles whose topics include `topic`.
    pub fn interested_in(&self, topic: &str) -> CoreResult<Vec<UserProfile>> {
        let query = Query::new(UserProfile::KIND)
            .eq("topics", topic)
            .order_by("main_email");
        Ok(self.store.find(&query)?)
    }

    fn owned_tickets(&self, email: &Email) -> CoreResult<Vec<Ticket>> {
        owned_tickets(self.store.as_ref(), email)
    }
}

/// Tickets sold to `email`, grouped by conference then seat.
pub(crate) fn owned_tickets(store: &dyn EntityStore, email: &Email) -> CoreResult<Vec<Ticket>> {
    let query = Query::new(Ticket::KIND)
        .eq("owner", email.as_str())
        .order_by("conference_name")
        .order_by("number");
    Ok(store.find(&query)?)
}
