use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use conclave_store::{run_atomic, AtomicPolicy, Entity, EntityStore, EntityStoreExt};
use conclave_types::{Email, TicketId};

use crate::conference::Conference;
use crate::error::{CoreError, CoreResult};
use crate::profile::{owned_tickets, UserProfile};
use crate::ticket::Ticket;

/// State of the three entities after a successful sale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SaleReceipt {
    pub ticket: Ticket,
    pub conference: Conference,
    pub profile: UserProfile,
}

/// Sells one ticket to one buyer.
///
/// The ticket, its conference and the buyer's profile change together or not
/// at all; a first-time buyer's profile is created by the same commit. For
/// any ticket, at most one concurrent sale succeeds; the others
/// re-read the ticket on retry and fail with [`CoreError::AlreadySold`].
pub struct TicketSale {
    store: Arc<dyn EntityStore>,
    policy: AtomicPolicy,
}

impl TicketSale {
    pub fn new(store: Arc<dyn EntityStore>, policy: AtomicPolicy) -> Self {
        Self { store, policy }
    }

    pub fn execute(&self, ticket_id: &TicketId, buyer: &Email) -> CoreResult<SaleReceipt> {
        let ticket_key = Ticket::key_for(ticket_id);
        let stored = self
            .store
            .get(&ticket_key)?
            .ok_or_else(|| CoreError::not_found("ticket", ticket_id))?;
        let ticket: Ticket = stored.decode()?;
        if !ticket.is_available() {
            return Err(CoreError::AlreadySold(ticket.id));
        }

        // The conference is always reached through the stored ticket.
        let conference_key = stored
            .parent
            .clone()
            .unwrap_or_else(|| Conference::key_for(ticket.conference_id));
        if self.store.load::<Conference>(&conference_key)?.is_none() {
            return Err(CoreError::not_found("conference", &conference_key.id));
        }

        let profile_key = UserProfile::key_for(buyer);

        let (ticket, conference, profile) =
            run_atomic(self.store.as_ref(), &self.policy, |tx| {
                let mut ticket: Ticket = tx
                    .get(&ticket_key)?
                    .ok_or_else(|| CoreError::not_found("ticket", ticket_id))?;
                let mut conference: Conference = tx
                    .get(&conference_key)?
                    .ok_or_else(|| CoreError::not_found("conference", &conference_key.id))?;
                let mut profile: UserProfile = tx
                    .get(&profile_key)?
                    .unwrap_or_else(|| UserProfile::new(buyer.clone()));

                ticket.sell(buyer)?;
                conference.decrement_remaining()?;
                profile.add_ticket(ticket.clone());

                tx.put(&ticket)?;
                tx.put(&conference)?;
                tx.put(&profile)?;
                Ok::<_, CoreError>((ticket, conference, profile))
            })
            .map_err(|e| match e {
                CoreError::Store(inner) => CoreError::TransactionFailed(inner.to_string()),
                other => other,
            })?;

        info!(
            ticket = %ticket.id,
            number = ticket.number,
            conference = %conference.id,
            buyer = %buyer,
            remaining = conference.tickets_available(),
            "ticket sold"
        );

        let profile = match owned_tickets(self.store.as_ref(), buyer) {
            Ok(tickets) => profile.with_tickets(tickets),
            Err(e) => {
                warn!(buyer = %buyer, error = %e, "could not refresh owned tickets after sale");
                profile
            }
        };

        Ok(SaleReceipt {
            ticket,
            conference,
            profile,
        })
    }
}
