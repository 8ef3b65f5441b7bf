use serde::{Deserialize, Serialize};

use conclave_store::{Entity, EntityKey};
use conclave_types::{ConferenceId, Email, TicketId, TicketState};

use crate::conference::Conference;
use crate::error::{CoreError, CoreResult};

/// One seat at a conference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub number: u32,
    pub conference_id: ConferenceId,
    /// Denormalised for listings.
    pub conference_name: String,
    state: TicketState,
    owner: Option<Email>,
}

impl Ticket {
    /// Seats `1..=count` for `conference`, all available.
    pub fn create_batch(conference: &Conference, count: u32) -> Vec<Ticket> {
        (1..=count)
            .map(|number| Ticket {
                id: TicketId::for_seat(&conference.id, number),
                number,
                conference_id: conference.id,
                conference_name: conference.name.clone(),
                state: TicketState::Available,
                owner: None,
            })
            .collect()
    }

    pub fn state(&self) -> TicketState {
        self.state
    }

    pub fn owner(&self) -> Option<&Email> {
        self.owner.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.state.is_available()
    }

    /// Mark the ticket sold to `buyer`. Does not persist.
    pub fn sell(&mut self, buyer: &Email) -> CoreResult<()> {
        if !self.state.is_available() {
            return Err(CoreError::AlreadySold(self.id));
        }
        self.state = TicketState::Sold;
        self.owner = Some(buyer.clone());
        Ok(())
    }
}

impl Entity for Ticket {
    const KIND: &'static str = "Ticket";

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn parent(&self) -> Option<EntityKey> {
        Some(Conference::key_for(self.conference_id))
    }
}
