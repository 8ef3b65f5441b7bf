use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use conclave_store::Entity;
use conclave_types::{ConferenceId, DateRange, Email};

use crate::error::{CoreError, CoreResult};

/// Largest capacity a single conference may be scheduled with.
pub const MAX_CAPACITY: u32 = 100_000;

/// Topics offered when scheduling a conference or editing a profile.
pub const TOPICS: [&str; 4] = [
    "Medical Innovations",
    "Programming Languages",
    "Web Technologies",
    "Movie Making",
];

/// Cities offered when scheduling a conference.
pub const CITIES: [&str; 4] = ["London", "Chicago", "San Francisco", "Paris"];

/// Raw scheduling input, as submitted by an organiser.
///
/// Capacity is signed so that negative values reach validation instead of
/// failing to parse.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceParams {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub city: String,
    pub topic: String,
    pub max_attendees: i64,
    pub start_date: String,
    pub end_date: String,
}

/// A scheduled event and its remaining capacity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
    pub id: ConferenceId,
    pub name: String,
    pub description: String,
    pub city: String,
    pub topic: String,
    pub organizer: Email,
    pub max_attendees: u32,
    tickets_available: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Conference {
    /// Validate `params` and build an unsaved conference with every seat
    /// available.
    pub fn create(params: ConferenceParams, organizer: Email) -> CoreResult<Self> {
        if params.max_attendees < 0 {
            return Err(CoreError::Validation(format!(
                "max attendees must not be negative, got {}",
                params.max_attendees
            )));
        }
        let max_attendees = u32::try_from(params.max_attendees)
            .ok()
            .filter(|n| *n <= MAX_CAPACITY)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "max attendees must be at most {MAX_CAPACITY}, got {}",
                    params.max_attendees
                ))
            })?;
        let dates = DateRange::parse(&params.start_date, &params.end_date)?;

        Ok(Self {
            id: ConferenceId::new(),
            name: params.name.trim().to_string(),
            description: params.description,
            city: params.city,
            topic: params.topic,
            organizer,
            max_attendees,
            tickets_available: max_attendees,
            start_date: dates.start(),
            end_date: dates.end(),
        })
    }

    pub fn tickets_available(&self) -> u32 {
        self.tickets_available
    }

    pub fn tickets_sold(&self) -> u32 {
        self.max_attendees - self.tickets_available
    }

    pub fn is_sold_out(&self) -> bool {
        self.tickets_available == 0
    }

    /// Take one seat. Only the sale transaction may call this.
    pub(crate) fn decrement_remaining(&mut self) -> CoreResult<()> {
        if self.tickets_available == 0 {
            return Err(CoreError::CapacityExhausted(self.id));
        }
        self.tickets_available -= 1;
        Ok(())
    }
}

impl Entity for Conference {
    const KIND: &'static str = "Conference";

    fn id(&self) -> String {
        self.id.to_string()
    }
}
