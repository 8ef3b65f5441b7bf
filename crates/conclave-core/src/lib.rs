//! Conclave domain logic.
//!
//! Conferences are scheduled with a fixed number of seats; each seat is a
//! [`Ticket`] that can be sold exactly once. The [`TicketSale`] transaction
//! marks a ticket sold, takes one seat from its [`Conference`], and records
//! the ticket on the buyer's [`UserProfile`], all in one atomic unit.
//!
//! # Modules
//!
//! - [`conference`] -- conference entity, validation, capacity accounting
//! - [`ticket`] -- ticket entity, batch creation, the sale predicate
//! - [`profile`] -- user profiles and [`ProfileService`]
//! - [`sale`] -- the ticket sale transaction
//! - [`service`] -- [`ConferenceService`]: scheduling and listings
//! - [`announcement`] -- announcements behind a read-through cache
//! - [`notify`] -- mail contract and interested-user notification
//! - [`app`] -- [`Conclave`], all services wired to one set of backends
//!
//! # Invariants
//!
//! 1. `0 <= tickets_available <= max_attendees` for every conference.
//! 2. `tickets_available == max_attendees - sold tickets` after any sequence
//!    of sales.
//! 3. A ticket goes from available to sold once and never back.
//! 4. A conference is never visible without its full set of tickets.

pub mod announcement;
pub mod app;
pub mod conference;
pub mod error;
pub mod notify;
pub mod profile;
pub mod sale;
pub mod service;
pub mod ticket;

#[cfg(test)]
mod testing;

pub use announcement::{Announcement, AnnouncementService, LATEST_ANNOUNCEMENT_KEY};
pub use app::{Conclave, Settings};
pub use conference::{Conference, ConferenceParams, CITIES, TOPICS};
pub use error::{CoreError, CoreResult};
pub use notify::{
    InMemoryMailer, LogMailer, MailMessage, Mailer, Notifier, NotifyHandler, NOTIFY_TASK,
    REVIEW_QUEUE, REVIEW_TASK,
};
pub use profile::{ProfileForm, ProfileService, UserProfile};
pub use sale::{SaleReceipt, TicketSale};
pub use service::{ConferenceFilter, ConferenceList, ConferenceService};
pub use ticket::Ticket;
