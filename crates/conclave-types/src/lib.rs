//! Foundation types for Conclave.
//!
//! This crate provides the identifier, identity, and scheduling types shared
//! by every other Conclave crate.
//!
//! # Key Types
//!
//! - [`ConferenceId`]: UUID v7 identifier assigned when a conference is scheduled
//! - [`TicketId`]: identifier derived from a conference id and a seat number
//! - [`Email`]: normalized attendee identity, the natural key of a profile
//! - [`TicketState`]: `available` or `sold`
//! - [`DateRange`]: validated start/end dates of a conference

pub mod error;
pub mod id;
pub mod identity;
pub mod schedule;
pub mod ticket;

pub use error::TypeError;
pub use id::{ConferenceId, TicketId};
pub use identity::Email;
pub use schedule::{DateRange, DATE_FORMAT};
pub use ticket::TicketState;
