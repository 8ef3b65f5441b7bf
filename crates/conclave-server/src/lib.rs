//! HTTP server for Conclave.
//!
//! Exposes the conference services as a JSON API:
//! - Conference listing, standard lists, scheduling, and ticket listings
//! - Ticket purchase for the signed-in user
//! - Profile view and edit
//! - Latest announcement and manual announcements
//! - Lease and ack endpoints for the conference review queue
//!
//! The signed-in user comes from an [`IdentityProvider`]; the default
//! [`HeaderIdentity`] trusts the `x-user-email` header.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use auth::{CurrentUser, HeaderIdentity, IdentityProvider, USER_HEADER};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{AppState, ProfileView};
pub use router::build_router;
pub use server::ConclaveServer;
