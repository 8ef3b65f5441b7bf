use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Json, Redirect};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use conclave_core::{
    Conclave, Conference, ConferenceFilter, ConferenceList, ConferenceParams, CoreError,
    ProfileForm, Ticket, UserProfile, CITIES, REVIEW_QUEUE, TOPICS,
};
use conclave_tasks::{Task, TaskId, TaskQueue};
use conclave_types::{ConferenceId, Email, TicketId};

use crate::auth::{CurrentUser, IdentityProvider};
use crate::error::{ServerError, ServerResult};

/// Upper bound on tasks handed out by one lease call.
pub const MAX_LEASE: usize = 100;

/// Longest lease a reviewer may ask for, in seconds.
pub const MAX_LEASE_SECS: u64 = 3600;

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<Conclave>,
    pub identity: Arc<dyn IdentityProvider>,
    pub tasks: Arc<dyn TaskQueue>,
}

impl AppState {
    pub fn new(
        app: Arc<Conclave>,
        identity: Arc<dyn IdentityProvider>,
        tasks: Arc<dyn TaskQueue>,
    ) -> Self {
        Self {
            app,
            identity,
            tasks,
        }
    }
}

fn parse_id<T: FromStr>(raw: &str, what: &str) -> ServerResult<T> {
    raw.parse()
        .map_err(|_| ServerError::BadRequest(format!("invalid {what} id: {raw}")))
}

// ---- Service ----

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn info_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": "conclave-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Fixed topic and city choices offered by the scheduling form.
pub async fn reference_handler() -> Json<serde_json::Value> {
    Json(json!({
        "topics": TOPICS,
        "cities": CITIES,
    }))
}

// ---- Conferences ----

/// Query string of the conference listing.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListParams {
    pub city: Option<String>,
    pub topic: Option<String>,
    pub organizer: Option<String>,
    pub min_attendees: Option<u32>,
    #[serde(default)]
    pub order_by_name: bool,
}

impl ListParams {
    fn into_filter(self) -> ServerResult<ConferenceFilter> {
        let organizer = self
            .organizer
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| ServerError::BadRequest(e.to_string()))?;
        Ok(ConferenceFilter {
            city: self.city,
            topic: self.topic,
            organizer,
            min_attendees: self.min_attendees,
            order_by_name: self.order_by_name,
        })
    }
}

pub async fn list_conferences_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ServerResult<Json<Vec<Conference>>> {
    let filter = params.into_filter()?;
    Ok(Json(state.app.conferences.list(&filter)?))
}

pub async fn standard_lists_handler(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
) -> ServerResult<Json<Vec<ConferenceList>>> {
    Ok(Json(state.app.conferences.standard_lists(&viewer)?))
}

/// Schedule a conference and redirect to its ticket listing.
pub async fn schedule_handler(
    State(state): State<AppState>,
    CurrentUser(organizer): CurrentUser,
    Json(params): Json<ConferenceParams>,
) -> ServerResult<Redirect> {
    let conference = state.app.conferences.schedule(&organizer, params)?;
    Ok(Redirect::to(&format!("/v1/conferences/{}/tickets", conference.id)))
}

pub async fn get_conference_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Conference>> {
    let id: ConferenceId = parse_id(&id, "conference")?;
    Ok(Json(state.app.conferences.get(&id)?))
}

pub async fn available_tickets_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Vec<Ticket>>> {
    let id: ConferenceId = parse_id(&id, "conference")?;
    Ok(Json(state.app.conferences.available_tickets(&id)?))
}

// ---- Tickets ----

/// Sell a ticket to the signed-in user and redirect to their profile.
pub async fn buy_ticket_handler(
    State(state): State<AppState>,
    CurrentUser(buyer): CurrentUser,
    Path(id): Path<String>,
) -> ServerResult<Redirect> {
    let id: TicketId = parse_id(&id, "ticket")?;
    state.app.sales.execute(&id, &buyer)?;
    Ok(Redirect::to("/v1/profile"))
}

// ---- Profile ----

/// A profile together with its derived ticket data.
#[derive(Clone, Debug, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub tickets: Vec<Ticket>,
    pub attending: Vec<String>,
}

impl From<UserProfile> for ProfileView {
    fn from(profile: UserProfile) -> Self {
        Self {
            tickets: profile.tickets().to_vec(),
            attending: profile.attending(),
            profile,
        }
    }
}

pub async fn get_profile_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ServerResult<Json<ProfileView>> {
    let profile = state.app.profiles.load_or_create(&user)?;
    Ok(Json(profile.into()))
}

pub async fn save_profile_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(form): Json<ProfileForm>,
) -> ServerResult<Redirect> {
    state.app.profiles.save(&user, form)?;
    Ok(Redirect::to("/v1/profile"))
}

// ---- Announcements ----

#[derive(Clone, Debug, Deserialize)]
pub struct AnnouncementForm {
    pub message: String,
}

pub async fn latest_announcement_handler(
    State(state): State<AppState>,
) -> ServerResult<Json<serde_json::Value>> {
    let latest = state.app.announcements.latest()?;
    Ok(Json(match latest {
        Some(a) => json!({
            "id": a.id,
            "message": a.message,
            "created_at": a.created_at.to_rfc3339(),
        }),
        None => serde_json::Value::Null,
    }))
}

pub async fn post_announcement_handler(
    State(state): State<AppState>,
    CurrentUser(author): CurrentUser,
    Json(form): Json<AnnouncementForm>,
) -> ServerResult<(StatusCode, Json<serde_json::Value>)> {
    let message = form.message.trim();
    if message.is_empty() {
        return Err(ServerError::BadRequest("message must not be empty".into()));
    }
    let posted = state.app.announcements.post(message)?;
    info!(author = %author, id = %posted.id, "announcement posted");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": posted.id,
            "message": posted.message,
            "created_at": posted.created_at.to_rfc3339(),
        })),
    ))
}

// ---- Review queue ----

#[derive(Clone, Debug, Deserialize)]
pub struct LeaseParams {
    #[serde(default = "default_lease")]
    pub max: usize,
    /// Seconds before an unacked task is handed out again.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,
}

fn default_lease() -> usize {
    10
}

fn default_lease_secs() -> u64 {
    300
}

/// Hand out pending conference reviews to an external reviewer.
pub async fn lease_reviews_handler(
    State(state): State<AppState>,
    CurrentUser(reviewer): CurrentUser,
    Query(params): Query<LeaseParams>,
) -> ServerResult<Json<Vec<Task>>> {
    let lease_for = Duration::from_secs(params.lease_secs.clamp(1, MAX_LEASE_SECS));
    let tasks = state
        .tasks
        .lease(REVIEW_QUEUE, params.max.clamp(1, MAX_LEASE), lease_for)
        .map_err(CoreError::from)?;
    info!(reviewer = %reviewer, count = tasks.len(), "review tasks leased");
    Ok(Json(tasks))
}

/// Mark a leased review as done so it is not handed out again.
pub async fn ack_review_handler(
    State(state): State<AppState>,
    CurrentUser(reviewer): CurrentUser,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    let id: TaskId = parse_id(&id, "task")?;
    if !state.tasks.ack(REVIEW_QUEUE, &id).map_err(CoreError::from)? {
        return Err(CoreError::not_found("review lease", id).into());
    }
    info!(reviewer = %reviewer, task = %id, "review task acked");
    Ok(StatusCode::NO_CONTENT)
}
