//! HTTP route handlers.

use std::convert::Infallible;

use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use futures::stream::{self, Stream};
use serde::de::DeserializeOwned;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::domain::{
    Location, LocationId, Schedule, ScheduleCandidate, ScheduleId, Train, TrainId,
    ValidationResult, active_dates, day_of_week, is_active_on,
};
use crate::events::UpdateEvent;
use crate::store::{NewLocation, NewTrain};
use crate::transfer::{self, ExportDocument, ImportReport};

use super::dto::*;
use super::error::AppError;
use super::extract::{ApiPath, ApiQuery};
use super::state::AppState;

/// Longest calendar window, in days, that a single request may cover.
pub const MAX_CALENDAR_DAYS: i64 = 366;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/trains", get(list_trains).post(create_train))
        .route("/trains/:id", get(get_train).put(update_train))
        .route("/locations", get(list_locations).post(create_location))
        .route("/locations/:id", get(get_location))
        .route("/schedules", get(list_schedules).post(create_schedule))
        .route("/schedules/validate", post(validate_schedule))
        .route(
            "/schedules/:id",
            get(get_schedule)
                .put(replace_schedule)
                .delete(delete_schedule),
        )
        .route("/schedules/:id/status", post(change_status))
        .route("/schedules/:id/cancel", post(cancel_schedule))
        .route("/schedules/:id/active", get(schedule_active))
        .route("/schedules/:id/calendar", get(schedule_calendar))
        .route("/export", get(export_data))
        .route("/import", post(import_data))
        .route("/events", get(event_stream));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Decode a JSON body, reporting failures as malformed input.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::MalformedInput {
        message: format!("invalid JSON: {e}"),
    })
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| AppError::BadRequest {
        message: format!("invalid {field}: {value} (expected YYYY-MM-DD)"),
    })
}

// Trains

async fn list_trains(State(state): State<AppState>) -> Json<Vec<Train>> {
    Json(state.store.list_trains().await)
}

async fn get_train(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Train>, AppError> {
    Ok(Json(state.store.get_train(TrainId(id)).await?))
}

async fn create_train(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Train>), AppError> {
    let new: NewTrain = parse_body(&body)?;
    let train = state.store.create_train(new).await?;
    state.events.publish(UpdateEvent::TrainSaved {
        train: train.clone(),
    });
    Ok((StatusCode::CREATED, Json(train)))
}

async fn update_train(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    body: Bytes,
) -> Result<Json<Train>, AppError> {
    let new: NewTrain = parse_body(&body)?;
    let train = state.store.update_train(TrainId(id), new).await?;
    state.events.publish(UpdateEvent::TrainSaved {
        train: train.clone(),
    });
    Ok(Json(train))
}

// Locations

async fn list_locations(State(state): State<AppState>) -> Json<Vec<Location>> {
    Json(state.store.list_locations().await)
}

async fn get_location(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Location>, AppError> {
    Ok(Json(state.store.get_location(LocationId(id)).await?))
}

async fn create_location(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Location>), AppError> {
    let new: NewLocation = parse_body(&body)?;
    let location = state.store.create_location(new).await?;
    state.events.publish(UpdateEvent::LocationCreated {
        location: location.clone(),
    });
    Ok((StatusCode::CREATED, Json(location)))
}

// Schedules

/// List schedules, optionally only those running on a given date.
async fn list_schedules(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ScheduleListQuery>,
) -> Result<Json<Vec<Schedule>>, AppError> {
    let schedules = state.store.list_schedules().await;

    let schedules = match query.date.as_deref() {
        Some(raw) => {
            let date = parse_date("date", raw)?;
            schedules
                .into_iter()
                .filter(|s| is_active_on(s, date))
                .collect()
        }
        None => schedules,
    };

    Ok(Json(schedules))
}

async fn get_schedule(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Schedule>, AppError> {
    Ok(Json(state.store.get_schedule(ScheduleId(id)).await?))
}

/// Validate and create a schedule.
async fn create_schedule(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Schedule>), AppError> {
    let candidate = ScheduleCandidate::from_json(&body)?;
    let schedule = state.store.create_schedule(candidate).await?;
    state.events.publish(UpdateEvent::ScheduleCreated {
        schedule: schedule.clone(),
    });
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// Dry-run validation. Violations are part of a successful response.
async fn validate_schedule(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ValidationResult>, AppError> {
    let candidate = ScheduleCandidate::from_json(&body)?;
    Ok(Json(state.store.validate(&candidate).await))
}

/// Full edit of a schedule, re-validated like a creation.
async fn replace_schedule(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    body: Bytes,
) -> Result<Json<Schedule>, AppError> {
    let req: UpdateScheduleRequest = parse_body(&body)?;
    let schedule = state
        .store
        .replace_schedule(ScheduleId(id), req.candidate, req.expected_version)
        .await?;
    state.events.publish(UpdateEvent::ScheduleUpdated {
        schedule: schedule.clone(),
    });
    Ok(Json(schedule))
}

async fn delete_schedule(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Schedule>, AppError> {
    let removed = state.store.delete_schedule(ScheduleId(id)).await?;
    state.events.publish(UpdateEvent::ScheduleDeleted {
        schedule_id: removed.id,
    });
    Ok(Json(removed))
}

async fn change_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    body: Bytes,
) -> Result<Json<Schedule>, AppError> {
    let req: StatusChangeRequest = parse_body(&body)?;
    let schedule = state
        .store
        .transition_schedule(ScheduleId(id), req.status, now())
        .await?;
    state.events.publish(UpdateEvent::StatusChanged {
        schedule: schedule.clone(),
    });
    Ok(Json(schedule))
}

async fn cancel_schedule(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Schedule>, AppError> {
    let schedule = state.store.cancel_schedule(ScheduleId(id)).await?;
    state.events.publish(UpdateEvent::ScheduleCancelled {
        schedule: schedule.clone(),
    });
    Ok(Json(schedule))
}

/// Whether a schedule runs on a date (today when omitted).
async fn schedule_active(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ActiveQuery>,
) -> Result<Json<ActiveResponse>, AppError> {
    let schedule = state.store.get_schedule(ScheduleId(id)).await?;
    let date = match query.date.as_deref() {
        Some(raw) => parse_date("date", raw)?,
        None => Local::now().date_naive(),
    };

    Ok(Json(ActiveResponse {
        schedule_id: schedule.id,
        date,
        day_of_week: day_of_week(date),
        active: is_active_on(&schedule, date),
    }))
}

/// Dates a schedule runs on within an inclusive window.
///
/// An inverted window is not an error; it simply contains no dates.
async fn schedule_calendar(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<CalendarQuery>,
) -> Result<Json<CalendarResponse>, AppError> {
    let from = parse_date("from", &query.from)?;
    let to = parse_date("to", &query.to)?;
    if (to - from).num_days() >= MAX_CALENDAR_DAYS {
        return Err(AppError::BadRequest {
            message: format!("calendar window must not exceed {MAX_CALENDAR_DAYS} days"),
        });
    }

    let schedule = state.store.get_schedule(ScheduleId(id)).await?;
    Ok(Json(CalendarResponse {
        schedule_id: schedule.id,
        from,
        to,
        dates: active_dates(&schedule, from, to),
    }))
}

// Transfer

async fn export_data(State(state): State<AppState>) -> Json<ExportDocument> {
    Json(transfer::export(&state.store, now()).await)
}

async fn import_data(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImportReport>, AppError> {
    let doc = ExportDocument::from_json(&body)?;
    let report = transfer::import(&state.store, doc).await?;

    state.events.publish(UpdateEvent::Imported {
        trains: report.trains_created,
        locations: report.locations_created,
        schedules: report.imported.len(),
    });
    Ok(Json(report))
}

// Events

/// Server-Sent Events stream of applied updates.
async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.events.subscribe();
    info!(
        subscribers = state.events.subscriber_count(),
        "event stream opened"
    );

    let stream = stream::unfold(subscription, |mut subscription| async move {
        let update = subscription.next().await?;
        Some((Ok::<_, Infallible>(to_sse(&update)), subscription))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse(update: &UpdateEvent) -> Event {
    match Event::default().event(update.name()).json_data(update) {
        Ok(event) => event,
        Err(e) => {
            warn!(event = update.name(), error = %e, "failed to encode event");
            Event::default().event("error").data(e.to_string())
        }
    }
}
