//! HTTP-level tests driving the router in-process.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use schedule_server::events::{Broadcaster, UpdateEvent};
use schedule_server::store::Store;
use schedule_server::web::{AppState, create_router};

fn app_with_events() -> (Router, Broadcaster) {
    let events = Broadcaster::new(16);
    let state = AppState::new(Arc::new(Store::in_memory()), events.clone());
    (create_router(state), events)
}

fn app() -> Router {
    app_with_events().0
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

/// Train, departure location and arrival location IDs.
async fn seed(app: &Router, train_type: &str) -> (i64, i64, i64) {
    let (status, train) = post(
        app,
        "/api/trains",
        json!({"trainNumber": "04501", "type": train_type}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, from) = post(app, "/api/locations", json!({"name": "Howrah", "code": "hwh"})).await;
    let (_, to) = post(app, "/api/locations", json!({"name": "Sealdah", "code": "SDAH"})).await;

    (
        train["id"].as_i64().unwrap(),
        from["id"].as_i64().unwrap(),
        to["id"].as_i64().unwrap(),
    )
}

fn monday_only(train: i64, from: i64, to: i64) -> Value {
    json!({
        "trainId": train,
        "departureLocationId": from,
        "arrivalLocationId": to,
        "scheduledDeparture": "2024-03-04T08:00:00",
        "scheduledArrival": "2024-03-04T12:00:00",
        "runningDays": [true, false, false, false, false, false, false],
        "effectiveStartDate": "2024-03-04"
    })
}

#[tokio::test]
async fn health_check() {
    let (status, body) = get(&app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn location_codes_are_normalized_and_unique() {
    let app = app();
    let (status, body) = post(&app, "/api/locations", json!({"name": "Howrah", "code": " hwh "})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["code"], "HWH");

    let (status, body) = post(&app, "/api/locations", json!({"name": "Other", "code": "HWH"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE");

    let (status, body) = post(&app, "/api/locations", json!({"name": "Bad", "code": "H-W"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MALFORMED_INPUT");
}

#[tokio::test]
async fn create_saloon_schedule_with_attach() {
    let app = app();
    let (train, from, to) = seed(&app, "saloon").await;

    let mut candidate = monday_only(train, from, to);
    candidate["attachLocationId"] = json!(to);
    candidate["attachTrainNumber"] = json!("12345");
    candidate["attachTime"] = json!("2024-03-04T10:00:00");

    let (status, body) = post(&app, "/api/schedules", candidate).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "scheduled");
    assert_eq!(body["version"], 1);
    assert_eq!(body["isCancelled"], false);
    assert_eq!(body["attach"]["trainNumber"], "12345");
    assert_eq!(body["attach"]["status"], "pending");

    let id = body["id"].as_i64().unwrap();
    let (status, fetched) = get(&app, &format!("/api/schedules/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, body);
}

#[tokio::test]
async fn arrival_before_departure_is_unprocessable() {
    let app = app();
    let (train, from, to) = seed(&app, "express").await;

    let mut candidate = monday_only(train, from, to);
    candidate["scheduledArrival"] = json!("2024-03-04T07:00:00");

    let (status, body) = post(&app, "/api/schedules", candidate).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["details"]["valid"], false);
    assert_eq!(body["details"]["violations"][0]["field"], "scheduledArrival");
    assert_eq!(
        body["details"]["violations"][0]["message"],
        "arrival must be after departure"
    );

    let (_, list) = get(&app, "/api/schedules").await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn malformed_running_days_is_bad_request() {
    let app = app();
    let (train, from, to) = seed(&app, "express").await;

    let mut candidate = monday_only(train, from, to);
    candidate["runningDays"] = json!("MTWTFSS");

    let (status, body) = post(&app, "/api/schedules", candidate).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MALFORMED_INPUT");
}

#[tokio::test]
async fn dry_run_validation_reports_violations() {
    let app = app();
    let (train, from, to) = seed(&app, "express").await;

    let mut candidate = monday_only(train, from, to);
    candidate["detachLocationId"] = json!(to);
    candidate["detachTime"] = json!("2024-03-04T11:00:00");

    let (status, body) = post(&app, "/api/schedules/validate", candidate).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);

    let fields: Vec<&str> = body["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["detachLocationId", "detachTime"]);

    let (_, list) = get(&app, "/api/schedules").await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn status_transitions() {
    let app = app();
    let (train, from, to) = seed(&app, "local").await;
    let (_, schedule) = post(&app, "/api/schedules", monday_only(train, from, to)).await;
    let uri = format!("/api/schedules/{}/status", schedule["id"]);

    let (status, body) = post(&app, &uri, json!({"status": "running"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert!(body["actualDeparture"].is_string());

    let (status, body) = post(&app, &uri, json!({"status": "completed"})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["actualArrival"].is_string());

    let (status, body) = post(&app, &uri, json!({"status": "running"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    let (status, body) = post(&app, &uri, json!({"status": "sideways"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MALFORMED_INPUT");
}

#[tokio::test]
async fn active_and_calendar_queries() {
    let app = app();
    let (train, from, to) = seed(&app, "local").await;
    let (_, schedule) = post(&app, "/api/schedules", monday_only(train, from, to)).await;
    let id = schedule["id"].as_i64().unwrap();

    let (status, body) = get(&app, &format!("/api/schedules/{id}/active?date=2024-03-04")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], true);
    assert_eq!(body["dayOfWeek"], 0);

    let (_, body) = get(&app, &format!("/api/schedules/{id}/active?date=2024-03-05")).await;
    assert_eq!(body["active"], false);
    assert_eq!(body["dayOfWeek"], 1);

    let (status, body) = get(
        &app,
        &format!("/api/schedules/{id}/calendar?from=2024-03-01&to=2024-03-31"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["dates"],
        json!(["2024-03-04", "2024-03-11", "2024-03-18", "2024-03-25"])
    );

    let (_, listed) = get(&app, "/api/schedules?date=2024-03-11").await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let (_, listed) = get(&app, "/api/schedules?date=2024-03-12").await;
    assert_eq!(listed, json!([]));

    let (status, body) = post(&app, &format!("/api/schedules/{id}/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isCancelled"], true);
    assert_eq!(body["status"], "scheduled");

    let (_, body) = get(&app, &format!("/api/schedules/{id}/active?date=2024-03-04")).await;
    assert_eq!(body["active"], false);
}

#[tokio::test]
async fn calendar_rejects_bad_windows() {
    let app = app();
    let (train, from, to) = seed(&app, "local").await;
    let (_, schedule) = post(&app, "/api/schedules", monday_only(train, from, to)).await;
    let id = schedule["id"].as_i64().unwrap();

    let (status, _) = get(
        &app,
        &format!("/api/schedules/{id}/calendar?from=2024-01-01&to=2025-01-01"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(
        &app,
        &format!("/api/schedules/{id}/active?date=04/03/2024"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = get(
        &app,
        &format!("/api/schedules/{id}/calendar?from=2024-03-31&to=2024-03-01"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dates"], json!([]));
}

#[tokio::test]
async fn bad_path_and_query_params_are_json_errors() {
    let app = app();
    let (train, from, to) = seed(&app, "local").await;
    let (_, schedule) = post(&app, "/api/schedules", monday_only(train, from, to)).await;
    let id = schedule["id"].as_i64().unwrap();

    let (status, body) = get(&app, "/api/schedules/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["message"].is_string());

    let (status, body) = get(&app, "/api/trains/1.5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = get(&app, &format!("/api/schedules/{id}/calendar?to=2024-03-31")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = get(&app, &format!("/api/schedules/{id}/active")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn edit_after_cancel_stays_cancelled() {
    let app = app();
    let (train, from, to) = seed(&app, "local").await;
    let (_, schedule) = post(&app, "/api/schedules", monday_only(train, from, to)).await;
    let id = schedule["id"].as_i64().unwrap();
    let uri = format!("/api/schedules/{id}");

    post(&app, &format!("{uri}/status"), json!({"status": "running"})).await;
    let (status, _) = post(&app, &format!("{uri}/status"), json!({"status": "cancelled"})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::PUT, &uri, Some(monday_only(train, from, to))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isCancelled"], true);
    assert_eq!(body["status"], "cancelled");

    let (_, body) = get(&app, &format!("{uri}/active?date=2024-03-04")).await;
    assert_eq!(body["active"], false);
}

#[tokio::test]
async fn edits_check_expected_version() {
    let app = app();
    let (train, from, to) = seed(&app, "local").await;
    let (_, schedule) = post(&app, "/api/schedules", monday_only(train, from, to)).await;
    let uri = format!("/api/schedules/{}", schedule["id"]);

    let mut edit = monday_only(train, from, to);
    edit["scheduledArrival"] = json!("2024-03-04T13:00:00");
    edit["expectedVersion"] = json!(5);
    let (status, body) = send(&app, Method::PUT, &uri, Some(edit.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "VERSION_CONFLICT");

    edit["expectedVersion"] = json!(1);
    let (status, body) = send(&app, Method::PUT, &uri, Some(edit.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);
    assert_eq!(body["scheduledArrival"], "2024-03-04T13:00:00");

    edit["scheduledArrival"] = json!("2024-03-04T06:00:00");
    edit["expectedVersion"] = json!(2);
    let (status, _) = send(&app, Method::PUT, &uri, Some(edit)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn delete_and_missing_schedule() {
    let app = app();
    let (train, from, to) = seed(&app, "local").await;
    let (_, schedule) = post(&app, "/api/schedules", monday_only(train, from, to)).await;
    let uri = format!("/api/schedules/{}", schedule["id"]);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn referenced_train_type_is_frozen() {
    let app = app();
    let (train, from, to) = seed(&app, "saloon").await;
    post(&app, "/api/schedules", monday_only(train, from, to)).await;

    let uri = format!("/api/trains/{train}");
    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({"trainNumber": "04501", "type": "express"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({"trainNumber": "04501", "type": "saloon", "speed": 110})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["speed"], 110);
}

#[tokio::test]
async fn export_then_import_into_fresh_server() {
    let source = app();
    let (train, from, to) = seed(&source, "local").await;
    let (_, schedule) = post(&source, "/api/schedules", monday_only(train, from, to)).await;
    let status_uri = format!("/api/schedules/{}/status", schedule["id"]);
    let (_, running) = post(&source, &status_uri, json!({"status": "running"})).await;

    let (status, doc) = get(&source, "/api/export").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["formatVersion"], 1);

    let target = app();
    let (status, report) = post(&target, "/api/import", doc).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["trainsCreated"], 1);
    assert_eq!(report["locationsCreated"], 2);
    assert_eq!(report["imported"].as_array().unwrap().len(), 1);
    assert_eq!(report["rejected"], json!([]));

    let imported = &report["imported"][0]["id"];
    let (_, copy) = get(&target, &format!("/api/schedules/{imported}")).await;
    assert_eq!(copy["status"], "running");
    assert_eq!(copy["actualDeparture"], running["actualDeparture"]);
    assert_eq!(copy["version"], 1);

    let (status, body) = post(&target, "/api/import", json!({"formatVersion": 7, "exportedAt": "2024-03-04T00:00:00"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn writes_publish_events() {
    let (app, events) = app_with_events();
    let (train, from, to) = seed(&app, "local").await;

    let mut subscription = events.subscribe();
    let (_, schedule) = post(&app, "/api/schedules", monday_only(train, from, to)).await;

    match &*subscription.next().await.unwrap() {
        UpdateEvent::ScheduleCreated { schedule: created } => {
            assert_eq!(created.id.value(), schedule["id"].as_i64().unwrap());
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // Rejected writes publish nothing
    let mut bad = monday_only(train, from, to);
    bad["scheduledArrival"] = json!("2024-03-04T07:00:00");
    post(&app, "/api/schedules", bad).await;
    post(&app, &format!("/api/schedules/{}/cancel", schedule["id"]), json!({})).await;

    assert!(matches!(
        &*subscription.next().await.unwrap(),
        UpdateEvent::ScheduleCancelled { .. }
    ));
}

#[tokio::test]
async fn event_stream_is_server_sent_events() {
    let app = app();
    let request = Request::builder()
        .uri("/api/events")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
}
