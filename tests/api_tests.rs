mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use fleet_integrity::create_router;

use common::{date, test_app, vehicle, TestApp, TripBuilder};

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn router(app: &TestApp) -> Router {
    create_router(app.state.clone())
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app();
    let (status, body) = send(router(&app), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "fleet-integrity");
}

#[tokio::test]
async fn test_scan_then_resolve_over_http() {
    let app = test_app();
    let truck = vehicle("MH12ZZ0001");
    app.store.put_vehicle(truck.clone()).await;
    app.store
        .put_trip(TripBuilder::new(truck.id, date(2024, 3, 1)).km(1000.0, 1300.0).refuel(6.0).build())
        .await;

    let (status, body) = send(router(&app), post_json("/api/alerts/scan", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["alerts_created"], 1);

    let (status, body) = send(router(&app), get("/api/alerts?status=pending")).await;
    assert_eq!(status, StatusCode::OK);
    let alerts = body["data"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["alert_type"], "fuel_anomaly");
    assert_eq!(alerts[0]["metadata"]["details"]["kind"], "fuel_anomaly");
    let id = alerts[0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        router(&app),
        post_json(
            &format!("/api/alerts/{}/action", id),
            json!({ "action": "ignore", "reason": "odometer replaced", "duration": "permanent" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ignored");
    assert_eq!(body["data"]["metadata"]["ignore_duration"], "permanent");
    assert_eq!(body["data"]["metadata"]["resolution_reason"], "odometer replaced");
}

#[tokio::test]
async fn test_action_errors() {
    let app = test_app();

    let (status, body) = send(
        router(&app),
        post_json(
            &format!("/api/alerts/{}/action", uuid::Uuid::new_v4()),
            json!({ "action": "accept" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = send(
        router(&app),
        post_json(
            &format!("/api/alerts/{}/action", uuid::Uuid::new_v4()),
            json!({ "action": "deny", "reason": "x".repeat(2000) }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_sequence_endpoints() {
    let app = test_app();
    let truck = vehicle("ABC-1234");
    app.store.put_vehicle(truck.clone()).await;
    for (serial, day) in [("ABC1234001", 1), ("ABC1234002", 2), ("ABC1234003", 3), ("ABC1234006", 4)] {
        app.store
            .put_trip(TripBuilder::new(truck.id, date(2024, 3, day)).serial(serial).build())
            .await;
    }

    let (status, body) = send(router(&app), get(&format!("/api/sequence/vehicles/{}", truck.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["gap_count"], 1);
    assert_eq!(body["data"]["issues"][0]["missing_serials"], json!(["ABC1234004", "ABC1234005"]));

    let (status, body) = send(router(&app), get("/api/sequence/issues")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_vehicles_checked"], 1);
    assert_eq!(body["data"]["vehicles_with_issues"], 1);

    let (status, _) = send(router(&app), get(&format!("/api/sequence/vehicles/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recalculate_endpoint() {
    let app = test_app();
    let truck = vehicle("GJ01RR0001");
    let edited = TripBuilder::new(truck.id, date(2024, 4, 1)).km(0.0, 400.0).refuel(40.0).build();
    let later = TripBuilder::new(truck.id, date(2024, 4, 3)).km(400.0, 700.0).refuel(30.0).build();
    app.store.put_trip(edited.clone()).await;
    app.store.put_trip(later).await;

    let (status, body) = send(
        router(&app),
        post_json(&format!("/api/trips/{}/recalculate", edited.id), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["trips_considered"], 2);
    assert_eq!(body["data"]["trips_updated"], 2);
    assert_eq!(body["data"]["failures"], 0);
}

#[tokio::test]
async fn test_performance_requires_valid_range() {
    let app = test_app();

    let (status, body) = send(
        router(&app),
        get("/api/drivers/performance?start=2024-06-01&end=2024-06-30"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (status, body) = send(
        router(&app),
        get("/api/drivers/insights?start=2024-06-30&end=2024-06-01"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(router(&app), get("/api/drivers/performance?start=junio")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_scan_survives_client_disconnect() {
    let app = test_app();
    let truck = vehicle("MH12ZZ0002");
    app.store.put_vehicle(truck.clone()).await;
    for day in 1..=3 {
        app.store
            .put_trip(TripBuilder::new(truck.id, date(2024, 3, day)).deviation(20.0).build())
            .await;
    }
    app.store
        .set_alert_insert_delay(Some(std::time::Duration::from_millis(50)))
        .await;

    // El cliente abandona la petición antes de que termine ninguna escritura
    let request = router(&app).oneshot(post_json("/api/alerts/scan", json!({})));
    let abandoned = tokio::time::timeout(std::time::Duration::from_millis(10), request).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    assert_eq!(app.store.alert_count().await, 3);
}
