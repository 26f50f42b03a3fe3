//! Integration tests for the gateway HTTP surface.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use clients::CarView;
use common::CarId;
use gateway::InMemoryBackends;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

const TOKEN: &str = "test-token";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, InMemoryBackends, CarId) {
    let (state, backends) = gateway::create_default_state();
    backends
        .identity
        .clone()
        .with_user(TOKEN, "alice")
        .with_user("bob-token", "bob");
    let car_id = backends
        .cars
        .add_car(CarView::new("Mercedes Benz", "GLA 250", "ЛО777Х799", 1000));
    let app = gateway::create_app(state, get_metrics_handle());
    (app, backends, car_id)
}

fn authed(builder: axum::http::request::Builder) -> axum::http::request::Builder {
    builder.header("authorization", format!("Bearer {TOKEN}"))
}

fn booking_body(car_id: CarId) -> Body {
    Body::from(
        serde_json::to_string(&serde_json::json!({
            "carUid": car_id,
            "dateFrom": "2025-11-01",
            "dateTo": "2025-11-05"
        }))
        .unwrap(),
    )
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn book(app: &axum::Router, car_id: CarId) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(
            authed(Request::builder().method("POST").uri("/api/v1/rental"))
                .header("content-type", "application/json")
                .body(booking_body(car_id))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

#[tokio::test]
async fn test_health_check_without_auth() {
    let (app, _, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/manage/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "OK");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (app, _, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/cars")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert!(json["message"].as_str().is_some());
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let (app, _, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/cars")
                .header("authorization", "Bearer forged")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_cars() {
    let (app, _, _) = setup();

    let response = app
        .oneshot(
            authed(Request::builder().uri("/api/v1/cars?page=1&size=10"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["totalElements"], 1);
    assert_eq!(json["items"][0]["brand"], "Mercedes Benz");
    assert_eq!(json["items"][0]["price"], 1000);
}

#[tokio::test]
async fn test_book_rental() {
    let (app, backends, car_id) = setup();

    let booking = book(&app, car_id).await;

    assert_eq!(booking["status"], "IN_PROGRESS");
    assert_eq!(booking["car"]["carUid"], car_id.to_string());
    assert_eq!(booking["payment"]["status"], "PAID");
    // 4 nights at 1000 per day
    assert_eq!(booking["payment"]["price"], 4000);
    assert!(backends.cars.is_reserved(car_id));
}

#[tokio::test]
async fn test_booked_rental_is_readable() {
    let (app, _, car_id) = setup();
    let booking = book(&app, car_id).await;
    let rental_uid = booking["rentalUid"].as_str().unwrap();

    let response = app
        .oneshot(
            authed(Request::builder().uri(format!("/api/v1/rental/{rental_uid}")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["rentalUid"], rental_uid);
    assert_eq!(json["status"], "IN_PROGRESS");
    assert_eq!(json["car"]["registrationNumber"], "ЛО777Х799");
    assert_eq!(json["payment"]["price"], 4000);
}

#[tokio::test]
async fn test_rental_list_is_scoped_to_the_caller() {
    let (app, _, car_id) = setup();
    book(&app, car_id).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/rental")
                .header("authorization", "Bearer bob-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_retried_booking_with_request_id_is_idempotent() {
    let (app, backends, car_id) = setup();
    let request_id = uuid::Uuid::new_v4().to_string();

    let mut bookings = Vec::new();
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(
                authed(Request::builder().method("POST").uri("/api/v1/rental"))
                    .header("content-type", "application/json")
                    .header("x-request-id", &request_id)
                    .body(booking_body(car_id))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        bookings.push(json_body(response).await);
    }

    assert_eq!(bookings[0]["rentalUid"], bookings[1]["rentalUid"]);
    assert_eq!(backends.payments.paid_count(), 1);
    assert_eq!(backends.rentals.in_progress_count(), 1);
}

#[tokio::test]
async fn test_malformed_request_id_is_rejected() {
    let (app, _, car_id) = setup();

    let response = app
        .oneshot(
            authed(Request::builder().method("POST").uri("/api/v1/rental"))
                .header("content-type", "application/json")
                .header("x-request-id", "not-a-uuid")
                .body(booking_body(car_id))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_period_is_rejected_without_side_effects() {
    let (app, backends, car_id) = setup();

    let response = app
        .oneshot(
            authed(Request::builder().method("POST").uri("/api/v1/rental"))
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_string(&serde_json::json!({
                        "carUid": car_id,
                        "dateFrom": "2025-11-05",
                        "dateTo": "2025-11-01"
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(backends.payments.paid_count(), 0);
}

#[tokio::test]
async fn test_payment_outage_maps_to_service_unavailable() {
    let (app, backends, car_id) = setup();
    backends.payments.set_unavailable(true);

    let response = app
        .oneshot(
            authed(Request::builder().method("POST").uri("/api/v1/rental"))
                .header("content-type", "application/json")
                .body(booking_body(car_id))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(response).await;
    assert_eq!(json["message"], "Payment Service unavailable");
    assert!(!backends.cars.is_reserved(car_id));
}

#[tokio::test]
async fn test_cancel_rental() {
    let (app, backends, car_id) = setup();
    let booking = book(&app, car_id).await;
    let rental_uid = booking["rentalUid"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            authed(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/rental/{rental_uid}")),
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!backends.cars.is_reserved(car_id));

    let read = app
        .oneshot(
            authed(Request::builder().uri(format!("/api/v1/rental/{rental_uid}")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(read).await;
    assert_eq!(json["status"], "CANCELED");
    assert_eq!(json["payment"]["status"], "CANCELED");
}

#[tokio::test]
async fn test_finish_rental() {
    let (app, backends, car_id) = setup();
    let booking = book(&app, car_id).await;
    let rental_uid = booking["rentalUid"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            authed(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/rental/{rental_uid}/finish")),
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!backends.cars.is_reserved(car_id));

    let read = app
        .oneshot(
            authed(Request::builder().uri(format!("/api/v1/rental/{rental_uid}")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(read).await;
    assert_eq!(json["status"], "FINISHED");
    assert_eq!(json["payment"]["status"], "PAID");
}

#[tokio::test]
async fn test_unknown_rental_is_not_found() {
    let (app, _, _) = setup();
    let fake_id = uuid::Uuid::new_v4();

    let response = app
        .oneshot(
            authed(Request::builder().uri(format!("/api/v1/rental/{fake_id}")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
