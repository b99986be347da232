//! HTTP API integration tests.
//!
//! Sends requests through the full Axum router with `tower::ServiceExt::oneshot`
//! over in-memory stores. Verifies routing, status codes and response bodies.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use cinema_booking::app::BookingService;
use cinema_booking::payment_gateway::SimulatedPaymentGateway;
use cinema_booking::server::{build_router, AppState};
use cinema_booking::OrderEnvironment;
use cinema_testing::test_clock;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn create_test_router() -> Router {
    let env = OrderEnvironment::in_memory(
        Arc::new(test_clock()),
        SimulatedPaymentGateway::always_approve().shared(),
    );
    build_router(AppState::new(Arc::new(BookingService::new(env))))
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("request");

    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn order_body(seats: &[u32]) -> Value {
    json!({
        "customer_id": 5,
        "movie_id": 12,
        "movie_title": "Past Lives",
        "session": "07:30 PM",
        "seats": seats,
    })
}

#[tokio::test]
async fn test_health() {
    let router = create_test_router();
    let (status, body) = send(&router, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "cinema-booking");
}

#[tokio::test]
async fn test_booking_flow_over_http() {
    let router = create_test_router();

    let (status, body) = send(&router, Method::GET, "/api/v1/movies/12/sessions/07:30%20PM/seats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["occupied"], json!([]));
    assert_eq!(body["total_seats"], 64);

    // Place
    let (status, created) = send(&router, Method::POST, "/api/v1/orders", Some(order_body(&[2, 1]))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "PENDING");
    assert_eq!(created["pricing"]["total"], 3630);
    let order_id = created["order_id"].as_str().unwrap().to_string();

    let (_, seats) = send(&router, Method::GET, "/api/v1/movies/12/sessions/07:30%20PM/seats", None).await;
    assert_eq!(seats["occupied"], json!([1, 2]));

    // Conflict
    let (status, body) = send(&router, Method::POST, "/api/v1/orders", Some(order_body(&[2]))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "CONFLICT");

    // Pay
    let (status, paid) = send(
        &router,
        Method::POST,
        &format!("/api/v1/payments/{order_id}"),
        Some(json!({ "method": "Cash" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "CONFIRMED");
    assert!(paid["booking_reference"].as_str().unwrap().starts_with("BK-20250101-"));
    assert!(paid["transaction_id"].as_str().unwrap().starts_with("TXN"));

    let (status, summary) = send(&router, Method::GET, &format!("/api/v1/payments/{order_id}/status"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["status"], "CONFIRMED");
    assert_eq!(summary["method"], "Cash");

    // Details
    let (status, details) = send(&router, Method::GET, &format!("/api/v1/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["title"], "Past Lives");
    assert_eq!(details["seats"], json!([1, 2]));
    assert_eq!(details["booking_reference"], paid["booking_reference"]);

    // History
    let (status, history) = send(&router, Method::GET, "/api/v1/customers/5/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    let (_, latest) = send(&router, Method::GET, "/api/v1/customers/5/orders/latest", None).await;
    assert_eq!(latest["order_id"], order_id.as_str());

    // Cancel
    let (status, cancelled) = send(&router, Method::DELETE, &format!("/api/v1/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["refund_amount"], 3630);

    let (status, again) = send(&router, Method::DELETE, &format!("/api/v1/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(again["message"], "Order is already cancelled");
}

#[tokio::test]
async fn test_promo_endpoints() {
    let router = create_test_router();

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/promo-codes",
        Some(json!({
            "code": "welcome",
            "discount": { "type": "FIXED_AMOUNT", "amount": 500 },
            "usage_limit": 10
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/promo-codes",
        Some(json!({ "code": "WELCOME", "discount": { "type": "PERCENTAGE", "percent": 5.0 } })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, details) = send(&router, Method::GET, "/api/v1/promo-codes/Welcome", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["code"], "WELCOME");
    assert_eq!(details["is_valid"], true);

    let (status, validation) = send(
        &router,
        Method::POST,
        "/api/v1/promo-codes/validate",
        Some(json!({ "code": "welcome" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validation["valid"], true);
    assert_eq!(validation["message"], "Promo code applied successfully!");

    let (status, blank) = send(
        &router,
        Method::POST,
        "/api/v1/promo-codes/validate",
        Some(json!({ "code": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(blank["message"], "Promo code is required");

    let (status, _) = send(&router, Method::GET, "/api/v1/promo-codes/MISSING", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_error_statuses() {
    let router = create_test_router();

    let (status, body) = send(&router, Method::POST, "/api/v1/orders", Some(order_body(&[]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let unknown = uuid::Uuid::new_v4();
    let (status, _) = send(&router, Method::GET, &format!("/api/v1/orders/{unknown}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, created) = send(&router, Method::POST, "/api/v1/orders", Some(order_body(&[40]))).await;
    let order_id = created["order_id"].as_str().unwrap().to_string();
    let (status, declined) = send(
        &router,
        Method::POST,
        &format!("/api/v1/payments/{order_id}"),
        Some(json!({ "method": "Gift Card" })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(declined["code"], "PAYMENT_DECLINED");

    let (status, email) = send(
        &router,
        Method::POST,
        &format!("/api/v1/orders/{order_id}/send-email"),
        Some(json!({ "email": "someone@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(email["code"], "INVALID_STATE");
}
