use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{accounts, checkout, events, health_check, reservations};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(accounts::register))
        .route("/auth/login", post(accounts::login))
        .route("/events", get(events::list_events).post(events::create_event))
        .route("/events/:event_id", get(events::get_event))
        .route(
            "/reservations",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route(
            "/reservations/:reservation_id",
            get(reservations::get_reservation)
                .put(reservations::update_reservation)
                .patch(reservations::update_reservation)
                .delete(reservations::destroy_reservation),
        )
        .route(
            "/reservations/:reservation_id/cancel",
            post(reservations::cancel_reservation),
        )
        .route("/checkout", post(checkout::checkout))
        .with_state(state)
        .layer(create_security_headers_layer(config.production))
        .layer(create_cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::bootstrap_staff;
    use crate::payment::SimulatedPayments;
    use crate::store::MemoryStore;

    const ADMIN_TOKEN: &str = "admin-token";

    async fn app_with(payments: SimulatedPayments) -> Router {
        let store = MemoryStore::new();
        bootstrap_staff(&store, "admin", ADMIN_TOKEN).await.unwrap();
        let state = AppState::new(Arc::new(store), Arc::new(payments));
        let config = Config::from_lookup(|_| None);
        create_routes(state, &config)
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register(app: &Router, username: &str) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": username, "password": "correct horse" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["access"].as_str().unwrap().to_string()
    }

    async fn create_event(app: &Router, total_tickets: i32) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/events",
            Some(ADMIN_TOKEN),
            Some(json!({
                "name": "Concert",
                "description": "Live show",
                "location": "Florence",
                "start_time": "2030-06-01T20:00:00Z",
                "end_time": "2030-06-01T23:00:00Z",
                "price": "30.00",
                "total_tickets": total_tickets
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["available_tickets"], total_tickets);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn available(app: &Router, event_id: &str) -> Value {
        let (status, body) = call(app, Method::GET, &format!("/events/{event_id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["available_tickets"].clone()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = app_with(SimulatedPayments::approving()).await;
        let (status, body) = call(&app, Method::GET, "/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_list_events() {
        let app = app_with(SimulatedPayments::approving()).await;
        create_event(&app, 100).await;

        let (status, body) = call(&app, Method::GET, "/events", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let events = body["data"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["name"], "Concert");
        assert!(events[0].get("description").is_none());
    }

    #[tokio::test]
    async fn test_only_staff_create_events() {
        let app = app_with(SimulatedPayments::approving()).await;
        let token = register(&app, "alice").await;
        let payload = json!({
            "name": "Concert",
            "location": "Florence",
            "start_time": "2030-06-01T20:00:00Z",
            "end_time": "2030-06-01T23:00:00Z",
            "total_tickets": 10
        });

        let (status, _) = call(&app, Method::POST, "/events", None, Some(payload.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(&app, Method::POST, "/events", Some(&token), Some(payload)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_reservation_flow_over_http() {
        let app = app_with(SimulatedPayments::approving()).await;
        let token = register(&app, "alice").await;
        let event_id = create_event(&app, 100).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/checkout",
            Some(&token),
            Some(json!({
                "event_id": event_id,
                "quantity": 10,
                "name": "Ada",
                "surname": "Lovelace",
                "card_number": "4242 4242 4242 4242",
                "expiry": "12/30",
                "cvc": "123"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["available_tickets"], 90);
        let reservation_id = body["data"]["reservation"]["id"].as_str().unwrap().to_string();
        let uri = format!("/reservations/{reservation_id}");

        let (status, body) = call(
            &app,
            Method::PATCH,
            &uri,
            Some(&token),
            Some(json!({ "quantity": 12 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "QUANTITY_INCREASE_NOT_ALLOWED");
        assert_eq!(available(&app, &event_id).await, 90);

        let (status, body) = call(
            &app,
            Method::PATCH,
            &uri,
            Some(&token),
            Some(json!({ "quantity": 4 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["available_tickets"], 96);

        let (status, body) = call(&app, Method::GET, "/reservations", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let other = register(&app, "mallory").await;
        let (status, _) = call(&app, Method::DELETE, &uri, Some(&other), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(available(&app, &event_id).await, 100);

        let (status, _) = call(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sold_out_reservation_is_conflict() {
        let app = app_with(SimulatedPayments::approving()).await;
        let token = register(&app, "alice").await;
        let event_id = create_event(&app, 2).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/reservations",
            Some(&token),
            Some(json!({ "event_id": event_id, "quantity": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "INSUFFICIENT_INVENTORY");
        assert_eq!(body["error"]["details"]["available"], 2);
        assert_eq!(available(&app, &event_id).await, 2);
    }

    #[tokio::test]
    async fn test_declined_checkout_is_payment_required() {
        let app = app_with(SimulatedPayments::declining()).await;
        let token = register(&app, "alice").await;
        let event_id = create_event(&app, 5).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/checkout",
            Some(&token),
            Some(json!({ "event_id": event_id, "quantity": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["error"]["code"], "PAYMENT_FAILED");
        assert_eq!(available(&app, &event_id).await, 5);

        let (_, body) = call(&app, Method::GET, "/reservations", Some(&token), None).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_over_http() {
        let app = app_with(SimulatedPayments::approving()).await;
        let registered = register(&app, "alice").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "wrong password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "AUTH_ERROR");

        let (status, body) = call(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "correct horse" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["user"].get("password_hash").is_none());
        let access = body["data"]["access"].as_str().unwrap().to_string();
        assert_ne!(access, registered);

        let (status, _) = call(&app, Method::GET, "/reservations", Some(&access), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_input_uses_error_envelope() {
        let app = app_with(SimulatedPayments::approving()).await;
        let token = register(&app, "alice").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/reservations",
            Some(&token),
            Some(json!({ "quantity": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, body) = call(
            &app,
            Method::GET,
            "/reservations/not-a-uuid",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, body) = call(&app, Method::GET, "/events/42", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        let app = app_with(SimulatedPayments::approving()).await;
        let (status, body) = call(&app, Method::GET, "/reservations", Some("nope"), None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "AUTH_ERROR");
    }
}
