//! Router-level tests driving the full middleware stack over in-memory
//! stores with `tower::ServiceExt::oneshot`.

#![allow(clippy::panic, clippy::indexing_slicing)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use ticketing_gateway::api::build_app;
use ticketing_gateway::app_state::AppState;
use ticketing_gateway::config::AppConfig;
use ticketing_gateway::persistence::Stores;

struct TestApp {
    router: Router,
    _uploads: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let Ok(uploads) = tempfile::tempdir() else {
            panic!("temp dir should be creatable");
        };
        let config = AppConfig::for_tests(uploads.path().to_path_buf());
        let state = AppState::new(&config, Stores::in_memory());
        Self {
            router: build_app(state, &config),
            _uploads: uploads,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let Ok(response) = self.router.clone().oneshot(request).await;
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body should be readable");
        };
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn call(
        &self,
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
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        let Ok(request) = request else {
            panic!("request should build");
        };
        self.send(request).await
    }

    async fn register(&self, name: &str, email: &str, role: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "secret123", "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let Some(token) = body["token"].as_str() else {
            panic!("register should return a token");
        };
        token.to_string()
    }

    async fn create_event(&self, token: &str, seats: i32, start: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/events",
                Some(token),
                Some(json!({
                    "title": "Rust Meetup",
                    "location": "Berlin",
                    "startDate": start,
                    "totalSeats": seats,
                    "price": "25.00",
                    "isPublished": true
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        let Some(id) = body["id"].as_str() else {
            panic!("event should have an id");
        };
        id.to_string()
    }
}

const FUTURE: &str = "2099-06-01T18:00:00Z";

#[tokio::test]
async fn root_and_health_respond() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event Management System API");

    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn full_ticketing_flow() {
    let app = TestApp::new();
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let customer = app.register("Carl", "carl@example.com", "customer").await;
    let event_id = app.create_event(&organizer, 5, FUTURE).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/tickets/reserve",
            Some(&customer),
            Some(json!({ "eventId": event_id, "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["price"], "50.00");
    assert_eq!(body["expiresIn"], "10 minutes");
    let reservation_id = body["reservationId"].clone();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/tickets/purchase",
            Some(&customer),
            Some(json!({
                "reservationId": reservation_id,
                "paymentInfo": { "method": "card" }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["tickets"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["payment"]["amount"], "50.00");
    assert_eq!(body["payment"]["status"], "completed");

    let (_, seats) = app
        .call(Method::GET, &format!("/api/events/{event_id}/seats"), None, None)
        .await;
    assert_eq!(seats["availableSeats"], 3);

    let (status, tickets) = app
        .call(Method::GET, "/api/tickets/my-tickets", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tickets.as_array().map(Vec::len), Some(2));
    assert_eq!(tickets[0]["event"]["title"], "Rust Meetup");
    let Some(ticket_id) = tickets[0]["id"].as_str() else {
        panic!("ticket should have an id");
    };

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/tickets/{ticket_id}/cancel"),
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Ticket cancelled successfully");
    assert_eq!(body["ticket"]["status"], "cancelled");

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/tickets/{ticket_id}/cancel"),
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, seats) = app
        .call(Method::GET, &format!("/api/events/{event_id}/seats"), None, None)
        .await;
    assert_eq!(seats["availableSeats"], 4);

    let (status, payments) = app
        .call(Method::GET, "/api/tickets/my-payments", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payments.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn reserving_more_than_available_is_unprocessable() {
    let app = TestApp::new();
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let customer = app.register("Carl", "carl@example.com", "customer").await;
    let event_id = app.create_event(&organizer, 2, FUTURE).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/tickets/reserve",
            Some(&customer),
            Some(json!({ "eventId": event_id, "quantity": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], 4001);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/tickets/reserve",
            Some(&customer),
            Some(json!({ "eventId": event_id, "quantity": 11 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn started_events_cannot_be_reserved() {
    let app = TestApp::new();
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let customer = app.register("Carl", "carl@example.com", "customer").await;
    let event_id = app
        .create_event(&organizer, 10, "2001-01-01T10:00:00Z")
        .await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/tickets/reserve",
            Some(&customer),
            Some(json!({ "eventId": event_id })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], 4002);
}

#[tokio::test]
async fn someone_elses_hold_cannot_be_purchased() {
    let app = TestApp::new();
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let alice = app.register("Alice", "alice@example.com", "customer").await;
    let bob = app.register("Bob", "bob@example.com", "customer").await;
    let event_id = app.create_event(&organizer, 10, FUTURE).await;

    let (_, hold) = app
        .call(
            Method::POST,
            "/api/tickets/reserve",
            Some(&alice),
            Some(json!({ "eventId": event_id })),
        )
        .await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/tickets/purchase",
            Some(&bob),
            Some(json!({
                "reservationId": hold["reservationId"],
                "paymentInfo": { "method": "card" }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unpublished_events_cannot_be_reserved() {
    let app = TestApp::new();
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let customer = app.register("Carl", "carl@example.com", "customer").await;
    let (status, draft) = app
        .call(
            Method::POST,
            "/api/events",
            Some(&organizer),
            Some(json!({
                "title": "Dress Rehearsal",
                "location": "Berlin",
                "startDate": FUTURE,
                "totalSeats": 10,
                "price": "10.00"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{draft}");
    assert_eq!(draft["isPublished"], false);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/tickets/reserve",
            Some(&customer),
            Some(json!({ "eventId": draft["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    assert_eq!(body["error"]["code"], 2002);
}

#[tokio::test]
async fn tickets_cannot_be_cancelled_once_the_event_started() {
    let app = TestApp::new();
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let customer = app.register("Carl", "carl@example.com", "customer").await;
    let event_id = app.create_event(&organizer, 5, FUTURE).await;

    let (_, hold) = app
        .call(
            Method::POST,
            "/api/tickets/reserve",
            Some(&customer),
            Some(json!({ "eventId": event_id })),
        )
        .await;
    let (status, receipt) = app
        .call(
            Method::POST,
            "/api/tickets/purchase",
            Some(&customer),
            Some(json!({
                "reservationId": hold["reservationId"],
                "paymentInfo": { "method": "card" }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    let Some(ticket_id) = receipt["tickets"][0]["id"].as_str() else {
        panic!("ticket should have an id");
    };

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/events/{event_id}"),
            Some(&organizer),
            Some(json!({ "startDate": "2001-01-01T10:00:00Z" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/tickets/{ticket_id}/cancel"),
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["error"]["code"], 4002);

    let (_, seats) = app
        .call(Method::GET, &format!("/api/events/{event_id}/seats"), None, None)
        .await;
    assert_eq!(seats["availableSeats"], 4);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = TestApp::new();
    let (status, body) = app
        .call(Method::GET, "/api/auth/profile", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], 1101);

    let (status, _) = app
        .call(Method::GET, "/api/auth/profile", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn registration_rules() {
    let app = TestApp::new();
    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Root", "email": "root@example.com", "password": "secret123", "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.register("Carl", "carl@example.com", "customer").await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Carl", "email": "CARL@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], 2101);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "carl@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], 1103);
}

#[tokio::test]
async fn profile_can_be_read_and_updated() {
    let app = TestApp::new();
    let token = app.register("Carl", "carl@example.com", "customer").await;

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/auth/profile",
            Some(&token),
            Some(json!({ "name": "Carl Jr", "phone": "+34 600 000 000" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Carl Jr");

    let (_, body) = app
        .call(Method::GET, "/api/auth/profile", Some(&token), None)
        .await;
    assert_eq!(body["phone"], "+34 600 000 000");
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn only_organizers_manage_events() {
    let app = TestApp::new();
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let rival = app.register("Rita", "rita@example.com", "organizer").await;
    let customer = app.register("Carl", "carl@example.com", "customer").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/events",
            Some(&customer),
            Some(json!({
                "title": "Nope",
                "location": "Nowhere",
                "startDate": FUTURE,
                "totalSeats": 1,
                "price": "1.00"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let event_id = app.create_event(&organizer, 10, FUTURE).await;
    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/events/{event_id}"),
            Some(&rival),
            Some(json!({ "title": "Hijacked" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/events/{event_id}"),
            Some(&organizer),
            Some(json!({ "totalSeats": 12 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["availableSeats"], 12);

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/events/{event_id}"),
            Some(&organizer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event deleted successfully");

    let (status, _) = app
        .call(Method::GET, &format!("/api/events/{event_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_shows_published_events_with_pagination() {
    let app = TestApp::new();
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    for _ in 0..3 {
        app.create_event(&organizer, 10, FUTURE).await;
    }
    let (status, _) = app
        .call(
            Method::POST,
            "/api/events",
            Some(&organizer),
            Some(json!({
                "title": "Draft",
                "location": "Berlin",
                "startDate": FUTURE,
                "totalSeats": 10,
                "price": "0"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .call(Method::GET, "/api/events?page=1&perPage=2", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["totalPages"], 2);
}

#[tokio::test]
async fn comments_and_reviews() {
    let app = TestApp::new();
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let customer = app.register("Carl", "carl@example.com", "customer").await;
    let other = app.register("Dana", "dana@example.com", "customer").await;
    let event_id = app.create_event(&organizer, 10, FUTURE).await;

    let (status, comment) = app
        .call(
            Method::POST,
            &format!("/api/events/{event_id}/comments"),
            Some(&customer),
            Some(json!({ "text": "Can't wait!" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{comment}");
    assert_eq!(comment["userName"], "Carl");

    let (status, review) = app
        .call(
            Method::POST,
            &format!("/api/events/{event_id}/reviews"),
            Some(&customer),
            Some(json!({ "rating": 4, "text": "Great talks" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{review}");
    let Some(review_id) = review["id"].as_str() else {
        panic!("review should have an id");
    };

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/events/{event_id}/reviews"),
            Some(&customer),
            Some(json!({ "rating": 5, "text": "Again" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/reviews/{review_id}"),
            Some(&other),
            Some(json!({ "rating": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = app
        .call(
            Method::PUT,
            &format!("/api/reviews/{review_id}"),
            Some(&customer),
            Some(json!({ "rating": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["rating"], 5);

    let (_, all) = app.call(Method::GET, "/api/reviews", None, None).await;
    assert_eq!(all.as_array().map(Vec::len), Some(1));

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/reviews/{review_id}"),
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Review deleted successfully");

    let (status, _) = app
        .call(Method::GET, &format!("/api/reviews/{review_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn media_upload_is_stored_and_listed() {
    let app = TestApp::new();
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let event_id = app.create_event(&organizer, 10, FUTURE).await;

    let boundary = "X-BOUNDARY";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"caption\"\r\n\r\n\
         Stage photo\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"stage shot.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         not-really-a-png\r\n\
         --{boundary}--\r\n"
    );
    let Ok(request) = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/events/{event_id}/media"))
        .header(header::AUTHORIZATION, format!("Bearer {organizer}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
    else {
        panic!("request should build");
    };
    let (status, media) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED, "{media}");
    assert_eq!(media["type"], "image");
    assert_eq!(media["caption"], "Stage photo");
    let Some(url) = media["url"].as_str() else {
        panic!("media should have a url");
    };
    assert!(url.starts_with("/uploads/events/"));

    let (status, listed) = app
        .call(Method::GET, &format!("/api/events/{event_id}/media"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let Ok(request) = Request::builder().uri(url).body(Body::empty()) else {
        panic!("request should build");
    };
    let Ok(response) = app.router.clone().oneshot(request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn community_on_unknown_event_is_not_found() {
    let app = TestApp::new();
    let customer = app.register("Carl", "carl@example.com", "customer").await;
    let missing = uuid::Uuid::new_v4();

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/events/{missing}/comments"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/events/{missing}/comments"),
            Some(&customer),
            Some(json!({ "text": "hello?" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
