//! HTTP-level tests against the full router, backed by the in-memory store,
//! a static token table and a stub payment gateway.

use async_trait::async_trait;
use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use parcel_api::{create_router, AppConfig, AppState};
use parcel_core::{
    AuthPolicy, Collection, DeliveryError, DeliveryResult, Endpoint, Gate, Identity,
    MemoryStore, PaymentGateway, PaymentIntent, StaticTokenVerifier,
};
use serde_json::{json, Value};
use std::sync::Arc;

const ALICE: &str = "alice@example.com";
const BOB: &str = "bob@example.com";
const ALICE_TOKEN: &str = "alice-token";
const BOB_TOKEN: &str = "bob-token";

/// Gateway that answers locally; amount 13 simulates a decline
struct StubGateway;

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_payment_intent(&self, amount: i64) -> DeliveryResult<PaymentIntent> {
        parcel_core::validate_amount(amount)?;
        if amount == 13 {
            return Err(DeliveryError::Gateway {
                provider: "stub".to_string(),
                message: "Your card was declined.".to_string(),
            });
        }

        Ok(PaymentIntent {
            id: format!("pi_{}", amount),
            client_secret: format!("pi_{}_secret", amount),
            amount,
            currency: "usd".to_string(),
            status: Some("requires_payment_method".to_string()),
        })
    }

    fn currency(&self) -> &str {
        "usd"
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

struct Harness {
    server: TestServer,
    store: Arc<MemoryStore>,
}

fn harness(policy: AuthPolicy) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let verifier = StaticTokenVerifier::new()
        .with_token(ALICE_TOKEN, Identity::new("uid-alice", Some(ALICE.to_string())))
        .with_token(BOB_TOKEN, Identity::new("uid-bob", Some(BOB.to_string())));

    let state = AppState::with_components(
        store.clone(),
        Arc::new(verifier),
        Arc::new(StubGateway),
        policy,
        AppConfig::default(),
    );

    Harness {
        server: TestServer::new(create_router(state)).unwrap(),
        store,
    }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

impl Harness {
    async fn create_parcel(&self, body: Value) -> String {
        let response = self.server.post("/parcels").json(&body).await;
        assert_eq!(response.status_code(), StatusCode::OK, "{}", response.text());

        let outcome: Value = response.json();
        assert_eq!(outcome["acknowledged"], json!(true));
        outcome["insertedId"].as_str().unwrap().to_string()
    }

    async fn parcels_for(&self, email: &str, token: &str) -> Vec<Value> {
        let response = self
            .server
            .get("/parcels")
            .add_query_param("email", email)
            .add_header(header::AUTHORIZATION, bearer(token))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK, "{}", response.text());
        response.json()
    }

    async fn parcel(&self, id: &str) -> Value {
        let response = self
            .server
            .get(&format!("/parcels/{}", id))
            .add_header(header::AUTHORIZATION, bearer(ALICE_TOKEN))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK, "{}", response.text());
        response.json()
    }
}

fn payment_body(transaction_id: &str, parcel_id: &str) -> Value {
    json!({
        "transactionId": transaction_id,
        "amount": 150,
        "email": ALICE,
        "parcelId": parcel_id,
        "paymentMethod": ["card"]
    })
}

// =============================================================================
// Service
// =============================================================================

#[tokio::test]
async fn root_reports_running() {
    let h = harness(AuthPolicy::legacy());
    let response = h.server.get("/").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "Parcel Delivery Server is Running!");
}

#[tokio::test]
async fn health_names_backends() {
    let h = harness(AuthPolicy::strict());
    let response = h.server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["service"], json!("parcel-server"));
    assert_eq!(body["store"], json!("memory"));
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let h = harness(AuthPolicy::legacy());
    let response = h
        .server
        .post("/parcels")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], json!(400));
    assert!(body["error"].is_string());
}

// =============================================================================
// Parcels
// =============================================================================

#[tokio::test]
async fn parcels_are_listed_for_their_creator_only() {
    let h = harness(AuthPolicy::legacy());
    let id = h
        .create_parcel(json!({"created_by": ALICE, "title": "Documents", "weight": 1.5}))
        .await;

    let mine = h.parcels_for(ALICE, ALICE_TOKEN).await;
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["_id"], json!(id));
    assert_eq!(mine[0]["title"], json!("Documents"));

    let theirs = h.parcels_for(BOB, BOB_TOKEN).await;
    assert!(theirs.is_empty());
}

#[tokio::test]
async fn blank_email_lists_every_parcel() {
    let h = harness(AuthPolicy::legacy());
    h.create_parcel(json!({"created_by": ALICE})).await;
    h.create_parcel(json!({"created_by": BOB})).await;

    assert_eq!(h.parcels_for("", ALICE_TOKEN).await.len(), 2);

    let h = harness(AuthPolicy::open());
    h.create_parcel(json!({"created_by": ALICE})).await;
    let response = h.server.get("/parcels").add_query_param("email", "").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let parcels: Vec<Value> = response.json();
    assert_eq!(parcels.len(), 1);

    let response = h.server.get("/payments").add_query_param("email", " ").await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn parcels_are_listed_newest_first() {
    let h = harness(AuthPolicy::legacy());
    for (title, date) in [
        ("middle", "2025-07-02T08:00:00.000Z"),
        ("oldest", "2025-07-01T08:00:00.000Z"),
        ("newest", "2025-07-03T08:00:00.000Z"),
    ] {
        h.create_parcel(json!({"created_by": ALICE, "title": title, "creation_date": date}))
            .await;
    }

    let titles: Vec<Value> = h
        .parcels_for(ALICE, ALICE_TOKEN)
        .await
        .into_iter()
        .map(|p| p["title"].clone())
        .collect();
    assert_eq!(titles, vec![json!("newest"), json!("middle"), json!("oldest")]);
}

#[tokio::test]
async fn new_parcels_start_unpaid() {
    let h = harness(AuthPolicy::legacy());
    let id = h
        .create_parcel(json!({"created_by": ALICE, "payment_status": "paid"}))
        .await;

    let parcel = h.parcel(&id).await;
    assert_eq!(parcel["payment_status"], json!("unpaid"));
    assert!(parcel["creation_date"].is_string());
}

#[tokio::test]
async fn parcel_without_creator_is_rejected() {
    let h = harness(AuthPolicy::legacy());
    let response = h.server.post("/parcels").json(&json!({"title": "x"})).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("created_by"));
    assert_eq!(h.store.len(Collection::Parcels), 0);
}

#[tokio::test]
async fn missing_or_malformed_parcel_id_is_not_found() {
    let h = harness(AuthPolicy::legacy());
    h.create_parcel(json!({"created_by": ALICE})).await;

    for id in ["64b7f0c2a1e4d3b2c1a09f8e", "not-an-id", "123"] {
        let response = h
            .server
            .get(&format!("/parcels/{}", id))
            .add_header(header::AUTHORIZATION, bearer(ALICE_TOKEN))
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "id {}", id);

        let body: Value = response.json();
        assert_eq!(body["code"], json!(404));
    }
}

#[tokio::test]
async fn deleting_a_parcel() {
    let h = harness(AuthPolicy::legacy());
    let id = h.create_parcel(json!({"created_by": ALICE})).await;

    let response = h.server.delete(&format!("/parcels/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let outcome: Value = response.json();
    assert_eq!(outcome, json!({"acknowledged": true, "deletedCount": 1}));

    let response = h.server.delete(&format!("/parcels/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Authorization
// =============================================================================

#[tokio::test]
async fn gated_list_without_header_is_unauthorized() {
    let h = harness(AuthPolicy::legacy());
    let response = h.server.get("/parcels").add_query_param("email", ALICE).await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], json!(401));
}

#[tokio::test]
async fn gated_list_with_invalid_token_is_forbidden() {
    let h = harness(AuthPolicy::legacy());
    let response = h
        .server
        .get("/parcels")
        .add_query_param("email", ALICE)
        .add_header(header::AUTHORIZATION, bearer("expired-or-forged"))
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn gated_list_for_someone_else_is_forbidden() {
    let h = harness(AuthPolicy::legacy());
    h.create_parcel(json!({"created_by": BOB})).await;

    for path in ["/parcels", "/payments"] {
        let response = h
            .server
            .get(path)
            .add_query_param("email", BOB)
            .add_header(header::AUTHORIZATION, bearer(ALICE_TOKEN))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN, "{}", path);
    }
}

#[tokio::test]
async fn single_parcel_read_needs_a_token() {
    let h = harness(AuthPolicy::legacy());
    let id = h.create_parcel(json!({"created_by": ALICE})).await;

    let response = h.server.get(&format!("/parcels/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn open_policy_gates_nothing() {
    let h = harness(AuthPolicy::open());
    let id = h.create_parcel(json!({"created_by": ALICE})).await;

    let response = h.server.get(&format!("/parcels/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = h.server.get("/parcels").add_query_param("email", BOB).await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn strict_policy_gates_writes() {
    let h = harness(AuthPolicy::strict());

    let response = h
        .server
        .post("/parcels")
        .json(&json!({"created_by": ALICE}))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = h
        .server
        .post("/parcels")
        .add_header(header::AUTHORIZATION, bearer(ALICE_TOKEN))
        .json(&json!({"created_by": ALICE}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    // Always open
    assert_eq!(h.server.get("/").await.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn policy_overrides_single_endpoint() {
    let h = harness(AuthPolicy::legacy().with_gate(Endpoint::AddTracking, Gate::Bearer));

    let response = h
        .server
        .post("/tracking")
        .json(&json!({
            "trackingId": "TRK-1",
            "status": "picked_up",
            "message": "Picked up",
            "location": "Dhaka",
            "updated_by": "rider@example.com"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    // The GET half of the same path stays open
    let response = h
        .server
        .get("/tracking")
        .add_query_param("trackingId", "TRK-1")
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Payments
// =============================================================================

#[tokio::test]
async fn payment_intent_returns_client_secret() {
    let h = harness(AuthPolicy::legacy());
    let response = h
        .server
        .post("/create-payment-intent")
        .json(&json!({"amount": 1500}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body, json!({"clientSecret": "pi_1500_secret"}));
}

#[tokio::test]
async fn payment_intent_validates_amount() {
    let h = harness(AuthPolicy::legacy());

    for body in [
        json!({}),
        json!({"amount": 0}),
        json!({"amount": 12.5}),
        json!({"amount": 1e30}),
    ] {
        let response = h.server.post("/create-payment-intent").json(&body).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{}", body);
    }
}

#[tokio::test]
async fn payment_intent_surfaces_gateway_message() {
    let h = harness(AuthPolicy::legacy());
    let response = h
        .server
        .post("/create-payment-intent")
        .json(&json!({"amount": 13}))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], json!("Your card was declined."));
}

#[tokio::test]
async fn recording_a_payment_marks_the_parcel_paid() {
    let h = harness(AuthPolicy::legacy());
    let id = h.create_parcel(json!({"created_by": ALICE})).await;

    let response = h
        .server
        .post("/payments")
        .json(&payment_body("pi_abc", &id))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK, "{}", response.text());
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({"success": true, "message": "Payment recorded & parcel updated"})
    );

    assert_eq!(h.parcel(&id).await["payment_status"], json!("paid"));
    assert_eq!(h.store.len(Collection::Transactions), 1);
}

#[tokio::test]
async fn payment_for_unknown_parcel_writes_nothing() {
    let h = harness(AuthPolicy::legacy());

    for parcel_id in ["64b7f0c2a1e4d3b2c1a09f8e", "garbage"] {
        let response = h
            .server
            .post("/payments")
            .json(&payment_body("pi_lost", parcel_id))
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }
    assert_eq!(h.store.len(Collection::Transactions), 0);
}

#[tokio::test]
async fn repeated_payment_is_recorded_once() {
    let h = harness(AuthPolicy::legacy());
    let id = h.create_parcel(json!({"created_by": ALICE})).await;

    for _ in 0..2 {
        let response = h
            .server
            .post("/payments")
            .json(&payment_body("pi_retry", &id))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    assert_eq!(h.store.len(Collection::Transactions), 1);
    assert_eq!(h.parcel(&id).await["payment_status"], json!("paid"));
}

#[tokio::test]
async fn transaction_id_cannot_pay_a_second_parcel() {
    let h = harness(AuthPolicy::legacy());
    let paid = h.create_parcel(json!({"created_by": ALICE})).await;
    let other = h.create_parcel(json!({"created_by": ALICE})).await;

    let response = h
        .server
        .post("/payments")
        .json(&payment_body("pi_same", &paid))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = h
        .server
        .post("/payments")
        .json(&payment_body("pi_same", &other))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    assert_eq!(h.parcel(&other).await["payment_status"], json!("unpaid"));
    assert_eq!(h.parcel(&paid).await["payment_status"], json!("paid"));
    assert_eq!(h.store.len(Collection::Transactions), 1);
}

#[tokio::test]
async fn incomplete_payment_is_rejected() {
    let h = harness(AuthPolicy::legacy());
    let id = h.create_parcel(json!({"created_by": ALICE})).await;

    let response = h
        .server
        .post("/payments")
        .json(&json!({"transactionId": "pi_x", "parcelId": id}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(h.parcel(&id).await["payment_status"], json!("unpaid"));
}

#[tokio::test]
async fn payment_history_is_newest_first() {
    let h = harness(AuthPolicy::legacy());
    let first = h.create_parcel(json!({"created_by": ALICE})).await;
    let second = h.create_parcel(json!({"created_by": ALICE})).await;

    for (tx, parcel) in [("pi_first", &first), ("pi_second", &second)] {
        h.server
            .post("/payments")
            .json(&payment_body(tx, parcel))
            .await;
    }

    let response = h
        .server
        .get("/payments")
        .add_query_param("email", ALICE)
        .add_header(header::AUTHORIZATION, bearer(ALICE_TOKEN))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let history: Vec<Value> = response.json();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["transactionId"], json!("pi_second"));
    assert_eq!(history[1]["transactionId"], json!("pi_first"));
    assert!(history[0]["createdAt"].is_string());
    assert_eq!(history[0]["amount"], json!(150));
}

// =============================================================================
// Tracking
// =============================================================================

fn tracking_body(status: &str) -> Value {
    json!({
        "trackingId": "TRK-42",
        "status": status,
        "message": format!("Parcel {}", status),
        "location": "Chattogram hub",
        "updated_by": "rider@example.com"
    })
}

#[tokio::test]
async fn tracking_requires_every_field() {
    let h = harness(AuthPolicy::legacy());

    for field in ["trackingId", "status", "message", "location", "updated_by"] {
        let mut body = tracking_body("in_transit");
        body.as_object_mut().unwrap().remove(field);

        let response = h.server.post("/tracking").json(&body).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{}", field);

        let error: Value = response.json();
        assert!(error["error"].as_str().unwrap().contains(field));
    }

    assert_eq!(h.store.len(Collection::TrackingEvents), 0);
}

#[tokio::test]
async fn tracking_history_is_newest_first() {
    let h = harness(AuthPolicy::legacy());

    for status in ["picked_up", "in_transit"] {
        let response = h.server.post("/tracking").json(&tracking_body(status)).await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body: Value = response.json();
        assert_eq!(body["message"], json!("Tracking update added"));
        assert!(body["insertedId"].is_string());
    }

    let response = h
        .server
        .get("/tracking")
        .add_query_param("trackingId", "TRK-42")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let events: Vec<Value> = response.json();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["status"], json!("in_transit"));
    assert_eq!(events[1]["status"], json!("picked_up"));
}

#[tokio::test]
async fn tracking_lookup_errors() {
    let h = harness(AuthPolicy::legacy());

    let response = h.server.get("/tracking").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = h
        .server
        .get("/tracking")
        .add_query_param("trackingId", "TRK-NONE")
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Riders & Users
// =============================================================================

async fn riders_with_status(h: &Harness, status: &str) -> Vec<Value> {
    let response = h
        .server
        .get("/riders")
        .add_query_param("status", status)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    response.json()
}

#[tokio::test]
async fn rider_application_review() {
    let h = harness(AuthPolicy::legacy());

    let response = h
        .server
        .post("/riders")
        .json(&json!({"name": "Karim", "email": "karim@example.com", "region": "Dhaka"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let rider_id = response.json::<Value>()["insertedId"]
        .as_str()
        .unwrap()
        .to_string();

    let pending = riders_with_status(&h, "pending").await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["name"], json!("Karim"));

    let response = h
        .server
        .patch(&format!("/riders/status/{}", rider_id))
        .json(&json!({"status": "approved"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let outcome: Value = response.json();
    assert_eq!(
        outcome,
        json!({"acknowledged": true, "matchedCount": 1, "modifiedCount": 1})
    );

    assert!(riders_with_status(&h, "pending").await.is_empty());
    assert_eq!(riders_with_status(&h, "approved").await.len(), 1);
}

#[tokio::test]
async fn rider_status_errors() {
    let h = harness(AuthPolicy::legacy());

    let response = h.server.get("/riders").add_query_param("status", "retired").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = h
        .server
        .patch("/riders/status/64b7f0c2a1e4d3b2c1a09f8e")
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = h
        .server
        .patch("/riders/status/64b7f0c2a1e4d3b2c1a09f8e")
        .json(&json!({"status": "approved"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn signing_in_twice_keeps_one_user() {
    let h = harness(AuthPolicy::legacy());
    let login = json!({"email": ALICE, "name": "Alice", "role": "user"});

    let response = h.server.post("/users").json(&login).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let first: Value = response.json();
    assert_eq!(first["acknowledged"], json!(true));
    assert!(first["insertedId"].is_string());

    let response = h.server.post("/users").json(&login).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let second: Value = response.json();
    assert_eq!(
        second,
        json!({"message": "User already exists", "inserted": false})
    );

    assert_eq!(h.store.len(Collection::Users), 1);
}

#[tokio::test]
async fn user_without_email_is_rejected() {
    let h = harness(AuthPolicy::legacy());
    let response = h.server.post("/users").json(&json!({"name": "Nobody"})).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(h.store.len(Collection::Users), 0);
}
