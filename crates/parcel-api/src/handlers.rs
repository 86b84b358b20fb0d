//! # Request Handlers
//!
//! Axum request handlers for the parcel delivery API.
//! Each handler validates its input, makes one store or gateway call (two
//! for payments and user upserts) and renders the result as JSON.

use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use parcel_core::{
    document_id, parcel, payment, rider, to_document, tracking, user, Collection,
    DeleteOutcome, DeliveryError, Document, InsertOutcome, NewParcel, NewRider, PaymentRecord,
    RiderStatus, RiderStatusChange, TrackingUpdate, UpdateOutcome, UserLogin,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// `?email=` filter on owner-scoped lists
#[derive(Debug, Default, Deserialize)]
pub struct EmailFilter {
    #[serde(default)]
    pub email: Option<String>,
}

impl EmailFilter {
    /// The requested email; a blank value means no filter
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|email| !email.trim().is_empty())
    }
}

/// `?status=` filter on the rider list
#[derive(Debug, Default, Deserialize)]
pub struct RiderFilter {
    #[serde(default)]
    pub status: Option<String>,
}

/// `?trackingId=` lookup
#[derive(Debug, Default, Deserialize)]
pub struct TrackingFilter {
    #[serde(rename = "trackingId", default)]
    pub tracking_id: Option<String>,
}

/// Create payment intent request
#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    /// Amount in minor currency units
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Create payment intent response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub client_secret: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a delivery error onto its status and public message.
///
/// Server-side failures are logged with full detail; the client only sees
/// the public message.
pub fn error_response(err: DeliveryError) -> ApiError {
    let code = err.status_code();
    if err.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }

    let response = ErrorResponse::new(err.public_message(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

/// JSON body extractor whose rejections use [`ErrorResponse`]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(error_response(DeliveryError::Validation(
                rejection.body_text(),
            ))),
        }
    }
}

// =============================================================================
// Service Endpoints
// =============================================================================

/// Liveness banner
pub async fn root() -> &'static str {
    "Parcel Delivery Server is Running!"
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (status, label) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(err) => {
            error!("Health check failed: {}", err);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    (
        status,
        Json(json!({
            "status": label,
            "service": "parcel-server",
            "version": env!("CARGO_PKG_VERSION"),
            "store": state.store.backend_name(),
            "payments": state.payments.provider_name(),
            "auth": state.verifier.provider_name()
        })),
    )
}

// =============================================================================
// Users
// =============================================================================

/// Create the user on first sign-in, otherwise refresh `last_login`
#[instrument(skip(state, login))]
pub async fn upsert_user(
    State(state): State<AppState>,
    JsonBody(login): JsonBody<UserLogin>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let email = login.email().map_err(error_response)?.to_string();

    let existing = state
        .store
        .find(Collection::Users, &user::email_query(&email))
        .await
        .map_err(error_response)?;

    if let Some(id) = existing.first().and_then(document_id) {
        state
            .store
            .update_by_id(
                Collection::Users,
                id,
                user::last_login_patch(login.login_time(now)),
            )
            .await
            .map_err(error_response)?;

        info!("Refreshed last login for existing user");
        return Ok(Json(json!({
            "message": "User already exists",
            "inserted": false
        }))
        .into_response());
    }

    let record = login.into_user(now).map_err(error_response)?;
    let outcome = insert(&state, Collection::Users, &record).await?;

    info!("Registered new user: {}", outcome.inserted_id);
    Ok(Json(outcome).into_response())
}

// =============================================================================
// Parcels
// =============================================================================

/// List parcels, optionally for one creator, newest first
#[instrument(skip(state))]
pub async fn list_parcels(
    State(state): State<AppState>,
    Query(filter): Query<EmailFilter>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let parcels = state
        .store
        .find(
            Collection::Parcels,
            &parcel::owner_query(filter.email()),
        )
        .await
        .map_err(error_response)?;

    Ok(Json(parcels))
}

/// Get one parcel
#[instrument(skip(state))]
pub async fn get_parcel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiError> {
    state
        .store
        .find_by_id(Collection::Parcels, &id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Create a parcel (always unpaid)
#[instrument(skip(state, body))]
pub async fn create_parcel(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<NewParcel>,
) -> Result<Json<InsertOutcome>, ApiError> {
    let record = body.into_parcel(Utc::now()).map_err(error_response)?;
    let outcome = insert(&state, Collection::Parcels, &record).await?;

    info!("Created parcel: {}", outcome.inserted_id);
    Ok(Json(outcome))
}

/// Delete a parcel
#[instrument(skip(state))]
pub async fn delete_parcel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let outcome = state
        .store
        .delete_by_id(Collection::Parcels, &id)
        .await
        .map_err(error_response)?;

    info!("Deleted parcel: {}", id);
    Ok(Json(outcome))
}

// =============================================================================
// Riders
// =============================================================================

/// List riders, optionally by review status
#[instrument(skip(state))]
pub async fn list_riders(
    State(state): State<AppState>,
    Query(filter): Query<RiderFilter>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let status = filter
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<RiderStatus>)
        .transpose()
        .map_err(error_response)?;

    let riders = state
        .store
        .find(Collection::Riders, &rider::status_query(status))
        .await
        .map_err(error_response)?;

    Ok(Json(riders))
}

/// Submit a rider application (starts pending)
#[instrument(skip(state, body))]
pub async fn create_rider(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<NewRider>,
) -> Result<Json<InsertOutcome>, ApiError> {
    let record = body.into_rider(Utc::now());
    let outcome = insert(&state, Collection::Riders, &record).await?;

    info!("Rider application received: {}", outcome.inserted_id);
    Ok(Json(outcome))
}

/// Move a rider application to a new review status
#[instrument(skip(state, body))]
pub async fn update_rider_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<RiderStatusChange>,
) -> Result<Json<UpdateOutcome>, ApiError> {
    let patch = body.into_patch().map_err(error_response)?;

    let outcome = state
        .store
        .update_by_id(Collection::Riders, &id, patch)
        .await
        .map_err(error_response)?;

    info!("Updated rider {} status", id);
    Ok(Json(outcome))
}

// =============================================================================
// Payments
// =============================================================================

/// Create a card payment intent and return its client secret
#[instrument(skip(state, body))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreatePaymentIntentRequest>,
) -> Result<Json<CreatePaymentIntentResponse>, ApiError> {
    let amount = body
        .amount
        .ok_or_else(|| error_response(DeliveryError::missing_fields(&["amount"])))?;

    let amount = minor_units(amount).map_err(error_response)?;

    let intent = state
        .payments
        .create_payment_intent(amount)
        .await
        .map_err(error_response)?;

    info!(
        "Created {} payment intent {} for {} {}",
        state.payments.provider_name(),
        intent.id,
        intent.amount,
        intent.currency
    );

    Ok(Json(CreatePaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}

/// Whole minor currency units that fit an `i64`
fn minor_units(amount: f64) -> Result<i64, DeliveryError> {
    // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive
    if !amount.is_finite()
        || amount.fract() != 0.0
        || amount < i64::MIN as f64
        || amount >= i64::MAX as f64
    {
        return Err(DeliveryError::Validation(
            "amount must be an integer number of minor currency units".to_string(),
        ));
    }
    Ok(amount as i64)
}

/// Record a completed payment and mark its parcel paid.
///
/// Idempotent by `transactionId`: repeating the call for the same parcel
/// skips the insert and re-applies the parcel update. Reusing a
/// `transactionId` for another parcel is rejected without writing.
#[instrument(skip(state, body))]
pub async fn record_payment(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<PaymentRecord>,
) -> Result<Json<Value>, ApiError> {
    let transaction = body.into_transaction(Utc::now()).map_err(error_response)?;

    // The parcel must exist before anything is written
    state
        .store
        .find_by_id(Collection::Parcels, &transaction.parcel_id)
        .await
        .map_err(error_response)?;

    let existing = state
        .store
        .find(
            Collection::Transactions,
            &payment::transaction_id_query(&transaction.transaction_id),
        )
        .await
        .map_err(error_response)?;

    if let Some(recorded) = existing.first() {
        let recorded_parcel = recorded.get(payment::PARCEL_ID_FIELD).and_then(Value::as_str);
        if recorded_parcel != Some(transaction.parcel_id.as_str()) {
            return Err(error_response(DeliveryError::Validation(format!(
                "Transaction {} is already recorded for another parcel",
                transaction.transaction_id
            ))));
        }
        info!(
            "Transaction {} already recorded, re-applying parcel update",
            transaction.transaction_id
        );
    } else {
        insert(&state, Collection::Transactions, &transaction).await?;
    }

    if let Err(err) = state
        .store
        .update_by_id(
            Collection::Parcels,
            &transaction.parcel_id,
            parcel::mark_paid_patch(),
        )
        .await
    {
        error!(
            "Transaction {} recorded but parcel {} not marked paid: {}",
            transaction.transaction_id, transaction.parcel_id, err
        );
        return Err(error_response(err));
    }

    info!(
        "Payment {} recorded for parcel {}",
        transaction.transaction_id, transaction.parcel_id
    );

    Ok(Json(json!({
        "success": true,
        "message": "Payment recorded & parcel updated"
    })))
}

/// List transactions, optionally for one payer, newest first
#[instrument(skip(state))]
pub async fn list_payments(
    State(state): State<AppState>,
    Query(filter): Query<EmailFilter>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let payments = state
        .store
        .find(
            Collection::Transactions,
            &payment::payer_query(filter.email()),
        )
        .await
        .map_err(error_response)?;

    Ok(Json(payments))
}

// =============================================================================
// Tracking
// =============================================================================

/// Full history for one tracking id, newest first
#[instrument(skip(state))]
pub async fn tracking_history(
    State(state): State<AppState>,
    Query(filter): Query<TrackingFilter>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let tracking_id = match filter.tracking_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return Err(error_response(DeliveryError::missing_fields(&[
                tracking::TRACKING_ID_FIELD,
            ])))
        }
    };

    let events = state
        .store
        .find(
            Collection::TrackingEvents,
            &tracking::history_query(&tracking_id),
        )
        .await
        .map_err(error_response)?;

    if events.is_empty() {
        return Err(error_response(DeliveryError::not_found(
            "Tracking history",
            tracking_id,
        )));
    }

    Ok(Json(events))
}

/// Append a tracking event
#[instrument(skip(state, body))]
pub async fn add_tracking(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<TrackingUpdate>,
) -> Result<Json<Value>, ApiError> {
    let event = body.into_event(Utc::now()).map_err(error_response)?;
    let outcome = insert(&state, Collection::TrackingEvents, &event).await?;

    info!(
        "Tracking {} moved to '{}'",
        event.tracking_id, event.status
    );

    Ok(Json(json!({
        "message": "Tracking update added",
        "insertedId": outcome.inserted_id
    })))
}

async fn insert<T: Serialize>(
    state: &AppState,
    collection: Collection,
    record: &T,
) -> Result<InsertOutcome, ApiError> {
    let document = to_document(record).map_err(error_response)?;
    state
        .store
        .insert_one(collection, document)
        .await
        .map_err(error_response)
}
