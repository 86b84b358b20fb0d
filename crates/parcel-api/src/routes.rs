//! # Routes
//!
//! Axum router configuration for the parcel delivery API.
//! Each endpoint's method router is wrapped in the interceptors its
//! [`Gate`] asks for before the routes are assembled.

use crate::auth;
use crate::handlers;
use crate::state::AppState;
use axum::{
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, MethodRouter},
    Router,
};
use parcel_core::{Endpoint, Gate};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Create the main application router
///
/// Routes:
/// - GET    / - Liveness banner
/// - GET    /health - Health check
/// - POST   /users - Register or refresh a user
/// - GET    /parcels?email= - List parcels
/// - POST   /parcels - Create parcel
/// - GET    /parcels/{id} - Get parcel
/// - DELETE /parcels/{id} - Delete parcel
/// - GET    /riders?status= - List riders
/// - POST   /riders - Submit rider application
/// - PATCH  /riders/status/{id} - Change rider status
/// - POST   /create-payment-intent - Create payment intent
/// - POST   /payments - Record payment
/// - GET    /payments?email= - List payments
/// - GET    /tracking?trackingId= - Tracking history
/// - POST   /tracking - Add tracking event
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state);

    let route = |endpoint: Endpoint, method_router: MethodRouter<AppState>| {
        gated(method_router, state.policy.gate(endpoint), &state)
    };

    let api_routes = Router::new()
        // Users
        .route("/users", route(Endpoint::UpsertUser, post(handlers::upsert_user)))
        // Parcels
        .route(
            "/parcels",
            route(Endpoint::ListParcels, get(handlers::list_parcels))
                .merge(route(Endpoint::CreateParcel, post(handlers::create_parcel))),
        )
        .route(
            "/parcels/{id}",
            route(Endpoint::GetParcel, get(handlers::get_parcel))
                .merge(route(Endpoint::DeleteParcel, delete(handlers::delete_parcel))),
        )
        // Riders
        .route(
            "/riders",
            route(Endpoint::ListRiders, get(handlers::list_riders))
                .merge(route(Endpoint::CreateRider, post(handlers::create_rider))),
        )
        .route(
            "/riders/status/{id}",
            route(
                Endpoint::UpdateRiderStatus,
                patch(handlers::update_rider_status),
            ),
        )
        // Payments
        .route(
            "/create-payment-intent",
            route(
                Endpoint::CreatePaymentIntent,
                post(handlers::create_payment_intent),
            ),
        )
        .route(
            "/payments",
            route(Endpoint::ListPayments, get(handlers::list_payments))
                .merge(route(Endpoint::RecordPayment, post(handlers::record_payment))),
        )
        // Tracking
        .route(
            "/tracking",
            route(Endpoint::TrackingHistory, get(handlers::tracking_history))
                .merge(route(Endpoint::AddTracking, post(handlers::add_tracking))),
        );

    Router::new()
        // Always open
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(api_routes)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

/// Wrap a method router in the interceptors its gate requires.
///
/// Layers added last run first, so the bearer check precedes the email check.
fn gated(
    method_router: MethodRouter<AppState>,
    gate: Gate,
    state: &AppState,
) -> MethodRouter<AppState> {
    match gate {
        Gate::Open => method_router,
        Gate::Bearer => {
            method_router.route_layer(from_fn_with_state(state.clone(), auth::require_bearer))
        }
        Gate::Owner => method_router
            .route_layer(from_fn(auth::require_owner_email))
            .route_layer(from_fn_with_state(state.clone(), auth::require_bearer)),
    }
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if state.config.allows_any_origin() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
}
