//! # Authorization Interceptors
//!
//! Middleware attached per route according to the [`AuthPolicy`]:
//!
//! 1. [`require_bearer`] verifies the bearer token and stores the caller's
//!    [`Identity`] in the request extensions.
//! 2. [`require_owner_email`] checks an `email` query parameter against
//!    that identity.
//!
//! Either step can end the request with an error response.
//!
//! [`AuthPolicy`]: parcel_core::AuthPolicy

use crate::handlers::{error_response, ApiError, EmailFilter};
use crate::state::AppState;
use axum::{
    extract::{Query, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use parcel_core::{bearer_token, DeliveryError, Identity};
use tracing::debug;

/// Reject requests without a verified bearer token
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = match request.headers().get(AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| {
            error_response(DeliveryError::Unauthorized(
                "Authorization header is not valid text".to_string(),
            ))
        })?),
        None => None,
    };

    let token = bearer_token(header).map_err(error_response)?;
    let identity = state.verifier.verify(token).await.map_err(error_response)?;

    debug!(
        "Authenticated uid={} via {}",
        identity.uid,
        state.verifier.provider_name()
    );
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Reject requests whose `email` query parameter is not the caller's.
///
/// Must run after [`require_bearer`]. Requests without the parameter, or
/// with it blank, pass.
pub async fn require_owner_email(request: Request, next: Next) -> Result<Response, ApiError> {
    let identity = request.extensions().get::<Identity>().ok_or_else(|| {
        error_response(DeliveryError::Unauthorized(
            "Missing authenticated identity".to_string(),
        ))
    })?;

    let Query(filter) = Query::<EmailFilter>::try_from_uri(request.uri())
        .map_err(|e| error_response(DeliveryError::Validation(e.body_text())))?;

    if let Some(email) = filter.email() {
        if !identity.owns_email(email) {
            return Err(error_response(DeliveryError::Forbidden(
                "Forbidden access".to_string(),
            )));
        }
    }

    Ok(next.run(request).await)
}
