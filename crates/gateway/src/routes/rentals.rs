//! Rental booking, read and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::{HeaderMap, StatusCode};
use common::{BearerToken, RentalId, RequestId};
use saga::{BookingRequest, BookingView, GatewayError, RentalSummary};

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the client-chosen idempotency key for bookings.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// GET /api/v1/rental — list the caller's rentals with composed views.
#[tracing::instrument(skip(state, token))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<BearerToken>,
) -> Result<Json<Vec<RentalSummary>>, ApiError> {
    let rentals = state.reader.list_rentals(&token).await?;
    Ok(Json(rentals))
}

/// GET /api/v1/rental/{rentalUid} — one rental with its car and payment.
#[tracing::instrument(skip(state, token))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<BearerToken>,
    Path(rental_uid): Path<RentalId>,
) -> Result<Json<RentalSummary>, ApiError> {
    let rental = state.reader.get_rental(&token, rental_uid).await?;
    Ok(Json(rental))
}

/// POST /api/v1/rental — book a car through the create-rental saga.
///
/// An optional `X-Request-Id` header makes the booking idempotent: retries
/// with the same id replay the stored outcome instead of booking twice.
#[tracing::instrument(skip(state, token, request), fields(car_uid = %request.car_uid))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<BearerToken>,
    headers: HeaderMap,
    Json(request): Json<BookingRequest>,
) -> Result<Json<BookingView>, ApiError> {
    let request_id = request_id(&headers)?;
    let view = state.saga.create_rental(&token, request_id, &request).await?;
    Ok(Json(view))
}

/// POST /api/v1/rental/{rentalUid}/finish — return the car, keep the payment.
#[tracing::instrument(skip(state, token))]
pub async fn finish(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<BearerToken>,
    Path(rental_uid): Path<RentalId>,
) -> Result<StatusCode, ApiError> {
    state.saga.finish_rental(&token, rental_uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/rental/{rentalUid} — cancel the rental and refund.
#[tracing::instrument(skip(state, token))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<BearerToken>,
    Path(rental_uid): Path<RentalId>,
) -> Result<StatusCode, ApiError> {
    state.saga.cancel_rental(&token, rental_uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn request_id(headers: &HeaderMap) -> Result<Option<RequestId>, ApiError> {
    let Some(value) = headers.get(REQUEST_ID_HEADER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| bad_request_id("not valid UTF-8"))?;
    let id = raw
        .parse::<RequestId>()
        .map_err(|_| bad_request_id("not a UUID"))?;
    Ok(Some(id))
}

fn bad_request_id(reason: &str) -> ApiError {
    ApiError(GatewayError::InvalidInput(format!(
        "X-Request-Id header is {reason}"
    )))
}
