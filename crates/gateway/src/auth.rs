//! Bearer-token authentication middleware.
//!
//! Every `/api/v1` request is verified once against the identity provider;
//! the resolved [`Principal`] and the raw [`BearerToken`] are stashed in the
//! request extensions for handlers to forward downstream.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use common::BearerToken;
use saga::GatewayError;

use crate::AppState;
use crate::error::ApiError;

/// Rejects requests without a valid `Authorization: Bearer <token>` header.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request).ok_or(ApiError(GatewayError::Unauthorized))?;
    let principal = state
        .identity
        .verify(&token)
        .await
        .map_err(GatewayError::from)?;

    tracing::debug!(username = %principal.username, "authenticated");
    request.extensions_mut().insert(principal);
    request.extensions_mut().insert(token);
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<BearerToken> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() {
        return None;
    }
    Some(BearerToken::new(token))
}
