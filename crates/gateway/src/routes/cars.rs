//! Car catalog passthrough endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Query, State};
use clients::CarPage;
use common::BearerToken;
use saga::GatewayError;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default)]
    pub show_all: bool,
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    10
}

/// GET /api/v1/cars — list a page of the catalog.
///
/// `showAll=true` includes cars that are currently reserved.
#[tracing::instrument(skip(state, token))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<BearerToken>,
    Query(query): Query<CarListQuery>,
) -> Result<Json<CarPage>, ApiError> {
    let page = state
        .cars
        .list_cars(query.page, query.size, query.show_all, &token)
        .await
        .map_err(GatewayError::from)?;
    Ok(Json(page))
}
