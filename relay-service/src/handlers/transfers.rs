//! Transfer listing with optional filtering.

use axum::{
    extract::{Query, State},
    Json,
};
use service_core::error::AppError;

use crate::{
    services::{FilterError, FilterQuery, FilterSpec, GatewayResponse},
    AppState,
};

impl From<FilterError> for AppError {
    fn from(err: FilterError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

/// `GET /transfers?status=failed`, `?date_kind=created&_from=..&to=..` or
/// `?r_kind=recipient_code&recipient=..`. No filter keys lists everything.
pub async fn list_transfers(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<GatewayResponse>, AppError> {
    let spec = FilterSpec::try_from(query)?;
    tracing::info!(filter = ?spec, "Listing transfers");

    let response = state.transfers.list_transfers(&spec).await?;
    if !response.success {
        return Err(AppError::BadGateway(response.message));
    }

    Ok(Json(response))
}
