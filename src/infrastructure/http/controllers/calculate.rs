use crate::{
    domain::entities::{CalculateRequest, CalculationRequest, CalculationResult},
    infrastructure::http::middleware::{ApiResult, AppState},
};
use axum::{extract::rejection::JsonRejection, extract::State, Json};

/// POST /api/v1/calculate - Compute a payment due date
pub async fn calculate(
    State(state): State<AppState>,
    body: Result<Json<CalculateRequest>, JsonRejection>,
) -> ApiResult<Json<CalculationResult>> {
    let Json(body) = body?;
    let request = CalculationRequest::try_from(body)?;

    let result = state
        .calculation_service
        .calculate_within(request, state.request_timeout)
        .await?;

    Ok(Json(result))
}
