use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use shared::api::{MessageResponse, ScheduleEventQuery};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::scheduler;
use crate::AppState;

/// Authorize, then create a meeting with the requested attendee.
///
/// Remote calendar failures still answer 200 with the error text in `msg`;
/// only bad input and failed authorization produce an error status.
pub async fn schedule_event(
    State(state): State<AppState>,
    query: Result<Query<ScheduleEventQuery>, QueryRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    query
        .validate()
        .map_err(|_| ApiError::bad_request("email must be a valid email address"))?;
    let email = query
        .email
        .ok_or_else(|| ApiError::bad_request("email query parameter is required"))?;

    let client = state.credentials.authorize().await?;

    let result =
        scheduler::schedule_event(state.calendar.as_ref(), &client, &state.template, &email).await;

    Ok(Json(MessageResponse::new(result.message())))
}
