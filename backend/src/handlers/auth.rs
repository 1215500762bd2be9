use axum::extract::State;
use axum::Json;
use shared::api::MessageResponse;

use crate::error::ApiResult;
use crate::AppState;

/// Forget the saved credential. The next authorization runs consent again.
pub async fn re_authenticate(State(state): State<AppState>) -> ApiResult<Json<MessageResponse>> {
    let outcome = state.credentials.reset().await?;
    Ok(Json(MessageResponse::new(outcome.message())))
}

/// Resolve a credential now, running consent if none is saved.
pub async fn authorize(State(state): State<AppState>) -> ApiResult<Json<MessageResponse>> {
    state.credentials.authorize().await?;
    Ok(Json(MessageResponse::new("Authorized")))
}
