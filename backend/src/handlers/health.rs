use axum::extract::State;
use axum::Json;
use shared::api::HealthResponse;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        credential: state.credentials.state().await,
    })
}
