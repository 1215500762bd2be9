use axum::{routing::get, Router};

use crate::handlers::{auth, health, schedule};
use crate::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))

        // Scheduling
        .route("/schedule_event", get(schedule::schedule_event))

        // Credential lifecycle
        .route("/re-authenticate", get(auth::re_authenticate))
        .route("/authorize", get(auth::authorize))
}
