//! Meeting scheduler backend.
//!
//! Resolves a delegated Google credential (saved token or interactive
//! consent) and creates calendar events with an attached video conference.

use axum::http::{header, Method};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod calendar;
pub mod config;
pub mod consent;
pub mod credentials;
pub mod error;
mod handlers;
mod routes;
pub mod scheduler;

use crate::calendar::CalendarApi;
use crate::credentials::CredentialManager;
use crate::routes::api_routes;
use crate::scheduler::EventTemplate;

/// Everything a request needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<CredentialManager>,
    pub calendar: Arc<dyn CalendarApi>,
    pub template: Arc<EventTemplate>,
}

impl AppState {
    pub fn new(
        credentials: CredentialManager,
        calendar: Arc<dyn CalendarApi>,
        template: EventTemplate,
    ) -> Self {
        Self {
            credentials: Arc::new(credentials),
            calendar,
            template: Arc::new(template),
        }
    }
}

pub fn create_app(state: AppState, cors_allowed_origins: Option<&str>) -> Router {
    Router::new()
        .merge(api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors_allowed_origins))
        .with_state(state)
}

/// Build CORS layer from the configured origin list.
///
/// If no origins are configured, defaults to permissive CORS.
fn build_cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    match allowed_origins {
        Some(origins) => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                tracing::warn!(
                    "CORS_ALLOWED_ORIGINS is set but empty, using permissive CORS"
                );
                CorsLayer::permissive()
            } else {
                tracing::info!("CORS configured for origins: {:?}", origins);
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods([Method::GET, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE])
            }
        }
        None => {
            tracing::warn!("CORS_ALLOWED_ORIGINS not set, using permissive CORS");
            CorsLayer::permissive()
        }
    }
}
