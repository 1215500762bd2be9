use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use google_calendar3::api::{
    ConferenceData, ConferenceSolutionKey, CreateConferenceRequest, Event, EventAttendee,
    EventDateTime,
};
use google_calendar3::yup_oauth2::AuthorizedUserAuthenticator;
use google_calendar3::CalendarHub;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::credentials::AuthorizedClient;

/// Event to be created, with conferencing attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRequest {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub time_zone: String,
    pub attendee_email: String,
    /// Idempotency key for the conference create request
    pub request_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedEvent {
    pub id: Option<String>,
    pub join_link: Option<String>,
}

/// Remote calendar that can create events on behalf of an authorized client.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn insert_event(
        &self,
        client: &AuthorizedClient,
        request: &EventRequest,
    ) -> Result<CreatedEvent>;
}

/// Google Calendar v3 backed implementation.
#[derive(Debug, Clone)]
pub struct GoogleCalendar {
    calendar_id: String,
}

impl GoogleCalendar {
    pub fn new(calendar_id: impl Into<String>) -> Self {
        Self {
            calendar_id: calendar_id.into(),
        }
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendar {
    async fn insert_event(
        &self,
        client: &AuthorizedClient,
        request: &EventRequest,
    ) -> Result<CreatedEvent> {
        let connector = google_calendar3::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        let http = Client::builder(TokioExecutor::new()).build(connector);
        let hub = match client {
            AuthorizedClient::Saved(credential) => {
                let auth = AuthorizedUserAuthenticator::builder(credential.clone().into())
                    .build()
                    .await
                    .context("Failed to build authenticator from refresh token")?;
                CalendarHub::new(http, auth)
            }
            AuthorizedClient::Session { access_token } => {
                CalendarHub::new(http, access_token.clone())
            }
        };

        let (_, created) = hub
            .events()
            .insert(to_google_event(request), &self.calendar_id)
            .conference_data_version(1)
            .doit()
            .await
            .context("Failed to create calendar event")?;

        tracing::debug!(
            "Inserted event {:?} into calendar {}",
            created.id,
            self.calendar_id
        );

        Ok(CreatedEvent {
            join_link: join_link(&created),
            id: created.id,
        })
    }
}

fn to_google_event(request: &EventRequest) -> Event {
    Event {
        summary: Some(request.summary.clone()),
        description: Some(request.description.clone()),
        start: Some(EventDateTime {
            date_time: Some(request.start),
            time_zone: Some(request.time_zone.clone()),
            ..Default::default()
        }),
        end: Some(EventDateTime {
            date_time: Some(request.end),
            time_zone: Some(request.time_zone.clone()),
            ..Default::default()
        }),
        attendees: Some(vec![EventAttendee {
            email: Some(request.attendee_email.clone()),
            ..Default::default()
        }]),
        conference_data: Some(ConferenceData {
            create_request: Some(CreateConferenceRequest {
                request_id: Some(request.request_id.clone()),
                conference_solution_key: Some(ConferenceSolutionKey {
                    type_: Some("hangoutsMeet".to_string()),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Hangout link if present, else the first video entry point.
fn join_link(event: &Event) -> Option<String> {
    if let Some(link) = event.hangout_link.as_ref().filter(|link| !link.is_empty()) {
        return Some(link.clone());
    }

    event
        .conference_data
        .as_ref()?
        .entry_points
        .as_ref()?
        .iter()
        .find(|entry| entry.entry_point_type.as_deref() == Some("video"))
        .and_then(|entry| entry.uri.clone())
}
