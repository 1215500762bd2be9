use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use shared::models::EventResult;
use uuid::Uuid;

use crate::calendar::{CalendarApi, EventRequest};
use crate::credentials::AuthorizedClient;

pub const DEFAULT_SUMMARY: &str = "Contemporary Meeting";
pub const DEFAULT_DESCRIPTION: &str = "Video Meet";
pub const DEFAULT_DURATION_HOURS: i64 = 2;

/// Fixed shape of every scheduled meeting; only the attendee varies.
#[derive(Debug, Clone)]
pub struct EventTemplate {
    pub summary: String,
    pub description: String,
    pub duration: Duration,
    pub time_zone: Tz,
}

impl EventTemplate {
    pub fn new(time_zone: Tz) -> Self {
        Self {
            summary: DEFAULT_SUMMARY.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            duration: Duration::hours(DEFAULT_DURATION_HOURS),
            time_zone,
        }
    }

    /// Build a request starting at `now` with a fresh idempotency key.
    pub fn build_request(&self, attendee_email: &str, now: DateTime<Utc>) -> EventRequest {
        EventRequest {
            summary: self.summary.clone(),
            description: self.description.clone(),
            start: now,
            end: now + self.duration,
            time_zone: self.time_zone.name().to_string(),
            attendee_email: attendee_email.to_string(),
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Create one meeting for `attendee_email` and relay its join link.
///
/// Every call creates a new event. Remote failures are not classified: they
/// come back as `EventResult::Failed` with the stringified error.
pub async fn schedule_event(
    calendar: &dyn CalendarApi,
    client: &AuthorizedClient,
    template: &EventTemplate,
    attendee_email: &str,
) -> EventResult {
    let request = template.build_request(attendee_email, Utc::now());

    match calendar.insert_event(client, &request).await {
        Ok(created) => match created.join_link {
            Some(join_link) => {
                tracing::info!("Event created: {}", join_link);
                EventResult::Created { join_link }
            }
            None => {
                tracing::error!("Event {:?} was created without a conference link", created.id);
                EventResult::Failed {
                    error: "Event was created but no conference link was generated".to_string(),
                }
            }
        },
        Err(e) => {
            let error = format!("There was an error contacting the Calendar service: {:#}", e);
            tracing::error!("{}", error);
            EventResult::Failed { error }
        }
    }
}
