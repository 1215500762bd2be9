//! Router-level tests with the consent ceremony and the calendar stubbed out.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use google_calendar3::yup_oauth2::ApplicationSecret;
use meetlink_backend::calendar::{CalendarApi, CreatedEvent, EventRequest};
use meetlink_backend::config::read_client_secret_file;
use meetlink_backend::consent::{ConsentFlow, ConsentGrant};
use meetlink_backend::credentials::{AuthorizedClient, CredentialManager, TokenStore};
use meetlink_backend::scheduler::EventTemplate;
use meetlink_backend::{create_app, AppState};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

const MEET_LINK: &str = "https://meet.google.com/xyz-abcd-efg";

struct StubConsent {
    refresh_token: Option<String>,
    fail: bool,
    calls: AtomicUsize,
}

impl StubConsent {
    fn new(refresh_token: Option<&str>, fail: bool) -> Self {
        Self {
            refresh_token: refresh_token.map(str::to_string),
            fail,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ConsentFlow for StubConsent {
    async fn obtain(
        &self,
        _scopes: &[&str],
        _secret: &ApplicationSecret,
    ) -> anyhow::Result<ConsentGrant> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("access_denied");
        }
        Ok(ConsentGrant {
            access_token: Some("access".to_string()),
            refresh_token: self.refresh_token.clone(),
        })
    }
}

#[derive(Default)]
struct StubCalendar {
    fail: bool,
    seen: Mutex<Vec<(AuthorizedClient, EventRequest)>>,
}

#[async_trait]
impl CalendarApi for StubCalendar {
    async fn insert_event(
        &self,
        client: &AuthorizedClient,
        request: &EventRequest,
    ) -> anyhow::Result<CreatedEvent> {
        self.seen
            .lock()
            .unwrap()
            .push((client.clone(), request.clone()));
        if self.fail {
            anyhow::bail!("Quota exceeded for quota metric 'Queries'");
        }
        Ok(CreatedEvent {
            id: Some("evt".to_string()),
            join_link: Some(MEET_LINK.to_string()),
        })
    }
}

struct Harness {
    dir: TempDir,
    consent: Arc<StubConsent>,
    calendar: Arc<StubCalendar>,
    app: Router,
}

impl Harness {
    fn new(consent: StubConsent, calendar: StubCalendar) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let credentials_path = dir.path().join("credentials.json");
        std::fs::write(
            &credentials_path,
            r#"{"installed": {
                "client_id": "installed-id.apps.googleusercontent.com",
                "client_secret": "installed-secret",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token",
                "redirect_uris": ["http://localhost"]
            }}"#,
        )
        .unwrap();
        let secret = read_client_secret_file(&credentials_path).unwrap();

        let consent = Arc::new(consent);
        let calendar = Arc::new(calendar);
        let manager = CredentialManager::new(
            TokenStore::new(dir.path().join("token.json")),
            secret,
            consent.clone(),
        );
        let state = AppState::new(manager, calendar.clone(), EventTemplate::new(chrono_tz::UTC));

        Self {
            app: create_app(state, None),
            dir,
            consent,
            calendar,
        }
    }

    fn granting(refresh_token: &str) -> Self {
        Self::new(
            StubConsent::new(Some(refresh_token), false),
            StubCalendar::default(),
        )
    }

    fn token_path(&self) -> PathBuf {
        self.dir.path().join("token.json")
    }

    fn consent_calls(&self) -> usize {
        self.consent.calls.load(Ordering::SeqCst)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}

fn read_token(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn first_schedule_runs_consent_and_saves_token() {
    let harness = Harness::granting("refresh-from-consent");
    assert!(!harness.token_path().exists());

    let (status, body) = harness.get("/schedule_event?email=x@y.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], MEET_LINK);
    assert_eq!(harness.consent_calls(), 1);

    let token = read_token(&harness.token_path());
    assert_eq!(token["type"], "authorized_user");
    assert_eq!(token["client_id"], "installed-id.apps.googleusercontent.com");
    assert_eq!(token["client_secret"], "installed-secret");
    assert_eq!(token["refresh_token"], "refresh-from-consent");

    let seen = harness.calendar.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0.refresh_token(), Some("refresh-from-consent"));
    assert_eq!(seen[0].1.attendee_email, "x@y.com");
    assert_eq!(seen[0].1.time_zone, "UTC");
}

#[tokio::test]
async fn grant_without_refresh_token_still_schedules() {
    let harness = Harness::new(StubConsent::new(None, false), StubCalendar::default());

    let (status, body) = harness.get("/schedule_event?email=x@y.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], MEET_LINK);
    assert!(!harness.token_path().exists());

    let seen = harness.calendar.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].0,
        AuthorizedClient::Session {
            access_token: "access".to_string()
        }
    );
}

#[tokio::test]
async fn saved_token_is_reused() {
    let harness = Harness::granting("refresh-from-consent");

    harness.get("/schedule_event?email=x@y.com").await;
    let (status, body) = harness.get("/schedule_event?email=x@y.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], MEET_LINK);
    assert_eq!(harness.consent_calls(), 1);

    let seen = harness.calendar.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_ne!(seen[0].1.request_id, seen[1].1.request_id);
}

#[tokio::test]
async fn remote_failure_is_reported_in_msg() {
    let harness = Harness::new(
        StubConsent::new(Some("refresh"), false),
        StubCalendar {
            fail: true,
            ..Default::default()
        },
    );

    let (status, body) = harness.get("/schedule_event?email=a@b.com").await;

    assert_eq!(status, StatusCode::OK);
    let msg = body["msg"].as_str().unwrap();
    assert!(msg.starts_with("There was an error contacting the Calendar service: "));
    assert!(msg.contains("Quota exceeded"));
    // A failed remote call does not invalidate the saved credential.
    assert!(harness.token_path().exists());
}

#[tokio::test]
async fn consent_failure_returns_structured_error() {
    let harness = Harness::new(
        StubConsent::new(None, true),
        StubCalendar::default(),
    );

    let (status, body) = harness.get("/schedule_event?email=a@b.com").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "authorization_failed");
    assert!(body["details"].as_str().unwrap().contains("access_denied"));
    assert!(harness.calendar.seen.lock().unwrap().is_empty());
    assert!(!harness.token_path().exists());
}

#[tokio::test]
async fn missing_or_invalid_email_is_rejected() {
    let harness = Harness::granting("refresh");

    let (status, body) = harness.get("/schedule_event").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = harness.get("/schedule_event?email=not-an-email").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Extractor failures use the same JSON error body.
    let (status, body) = harness.get("/schedule_event?email=a@b.com&email=c@d.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    assert_eq!(harness.consent_calls(), 0);
}

#[tokio::test]
async fn re_authenticate_deletes_existing_token() {
    let harness = Harness::granting("refresh");
    harness.get("/authorize").await;
    assert!(harness.token_path().exists());

    let (status, body) = harness.get("/re-authenticate").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "File deleted successfully");
    assert!(!harness.token_path().exists());
    assert_eq!(harness.consent_calls(), 1);
}

#[tokio::test]
async fn re_authenticate_without_token() {
    let harness = Harness::granting("refresh");

    let (status, body) = harness.get("/re-authenticate").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "File not exist");
    assert_eq!(harness.consent_calls(), 0);
}

#[tokio::test]
async fn authorize_after_reset_runs_consent_again() {
    let harness = Harness::granting("refresh");

    let (_, body) = harness.get("/authorize").await;
    assert_eq!(body["msg"], "Authorized");
    harness.get("/re-authenticate").await;
    harness.get("/authorize").await;

    assert_eq!(harness.consent_calls(), 2);
    assert!(harness.token_path().exists());
}

#[tokio::test]
async fn health_reports_credential_state() {
    let harness = Harness::granting("refresh");

    let (status, body) = harness.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["credential"], "no_credential");

    harness.get("/authorize").await;
    let (_, body) = harness.get("/health").await;
    assert_eq!(body["credential"], "authorized");
}
