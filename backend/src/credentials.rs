//! Persisted OAuth credential lifecycle.
//!
//! A single authorized-user credential lives in `token.json`. It is either
//! absent or complete: writes replace the whole file, reads that fail for any
//! reason count as "no credential".

use google_calendar3::yup_oauth2::authorized_user::AuthorizedUserSecret;
use google_calendar3::yup_oauth2::ApplicationSecret;
use serde::{Deserialize, Serialize};
use shared::models::{CredentialState, ResetOutcome};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::consent::ConsentFlow;
use crate::error::CredentialError;

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

const AUTHORIZED_USER: &str = "authorized_user";

/// Authorized-user token bundle as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "type")]
    pub key_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Credential {
    pub fn new(secret: &ApplicationSecret, refresh_token: impl Into<String>) -> Self {
        Self {
            key_type: AUTHORIZED_USER.to_string(),
            client_id: secret.client_id.clone(),
            client_secret: secret.client_secret.clone(),
            refresh_token: refresh_token.into(),
        }
    }

    fn is_usable(&self) -> bool {
        self.key_type == AUTHORIZED_USER && !self.refresh_token.is_empty()
    }
}

impl From<Credential> for AuthorizedUserSecret {
    fn from(credential: Credential) -> Self {
        AuthorizedUserSecret {
            client_id: credential.client_id,
            client_secret: credential.client_secret,
            refresh_token: credential.refresh_token,
            key_type: credential.key_type,
        }
    }
}

/// Client handed to the calendar for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizedClient {
    /// Backed by the refresh token in `token.json`
    Saved(Credential),
    /// Consent issued only an access token; nothing was persisted.
    Session { access_token: String },
}

impl AuthorizedClient {
    pub fn refresh_token(&self) -> Option<&str> {
        match self {
            Self::Saved(credential) => Some(&credential.refresh_token),
            Self::Session { .. } => None,
        }
    }
}

/// File-backed storage for the one persisted credential.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the saved credential. Never fails: anything short of a complete,
    /// parseable authorized-user file is treated as absent.
    pub async fn load_saved(&self) -> Option<Credential> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No saved credential at {}", self.path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<Credential>(&content) {
            Ok(credential) if credential.is_usable() => Some(credential),
            Ok(credential) => {
                tracing::warn!(
                    "Ignoring unusable credential in {} (type {:?})",
                    self.path.display(),
                    credential.key_type
                );
                None
            }
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Combine the client bundle with `refresh_token` and overwrite the file.
    pub async fn persist(
        &self,
        secret: &ApplicationSecret,
        refresh_token: &str,
    ) -> Result<Credential, CredentialError> {
        let credential = Credential::new(secret, refresh_token);
        let payload = serde_json::to_vec(&credential)?;

        // Readers never observe a half-written token.
        let temp_path = self.path.with_extension("json.tmp");
        write_private(&temp_path, &payload)
            .await
            .map_err(|e| CredentialError::io(&temp_path, e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| CredentialError::io(&self.path, e))?;

        tracing::info!("Saved credential to {}", self.path.display());
        Ok(credential)
    }

    /// Delete the saved credential, reporting whether there was one.
    pub async fn reset(&self) -> Result<ResetOutcome, CredentialError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!("Deleted {}", self.path.display());
                Ok(ResetOutcome::Deleted)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No credential to delete at {}", self.path.display());
                Ok(ResetOutcome::NotPresent)
            }
            Err(e) => Err(CredentialError::io(&self.path, e)),
        }
    }
}

/// Create `path` owner-only from the start and write `payload` to it.
async fn write_private(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    // A stale temp file would keep its old mode; `mode` only applies on create.
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(payload).await?;
    file.sync_all().await
}

/// Resolves an authorized credential, running consent when none is saved.
pub struct CredentialManager {
    store: TokenStore,
    secret: ApplicationSecret,
    consent: Arc<dyn ConsentFlow>,
    authorize_lock: Mutex<()>,
}

impl CredentialManager {
    pub fn new(store: TokenStore, secret: ApplicationSecret, consent: Arc<dyn ConsentFlow>) -> Self {
        Self {
            store,
            secret,
            consent,
            authorize_lock: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> CredentialState {
        match self.store.load_saved().await {
            Some(_) => CredentialState::Authorized,
            None => CredentialState::NoCredential,
        }
    }

    pub async fn authorize(&self) -> Result<AuthorizedClient, CredentialError> {
        // One consent ceremony at a time; a waiter re-reads what the winner saved.
        let _guard = self.authorize_lock.lock().await;

        if let Some(credential) = self.store.load_saved().await {
            return Ok(AuthorizedClient::Saved(credential));
        }

        tracing::info!("No saved credential, starting consent flow");
        let grant = self
            .consent
            .obtain(&[CALENDAR_SCOPE], &self.secret)
            .await
            .map_err(CredentialError::Consent)?;

        let refresh_token = grant.refresh_token.filter(|token| !token.is_empty());
        let access_token = grant.access_token.filter(|token| !token.is_empty());

        match (refresh_token, access_token) {
            (Some(refresh_token), _) => self
                .store
                .persist(&self.secret, &refresh_token)
                .await
                .map(AuthorizedClient::Saved),
            (None, Some(access_token)) => {
                tracing::warn!(
                    "Consent issued no refresh token, using the access token for this request only"
                );
                Ok(AuthorizedClient::Session { access_token })
            }
            (None, None) => Err(CredentialError::EmptyGrant),
        }
    }

    pub async fn reset(&self) -> Result<ResetOutcome, CredentialError> {
        self.store.reset().await
    }
}
