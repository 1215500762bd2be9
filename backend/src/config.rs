use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use google_calendar3::yup_oauth2::{ApplicationSecret, ConsoleApplicationSecret};
use std::env;
use std::path::{Path, PathBuf};

const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub time_zone: Tz,
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub calendar_id: String,
    pub consent_redirect_port: Option<u16>,
    pub google_client: Option<GoogleClientEnv>,
    pub cors_allowed_origins: Option<String>,
}

/// Client id/secret/redirect supplied through the environment instead of
/// `credentials.json`.
#[derive(Debug, Clone)]
pub struct GoogleClientEnv {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let time_zone_name = lookup("TIME_ZONE").unwrap_or_else(|| "UTC".to_string());

        Ok(Self {
            port: lookup("PORT")
                .unwrap_or_else(|| "8000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            time_zone: time_zone_name.parse::<Tz>().map_err(|e| {
                anyhow::anyhow!("TIME_ZONE '{}' is not a valid zone: {}", time_zone_name, e)
            })?,
            credentials_path: lookup("CREDENTIALS_PATH")
                .unwrap_or_else(|| "credentials.json".to_string())
                .into(),
            token_path: lookup("TOKEN_PATH")
                .unwrap_or_else(|| "token.json".to_string())
                .into(),
            calendar_id: lookup("CALENDAR_ID").unwrap_or_else(|| "primary".to_string()),
            consent_redirect_port: lookup("CONSENT_REDIRECT_PORT")
                .map(|port| port.parse::<u16>())
                .transpose()
                .context("CONSENT_REDIRECT_PORT must be a valid number")?,
            google_client: GoogleClientEnv::from_lookup(&lookup)?,
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS"),
        })
    }
}

impl GoogleClientEnv {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let client_id = lookup("GOOGLE_CLIENT_ID");
        let client_secret = lookup("GOOGLE_CLIENT_SECRET");
        let redirect_url = lookup("GOOGLE_REDIRECT_URL");

        match (client_id, client_secret, redirect_url) {
            (None, None, None) => Ok(None),
            (Some(client_id), Some(client_secret), Some(redirect_url)) => Ok(Some(Self {
                client_id,
                client_secret,
                redirect_url,
            })),
            _ => bail!(
                "GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and GOOGLE_REDIRECT_URL must be set together"
            ),
        }
    }

    fn into_secret(self) -> ApplicationSecret {
        ApplicationSecret {
            client_id: self.client_id,
            client_secret: self.client_secret,
            auth_uri: GOOGLE_AUTH_URI.to_string(),
            token_uri: GOOGLE_TOKEN_URI.to_string(),
            redirect_uris: vec![self.redirect_url],
            ..Default::default()
        }
    }
}

/// Load the client-secret bundle once for the lifetime of the process.
///
/// `credentials.json` wins when present; otherwise the bundle is built from
/// the `GOOGLE_*` variables.
pub fn load_client_secret(config: &AppConfig) -> Result<ApplicationSecret> {
    if config.credentials_path.exists() {
        return read_client_secret_file(&config.credentials_path);
    }

    match config.google_client.clone() {
        Some(client) => {
            tracing::info!(
                "{} not found, using client credentials from the environment",
                config.credentials_path.display()
            );
            Ok(client.into_secret())
        }
        None => bail!(
            "{} not found and GOOGLE_CLIENT_ID is not set",
            config.credentials_path.display()
        ),
    }
}

/// Parse a console-issued client secret file, preferring `installed` over `web`.
pub fn read_client_secret_file(path: &Path) -> Result<ApplicationSecret> {
    let content = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let keys: ConsoleApplicationSecret = serde_json::from_slice(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    keys.installed
        .or(keys.web)
        .with_context(|| format!("{} has neither an installed nor a web client", path.display()))
}
