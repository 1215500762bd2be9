//! Interactive OAuth consent.
//!
//! The ceremony itself belongs to yup-oauth2's installed-application flow;
//! this module only wraps it behind `ConsentFlow` so the credential manager
//! can be driven by a stub in tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use google_calendar3::yup_oauth2::authenticator_delegate::InstalledFlowDelegate;
use google_calendar3::yup_oauth2::storage::{TokenInfo, TokenStorage};
use google_calendar3::yup_oauth2::{
    ApplicationSecret, InstalledFlowAuthenticator, InstalledFlowReturnMethod,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

/// Tokens handed back by a completed consent ceremony.
#[derive(Debug, Clone, Default)]
pub struct ConsentGrant {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Obtain a fresh grant for `scopes` on behalf of the client in `secret`.
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    async fn obtain(&self, scopes: &[&str], secret: &ApplicationSecret) -> Result<ConsentGrant>;
}

/// Browser consent through a loopback redirect listener.
#[derive(Debug, Clone, Default)]
pub struct InstalledFlowConsent {
    redirect_port: Option<u16>,
}

impl InstalledFlowConsent {
    pub fn new(redirect_port: Option<u16>) -> Self {
        Self { redirect_port }
    }

    fn return_method(&self) -> InstalledFlowReturnMethod {
        match self.redirect_port {
            Some(port) => InstalledFlowReturnMethod::HTTPPortRedirect(port),
            None => InstalledFlowReturnMethod::HTTPRedirect,
        }
    }
}

#[async_trait]
impl ConsentFlow for InstalledFlowConsent {
    async fn obtain(&self, scopes: &[&str], secret: &ApplicationSecret) -> Result<ConsentGrant> {
        let captured = CapturedTokens::default();

        let auth = InstalledFlowAuthenticator::builder(secret.clone(), self.return_method())
            .with_storage(Box::new(captured.clone()))
            .flow_delegate(Box::new(LoggingFlowDelegate))
            .build()
            .await
            .context("Failed to build consent authenticator")?;

        let access = auth
            .token(scopes)
            .await
            .context("Consent flow did not complete")?;

        let info = captured.take();
        Ok(ConsentGrant {
            access_token: access.token().map(str::to_string),
            refresh_token: info.and_then(|info| info.refresh_token),
        })
    }
}

/// In-memory token sink so the refresh token can be persisted in the
/// authorized-user format rather than yup-oauth2's own cache format.
#[derive(Clone, Default)]
struct CapturedTokens {
    inner: Arc<Mutex<Option<TokenInfo>>>,
}

impl CapturedTokens {
    fn take(&self) -> Option<TokenInfo> {
        self.inner.lock().ok().and_then(|mut guard| guard.take())
    }
}

#[async_trait]
impl TokenStorage for CapturedTokens {
    async fn set(&self, _scopes: &[&str], token: TokenInfo) -> anyhow::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("token capture lock poisoned"))?;
        *guard = Some(token);
        Ok(())
    }

    async fn get(&self, _scopes: &[&str]) -> Option<TokenInfo> {
        // Never serve a cached token: every call is a fresh ceremony.
        None
    }
}

/// Routes the consent URL through tracing instead of stdout.
struct LoggingFlowDelegate;

impl InstalledFlowDelegate for LoggingFlowDelegate {
    fn present_user_url<'a>(
        &'a self,
        url: &'a str,
        need_code: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>> {
        Box::pin(async move {
            if need_code {
                return Err("interactive code entry is not supported".to_string());
            }
            tracing::warn!("Calendar authorization required, open this URL to consent: {}", url);
            Ok(String::new())
        })
    }
}
