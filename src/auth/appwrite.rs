//! Appwrite account client
//!
//! Implements [`AuthProvider`] against the Appwrite REST API. A terminal
//! cannot receive the OAuth redirect, so sign-in is split in two: the user
//! opens the URL from [`AuthProvider::login_with_google`] in a browser, then
//! hands the resulting session secret to [`AppwriteAuth::complete_login`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::auth::{AuthProvider, LoginRedirect, SecretStore, StoredSession, User};
use crate::config::AppwriteConfig;
use crate::error::{OdiaLinguaError, Result};

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const SESSION_HEADER: &str = "X-Appwrite-Session";

/// Appwrite-backed identity provider
pub struct AppwriteAuth {
    client: Client,
    config: AppwriteConfig,
    store: Arc<dyn SecretStore>,
}

impl AppwriteAuth {
    /// Create a new Appwrite client
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: &AppwriteConfig, store: Arc<dyn SecretStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("odialingua/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OdiaLinguaError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
            store,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn secret(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .load(&self.config.project_id)?
            .map(|s| s.secret))
    }

    fn authorized(&self, request: RequestBuilder, secret: &str) -> RequestBuilder {
        request
            .header(PROJECT_HEADER, &self.config.project_id)
            .header(SESSION_HEADER, secret)
    }

    /// Stores the session secret obtained from the browser sign-in
    ///
    /// The secret is verified against `GET /account` and discarded again if
    /// Appwrite rejects it.
    pub async fn complete_login(&self, secret: &str) -> Result<User> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(OdiaLinguaError::Auth("Session secret cannot be empty".to_string()).into());
        }

        self.store
            .save(&self.config.project_id, &StoredSession::new(secret))?;

        match self.get_user().await? {
            Some(user) => {
                tracing::info!(user_id = %user.id, "Signed in");
                Ok(user)
            }
            None => {
                self.store.delete(&self.config.project_id)?;
                Err(OdiaLinguaError::Auth("Session secret was rejected".to_string()).into())
            }
        }
    }

    /// Whether the stored session is still valid
    pub async fn check_session(&self) -> bool {
        let secret = match self.secret() {
            Ok(Some(secret)) => secret,
            Ok(None) => return false,
            Err(e) => {
                tracing::debug!("Session check failed: {}", e);
                return false;
            }
        };

        let request = self.authorized(self.client.get(self.url("account/sessions/current")), &secret);
        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Session check failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl AuthProvider for AppwriteAuth {
    async fn get_user(&self) -> Result<Option<User>> {
        let Some(secret) = self.secret()? else {
            return Ok(None);
        };

        let request = self.authorized(self.client.get(self.url("account")), &secret);
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Get user failed: {}", e);
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            tracing::debug!(status = response.status().as_u16(), "Get user rejected");
            return Ok(None);
        }

        match response.json::<User>().await {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::debug!("Unreadable account response: {}", e);
                Ok(None)
            }
        }
    }

    async fn login_with_google(&self) -> Result<LoginRedirect> {
        let base = self.url("account/sessions/oauth2/google");
        let url = Url::parse_with_params(
            &base,
            &[
                ("project", self.config.project_id.as_str()),
                ("success", self.config.redirect_success.as_str()),
                ("failure", self.config.redirect_failure.as_str()),
            ],
        )
        .map_err(|e| OdiaLinguaError::Auth(format!("Google OAuth login failed: {}", e)))?;
        tracing::debug!(url = %url, "Built Google sign-in URL");
        Ok(LoginRedirect { url })
    }

    async fn logout_user(&self) -> Result<()> {
        if let Some(secret) = self.secret()? {
            let request = self.authorized(
                self.client.delete(self.url("account/sessions/current")),
                &secret,
            );
            match request.send().await {
                Ok(response) if !response.status().is_success() => {
                    tracing::warn!(status = response.status().as_u16(), "Logout rejected");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Logout failed: {}", e),
            }
        }
        self.store.delete(&self.config.project_id)?;
        tracing::info!("Signed out");
        Ok(())
    }
}
