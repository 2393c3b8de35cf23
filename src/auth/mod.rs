//! Authentication
//!
//! The chat screen only needs a signed-in [`User`]. Identity comes from an
//! [`AuthProvider`]; [`AuthGate`] decides whether the chat may open.
//!
//! - [`appwrite`]: Appwrite REST implementation of [`AuthProvider`]
//! - [`token_store`]: persistence of the Appwrite session secret

pub mod appwrite;
pub mod token_store;

pub use appwrite::AppwriteAuth;
pub use token_store::{KeyringSecretStore, MemorySecretStore, SecretStore, StoredSession};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// A signed-in account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account id, used as the backend's `user_id`
    #[serde(rename = "$id")]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Email address
    #[serde(default)]
    pub email: String,
}

/// Where to send the user to sign in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    /// OAuth entry point
    pub url: Url,
}

/// Source of the signed-in identity
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The signed-in user, or `None` when there is no valid session
    async fn get_user(&self) -> Result<Option<User>>;

    /// Starts a Google sign-in
    async fn login_with_google(&self) -> Result<LoginRedirect>;

    /// Ends the current session
    async fn logout_user(&self) -> Result<()>;
}

/// Outcome of the auth check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Open the chat for this user
    Allow(User),
    /// Send the user to the login flow
    RedirectToLogin,
}

/// Guards the chat screen
pub struct AuthGate;

impl AuthGate {
    /// Asks `provider` for the user once; errors count as signed out
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use odialingua::auth::{AppwriteAuth, AuthGate, GateDecision, MemorySecretStore};
    /// use odialingua::config::AppwriteConfig;
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> odialingua::error::Result<()> {
    /// let auth = AppwriteAuth::new(&AppwriteConfig::default(), Arc::new(MemorySecretStore::new()))?;
    /// match AuthGate::check(&auth).await {
    ///     GateDecision::Allow(user) => println!("Hello {}", user.name),
    ///     GateDecision::RedirectToLogin => println!("Please sign in"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn check(provider: &dyn AuthProvider) -> GateDecision {
        match provider.get_user().await {
            Ok(Some(user)) => {
                tracing::debug!(user_id = %user.id, "Auth check passed");
                GateDecision::Allow(user)
            }
            Ok(None) => {
                tracing::debug!("No signed-in user");
                GateDecision::RedirectToLogin
            }
            Err(e) => {
                tracing::debug!("Auth check failed: {}", e);
                GateDecision::RedirectToLogin
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OdiaLinguaError;

    struct StaticProvider(std::result::Result<Option<User>, String>);

    #[async_trait]
    impl AuthProvider for StaticProvider {
        async fn get_user(&self) -> Result<Option<User>> {
            self.0
                .clone()
                .map_err(|e| OdiaLinguaError::Auth(e).into())
        }

        async fn login_with_google(&self) -> Result<LoginRedirect> {
            Ok(LoginRedirect {
                url: Url::parse("https://example.com/login").unwrap(),
            })
        }

        async fn logout_user(&self) -> Result<()> {
            Ok(())
        }
    }

    fn user() -> User {
        User {
            id: "u1".into(),
            name: "Asha".into(),
            email: "asha@example.com".into(),
        }
    }

    #[tokio::test]
    async fn test_gate_allows_user() {
        let decision = AuthGate::check(&StaticProvider(Ok(Some(user())))).await;
        assert_eq!(decision, GateDecision::Allow(user()));
    }

    #[tokio::test]
    async fn test_gate_redirects_without_user() {
        let decision = AuthGate::check(&StaticProvider(Ok(None))).await;
        assert_eq!(decision, GateDecision::RedirectToLogin);
    }

    #[tokio::test]
    async fn test_gate_redirects_on_error() {
        let decision = AuthGate::check(&StaticProvider(Err("boom".into()))).await;
        assert_eq!(decision, GateDecision::RedirectToLogin);
    }

    #[test]
    fn test_user_reads_appwrite_account() {
        let user: User = serde_json::from_str(
            r#"{"$id":"64f0","name":"Asha","email":"asha@example.com","status":true}"#,
        )
        .unwrap();
        assert_eq!(user.id, "64f0");
        assert_eq!(user.name, "Asha");
    }
}
