//! Username Login
//!
//! Signs a user in with username + password without exposing the account
//! email to the client: username → profile id → auth email → password grant.
//!
//! Every failure along that chain is reported as invalid credentials, so
//! callers cannot probe which usernames exist.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::SupabaseConfig;
use crate::supabase::{SupabaseClient, SupabaseError};

/// Username login request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Issued session tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

/// Identity lookups and sign-in against an auth provider
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Resolve a normalized username to its profile (user) id
    async fn find_profile_id(&self, username: &str) -> Result<Option<String>, SupabaseError>;

    /// Look up the email registered for a user id
    async fn user_email(&self, user_id: &str) -> Result<Option<String>, SupabaseError>;

    /// Password grant; `None` when the provider rejects the credentials
    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>, SupabaseError>;
}

/// Supabase-backed [`AuthBackend`]
///
/// Profile and user lookups use the service role key; the password grant
/// uses the anon key.
pub struct SupabaseAuth {
    admin: SupabaseClient,
    anon: SupabaseClient,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: Option<String>,
}

impl SupabaseAuth {
    pub fn new(admin: SupabaseClient, anon: SupabaseClient) -> Self {
        Self { admin, anon }
    }

    /// Build from config; `None` when URL or service key is missing
    pub fn from_config(config: &SupabaseConfig) -> Result<Option<Self>, SupabaseError> {
        if !config.is_configured() {
            return Ok(None);
        }
        let (Some(url), Some(service_key), Some(anon_key)) = (
            config.url.as_deref(),
            config.service_role_key.as_deref(),
            config.effective_anon_key(),
        ) else {
            return Ok(None);
        };

        let admin = SupabaseClient::new(url, service_key)?;
        let anon = SupabaseClient::new(url, anon_key)?;
        Ok(Some(Self::new(admin, anon)))
    }
}

#[async_trait]
impl AuthBackend for SupabaseAuth {
    async fn find_profile_id(&self, username: &str) -> Result<Option<String>, SupabaseError> {
        let rows: Vec<ProfileRow> = self
            .admin
            .select(
                "profiles",
                "id,username",
                &[
                    ("username", format!("eq.{}", username)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(rows.into_iter().next().and_then(|r| r.id))
    }

    async fn user_email(&self, user_id: &str) -> Result<Option<String>, SupabaseError> {
        let user = self.admin.admin_get_user(user_id).await?;
        Ok(user.and_then(|u| u.email).filter(|e| !e.is_empty()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>, SupabaseError> {
        let session = self.anon.sign_in_with_password(email, password).await?;

        Ok(session.and_then(|s| match (s.access_token, s.refresh_token) {
            (Some(access_token), Some(refresh_token))
                if !access_token.is_empty() && !refresh_token.is_empty() =>
            {
                Some(Session {
                    access_token,
                    refresh_token,
                })
            }
            _ => None,
        }))
    }
}

/// Login errors, each mapped to one HTTP status
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Missing username or password")]
    MissingCredentials,

    #[error("Server misconfigured")]
    Misconfigured,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Username → session exchange
pub struct UsernameLogin {
    backend: Option<Arc<dyn AuthBackend>>,
}

impl UsernameLogin {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A login service that answers every request with "misconfigured"
    pub fn unconfigured() -> Self {
        Self { backend: None }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<Session, LoginError> {
        let username = normalize_username(request.username.as_deref());
        let password = request.password.as_deref().unwrap_or_default();

        if username.is_empty() || password.is_empty() {
            return Err(LoginError::MissingCredentials);
        }

        let backend = self.backend.as_ref().ok_or(LoginError::Misconfigured)?;

        let profile_id = backend
            .find_profile_id(&username)
            .await
            .map_err(|e| reject("profile lookup", e))?
            .ok_or(LoginError::InvalidCredentials)?;

        let email = backend
            .user_email(&profile_id)
            .await
            .map_err(|e| reject("user lookup", e))?
            .ok_or(LoginError::InvalidCredentials)?;

        let session = backend
            .sign_in(&email, password)
            .await
            .map_err(|e| reject("password grant", e))?
            .ok_or(LoginError::InvalidCredentials)?;

        tracing::info!(username = %username, "Username login succeeded");
        Ok(session)
    }
}

/// Trim and lowercase
pub fn normalize_username(username: Option<&str>) -> String {
    username.unwrap_or_default().trim().to_lowercase()
}

fn reject(step: &str, error: SupabaseError) -> LoginError {
    if error.is_api() {
        tracing::debug!(step, error = %error, "Login step refused");
        LoginError::InvalidCredentials
    } else {
        tracing::error!(step, error = %error, "Login step failed");
        LoginError::Unexpected(error.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory backend: username → (user id, email, password)
    pub(crate) struct MockAuth {
        pub users: HashMap<String, (String, String, String)>,
        pub fail_profiles: bool,
    }

    impl MockAuth {
        pub(crate) fn with_user(username: &str, password: &str) -> Self {
            let mut users = HashMap::new();
            users.insert(
                username.to_string(),
                (
                    format!("id-{}", username),
                    format!("{}@example.com", username),
                    password.to_string(),
                ),
            );
            Self {
                users,
                fail_profiles: false,
            }
        }
    }

    #[async_trait]
    impl AuthBackend for MockAuth {
        async fn find_profile_id(&self, username: &str) -> Result<Option<String>, SupabaseError> {
            if self.fail_profiles {
                return Err(SupabaseError::Api {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(self.users.get(username).map(|(id, _, _)| id.clone()))
        }

        async fn user_email(&self, user_id: &str) -> Result<Option<String>, SupabaseError> {
            Ok(self
                .users
                .values()
                .find(|(id, _, _)| id == user_id)
                .map(|(_, email, _)| email.clone()))
        }

        async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>, SupabaseError> {
            let ok = self
                .users
                .values()
                .any(|(_, e, p)| e == email && p == password);
            Ok(ok.then(|| Session {
                access_token: "access".to_string(),
                refresh_token: "refresh".to_string(),
            }))
        }
    }

    fn request(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn test_login_success_normalizes_username() {
        let login = UsernameLogin::new(Arc::new(MockAuth::with_user("alice", "pw")));

        let session = login.login(&request("  Alice ", "pw")).await.unwrap();
        assert_eq!(session.access_token, "access");
        assert_eq!(session.refresh_token, "refresh");
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let login = UsernameLogin::new(Arc::new(MockAuth::with_user("alice", "pw")));

        let err = login.login(&request("   ", "pw")).await.unwrap_err();
        assert!(matches!(err, LoginError::MissingCredentials));

        let err = login.login(&LoginRequest::default()).await.unwrap_err();
        assert!(matches!(err, LoginError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_unknown_user_and_wrong_password_look_identical() {
        let login = UsernameLogin::new(Arc::new(MockAuth::with_user("alice", "pw")));

        let unknown = login.login(&request("bob", "pw")).await.unwrap_err();
        let wrong = login.login(&request("alice", "nope")).await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(wrong, LoginError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_backend_refusal_is_invalid_credentials() {
        let mut backend = MockAuth::with_user("alice", "pw");
        backend.fail_profiles = true;
        let login = UsernameLogin::new(Arc::new(backend));

        let err = login.login(&request("alice", "pw")).await.unwrap_err();
        assert!(matches!(err, LoginError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let login = UsernameLogin::unconfigured();
        assert!(!login.is_configured());

        let err = login.login(&request("alice", "pw")).await.unwrap_err();
        assert!(matches!(err, LoginError::Misconfigured));
    }

    #[test]
    fn test_from_config_requires_url_and_key() {
        let config = SupabaseConfig {
            url: Some("http://localhost:54321".to_string()),
            ..Default::default()
        };
        assert!(SupabaseAuth::from_config(&config).unwrap().is_none());
    }
}
