//! Supabase REST Client
//!
//! Thin reqwest wrapper over the PostgREST (`/rest/v1`) and GoTrue
//! (`/auth/v1`) endpoints of a hosted Supabase project.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Supabase REST API client bound to one API key
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    /// Create a client for `base_url` authenticated with `api_key`
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, SupabaseError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Create a client sharing an existing connection pool
    pub fn with_client(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// `GET /rest/v1/{table}` with PostgREST filter pairs
    ///
    /// Filters use PostgREST syntax, e.g. `("username", "eq.alice")`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, SupabaseError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);

        let mut query: Vec<(&str, String)> = vec![("select", columns.to_string())];
        query.extend(filters.iter().cloned());

        let response = self
            .authorized(self.client.get(&url))
            .query(&query)
            .send()
            .await?;

        Self::json(response).await
    }

    /// `POST /rest/v1/{table}` returning the inserted rows
    pub async fn insert<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<Vec<T>, SupabaseError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);

        let response = self
            .authorized(self.client.post(&url))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        Self::json(response).await
    }

    /// `PATCH /rest/v1/{table}` on rows matching `filters`
    pub async fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        body: &B,
    ) -> Result<Vec<T>, SupabaseError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);

        let response = self
            .authorized(self.client.patch(&url))
            .header("Prefer", "return=representation")
            .query(filters)
            .json(body)
            .send()
            .await?;

        Self::json(response).await
    }

    /// `GET /auth/v1/admin/users/{id}`; requires the service role key
    pub async fn admin_get_user(&self, user_id: &str) -> Result<Option<AuthUser>, SupabaseError> {
        let url = format!(
            "{}/auth/v1/admin/users/{}",
            self.base_url,
            urlencoding::encode(user_id)
        );

        let response = self.authorized(self.client.get(&url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::json(response).await.map(Some)
    }

    /// `POST /auth/v1/token?grant_type=password`
    ///
    /// Rejected credentials yield `Ok(None)`.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<AuthSession>, SupabaseError> {
        let url = format!("{}/auth/v1/token", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                tracing::debug!(status = %response.status(), "Password grant rejected");
                Ok(None)
            }
            _ => Self::json(response).await.map(Some),
        }
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, SupabaseError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SupabaseError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SupabaseError::Decode(e.to_string()))
    }
}

// ============================================
// Request/Response DTOs
// ============================================

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

/// User record from the auth admin API
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens from a successful sign-in
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

// ============================================
// Errors
// ============================================

/// Errors from the Supabase REST API
#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl SupabaseError {
    /// Upstream answered but refused or failed the request
    pub fn is_api(&self) -> bool {
        matches!(self, SupabaseError::Api { .. } | SupabaseError::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query},
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn spawn_mock(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = SupabaseClient::new("http://localhost:54321/", "key").unwrap();
        assert_eq!(client.base_url(), "http://localhost:54321");
    }

    #[tokio::test]
    async fn test_select_sends_filters_and_key() {
        let router = Router::new().route(
            "/rest/v1/profiles",
            get(
                |headers: HeaderMap, Query(q): Query<HashMap<String, String>>| async move {
                    assert_eq!(headers["apikey"], "service");
                    assert_eq!(headers["authorization"], "Bearer service");
                    assert_eq!(q["select"], "id,username");
                    assert_eq!(q["username"], "eq.alice");
                    Json(json!([{"id": "u1", "username": "alice"}]))
                },
            ),
        );
        let client = SupabaseClient::new(spawn_mock(router).await, "service").unwrap();

        let rows: Vec<Value> = client
            .select("profiles", "id,username", &[("username", "eq.alice".to_string())])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "u1");
    }

    #[tokio::test]
    async fn test_api_error_surfaces_status() {
        let router = Router::new().route(
            "/rest/v1/items",
            get(|| async { (AxumStatus::FORBIDDEN, "permission denied") }),
        );
        let client = SupabaseClient::new(spawn_mock(router).await, "anon").unwrap();

        let err = client
            .select::<Value>("items", "id", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SupabaseError::Api { status: 403, .. }));
        assert!(err.is_api());
    }

    #[tokio::test]
    async fn test_admin_get_user_not_found() {
        let router = Router::new().route(
            "/auth/v1/admin/users/:id",
            get(|Path(id): Path<String>| async move {
                if id == "u1" {
                    (AxumStatus::OK, Json(json!({"id": "u1", "email": "a@example.com"})))
                } else {
                    (AxumStatus::NOT_FOUND, Json(json!({"msg": "User not found"})))
                }
            }),
        );
        let client = SupabaseClient::new(spawn_mock(router).await, "service").unwrap();

        let user = client.admin_get_user("u1").await.unwrap().unwrap();
        assert_eq!(user.email.as_deref(), Some("a@example.com"));
        assert!(client.admin_get_user("u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_grant() {
        let router = Router::new().route(
            "/auth/v1/token",
            post(
                |Query(q): Query<HashMap<String, String>>, Json(body): Json<Value>| async move {
                    assert_eq!(q["grant_type"], "password");
                    if body["password"] == "correct" {
                        (
                            AxumStatus::OK,
                            Json(json!({"access_token": "at", "refresh_token": "rt"})),
                        )
                    } else {
                        (
                            AxumStatus::BAD_REQUEST,
                            Json(json!({"error": "invalid_grant"})),
                        )
                    }
                },
            ),
        );
        let client = SupabaseClient::new(spawn_mock(router).await, "anon").unwrap();

        let session = client
            .sign_in_with_password("a@example.com", "correct")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.access_token.as_deref(), Some("at"));

        assert!(client
            .sign_in_with_password("a@example.com", "wrong")
            .await
            .unwrap()
            .is_none());
    }
}
