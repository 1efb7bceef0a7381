//! API client for communicating with the PassVault REST API.
//!
//! This module provides the `ApiClient` struct for authenticating and for
//! making bearer-authenticated requests against the password endpoints.

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{
    CollaboratorEntry, CredentialRecord, CredentialUpdate, NewCredential, ShareOutcome,
    SharedCredentialLink, User,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default base URL of a locally running PassVault backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Successful `/login` response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Both collections returned by `GET /api/passwords`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordCollections {
    #[serde(default)]
    pub owned: Vec<CredentialRecord>,
    #[serde(default)]
    pub shared: Vec<SharedCredentialLink>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SharedFlag {
    shared: bool,
}

#[derive(Serialize)]
struct ShareRequest<'a> {
    emails: &'a [String],
}

/// API client for PassVault.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl ApiClient {
    /// Create a new, unauthenticated API client
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token.into()),
        }
    }

    /// Same connection pool and base URL, no credentials.
    pub fn without_token(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(&self) -> ApiResult<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidResponse(format!("Invalid token header: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        Ok(self
            .client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json")
            .headers(self.auth_headers()?))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> ApiResult<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, path: &str) -> ApiResult<T> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e)))
    }

    async fn send(&self, builder: RequestBuilder, method: &Method, path: &str) -> ApiResult<Response> {
        debug!(%method, path, "Sending request");
        let response = builder.send().await?;
        Self::check_response(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let builder = self.request(Method::GET, path)?;
        let response = self.send(builder, &Method::GET, path).await?;
        Self::parse_json(response, path).await
    }

    async fn send_json<B: Serialize + ?Sized>(&self, method: Method, path: &str, body: &B) -> ApiResult<Response> {
        let builder = self.request(method.clone(), path)?.json(body);
        self.send(builder, &method, path).await
    }

    async fn send_empty(&self, method: Method, path: &str) -> ApiResult<Response> {
        let builder = self.request(method.clone(), path)?;
        self.send(builder, &method, path).await
    }

    // ===== Authentication =====

    /// Exchange email and password for a token and the user profile.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        let response = self
            .send_json(Method::POST, "/login", &LoginRequest { email, password })
            .await?;
        Self::parse_json(response, "/login").await
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> ApiResult<()> {
        self.send_json(Method::POST, "/register", &RegisterRequest { name, email, password })
            .await?;
        Ok(())
    }

    // ===== Passwords =====

    /// Fetch the owned records and the shared links of the current user
    pub async fn fetch_passwords(&self) -> ApiResult<PasswordCollections> {
        self.get("/api/passwords").await
    }

    pub async fn create_password(&self, new: &NewCredential) -> ApiResult<CredentialRecord> {
        let path = "/api/passwords";
        let response = self.send_json(Method::POST, path, new).await?;
        Self::parse_json(response, path).await
    }

    pub async fn update_password(&self, id: &str, update: &CredentialUpdate) -> ApiResult<()> {
        let path = format!("/api/passwords/{}", id);
        self.send_json(Method::PUT, &path, update).await?;
        Ok(())
    }

    pub async fn delete_password(&self, id: &str) -> ApiResult<()> {
        let path = format!("/api/passwords/{}", id);
        self.send_empty(Method::DELETE, &path).await?;
        Ok(())
    }

    /// Toggle the favorite flag. `shared` selects the link-local flag.
    pub async fn toggle_favorite(&self, id: &str, shared: bool) -> ApiResult<()> {
        let path = format!("/api/passwords/{}/favorite", id);
        self.send_json(Method::PATCH, &path, &SharedFlag { shared }).await?;
        Ok(())
    }

    /// Record a reveal/copy. `shared` selects the link-local timestamp.
    pub async fn mark_used(&self, id: &str, shared: bool) -> ApiResult<()> {
        let path = format!("/api/passwords/{}/use", id);
        self.send_json(Method::PATCH, &path, &SharedFlag { shared }).await?;
        Ok(())
    }

    // ===== Sharing =====

    pub async fn share_password(&self, id: &str, emails: &[String]) -> ApiResult<ShareOutcome> {
        let path = format!("/api/passwords/{}/share", id);
        let response = self
            .send_json(Method::POST, &path, &ShareRequest { emails })
            .await?;
        Self::parse_json(response, &path).await
    }

    /// Remove the current user's own grant to a shared record.
    pub async fn remove_shared(&self, link_id: &str) -> ApiResult<()> {
        let path = format!("/api/passwords/shared/{}", link_id);
        self.send_empty(Method::DELETE, &path).await?;
        Ok(())
    }

    /// Fetch the users an owned record has been shared with
    pub async fn fetch_shared_users(&self, id: &str) -> ApiResult<Vec<CollaboratorEntry>> {
        let path = format!("/api/passwords/{}/shared-users", id);
        let items: Vec<SharedUserApiItem> = self.get(&path).await?;
        debug!(record_id = id, count = items.len(), "Fetched collaborators");
        Ok(items.into_iter().map(SharedUserApiItem::into_entry).collect())
    }
}

// Internal API response types for parsing

#[derive(Debug, Clone, Deserialize)]
struct SharedUserApiItem {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    #[serde(rename = "sharedWithId")]
    shared_with: SharedWithApi,
}

#[derive(Debug, Clone, Deserialize)]
struct SharedWithApi {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    #[serde(default)]
    name: Option<String>,
    email: String,
}

impl SharedUserApiItem {
    fn into_entry(self) -> CollaboratorEntry {
        CollaboratorEntry {
            link_id: self.id,
            collaborator_user_id: self.shared_with.id,
            collaborator_name: self.shared_with.name.unwrap_or_default(),
            collaborator_email: self.shared_with.email,
        }
    }
}
