//! API client for communicating with the Captain's Log REST API.
//!
//! This module provides the `ApiClient` struct. Each method maps one logical
//! remote operation onto one HTTP request/response pair.

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use urlencoding::encode;

use crate::auth::TokenStore;
use crate::models::{
    Boat, LoginResponse, MaintenanceTask, NewBoat, NewMaintenanceTask, NewNote, Note, TodoList,
    Trip, UnitSystem, User, UserSettings,
};

use super::{ApiError, ApiResult};

// ============================================================================
// Constants
// ============================================================================

/// Default base URL for a locally running server.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";

/// HTTP request timeout in seconds.
/// 30s allows for slow marina Wi-Fi while failing fast enough for good UX.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Whether a 401 on this request should log the user out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthPolicy {
    ClearOnUnauthorized,
    KeepToken,
}

/// API client for the logbook server.
/// Clone is cheap - reqwest::Client and TokenStore are both Arc-backed.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens: TokenStore::new(),
        })
    }

    /// Create a client with the default timeout
    pub fn with_base_url(base_url: impl Into<String>) -> ApiResult<Self> {
        Self::new(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token store shared with every clone of this client
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&self, token: impl Into<String>) {
        self.tokens.set(token);
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_set()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json");
        if let Some(token) = self.tokens.get() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Check if response is successful, returning a normalized error if not.
    async fn check_response(&self, response: Response, policy: AuthPolicy) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = ApiError::from_status(status, &body);
        if error.is_unauthorized() && policy == AuthPolicy::ClearOnUnauthorized && self.tokens.clear() {
            warn!("Server rejected token, clearing session");
        }
        Err(error)
    }

    async fn send(&self, builder: RequestBuilder, policy: AuthPolicy) -> ApiResult<Response> {
        let response = builder.send().await?;
        self.check_response(response, policy).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let url = response.url().to_string();
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            debug!(url = %url, error = %e, "Failed to parse response");
            ApiError::InvalidResponse(format!("{} from {}", e, url))
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: Method, path: &str) -> ApiResult<T> {
        debug!(%method, path, "API request");
        let response = self.send(self.request(method, path), AuthPolicy::ClearOnUnauthorized).await?;
        Self::parse(response).await
    }

    async fn call_with_body<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        debug!(%method, path, "API request");
        let builder = self.request(method, path).json(body);
        let response = self.send(builder, AuthPolicy::ClearOnUnauthorized).await?;
        Self::parse(response).await
    }

    /// Requests whose success carries no body worth reading.
    async fn call_empty(&self, method: Method, path: &str) -> ApiResult<()> {
        debug!(%method, path, "API request");
        self.send(self.request(method, path), AuthPolicy::ClearOnUnauthorized).await?;
        Ok(())
    }

    // ===== Authentication =====

    /// Exchange credentials for a bearer token and store it.
    /// A 401 here means bad credentials, so the current token is left alone.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        let builder = self
            .request(Method::POST, "/auth/login")
            .json(&json!({ "email": email, "password": password }));
        let response = self.send(builder, AuthPolicy::KeepToken).await?;
        let login: LoginResponse = Self::parse(response).await?;
        self.tokens.set(login.token.clone());
        debug!(user_id = %login.user.id, "Logged in");
        Ok(login)
    }

    pub async fn current_user(&self) -> ApiResult<User> {
        self.call(Method::GET, "/auth/me").await
    }

    // ===== Boats =====

    pub async fn list_boats(&self) -> ApiResult<Vec<Boat>> {
        self.call(Method::GET, "/boats").await
    }

    pub async fn get_boat(&self, id: &str) -> ApiResult<Boat> {
        self.call(Method::GET, &format!("/boats/{}", encode(id))).await
    }

    pub async fn create_boat(&self, boat: &NewBoat) -> ApiResult<Boat> {
        self.call_with_body(Method::POST, "/boats", boat).await
    }

    pub async fn update_boat(&self, id: &str, boat: &NewBoat) -> ApiResult<Boat> {
        self.call_with_body(Method::PUT, &format!("/boats/{}", encode(id)), boat).await
    }

    pub async fn set_boat_enabled(&self, id: &str, enabled: bool) -> ApiResult<Boat> {
        self.call_with_body(Method::PATCH, &format!("/boats/{}", encode(id)), &json!({ "enabled": enabled }))
            .await
    }

    pub async fn delete_boat(&self, id: &str) -> ApiResult<()> {
        self.call_empty(Method::DELETE, &format!("/boats/{}", encode(id))).await
    }

    // ===== Trips =====

    pub async fn list_trips(&self, boat_id: &str) -> ApiResult<Vec<Trip>> {
        self.call(Method::GET, &format!("/boats/{}/trips", encode(boat_id))).await
    }

    pub async fn get_trip(&self, id: &str) -> ApiResult<Trip> {
        self.call(Method::GET, &format!("/trips/{}", encode(id))).await
    }

    pub async fn delete_trip(&self, id: &str) -> ApiResult<()> {
        self.call_empty(Method::DELETE, &format!("/trips/{}", encode(id))).await
    }

    // ===== Notes =====

    /// Notes for one boat, or all of the user's notes when `boat_id` is None
    pub async fn list_notes(&self, boat_id: Option<&str>) -> ApiResult<Vec<Note>> {
        let mut builder = self.request(Method::GET, "/notes");
        if let Some(id) = boat_id {
            builder = builder.query(&[("boatId", id)]);
        }
        debug!(method = "GET", path = "/notes", ?boat_id, "API request");
        let response = self.send(builder, AuthPolicy::ClearOnUnauthorized).await?;
        Self::parse(response).await
    }

    pub async fn create_note(&self, note: &NewNote) -> ApiResult<Note> {
        self.call_with_body(Method::POST, "/notes", note).await
    }

    pub async fn update_note(&self, id: &str, note: &NewNote) -> ApiResult<Note> {
        self.call_with_body(Method::PUT, &format!("/notes/{}", encode(id)), note).await
    }

    pub async fn delete_note(&self, id: &str) -> ApiResult<()> {
        self.call_empty(Method::DELETE, &format!("/notes/{}", encode(id))).await
    }

    // ===== Maintenance =====

    pub async fn list_maintenance(&self, boat_id: &str) -> ApiResult<Vec<MaintenanceTask>> {
        self.call(Method::GET, &format!("/boats/{}/maintenance", encode(boat_id))).await
    }

    pub async fn create_maintenance(&self, task: &NewMaintenanceTask) -> ApiResult<MaintenanceTask> {
        self.call_with_body(Method::POST, "/maintenance", task).await
    }

    pub async fn complete_maintenance(&self, id: &str) -> ApiResult<MaintenanceTask> {
        self.call(Method::POST, &format!("/maintenance/{}/complete", encode(id))).await
    }

    pub async fn delete_maintenance(&self, id: &str) -> ApiResult<()> {
        self.call_empty(Method::DELETE, &format!("/maintenance/{}", encode(id))).await
    }

    // ===== To-do lists =====

    pub async fn get_todo_list(&self, list_id: &str) -> ApiResult<TodoList> {
        self.call(Method::GET, &format!("/todos/{}", encode(list_id))).await
    }

    /// Append an item; the server answers with the whole updated list
    pub async fn add_todo_item(&self, list_id: &str, text: &str) -> ApiResult<TodoList> {
        self.call_with_body(Method::POST, &format!("/todos/{}/items", encode(list_id)), &json!({ "text": text }))
            .await
    }

    pub async fn set_todo_item_done(&self, list_id: &str, item_id: &str, done: bool) -> ApiResult<TodoList> {
        self.call_with_body(
            Method::PATCH,
            &format!("/todos/{}/items/{}", encode(list_id), encode(item_id)),
            &json!({ "done": done }),
        )
        .await
    }

    pub async fn delete_todo_item(&self, list_id: &str, item_id: &str) -> ApiResult<TodoList> {
        self.call(Method::DELETE, &format!("/todos/{}/items/{}", encode(list_id), encode(item_id))).await
    }

    // ===== Settings =====

    pub async fn get_settings(&self) -> ApiResult<UserSettings> {
        self.call(Method::GET, "/settings").await
    }

    pub async fn set_toggle(&self, name: &str, enabled: bool) -> ApiResult<UserSettings> {
        self.call_with_body(
            Method::PATCH,
            &format!("/settings/toggles/{}", encode(name)),
            &json!({ "enabled": enabled }),
        )
        .await
    }

    pub async fn set_units(&self, units: UnitSystem) -> ApiResult<UserSettings> {
        self.call_with_body(Method::PATCH, "/settings", &json!({ "units": units })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::with_base_url("http://example.test/api/").unwrap();
        assert_eq!(client.base_url(), "http://example.test/api");
        assert_eq!(client.url("/boats"), "http://example.test/api/boats");
    }

    #[test]
    fn test_path_segments_are_percent_encoded() {
        let client = ApiClient::with_base_url("http://example.test/api").unwrap();
        let path = format!("/settings/toggles/{}", encode("night mode/dark"));
        let request = client.request(Method::PATCH, &path).build().unwrap();
        assert_eq!(request.url().path(), "/api/settings/toggles/night%20mode%2Fdark");

        let request = client
            .request(Method::GET, "/notes")
            .query(&[("boatId", "b1&all=1")])
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("boatId=b1%26all%3D1"));
    }

    #[test]
    fn test_clones_share_token() {
        let client = ApiClient::with_base_url(DEFAULT_API_BASE_URL).unwrap();
        let clone = client.clone();
        assert!(!clone.is_authenticated());
        client.set_token("abc");
        assert!(clone.is_authenticated());
    }
}
