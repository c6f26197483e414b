use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tokio::time::Duration;

use super::retry::{retry_after, send_with_retry, RetryConfig};
use super::PhotoSource;
use crate::errors::{AppError, AppResult, OperationResult};
use crate::models::PhotoPage;
use crate::security::InputValidator;

pub const VK_API_URL: &str = "https://api.vk.com/method";
pub const VK_API_VERSION: &str = "5.131";
const VK_OAUTH_URL: &str = "https://oauth.vk.com/authorize";
const VK_REDIRECT_URL: &str = "https://oauth.vk.com/blank.html";

/// VK API client bound to one access token.
pub struct VkClient {
    client: Client,
    api_url: String,
    token: String,
    user_id: Option<String>,
    initialized: bool,
    retry_config: RetryConfig,
}

impl VkClient {
    /// Checks the token against `users.get` and resolves the numeric id of
    /// `user_id` (or of the token owner). The client stays uninitialized if
    /// that fails.
    pub async fn connect(token: &str, user_id: Option<&str>, retry_config: RetryConfig) -> Self {
        Self::connect_to(VK_API_URL, token, user_id, retry_config).await
    }

    pub async fn connect_to(
        api_url: &str,
        token: &str,
        user_id: Option<&str>,
        retry_config: RetryConfig,
    ) -> Self {
        let mut client = Self {
            client: build_http_client(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
            user_id: None,
            initialized: false,
            retry_config,
        };

        if let Err(e) = InputValidator::validate_token("vk_token", &client.token) {
            log::error!("VK client init failed: {}", e);
            return client;
        }

        match client.resolve_user_id(user_id).await {
            Ok(id) => {
                log::info!("VK client initialised for user {}", id);
                client.user_id = Some(id);
                client.initialized = true;
            }
            Err(e) => log::error!("VK client init failed: {}", e),
        }
        client
    }

    /// Implicit-flow OAuth link the user opens to obtain an access token.
    pub fn get_auth_link(app_id: &str, scope: &str) -> String {
        let params = [
            ("client_id", app_id),
            ("display", "page"),
            ("redirect_uri", VK_REDIRECT_URL),
            ("scope", scope),
            ("response_type", "token"),
            ("v", VK_API_VERSION),
        ];
        match Url::parse_with_params(VK_OAUTH_URL, &params) {
            Ok(url) => url.to_string(),
            Err(e) => {
                log::error!("Failed to build VK auth link: {}", e);
                String::new()
            }
        }
    }

    async fn resolve_user_id(&self, user_id: Option<&str>) -> AppResult<String> {
        let mut params = Vec::new();
        if let Some(id) = user_id {
            params.push(("user_ids", id.to_string()));
        }
        let response = self.call_method("users.get", &params).await?;
        parse_user_id(&response)
    }

    async fn call_method(&self, method: &str, params: &[(&str, String)]) -> AppResult<Value> {
        let url = format!("{}/{}", self.api_url, method);
        log::debug!("VK request: {} ({} params)", method, params.len());

        let request = self
            .client
            .get(&url)
            .query(params)
            .query(&[("access_token", self.token.as_str()), ("v", VK_API_VERSION)]);

        let response = send_with_retry(request, &self.retry_config).await?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = retry_after(response.headers())
                .map(|delay| delay.as_millis() as u64)
                .unwrap_or(0);
            return Err(AppError::RateLimit { retry_after_ms });
        }
        if !status.is_success() {
            return Err(AppError::api("VK", status.as_u16() as i64, status.as_str()));
        }

        let body: Value = response.json().await?;
        parse_vk_response(body)
    }

    async fn fetch_photos(
        &self,
        user_id: Option<&str>,
        album_id: &str,
        count: usize,
        offset: usize,
    ) -> AppResult<PhotoPage> {
        let mut params = vec![
            ("album_id", album_id.to_string()),
            ("extended", "1".to_string()),
            ("photo_sizes", "1".to_string()),
            ("count", count.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(owner_id) = self.owner_id(user_id) {
            params.push(("owner_id", owner_id));
        }

        let response = self.call_method("photos.get", &params).await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn fetch_status(&self, user_id: Option<&str>) -> AppResult<String> {
        let mut params = Vec::new();
        if let Some(id) = self.owner_id(user_id) {
            params.push(("user_id", id));
        }

        let response = self.call_method("status.get", &params).await?;
        Ok(parse_status_text(&response))
    }

    fn owner_id(&self, user_id: Option<&str>) -> Option<String> {
        user_id.map(str::to_string).or_else(|| self.user_id.clone())
    }
}

#[async_trait]
impl PhotoSource for VkClient {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    async fn get_user_photos(
        &self,
        user_id: Option<&str>,
        album_id: &str,
        count: usize,
        offset: usize,
    ) -> OperationResult<PhotoPage> {
        self.fetch_photos(user_id, album_id, count, offset)
            .await
            .map(Some)
            .into()
    }

    async fn get_user_status(&self, user_id: Option<&str>) -> OperationResult<String> {
        self.fetch_status(user_id).await.map(Some).into()
    }
}

fn build_http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("Failed to configure HTTP client, using defaults: {}", e);
            Client::new()
        })
}

/// Unwraps the `response` envelope or turns the `error` envelope into an error.
pub fn parse_vk_response(mut body: Value) -> AppResult<Value> {
    if let Some(error) = body.get("error") {
        let code = error.get("error_code").and_then(Value::as_i64).unwrap_or(0);
        let message = error
            .get("error_msg")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        return Err(AppError::api("VK", code, message));
    }

    match body.get_mut("response") {
        Some(response) => Ok(response.take()),
        None => Err(AppError::api("VK", 0, "Response envelope missing")),
    }
}

fn parse_user_id(response: &Value) -> AppResult<String> {
    response
        .as_array()
        .and_then(|users| users.first())
        .and_then(|user| user.get("id"))
        .and_then(Value::as_i64)
        .map(|id| id.to_string())
        .ok_or_else(|| AppError::api("VK", 0, "User not found"))
}

fn parse_status_text(response: &Value) -> String {
    response
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
