use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::path::Path;
use tokio::time::Duration;

use super::retry::{send_with_retry, RetryConfig};
use super::DiskStorage;
use crate::errors::{AppError, AppResult, OperationResult};
use crate::security::InputValidator;

pub const YADISK_API_URL: &str = "https://cloud-api.yandex.net/v1/disk";

/// Yandex Disk REST client bound to one OAuth token.
pub struct YaDiskClient {
    client: Client,
    api_url: String,
    token: String,
    initialized: bool,
    retry_config: RetryConfig,
}

impl YaDiskClient {
    /// Checks the token against the disk info endpoint.
    pub async fn connect(token: &str, retry_config: RetryConfig) -> Self {
        Self::connect_to(YADISK_API_URL, token, retry_config).await
    }

    pub async fn connect_to(api_url: &str, token: &str, retry_config: RetryConfig) -> Self {
        let mut client = Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_else(|e| {
                    log::warn!("Failed to configure HTTP client, using defaults: {}", e);
                    Client::new()
                }),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
            initialized: false,
            retry_config,
        };

        if let Err(e) = InputValidator::validate_token("yadisk_token", &client.token) {
            log::error!("Yandex Disk client init failed: {}", e);
            return client;
        }

        let disk = client.request(Method::GET, "/", &[]).await;
        if disk.success {
            client.initialized = true;
            log::info!("Yandex Disk client initialised");
        } else {
            log::error!("Yandex Disk client init failed: {}", disk.message);
        }
        client
    }

    async fn request(&self, method: Method, endpoint: &str, query: &[(&str, &str)]) -> OperationResult {
        self.request_with(method, endpoint, query, &self.retry_config).await
    }

    async fn request_with(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        retry_config: &RetryConfig,
    ) -> OperationResult {
        self.try_request(method, endpoint, query, retry_config).await.unwrap_or_else(|e| {
            log::warn!("Yandex Disk request {} failed: {}", endpoint, e);
            OperationResult::failure(e.to_string())
        })
    }

    async fn try_request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        retry_config: &RetryConfig,
    ) -> AppResult<OperationResult> {
        let url = format!("{}{}", self.api_url, endpoint);
        log::debug!("Yandex Disk request: {} {}", method, endpoint);

        let request = self
            .client
            .request(method, &url)
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .query(query);

        let response = send_with_retry(request, retry_config).await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(into_operation_result(status, &body))
    }

    async fn try_upload_local_file(&self, local_path: &Path, folder: &str) -> AppResult<OperationResult> {
        let file_name = local_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| AppError::validation("local_path", "Path has no file name"))?;
        let dest_path = join_disk_path(folder, &file_name);

        let link = self
            .try_request(
                Method::GET,
                "/resources/upload",
                &[("path", dest_path.as_str()), ("overwrite", "true")],
                &self.retry_config,
            )
            .await?;
        if !link.success {
            return Ok(link);
        }

        let href = link
            .object
            .as_ref()
            .and_then(|o| o.get("href"))
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::api("Yandex Disk", 0, "Upload link missing"))?
            .to_string();

        let data = tokio::fs::read(local_path).await?;
        log::debug!("Uploading {} bytes to {}", data.len(), dest_path);

        let request = self.client.put(&href).body(data);
        let response = send_with_retry(request, &self.retry_config).await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(into_operation_result(status, &body))
    }
}

#[async_trait]
impl DiskStorage for YaDiskClient {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    async fn create_folder(&self, path: &str) -> OperationResult {
        self.request(Method::PUT, "/resources", &[("path", path)]).await
    }

    async fn upload_remote_file(&self, dest_path: &str, source_url: &str) -> OperationResult {
        // A repeated POST queues a second download of the same file
        self.request_with(
            Method::POST,
            "/resources/upload",
            &[("path", dest_path), ("url", source_url)],
            &self.retry_config.non_idempotent(),
        )
        .await
    }

    async fn upload_local_file(&self, local_path: &Path, folder: &str) -> OperationResult {
        self.try_upload_local_file(local_path, folder)
            .await
            .unwrap_or_else(|e| {
                log::warn!("Uploading {} failed: {}", local_path.display(), e);
                OperationResult::failure(e.to_string())
            })
    }

    async fn list_files(&self, limit: u32) -> OperationResult {
        let limit = limit.to_string();
        self.request(Method::GET, "/resources/files", &[("limit", limit.as_str())])
            .await
    }

    async fn delete_file(&self, path: &str) -> OperationResult {
        self.request(Method::DELETE, "/resources", &[("path", path)]).await
    }

    async fn get_file_info(&self, path: &str) -> OperationResult {
        self.request(Method::GET, "/resources", &[("path", path)]).await
    }
}

/// `folder` and `file_name` joined with exactly one slash.
pub fn join_disk_path(folder: &str, file_name: &str) -> String {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", folder, file_name)
    }
}

/// Any 2xx is a success. A non-empty body becomes the result object; error
/// documents (`{message, description, error}`) also feed the failure message.
pub fn into_operation_result(status: StatusCode, body: &str) -> OperationResult {
    let object = if body.trim().is_empty() {
        None
    } else {
        Some(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
    };

    if status.is_success() {
        return OperationResult::ok(object);
    }

    let detail = object
        .as_ref()
        .and_then(|o| {
            o.get("description")
                .or_else(|| o.get("message"))
                .and_then(Value::as_str)
        })
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
    let message = format!("Yandex Disk error {}: {}", status.as_u16(), detail);
    OperationResult::failure_with(object, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_with_body() {
        let result = into_operation_result(
            StatusCode::CREATED,
            r#"{"href":"https://cloud-api.yandex.net/v1/disk/resources?path=disk%3A%2Fbackup","method":"GET","templated":false}"#,
        );
        assert!(result.success);
        assert!(result.message.is_empty());
        assert_eq!(
            result.object.unwrap()["href"],
            "https://cloud-api.yandex.net/v1/disk/resources?path=disk%3A%2Fbackup"
        );
    }

    #[test]
    fn test_success_with_empty_body() {
        let result = into_operation_result(StatusCode::NO_CONTENT, "");
        assert!(result.success);
        assert!(result.object.is_none());
    }

    #[test]
    fn test_error_document_becomes_message() {
        let body = json!({
            "message": "Не удалось найти запрошенный ресурс.",
            "description": "Resource not found.",
            "error": "DiskNotFoundError"
        })
        .to_string();
        let result = into_operation_result(StatusCode::NOT_FOUND, &body);
        assert!(!result.success);
        assert_eq!(result.message, "Yandex Disk error 404: Resource not found.");
        assert_eq!(result.object.unwrap()["error"], "DiskNotFoundError");
    }

    #[test]
    fn test_error_without_body() {
        let result = into_operation_result(StatusCode::UNAUTHORIZED, "");
        assert!(!result.success);
        assert_eq!(result.message, "Yandex Disk error 401: Unauthorized");
    }

    #[test]
    fn test_join_disk_path() {
        assert_eq!(join_disk_path("backup/", "images_log.json"), "backup/images_log.json");
        assert_eq!(join_disk_path("backup", "1.jpg"), "backup/1.jpg");
        assert_eq!(join_disk_path("", "1.jpg"), "1.jpg");
    }
}
