// Photo saver - orchestrates the VK to Yandex Disk backup
//
// Fetches photo links from the source, picks the best size of each photo,
// uploads them by URL and leaves a JSON manifest next to them.

pub mod manifest;
pub mod rate_limit;
pub mod selection;

use serde_json::Value;
use std::path::Path;

use crate::clients::{DiskStorage, PhotoSource, RetryConfig, VkClient, YaDiskClient};
use crate::errors::OperationResult;
use crate::models::SelectedImage;

use self::manifest::{write_manifest, ManifestEntry, DEFAULT_MANIFEST_PATH};
use self::rate_limit::{FixedIntervalGate, RequestGate, DEFAULT_REQUEST_INTERVAL};
use self::selection::select_images;

/// Most photos `photos.get` returns per request
pub const MAX_PHOTOS_PER_REQUEST: usize = 1000;

/// Page size used by `list_disk`
pub const DISK_LIST_LIMIT: u32 = 50;

/// Everything needed to connect both services.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub vk_token: String,
    pub yadisk_token: String,
    pub vk_user_id: Option<String>,
    pub request_interval: tokio::time::Duration,
    pub retry_config: RetryConfig,
}

impl Credentials {
    pub fn new(vk_token: &str, yadisk_token: &str, vk_user_id: Option<&str>) -> Self {
        Self {
            vk_token: vk_token.to_string(),
            yadisk_token: yadisk_token.to_string(),
            vk_user_id: vk_user_id.map(str::to_string),
            request_interval: DEFAULT_REQUEST_INTERVAL,
            retry_config: RetryConfig::default(),
        }
    }
}

pub struct ImageSaver {
    source: Box<dyn PhotoSource>,
    storage: Box<dyn DiskStorage>,
    gate: Box<dyn RequestGate>,
    initialized: bool,
}

impl ImageSaver {
    /// Connects to VK and Yandex Disk with the given credentials.
    pub async fn connect(credentials: &Credentials) -> Self {
        log::debug!("Creating ImageSaver...");
        let source = VkClient::connect(
            &credentials.vk_token,
            credentials.vk_user_id.as_deref(),
            credentials.retry_config.clone(),
        )
        .await;
        let storage =
            YaDiskClient::connect(&credentials.yadisk_token, credentials.retry_config.clone())
                .await;

        Self::with_clients(
            Box::new(source),
            Box::new(storage),
            Box::new(FixedIntervalGate::new(credentials.request_interval)),
        )
    }

    /// Builds a saver around already constructed collaborators.
    pub fn with_clients(
        source: Box<dyn PhotoSource>,
        storage: Box<dyn DiskStorage>,
        gate: Box<dyn RequestGate>,
    ) -> Self {
        let initialized = source.is_initialized() && storage.is_initialized();
        if initialized {
            log::info!("ImageSaver initialised.");
        } else {
            log::error!(
                "ImageSaver init failed (VK client: {}, Yandex Disk client: {})",
                source.is_initialized(),
                storage.is_initialized()
            );
        }

        Self {
            source,
            storage,
            gate,
            initialized,
        }
    }

    pub fn get_auth_link(app_id: &str, scope: &str) -> String {
        VkClient::get_auth_link(app_id, scope)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_client_initialized(&self) -> bool {
        self.source.is_initialized()
    }

    pub fn is_uploader_initialized(&self) -> bool {
        self.storage.is_initialized()
    }

    /// Fetches up to `max_qty` photos of `album_id` and picks the best size of
    /// each one. `vk_id = None` means the user the saver was connected for.
    ///
    /// Returns an empty list when the saver is not initialized. A failed page
    /// request ends paging; photos from earlier pages are still returned.
    pub async fn get_images_links(
        &self,
        vk_id: Option<&str>,
        album_id: &str,
        max_qty: usize,
    ) -> Vec<SelectedImage> {
        if !self.initialized {
            log::error!("Error: not initialized.");
            return Vec::new();
        }
        if max_qty == 0 {
            return Vec::new();
        }

        let count = max_qty.min(MAX_PHOTOS_PER_REQUEST);
        let mut photos = Vec::new();
        let mut offset = 0;

        log::info!("Requesting max {} image links from VK album {}...", max_qty, album_id);
        loop {
            self.gate.wait().await;
            let page = self
                .source
                .get_user_photos(vk_id, album_id, count, offset)
                .await;
            if !page.success {
                log::warn!("Loading image links failed: {}", page.message);
                break;
            }

            let (total, items) = page
                .object
                .map(|p| (p.count, p.items))
                .unwrap_or_default();
            let items_count = items.len();
            log::debug!(
                "Loaded {} of {} image links from VK (offset {})",
                items_count,
                total,
                offset
            );

            if items_count == 0 {
                break;
            }
            photos.extend(items);

            // A short page is the last one
            if items_count < count || offset + count >= max_qty {
                break;
            }
            offset += count;
        }
        log::info!("Loading image links finished: {} photos", photos.len());

        select_images(&photos, max_qty)
    }

    pub async fn create_folder(&self, folder_name: &str) -> OperationResult {
        if !self.initialized {
            log::error!("Error: not initialized");
            return OperationResult::not_initialized();
        }

        let result = self.storage.create_folder(folder_name).await;
        if result.success {
            log::info!("Folder created: {}", href(&result));
        } else {
            log::warn!("Error creating folder. {}", result.message);
        }
        result
    }

    /// Uploads `files` into `folder` one by one, stopping at the first
    /// failure, then saves the manifest of what was uploaded to
    /// `manifest_path` and uploads it into `folder` as well.
    ///
    /// The returned result describes the image uploads only; the manifest
    /// outcome is logged.
    pub async fn upload_remote_files(
        &self,
        folder: &str,
        files: &[SelectedImage],
        manifest_path: Option<&Path>,
    ) -> OperationResult {
        if !self.initialized {
            log::error!("Error: not initialized");
            return OperationResult::not_initialized();
        }

        log::info!("Start to upload {} remote files to folder {}...", files.len(), folder);
        let mut manifest: Vec<ManifestEntry> = Vec::with_capacity(files.len());
        let mut failure: Option<OperationResult> = None;

        for file in files {
            let dest_path = format!("{}/{}", folder, file.file_name());
            self.gate.wait().await;
            let response = self.storage.upload_remote_file(&dest_path, &file.url).await;

            if response.success {
                log::debug!("Uploading file accepted: {}", href(&response));
                manifest.push(ManifestEntry::from(file));
            } else {
                let message = format!("Uploading file failed: {} ({})", file.url, response.message);
                log::error!("{}", message);
                failure = Some(OperationResult::failure_with(response.object, message));
                break;
            }
        }

        let manifest_path = manifest_path.unwrap_or_else(|| Path::new(DEFAULT_MANIFEST_PATH));
        self.upload_manifest(folder, &manifest, manifest_path).await;

        match failure {
            Some(failure) => failure,
            None => {
                log::info!("{} files uploaded to {}", manifest.len(), folder);
                OperationResult::ok(serde_json::to_value(&manifest).ok())
            }
        }
    }

    async fn upload_manifest(&self, folder: &str, manifest: &[ManifestEntry], manifest_path: &Path) {
        if let Err(e) = write_manifest(manifest_path, manifest).await {
            log::error!("Saving log file {} failed: {}", manifest_path.display(), e);
            return;
        }
        log::info!("Log file saved to {}", manifest_path.display());

        log::debug!("Uploading log file to disk with overwrite...");
        self.gate.wait().await;
        let response = self
            .storage
            .upload_local_file(manifest_path, &format!("{}/", folder))
            .await;
        if response.success {
            log::info!("Log file uploaded to disk");
        } else {
            log::warn!("Uploading log file error. {}", response.message);
        }
    }

    pub async fn list_disk(&self) -> OperationResult {
        if !self.initialized {
            log::error!("Error: not initialized.");
            return OperationResult::not_initialized();
        }

        log::debug!("Listing files on Yandex Disk...");
        let result = self.storage.list_files(DISK_LIST_LIMIT).await;
        if result.success {
            let items = result
                .object
                .as_ref()
                .and_then(|o| o.get("items"))
                .and_then(Value::as_array)
                .map(|items| items.len())
                .unwrap_or(0);
            log::info!("Yandex Disk returned {} files", items);
        } else {
            log::warn!("Listing files failed: {}", result.message);
        }
        result
    }

    /// Status text of `user_id` (or of the connected user); empty on failure.
    pub async fn get_user_vk_status(&self, user_id: Option<&str>) -> String {
        if !self.initialized {
            log::error!("Error: not initialized.");
            return String::new();
        }

        let result = self.source.get_user_status(user_id).await;
        if result.success {
            let status = result.object.unwrap_or_default();
            log::info!("VK user status: {}", status);
            status
        } else {
            log::warn!("VK user status: {}", result.message);
            String::new()
        }
    }

    pub async fn delete_file(&self, file_path: &str) -> OperationResult {
        if !self.initialized {
            log::error!("Error: not initialized.");
            return OperationResult::not_initialized();
        }

        log::debug!("Try to delete file or folder: {}", file_path);
        let result = self.storage.delete_file(file_path).await;
        if result.success {
            log::info!("File/Folder deleted: {}", file_path);
        } else {
            log::warn!("File/Folder delete error: {}", result.message);
        }
        result
    }

    pub async fn get_file_info(&self, file_path: &str) -> OperationResult {
        if !self.initialized {
            log::error!("Error: not initialized");
            return OperationResult::not_initialized();
        }

        log::debug!("Checking if file/folder \"{}\" exists...", file_path);
        let result = self.storage.get_file_info(file_path).await;
        if result.success {
            log::info!("File/Folder present: {}", file_path);
        } else {
            log::warn!("File/Folder not found: {}", result.message);
        }
        result
    }
}

fn href(result: &OperationResult) -> &str {
    result
        .object
        .as_ref()
        .and_then(|o| o.get("href"))
        .and_then(Value::as_str)
        .unwrap_or_default()
}
