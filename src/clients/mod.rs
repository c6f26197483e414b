// Remote service clients
//
// The saver only talks to the traits below; the HTTP implementations live in
// the submodules.

pub mod retry;
pub mod vk_client;
pub mod yadisk_client;

use async_trait::async_trait;
use std::path::Path;

use crate::errors::OperationResult;
use crate::models::PhotoPage;

pub use retry::RetryConfig;
pub use vk_client::VkClient;
pub use yadisk_client::YaDiskClient;

/// Source of photos (VK).
#[async_trait]
pub trait PhotoSource: Send + Sync {
    fn is_initialized(&self) -> bool;

    /// One page of the album. `user_id = None` means the authorised user.
    async fn get_user_photos(
        &self,
        user_id: Option<&str>,
        album_id: &str,
        count: usize,
        offset: usize,
    ) -> OperationResult<PhotoPage>;

    async fn get_user_status(&self, user_id: Option<&str>) -> OperationResult<String>;
}

/// Destination storage (Yandex Disk).
#[async_trait]
pub trait DiskStorage: Send + Sync {
    fn is_initialized(&self) -> bool;

    async fn create_folder(&self, path: &str) -> OperationResult;

    /// Asks the storage to fetch `source_url` into `dest_path`.
    async fn upload_remote_file(&self, dest_path: &str, source_url: &str) -> OperationResult;

    /// Uploads a local file into `folder`, replacing a file of the same name.
    async fn upload_local_file(&self, local_path: &Path, folder: &str) -> OperationResult;

    async fn list_files(&self, limit: u32) -> OperationResult;

    async fn delete_file(&self, path: &str) -> OperationResult;

    async fn get_file_info(&self, path: &str) -> OperationResult;
}
