//! Back up VK photos to Yandex Disk.
//!
//! [`saver::ImageSaver`] fetches a user's photo links from VK, keeps the
//! largest rendition of every photo, asks Yandex Disk to download each one by
//! URL and uploads a JSON manifest of what was copied.

pub mod clients;
pub mod config;
pub mod errors;
pub mod models;
pub mod saver;
pub mod security;

pub use errors::{AppError, AppResult, OperationResult};
pub use models::{PhotoPage, PhotoRecord, PhotoSize, SelectedImage};
pub use saver::{Credentials, ImageSaver};
