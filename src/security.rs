use regex::Regex;
use crate::errors::{AppError, AppResult};

pub struct InputValidator;

impl InputValidator {
    pub fn validate_token(field: &str, token: &str) -> AppResult<()> {
        let trimmed = token.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation(field, "Token cannot be empty"));
        }

        if trimmed.len() > 512 {
            return Err(AppError::validation(field, "Token too long"));
        }

        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(AppError::validation(field, "Token contains invalid characters"));
        }

        Ok(())
    }

    /// Numeric id (`1`, `id1`) or screen name (`durov`).
    pub fn validate_user_id(user_id: &str) -> AppResult<()> {
        let trimmed = user_id.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("user_id", "User ID cannot be empty"));
        }

        let user_pattern = Regex::new(r"^[a-zA-Z0-9_.]{1,64}$")
            .map_err(|e| AppError::Config(e.to_string()))?;
        if !user_pattern.is_match(trimmed) {
            return Err(AppError::validation("user_id", "User ID contains invalid characters"));
        }

        Ok(())
    }

    /// `profile`, `wall`, `saved` or a numeric album id.
    pub fn validate_album_id(album_id: &str) -> AppResult<()> {
        let trimmed = album_id.trim();

        if matches!(trimmed, "profile" | "wall" | "saved") {
            return Ok(());
        }

        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Ok(());
        }

        Err(AppError::validation(
            "album_id",
            "Must be 'profile', 'wall', 'saved' or a numeric album ID",
        ))
    }

    pub fn validate_folder_name(folder: &str) -> AppResult<()> {
        let trimmed = folder.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("folder", "Folder name cannot be empty"));
        }

        if trimmed.len() > 255 {
            return Err(AppError::validation("folder", "Folder name too long (max 255 characters)"));
        }

        // Check for path traversal attempts
        if trimmed.split('/').any(|part| part == "..") {
            return Err(AppError::validation("folder", "Invalid folder path detected"));
        }

        if trimmed.chars().any(|c| c.is_control()) {
            return Err(AppError::validation("folder", "Folder name contains invalid characters"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_validation() {
        assert!(InputValidator::validate_token("vk_token", "vk1.a.abcDEF123").is_ok());
        assert!(InputValidator::validate_token("vk_token", "   ").is_err());
        assert!(InputValidator::validate_token("vk_token", "abc def").is_err());
        assert!(InputValidator::validate_token("vk_token", &"a".repeat(600)).is_err());
    }

    #[test]
    fn test_user_id_validation() {
        assert!(InputValidator::validate_user_id("1").is_ok());
        assert!(InputValidator::validate_user_id("durov").is_ok());
        assert!(InputValidator::validate_user_id("").is_err());
        assert!(InputValidator::validate_user_id("a/b").is_err());
    }

    #[test]
    fn test_album_id_validation() {
        for album in ["profile", "wall", "saved", "285307254"] {
            assert!(InputValidator::validate_album_id(album).is_ok(), "{}", album);
        }
        assert!(InputValidator::validate_album_id("photos").is_err());
        assert!(InputValidator::validate_album_id("").is_err());
    }

    #[test]
    fn test_folder_validation() {
        assert!(InputValidator::validate_folder_name("vk_photos_2024-05-01").is_ok());
        assert!(InputValidator::validate_folder_name("backup/vk").is_ok());
        assert!(InputValidator::validate_folder_name("").is_err());
        assert!(InputValidator::validate_folder_name("../other").is_err());
        assert!(InputValidator::validate_folder_name("bad\nname").is_err());
    }
}
