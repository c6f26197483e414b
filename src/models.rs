use serde::{Deserialize, Serialize};

/// One rendition of a photo as reported by `photos.get` with `photo_sizes=1`.
///
/// Photos uploaded before 2012 report zero width and height for every size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoSize {
    #[serde(rename = "type")]
    pub size_type: String,
    #[serde(default)]
    pub width: u64,
    #[serde(default)]
    pub height: u64,
    pub url: String,
}

impl PhotoSize {
    pub fn area(&self) -> u64 {
        self.height.saturating_mul(self.width)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Likes {
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub sizes: Vec<PhotoSize>,
    #[serde(default)]
    pub likes: Likes,
}

/// One page of `photos.get`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoPage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub items: Vec<PhotoRecord>,
}

/// A photo picked for upload: its de-duplicated name, the extension taken
/// from the source URL, the URL itself and the size tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedImage {
    pub name: String,
    pub extension: String,
    pub url: String,
    pub size_type: String,
}

impl SelectedImage {
    pub fn file_name(&self) -> String {
        format!("{}{}", self.name, self.extension)
    }
}
