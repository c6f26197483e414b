// Size selection and naming for fetched photos
//
// Picks the largest rendition of every photo and turns its like count into a
// file name that is unique within one run.

use std::collections::HashSet;

use reqwest::Url;

use crate::models::{PhotoRecord, PhotoSize, SelectedImage};

/// Rank of every known size tag, smallest to largest.
/// See https://vk.com/dev/objects/photo_sizes
pub const SIZE_TYPE_PRIORITY: [(&str, u8); 10] = [
    ("s", 1),
    ("m", 2),
    ("x", 3),
    ("o", 4),
    ("p", 5),
    ("q", 6),
    ("r", 7),
    ("y", 8),
    ("z", 9),
    ("w", 10),
];

/// Unknown tags rank below every known one.
pub fn size_type_rank(size_type: &str) -> u8 {
    SIZE_TYPE_PRIORITY
        .iter()
        .find(|(tag, _)| *tag == size_type)
        .map(|(_, rank)| *rank)
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeChoice {
    pub url: String,
    pub size_type: String,
}

/// Picks the rendition to download.
///
/// The URL comes from the largest `height * width`, unless every area is zero,
/// in which case it comes from the highest ranked tag. The reported tag is
/// always the highest ranked one, even when the URL belongs to another size.
/// Both scans keep the first maximum they meet.
pub fn select_size(sizes: &[PhotoSize]) -> SizeChoice {
    let mut url = "";
    let mut max_area: Option<u64> = None;

    let mut fallback_url = "";
    let mut size_type = "";
    let mut max_rank: Option<u8> = None;

    for size in sizes {
        let area = size.area();
        if max_area.map_or(true, |max| max < area) {
            max_area = Some(area);
            url = size.url.as_str();
        }

        let rank = size_type_rank(&size.size_type);
        if max_rank.map_or(true, |max| max < rank) {
            max_rank = Some(rank);
            size_type = size.size_type.as_str();
            fallback_url = size.url.as_str();
        }
    }

    if max_area == Some(0) {
        url = fallback_url;
    }

    SizeChoice {
        url: url.to_string(),
        size_type: size_type.to_string(),
    }
}

/// Returns `base`, or `base_N` with the smallest free `N` when `base` is taken,
/// and records the returned name as taken.
pub fn unique_name(base: &str, taken: &mut HashSet<String>) -> String {
    let mut name = base.to_string();
    if taken.contains(&name) {
        let mut i = 1;
        while taken.contains(&format!("{}_{}", base, i)) {
            i += 1;
        }
        name = format!("{}_{}", base, i);
    }
    taken.insert(name.clone());
    name
}

/// Extension of the last path segment of `url`, dot included.
///
/// Query and fragment are ignored. Names that start with their only dot
/// (`.jpg`) or end with a dot have no extension.
pub fn file_extension(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };
    let file_name = path.rsplit('/').next().unwrap_or_default();

    match file_name.rfind('.') {
        Some(pos) if pos > 0 && pos < file_name.len() - 1 => file_name[pos..].to_string(),
        _ => String::new(),
    }
}

/// Turns fetched photos into upload candidates, keeping at most `max_qty`
/// and preserving their order.
pub fn select_images(photos: &[PhotoRecord], max_qty: usize) -> Vec<SelectedImage> {
    let mut taken = HashSet::new();

    photos
        .iter()
        .take(max_qty)
        .map(|photo| {
            let choice = select_size(&photo.sizes);
            let name = unique_name(&photo.likes.count.to_string(), &mut taken);
            SelectedImage {
                name,
                extension: file_extension(&choice.url),
                url: choice.url,
                size_type: choice.size_type,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Likes;

    fn size(size_type: &str, width: u64, height: u64, url: &str) -> PhotoSize {
        PhotoSize {
            size_type: size_type.to_string(),
            width,
            height,
            url: url.to_string(),
        }
    }

    fn photo(likes: u64, sizes: Vec<PhotoSize>) -> PhotoRecord {
        PhotoRecord {
            id: 0,
            sizes,
            likes: Likes { count: likes },
        }
    }

    #[test]
    fn test_priority_table_ranks() {
        assert_eq!(size_type_rank("s"), 1);
        assert_eq!(size_type_rank("x"), 3);
        assert_eq!(size_type_rank("w"), 10);
        assert_eq!(size_type_rank("a"), 0);
    }

    #[test]
    fn test_zero_areas_fall_back_to_priority() {
        let sizes = vec![
            size("s", 0, 0, "https://cdn.example/s.jpg"),
            size("m", 0, 0, "https://cdn.example/m.jpg"),
            size("x", 0, 0, "https://cdn.example/x.jpg"),
        ];
        let choice = select_size(&sizes);
        assert_eq!(choice.url, "https://cdn.example/x.jpg");
        assert_eq!(choice.size_type, "x");
    }

    #[test]
    fn test_largest_area_wins_but_tag_follows_priority() {
        let sizes = vec![
            size("m", 130, 87, "https://cdn.example/m.jpg"),
            size("z", 1280, 853, "https://cdn.example/z.jpg"),
            size("r", 510, 510, "https://cdn.example/r.jpg"),
        ];
        let choice = select_size(&sizes);
        assert_eq!(choice.url, "https://cdn.example/z.jpg");
        assert_eq!(choice.size_type, "z");

        let sizes = vec![
            size("y", 807, 538, "https://cdn.example/y.jpg"),
            size("w", 100, 100, "https://cdn.example/w.jpg"),
        ];
        let choice = select_size(&sizes);
        assert_eq!(choice.url, "https://cdn.example/y.jpg");
        assert_eq!(choice.size_type, "w");
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let sizes = vec![
            size("x", 100, 100, "https://cdn.example/first.jpg"),
            size("x", 100, 100, "https://cdn.example/second.jpg"),
        ];
        let choice = select_size(&sizes);
        assert_eq!(choice.url, "https://cdn.example/first.jpg");

        let sizes = vec![
            size("x", 0, 0, "https://cdn.example/first.jpg"),
            size("x", 0, 0, "https://cdn.example/second.jpg"),
        ];
        let choice = select_size(&sizes);
        assert_eq!(choice.url, "https://cdn.example/first.jpg");
        assert_eq!(choice.size_type, "x");
    }

    #[test]
    fn test_empty_sizes() {
        let choice = select_size(&[]);
        assert_eq!(choice.url, "");
        assert_eq!(choice.size_type, "");
    }

    #[test]
    fn test_unique_name_suffixes() {
        let mut taken = HashSet::new();
        assert_eq!(unique_name("5", &mut taken), "5");
        assert_eq!(unique_name("5", &mut taken), "5_1");
        assert_eq!(unique_name("5", &mut taken), "5_2");
        assert_eq!(unique_name("7", &mut taken), "7");
    }

    #[test]
    fn test_unique_name_skips_used_suffix() {
        let mut taken = HashSet::new();
        taken.insert("5".to_string());
        taken.insert("5_1".to_string());
        assert_eq!(unique_name("5", &mut taken), "5_2");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(
            file_extension("https://sun9-1.userapi.com/c1/v1/abc.jpg?size=604x604&quality=96"),
            ".jpg"
        );
        assert_eq!(file_extension("https://cdn.example/photos/a.b.png"), ".png");
        assert_eq!(file_extension("https://cdn.example/impg/abc"), "");
        assert_eq!(file_extension("https://cdn.example/.hidden"), "");
        assert_eq!(file_extension(""), "");
        assert_eq!(file_extension("local/file.jpeg"), ".jpeg");
    }

    #[test]
    fn test_select_images_truncates_and_keeps_order() {
        let photos: Vec<PhotoRecord> = (0..5)
            .map(|i| {
                photo(
                    i,
                    vec![size("x", 10, 10, &format!("https://cdn.example/{}.jpg", i))],
                )
            })
            .collect();

        let images = select_images(&photos, 3);
        assert_eq!(images.len(), 3);
        let names: Vec<&str> = images.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["0", "1", "2"]);
        assert_eq!(images[2].url, "https://cdn.example/2.jpg");
        assert_eq!(images[2].file_name(), "2.jpg");
    }

    #[test]
    fn test_select_images_deduplicates_likes() {
        let photos = vec![
            photo(5, vec![size("x", 1, 1, "https://cdn.example/a.jpg")]),
            photo(5, vec![size("x", 1, 1, "https://cdn.example/b.jpg")]),
            photo(5, vec![size("x", 1, 1, "https://cdn.example/c.jpg")]),
        ];
        let names: Vec<String> = select_images(&photos, 10)
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["5", "5_1", "5_2"]);
    }
}
