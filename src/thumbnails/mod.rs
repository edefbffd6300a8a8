/// Thumbnail URL rendering
///
/// Generating the thumbnail files is left to the media pipeline; this module
/// only knows the configured presets and how their file names are derived
/// from the original upload, so the API can hand out the URLs.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Quality used when a preset does not set one
const DEFAULT_QUALITY: u8 = 85;

/// Alias used for the small image next to search suggestions
pub const SEARCH_ALIAS: &str = "micro_cropped";

/// A named thumbnail preset, e.g. `micro_cropped` = 30x30, smart crop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailAlias {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Crop strategy, `None` scales without cropping
    pub crop: Option<String>,
    /// JPEG quality, `None` falls back to the default of 85
    pub quality: Option<u8>,
}

impl ThumbnailAlias {
    fn new(name: &str, size: u32, crop: bool, quality: Option<u8>) -> Self {
        Self {
            name: name.to_string(),
            width: size,
            height: size,
            crop: crop.then(|| "smart".to_string()),
            quality,
        }
    }

    /// The presets shipped with the application
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("micro", 30, false, None),
            Self::new("micro_cropped", 30, true, None),
            Self::new("thumbnail", 80, false, None),
            Self::new("thumbnail_cropped", 80, true, None),
            Self::new("small", 200, false, None),
            Self::new("small_cropped", 200, true, None),
            Self::new("medium", 400, false, None),
            Self::new("medium_cropped", 400, true, None),
            Self::new("large", 800, false, Some(90)),
            Self::new("large_cropped", 800, true, Some(90)),
        ]
    }

    /// Generation settings as reported by the thumbnails endpoint
    pub fn settings(&self) -> Value {
        let mut settings = Map::new();
        settings.insert("size".to_string(), json!([self.width, self.height]));
        if let Some(crop) = &self.crop {
            settings.insert("crop".to_string(), json!(crop));
        }
        if let Some(quality) = self.quality {
            settings.insert("quality".to_string(), json!(quality));
        }
        Value::Object(settings)
    }

    /// File name of the rendered thumbnail relative to the media root.
    ///
    /// `exercise-images/1/curl.png` with `micro_cropped` becomes
    /// `exercise-images/1/curl.png.30x30_q85_crop-smart.png`.
    pub fn file_name(&self, source: &str) -> String {
        let quality = self.quality.unwrap_or(DEFAULT_QUALITY);
        let crop = self
            .crop
            .as_ref()
            .map(|c| format!("_crop-{}", c))
            .unwrap_or_default();
        let extension = source
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.contains('/'))
            .unwrap_or("jpg");
        format!("{}.{}x{}_q{}{}.{}", source, self.width, self.height, quality, crop, extension)
    }
}

/// Renders media and thumbnail URLs for stored image paths
#[derive(Debug, Clone)]
pub struct Thumbnailer {
    media_url: String,
    aliases: Vec<ThumbnailAlias>,
}

impl Thumbnailer {
    pub fn new(media_url: impl Into<String>, aliases: Vec<ThumbnailAlias>) -> Self {
        Self {
            media_url: media_url.into(),
            aliases,
        }
    }

    /// Public URL of an uploaded file
    pub fn media_url(&self, path: &str) -> String {
        format!("{}{}", self.media_url, path.trim_start_matches('/'))
    }

    /// URL of one thumbnail preset, `None` if the alias is not configured
    pub fn thumbnail_url(&self, path: &str, alias: &str) -> Option<String> {
        self.aliases
            .iter()
            .find(|a| a.name == alias)
            .map(|a| self.media_url(&a.file_name(path)))
    }

    /// Every configured alias mapped to `{url, settings}`, plus `original`
    pub fn thumbnails(&self, path: &str) -> Map<String, Value> {
        let mut out = Map::new();
        for alias in &self.aliases {
            out.insert(
                alias.name.clone(),
                json!({
                    "url": self.media_url(&alias.file_name(path)),
                    "settings": alias.settings(),
                }),
            );
        }
        out.insert("original".to_string(), json!(self.media_url(path)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn thumbnailer() -> Thumbnailer {
        Thumbnailer::new("/media/", ThumbnailAlias::defaults())
    }

    #[test]
    fn file_name_carries_size_quality_and_crop() {
        let alias = ThumbnailAlias::new("micro_cropped", 30, true, None);
        assert_eq!(
            alias.file_name("exercise-images/1/curl.png"),
            "exercise-images/1/curl.png.30x30_q85_crop-smart.png"
        );

        let large = ThumbnailAlias::new("large", 800, false, Some(90));
        assert_eq!(large.file_name("a/b.jpeg"), "a/b.jpeg.800x800_q90.jpeg");
    }

    #[test]
    fn settings_only_report_configured_options() {
        let alias = ThumbnailAlias::new("thumbnail", 80, false, None);
        assert_eq!(alias.settings(), json!({"size": [80, 80]}));

        let alias = ThumbnailAlias::new("large_cropped", 800, true, Some(90));
        assert_eq!(
            alias.settings(),
            json!({"size": [800, 800], "crop": "smart", "quality": 90})
        );
    }

    #[test]
    fn thumbnails_include_every_alias_and_the_original() {
        let map = thumbnailer().thumbnails("exercise-images/7/row.png");
        assert_eq!(map.len(), ThumbnailAlias::defaults().len() + 1);
        assert_eq!(map["original"], json!("/media/exercise-images/7/row.png"));
        assert_eq!(
            map["micro"]["url"],
            json!("/media/exercise-images/7/row.png.30x30_q85.png")
        );
    }

    #[test]
    fn unknown_alias_has_no_url() {
        assert_eq!(thumbnailer().thumbnail_url("x.png", "gigantic"), None);
    }
}
