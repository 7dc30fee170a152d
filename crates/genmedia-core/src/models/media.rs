use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

pub const PNG_MIME_TYPE: &str = "image/png";
pub const MP4_MIME_TYPE: &str = "video/mp4";

/// A generated (and sanitized) image.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ImageAsset {
    pub id: Uuid,
    pub mime_type: String,
    #[serde(skip)]
    pub data: Bytes,
}

impl ImageAsset {
    pub fn png(data: impl Into<Bytes>) -> Self {
        Self {
            id: Uuid::new_v4(),
            mime_type: PNG_MIME_TYPE.to_string(),
            data: data.into(),
        }
    }

    pub fn extension(&self) -> &'static str {
        extension_for(&self.mime_type)
    }
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("id", &self.id)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// A downloaded video. `source_uri` is where the provider published it.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct VideoAsset {
    pub id: Uuid,
    pub mime_type: String,
    #[serde(skip)]
    pub data: Bytes,
    pub source_uri: String,
}

impl VideoAsset {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>, source_uri: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            mime_type: mime_type.into(),
            data: data.into(),
            source_uri: source_uri.into(),
        }
    }

    pub fn extension(&self) -> &'static str {
        extension_for(&self.mime_type)
    }
}

impl fmt::Debug for VideoAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoAsset")
            .field("id", &self.id)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .field("source_uri", &self.source_uri)
            .finish()
    }
}

/// One output of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediaItem {
    Image(ImageAsset),
    Video(VideoAsset),
}

impl MediaItem {
    pub fn id(&self) -> Uuid {
        match self {
            MediaItem::Image(image) => image.id,
            MediaItem::Video(video) => video.id,
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            MediaItem::Image(image) => &image.mime_type,
            MediaItem::Video(video) => &video.mime_type,
        }
    }

    pub fn data(&self) -> &Bytes {
        match self {
            MediaItem::Image(image) => &image.data,
            MediaItem::Video(video) => &video.data,
        }
    }

    pub fn as_image(&self) -> Option<&ImageAsset> {
        match self {
            MediaItem::Image(image) => Some(image),
            MediaItem::Video(_) => None,
        }
    }

    pub fn as_video(&self) -> Option<&VideoAsset> {
        match self {
            MediaItem::Video(video) => Some(video),
            MediaItem::Image(_) => None,
        }
    }

    /// Suggested file name, e.g. `image-1.png`.
    pub fn file_name(&self, index: usize) -> String {
        match self {
            MediaItem::Image(image) => format!("image-{}.{}", index + 1, image.extension()),
            MediaItem::Video(video) => format!("video-{}.{}", index + 1, video.extension()),
        }
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let image = MediaItem::Image(ImageAsset::png(vec![0u8; 4]));
        assert_eq!(image.file_name(0), "image-1.png");

        let video = MediaItem::Video(VideoAsset::new(MP4_MIME_TYPE, vec![0u8; 4], "https://x/v"));
        assert_eq!(video.file_name(2), "video-3.mp4");
        assert_eq!(video.as_video().unwrap().source_uri, "https://x/v");
        assert!(video.as_image().is_none());
    }

    #[test]
    fn test_debug_hides_payload() {
        let image = ImageAsset::png(vec![7u8; 1024]);
        let debug = format!("{:?}", image);
        assert!(debug.contains("bytes: 1024"));
        assert!(!debug.contains("7, 7"));
    }

    #[test]
    fn test_serialize_skips_bytes() {
        let item = MediaItem::Image(ImageAsset::png(vec![1u8, 2, 3]));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["mime_type"], "image/png");
        assert!(json.get("data").is_none());
    }
}
