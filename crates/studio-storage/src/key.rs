//! Object key layout.
//!
//! Every key starts with the owning organization so a bucket listing can be
//! scoped per tenant: `{organization}/{category}/{entity}/{file}`.

use studio_models::OrganizationId;

use crate::error::{StorageError, StorageResult};

/// Top-level grouping under an organization prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCategory {
    Audio,
    Video,
    Podcast,
    Standalone,
    Thumbnail,
}

impl MediaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::Audio => "audio",
            MediaCategory::Video => "video",
            MediaCategory::Podcast => "podcast",
            MediaCategory::Standalone => "standalone",
            MediaCategory::Thumbnail => "thumbnails",
        }
    }
}

fn check_segment(segment: &str) -> StorageResult<&str> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
    {
        return Err(StorageError::InvalidKey(segment.to_string()));
    }
    Ok(segment)
}

/// Build the key for one stored file.
pub fn object_key(
    organization_id: &OrganizationId,
    category: MediaCategory,
    entity_id: &str,
    file_name: &str,
) -> StorageResult<String> {
    Ok(format!(
        "{}/{}/{}/{}",
        check_segment(organization_id.as_str())?,
        category.as_str(),
        check_segment(entity_id)?,
        check_segment(file_name)?
    ))
}

/// MIME type for a file extension, falling back to octet-stream.
pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}
