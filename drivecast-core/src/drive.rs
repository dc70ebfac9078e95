//! Drive item model and the trait for talking to the drive backend.

use crate::error::Result;
use crate::lrc::LRC_EXTENSION;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A file or folder as returned by the drive backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub last_modified_date_time: Option<String>,
    #[serde(default)]
    pub file: Option<FileFacet>,
    #[serde(default)]
    pub folder: Option<FolderFacet>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    #[serde(default)]
    pub child_count: u64,
}

impl DriveItem {
    /// Item with only a name, used when the backend can't describe a file
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// MIME type if this item is a file that has one
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.file.as_ref()?.mime_type.as_deref()
    }

    #[must_use]
    pub fn is_audio(&self) -> bool {
        self.mime_type().is_some_and(|mime| mime.starts_with("audio/"))
    }
}

/// One page of a folder listing
#[derive(Debug, Clone, Default)]
pub struct FolderPage {
    pub items: Vec<DriveItem>,
    /// Continuation token; `None` on the last page
    pub next: Option<String>,
}

impl FolderPage {
    pub fn new(items: Vec<DriveItem>, next: Option<String>) -> Self {
        // An empty token is the same as no token
        let next = next.filter(|token| !token.is_empty());
        Self { items, next }
    }
}

/// Trait for drive backends
#[async_trait]
pub trait DriveSource: Send + Sync {
    /// Get the backend name
    fn name(&self) -> &'static str;

    /// Fetch one page of the listing of `folder`, continuing from `next` if given
    async fn fetch_folder_page(&self, folder: &str, next: Option<&str>) -> Result<FolderPage>;

    /// Describe a single file
    async fn fetch_item(&self, path: &str) -> Result<DriveItem>;

    /// Fetch a file's raw content as text. `Ok(None)` when the file doesn't exist.
    async fn fetch_text(&self, path: &str) -> Result<Option<String>>;

    /// Fetch the cover thumbnail of a file. `Ok(None)` when there is none.
    async fn fetch_thumbnail(&self, path: &str) -> Result<Option<Vec<u8>>>;
}

/// Join a folder path and an entry name into a drive path
#[must_use]
pub fn join_path(folder: &str, name: &str) -> String {
    let folder = folder.trim_end_matches('/');
    format!("{folder}/{name}")
}

/// Split a drive path into its parent folder and file name
#[must_use]
pub fn split_path(path: &str) -> (String, String) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some(("", name)) => ("/".to_string(), name.to_string()),
        Some((folder, name)) => (folder.to_string(), name.to_string()),
        None => ("/".to_string(), trimmed.to_string()),
    }
}

/// Path of the companion lyric file: same folder, extension replaced by `.lrc`
#[must_use]
pub fn lyrics_path_for(path: &str) -> String {
    let (folder, name) = split_path(path);
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name.as_str(),
    };
    join_path(&folder, &format!("{stem}.{LRC_EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_drive_item() {
        let json = r#"{
            "id": "01ABC",
            "name": "song.mp3",
            "size": 4096,
            "lastModifiedDateTime": "2024-01-01T00:00:00Z",
            "file": { "mimeType": "audio/mpeg", "hashes": {} },
            "@odata.etag": "ignored"
        }"#;
        let item: DriveItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.name, "song.mp3");
        assert_eq!(item.mime_type(), Some("audio/mpeg"));
        assert!(item.is_audio());
        assert!(item.folder.is_none());
    }

    #[test]
    fn test_folder_is_not_audio() {
        let json = r#"{ "id": "1", "name": "Albums", "folder": { "childCount": 3 } }"#;
        let item: DriveItem = serde_json::from_str(json).unwrap();
        assert!(!item.is_audio());
        assert_eq!(item.folder.map(|f| f.child_count), Some(3));
    }

    #[test]
    fn test_file_without_mime_is_not_audio() {
        let item = DriveItem {
            file: Some(FileFacet { mime_type: None }),
            ..DriveItem::named("unknown.bin")
        };
        assert!(!item.is_audio());
    }

    #[test]
    fn test_empty_next_token_is_final() {
        assert!(FolderPage::new(vec![], Some(String::new())).next.is_none());
        assert_eq!(
            FolderPage::new(vec![], Some("abc".into())).next.as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "a.mp3"), "/a.mp3");
        assert_eq!(join_path("/Music", "a.mp3"), "/Music/a.mp3");
        assert_eq!(join_path("/Music/", "a.mp3"), "/Music/a.mp3");
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/a.mp3"), ("/".into(), "a.mp3".into()));
        assert_eq!(split_path("/Music/Album/a.mp3"), ("/Music/Album".into(), "a.mp3".into()));
        assert_eq!(split_path("a.mp3"), ("/".into(), "a.mp3".into()));
    }

    #[test]
    fn test_lyrics_path_for() {
        assert_eq!(lyrics_path_for("/Music/song.mp3"), "/Music/song.lrc");
        assert_eq!(lyrics_path_for("/Music/my.song.flac"), "/Music/my.song.lrc");
        assert_eq!(lyrics_path_for("/Music/noext"), "/Music/noext.lrc");
        assert_eq!(lyrics_path_for("/a.b/track"), "/a.b/track.lrc");
    }
}
