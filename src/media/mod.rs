//! Media intake types.
//!
//! Files are classified by extension into one of four categories. The
//! category decides which upload endpoint is used, which controls are shown,
//! and which renderer draws the results.

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Default upload limit (100 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Extension table. Matching is case-insensitive on the last extension.
const EXTENSIONS: &[(&str, MediaCategory)] = &[
    ("jpg", MediaCategory::Image),
    ("jpeg", MediaCategory::Image),
    ("png", MediaCategory::Image),
    ("gif", MediaCategory::Image),
    ("mp3", MediaCategory::Audio),
    ("wav", MediaCategory::Audio),
    ("txt", MediaCategory::Text),
    ("obj", MediaCategory::Mesh),
    ("stl", MediaCategory::Mesh),
    ("off", MediaCategory::Mesh),
    ("ply", MediaCategory::Mesh),
];

/// Kind of media a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCategory {
    Image,
    Audio,
    Text,
    Mesh,
}

impl MediaCategory {
    pub const ALL: [MediaCategory; 4] = [
        MediaCategory::Image,
        MediaCategory::Audio,
        MediaCategory::Text,
        MediaCategory::Mesh,
    ];

    /// Classify a filename by its extension.
    pub fn classify(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        EXTENSIONS
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, category)| *category)
    }

    /// Path segment used by the backend API.
    pub fn api_segment(&self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::Audio => "audio",
            MediaCategory::Text => "text",
            MediaCategory::Mesh => "3d",
        }
    }

    /// Human label for headings and notices.
    pub fn label(&self) -> &'static str {
        match self {
            MediaCategory::Image => "Image",
            MediaCategory::Audio => "Audio",
            MediaCategory::Text => "Text",
            MediaCategory::Mesh => "3D Model",
        }
    }

    /// MIME type used when the extension does not resolve to one.
    pub fn fallback_mime(&self) -> &'static str {
        match self {
            MediaCategory::Image => "image/png",
            MediaCategory::Audio => "audio/wav",
            MediaCategory::Text => "text/plain",
            MediaCategory::Mesh => "application/octet-stream",
        }
    }

    /// Extensions accepted for this category, in table order.
    pub fn extensions(&self) -> Vec<&'static str> {
        EXTENSIONS
            .iter()
            .filter(|(_, category)| category == self)
            .map(|(ext, _)| *ext)
            .collect()
    }

    /// Parse a category name as used on the command line or in API paths.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "image" => Some(MediaCategory::Image),
            "audio" => Some(MediaCategory::Audio),
            "text" => Some(MediaCategory::Text),
            "mesh" | "3d" => Some(MediaCategory::Mesh),
            _ => None,
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaCategory::Image => "image",
            MediaCategory::Audio => "audio",
            MediaCategory::Text => "text",
            MediaCategory::Mesh => "mesh",
        })
    }
}

/// A file the user selected for upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    filename: String,
    content: Bytes,
    mime_type: String,
}

impl UploadedFile {
    /// Wrap in-memory content. The MIME type is guessed from the filename.
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let filename = filename.into();
        let mime_type = guess_mime(&filename);
        Self {
            filename,
            content: content.into(),
            mime_type,
        }
    }

    /// Read a file from disk, keeping only its final path component as the name.
    pub async fn from_path(path: &Path) -> ClientResult<Self> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ClientError::Io(format!("not a file path: {}", path.display())))?;
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::Io(format!("{}: {e}", path.display())))?;
        Ok(Self::new(filename, content))
    }

    /// Override the guessed MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn category(&self) -> Option<MediaCategory> {
        MediaCategory::classify(&self.filename)
    }
}

fn guess_mime(filename: &str) -> String {
    if let Some(mime) = mime_guess::from_path(filename).first() {
        return mime.essence_str().to_string();
    }
    MediaCategory::classify(filename)
        .map(|c| c.fallback_mime())
        .unwrap_or("application/octet-stream")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_extensions() {
        assert_eq!(MediaCategory::classify("photo.png"), Some(MediaCategory::Image));
        assert_eq!(MediaCategory::classify("a.jpg"), Some(MediaCategory::Image));
        assert_eq!(MediaCategory::classify("a.jpeg"), Some(MediaCategory::Image));
        assert_eq!(MediaCategory::classify("a.gif"), Some(MediaCategory::Image));
        assert_eq!(MediaCategory::classify("clip.mp3"), Some(MediaCategory::Audio));
        assert_eq!(MediaCategory::classify("clip.wav"), Some(MediaCategory::Audio));
        assert_eq!(MediaCategory::classify("notes.txt"), Some(MediaCategory::Text));
        for ext in ["obj", "stl", "off", "ply"] {
            assert_eq!(
                MediaCategory::classify(&format!("model.{ext}")),
                Some(MediaCategory::Mesh)
            );
        }
    }

    #[test]
    fn test_classify_case_insensitive() {
        assert_eq!(MediaCategory::classify("PHOTO.PNG"), Some(MediaCategory::Image));
        assert_eq!(MediaCategory::classify("Clip.Mp3"), Some(MediaCategory::Audio));
        assert_eq!(MediaCategory::classify("mesh.StL"), Some(MediaCategory::Mesh));
    }

    #[test]
    fn test_classify_uses_last_extension() {
        assert_eq!(
            MediaCategory::classify("archive.txt.png"),
            Some(MediaCategory::Image)
        );
        assert_eq!(MediaCategory::classify("image.png.exe"), None);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(MediaCategory::classify("document.pdf"), None);
        assert_eq!(MediaCategory::classify("README"), None);
        assert_eq!(MediaCategory::classify("trailing."), None);
        assert_eq!(MediaCategory::classify(""), None);
    }

    #[test]
    fn test_every_table_entry_round_trips_through_extensions() {
        for category in MediaCategory::ALL {
            for ext in category.extensions() {
                assert_eq!(
                    MediaCategory::classify(&format!("f.{ext}")),
                    Some(category)
                );
                assert_eq!(
                    MediaCategory::classify(&format!("f.{}", ext.to_uppercase())),
                    Some(category)
                );
            }
        }
    }

    #[test]
    fn test_api_segments() {
        assert_eq!(MediaCategory::Image.api_segment(), "image");
        assert_eq!(MediaCategory::Mesh.api_segment(), "3d");
        assert_eq!(MediaCategory::parse("3d"), Some(MediaCategory::Mesh));
        assert_eq!(MediaCategory::parse("Audio"), Some(MediaCategory::Audio));
        assert_eq!(MediaCategory::parse("video"), None);
    }

    #[test]
    fn test_uploaded_file_mime_guess() {
        let file = UploadedFile::new("photo.png", vec![1u8, 2, 3]);
        assert_eq!(file.mime_type(), "image/png");
        assert_eq!(file.size(), 3);
        assert_eq!(file.category(), Some(MediaCategory::Image));

        let file = UploadedFile::new("clip.mp3", Vec::new());
        assert_eq!(file.mime_type(), "audio/mpeg");

        let file = UploadedFile::new("notes.txt", "hi");
        assert_eq!(file.mime_type(), "text/plain");
    }

    #[tokio::test]
    async fn test_uploaded_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "<b>hi</b>").unwrap();

        let file = UploadedFile::from_path(&path).await.unwrap();
        assert_eq!(file.filename(), "notes.txt");
        assert_eq!(file.content().as_ref(), b"<b>hi</b>");
        assert_eq!(file.category(), Some(MediaCategory::Text));
    }

    #[tokio::test]
    async fn test_uploaded_file_from_missing_path() {
        let result = UploadedFile::from_path(Path::new("/nonexistent/file.png")).await;
        assert!(matches!(result, Err(ClientError::Io(_))));
    }
}
