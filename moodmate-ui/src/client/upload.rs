//! Uploaded media forwarded to the backend
//!
//! Files are forwarded straight from memory as multipart parts; nothing is
//! staged on disk, so there is nothing to clean up afterwards.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};

use super::ClientError;

/// What an upload is for; decides accepted file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Audio,
    Video,
}

impl UploadKind {
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            UploadKind::Audio => &["wav", "mp3"],
            UploadKind::Video => &["mp4", "avi", "mov"],
        }
    }

    /// `accept` attribute for the file input
    pub fn accept_attr(self) -> String {
        self.allowed_extensions()
            .iter()
            .map(|ext| format!(".{}", ext))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn content_type(self, extension: &str) -> &'static str {
        match (self, extension) {
            (UploadKind::Audio, "wav") => "audio/wav",
            (UploadKind::Audio, "mp3") => "audio/mpeg",
            (UploadKind::Video, "mp4") => "video/mp4",
            (UploadKind::Video, "avi") => "video/x-msvideo",
            (UploadKind::Video, "mov") => "video/quicktime",
            _ => "application/octet-stream",
        }
    }
}

/// A validated media file ready to send
#[derive(Debug, Clone)]
pub struct Upload {
    kind: UploadKind,
    file_name: String,
    content_type: &'static str,
    bytes: Bytes,
}

impl Upload {
    /// Check the file name's extension against `kind` and reject empty files
    pub fn new(kind: UploadKind, file_name: &str, bytes: Bytes) -> Result<Self, ClientError> {
        let file_name = file_name.trim();
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        if !kind.allowed_extensions().contains(&extension.as_str()) {
            return Err(ClientError::InvalidRequest(format!(
                "Unsupported file type {:?}. Please upload one of: {}",
                file_name,
                kind.allowed_extensions().join(", ")
            )));
        }
        if bytes.is_empty() {
            return Err(ClientError::InvalidRequest(format!(
                "The file {:?} is empty.",
                file_name
            )));
        }

        Ok(Self {
            kind,
            content_type: kind.content_type(&extension),
            file_name: file_name.to_string(),
            bytes,
        })
    }

    pub fn kind(&self) -> UploadKind {
        self.kind
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Multipart form with the file under `field`
    pub fn into_form(self, field: &'static str) -> Result<Form, ClientError> {
        let part = Part::stream_with_length(self.bytes.clone(), self.bytes.len() as u64)
            .file_name(self.file_name)
            .mime_str(self.content_type)
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
        Ok(Form::new().part(field, part))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_known_extensions_case_insensitively() {
        let upload = Upload::new(UploadKind::Audio, "Memo.MP3", Bytes::from_static(b"id3")).unwrap();
        assert_eq!(upload.content_type(), "audio/mpeg");
        assert_eq!(upload.file_name(), "Memo.MP3");

        let upload = Upload::new(UploadKind::Video, "clip.mov", Bytes::from_static(b"moov")).unwrap();
        assert_eq!(upload.content_type(), "video/quicktime");
        assert_eq!(upload.len(), 4);
    }

    #[test]
    fn test_rejects_wrong_kind_and_missing_extension() {
        assert!(Upload::new(UploadKind::Audio, "clip.mp4", Bytes::from_static(b"x")).is_err());
        assert!(Upload::new(UploadKind::Video, "song.wav", Bytes::from_static(b"x")).is_err());
        assert!(Upload::new(UploadKind::Video, "noext", Bytes::from_static(b"x")).is_err());
    }

    #[test]
    fn test_rejects_empty_file() {
        let err = Upload::new(UploadKind::Audio, "a.wav", Bytes::new()).unwrap_err();
        assert!(err.user_message().contains("empty"));
    }

    #[test]
    fn test_accept_attr() {
        assert_eq!(UploadKind::Video.accept_attr(), ".mp4,.avi,.mov");
    }
}
