use async_trait::async_trait;
use peerdrop_core::{RoomId, SessionId};
use serde::Serialize;
use mime_guess::mime::{self, Mime};
use std::fmt;
use tracing::info;

/// Coarse file type recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Video,
    Document,
    Archive,
    Other,
}

impl FileCategory {
    pub fn from_name(name: &str) -> Self {
        Self::from_mime(&guess_mime(name))
    }

    pub fn from_mime(guessed: &Mime) -> Self {
        let top = guessed.type_();
        if top == mime::IMAGE {
            return Self::Image;
        }
        if top == mime::VIDEO {
            return Self::Video;
        }
        if top == mime::TEXT {
            return Self::Document;
        }
        if top != mime::APPLICATION {
            return Self::Other;
        }

        match guessed.subtype().as_str() {
            "zip" | "gzip" | "x-gzip" | "x-tar" | "x-bzip2" | "x-xz" | "x-7z-compressed"
            | "vnd.rar" | "x-rar-compressed" => Self::Archive,
            "pdf" | "rtf" | "msword" | "vnd.ms-excel" | "vnd.ms-powerpoint" => Self::Document,
            sub if sub.starts_with("vnd.openxmlformats-officedocument")
                || sub.starts_with("vnd.oasis.opendocument") =>
            {
                Self::Document
            }
            _ => Self::Other,
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
            Self::Archive => "archive",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// MIME type guessed from the file extension, `application/octet-stream`
/// when unknown.
pub fn guess_mime(name: &str) -> Mime {
    mime_guess::from_path(name).first_or_octet_stream()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileLogEntry {
    pub room_id: RoomId,
    pub sender: SessionId,
    pub file_name: String,
    pub file_category: FileCategory,
    pub file_size: u64,
}

impl FileLogEntry {
    pub fn new(room_id: RoomId, sender: SessionId, file_name: &str, file_size: u64) -> Self {
        Self {
            room_id,
            sender,
            file_name: file_name.to_owned(),
            file_category: FileCategory::from_name(file_name),
            file_size,
        }
    }
}

/// Told once per file when a send starts.
#[async_trait]
pub trait TransferLog: Send + Sync {
    async fn record(&self, entry: FileLogEntry);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTransferLog;

#[async_trait]
impl TransferLog for TracingTransferLog {
    async fn record(&self, entry: FileLogEntry) {
        info!(
            room = %entry.room_id,
            sender = %entry.sender,
            category = %entry.file_category,
            size = entry.file_size,
            "Sending {}",
            entry.file_name
        );
    }
}
