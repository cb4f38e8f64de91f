use crate::model::error::ProtocolError;
use crate::model::peer::SessionId;
use crate::utils::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub struct TransferId(pub Uuid);

impl TransferId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn default_chunk_size() -> u32 {
    DEFAULT_CHUNK_SIZE
}

/// Payload of the `file` control frame that opens a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub mime_type: String,
    pub total_chunks: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
}

impl FileMetadata {
    pub fn new(
        name: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
        chunk_size: u32,
    ) -> Result<Self, ProtocolError> {
        if chunk_size == 0 {
            return Err(ProtocolError::ZeroChunkSize);
        }

        Ok(Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            total_chunks: Self::chunk_count(size, chunk_size),
            chunk_size,
        })
    }

    /// `ceil(size / chunk_size)`; zero for an empty file.
    pub fn chunk_count(size: u64, chunk_size: u32) -> u64 {
        size.div_ceil(u64::from(chunk_size))
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.chunk_size == 0 {
            return Err(ProtocolError::ZeroChunkSize);
        }

        let expected = Self::chunk_count(self.size, self.chunk_size);
        if self.total_chunks != expected {
            return Err(ProtocolError::InconsistentChunkCount {
                declared: self.total_chunks,
                expected,
                size: self.size,
                chunk_size: self.chunk_size,
            });
        }
        Ok(())
    }

    /// Exact byte length chunk `index` must have. Only meaningful for
    /// `index < total_chunks`.
    pub fn chunk_len(&self, index: u64) -> usize {
        let chunk_size = u64::from(self.chunk_size);
        let remaining = self.size.saturating_sub(index * chunk_size);
        remaining.min(chunk_size) as usize
    }
}

/// Text frames exchanged on the file data channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TransferMessage {
    File(FileMetadata),
    FileComplete,
}

impl TransferMessage {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Transferring,
    Completed,
    Failed,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Bookkeeping for one file moving across one channel, on either end.
#[derive(Debug, Clone)]
pub struct FileTransfer {
    id: TransferId,
    metadata: FileMetadata,
    sender: Option<SessionId>,
    status: TransferStatus,
    chunks_done: u64,
    failure: Option<String>,
}

impl FileTransfer {
    pub fn new(metadata: FileMetadata, sender: Option<SessionId>) -> Self {
        Self {
            id: TransferId::new(),
            metadata,
            sender,
            status: TransferStatus::Pending,
            chunks_done: 0,
            failure: None,
        }
    }

    pub fn id(&self) -> TransferId {
        self.id
    }

    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    pub fn sender(&self) -> Option<SessionId> {
        self.sender
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    pub fn chunks_done(&self) -> u64 {
        self.chunks_done
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Percentage in `[0, 100]`.
    pub fn progress(&self) -> f64 {
        match (self.status, self.metadata.total_chunks) {
            (TransferStatus::Completed, _) => 100.0,
            (_, 0) => 0.0,
            (_, total) => self.chunks_done as f64 / total as f64 * 100.0,
        }
    }

    pub fn begin(&mut self) {
        if self.status == TransferStatus::Pending {
            self.status = TransferStatus::Transferring;
        }
    }

    /// Counts one more chunk and returns the new progress, or `None` once
    /// the transfer is terminal.
    pub fn record_chunk(&mut self) -> Option<f64> {
        if self.is_terminal() {
            return None;
        }
        self.status = TransferStatus::Transferring;
        self.chunks_done += 1;
        Some(self.progress())
    }

    pub fn complete(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TransferStatus::Completed;
        true
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TransferStatus::Failed;
        self.failure = Some(reason.into());
        true
    }
}
