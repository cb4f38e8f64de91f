use crate::transfer::Frame;
use bytes::{Bytes, BytesMut};
use peerdrop_core::{
    FileMetadata, FileTransfer, ProtocolError, SessionId, TransferId, TransferMessage,
};
use tracing::{debug, info, warn};

/// A fully received file.
#[derive(Debug, Clone)]
pub struct ReceivedFile {
    pub transfer_id: TransferId,
    pub metadata: FileMetadata,
    pub data: Bytes,
}

/// What one inbound frame did to the receiver.
#[derive(Debug)]
pub enum ReceiveEvent {
    Started(FileMetadata),
    Progress { transfer_id: TransferId, percent: f64 },
    Completed(ReceivedFile),
    Failed(FileTransfer),
}

struct Incoming {
    transfer: FileTransfer,
    buf: BytesMut,
}

/// Reassembles files arriving on one data channel.
///
/// A protocol violation fails the transfer in progress (if any) and leaves the
/// receiver ready for the next `file` frame.
pub struct FileReceiver {
    from: Option<SessionId>,
    max_file_size: u64,
    current: Option<Incoming>,
}

impl FileReceiver {
    pub fn new(from: Option<SessionId>, max_file_size: u64) -> Self {
        Self {
            from,
            max_file_size,
            current: None,
        }
    }

    pub fn in_progress(&self) -> Option<&FileTransfer> {
        self.current.as_ref().map(|incoming| &incoming.transfer)
    }

    pub fn on_frame(&mut self, frame: Frame) -> ReceiveEvent {
        let res = match frame {
            Frame::Text(text) => self.on_text(&text),
            Frame::Binary(data) => self.on_chunk(data),
        };

        res.unwrap_or_else(|e| self.fail(e))
    }

    /// Fails whatever was in flight when the channel went away.
    pub fn channel_closed(&mut self) -> Option<FileTransfer> {
        let mut incoming = self.current.take()?;
        warn!(
            "Channel closed during transfer of {}",
            incoming.transfer.metadata().name
        );
        incoming.transfer.fail("channel closed");
        Some(incoming.transfer)
    }

    fn on_text(&mut self, text: &str) -> Result<ReceiveEvent, ProtocolError> {
        match TransferMessage::decode(text)? {
            TransferMessage::File(metadata) => self.start(metadata),
            TransferMessage::FileComplete => self.finish(),
        }
    }

    fn start(&mut self, metadata: FileMetadata) -> Result<ReceiveEvent, ProtocolError> {
        if self.current.is_some() {
            return Err(ProtocolError::UnexpectedMetadata);
        }
        metadata.validate()?;
        if metadata.size > self.max_file_size {
            return Err(ProtocolError::FileTooLarge {
                size: metadata.size,
                limit: self.max_file_size,
            });
        }

        info!(
            "Receiving {} ({} bytes, {} chunks)",
            metadata.name, metadata.size, metadata.total_chunks
        );

        let mut transfer = FileTransfer::new(metadata.clone(), self.from);
        transfer.begin();
        self.current = Some(Incoming {
            transfer,
            buf: BytesMut::with_capacity(metadata.size as usize),
        });

        Ok(ReceiveEvent::Started(metadata))
    }

    fn on_chunk(&mut self, data: Bytes) -> Result<ReceiveEvent, ProtocolError> {
        let incoming = self
            .current
            .as_mut()
            .ok_or(ProtocolError::ChunkBeforeMetadata)?;
        let metadata = incoming.transfer.metadata();
        let total = metadata.total_chunks;

        let index = incoming.transfer.chunks_done();
        if index >= total {
            return Err(ProtocolError::TooManyChunks { declared: total });
        }

        let expected = metadata.chunk_len(index);
        if data.len() != expected {
            return Err(ProtocolError::WrongChunkLength {
                index,
                len: data.len(),
                expected,
            });
        }

        incoming.buf.extend_from_slice(&data);
        let percent = incoming.transfer.record_chunk().unwrap_or(100.0);
        debug!("Chunk {} of {} received", index + 1, total);

        Ok(ReceiveEvent::Progress {
            transfer_id: incoming.transfer.id(),
            percent,
        })
    }

    fn finish(&mut self) -> Result<ReceiveEvent, ProtocolError> {
        let incoming = self
            .current
            .as_ref()
            .ok_or(ProtocolError::CompletionWithoutTransfer)?;
        let declared = incoming.transfer.metadata().total_chunks;
        let received = incoming.transfer.chunks_done();
        if received != declared {
            return Err(ProtocolError::EarlyCompletion { received, declared });
        }

        let Some(mut incoming) = self.current.take() else {
            return Err(ProtocolError::CompletionWithoutTransfer);
        };
        incoming.transfer.complete();

        let metadata = incoming.transfer.metadata().clone();
        info!("Received {} ({} bytes)", metadata.name, metadata.size);

        Ok(ReceiveEvent::Completed(ReceivedFile {
            transfer_id: incoming.transfer.id(),
            metadata,
            data: incoming.buf.freeze(),
        }))
    }

    fn fail(&mut self, error: ProtocolError) -> ReceiveEvent {
        warn!("Transfer protocol violation: {}", error);

        let mut transfer = match self.current.take() {
            Some(incoming) => incoming.transfer,
            None => FileTransfer::new(orphan_metadata(), self.from),
        };
        transfer.fail(error.to_string());
        ReceiveEvent::Failed(transfer)
    }
}

/// Placeholder for violations that happen before any metadata arrived.
fn orphan_metadata() -> FileMetadata {
    FileMetadata {
        name: String::new(),
        size: 0,
        mime_type: String::new(),
        total_chunks: 0,
        chunk_size: peerdrop_core::utils::DEFAULT_CHUNK_SIZE,
    }
}
