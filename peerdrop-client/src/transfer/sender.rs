use crate::activity::{FileLogEntry, TransferLog};
use crate::error::TransferError;
use crate::transfer::FrameChannel;
use bytes::Bytes;
use peerdrop_core::{FileMetadata, FileTransfer, RoomId, SessionId, TransferMessage};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A file held in memory, ready to go out.
#[derive(Debug, Clone)]
pub struct OutgoingFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl OutgoingFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn prepare(
        &self,
        chunk_size: u32,
        sender: Option<SessionId>,
    ) -> Result<FileTransfer, TransferError> {
        let metadata = FileMetadata::new(&self.name, self.size(), &self.mime_type, chunk_size)?;
        Ok(FileTransfer::new(metadata, sender))
    }
}

/// Streams `data` over `channel` as described by `transfer`'s metadata:
/// the `file` frame, every chunk in order, then `file-complete`.
///
/// `on_progress` sees strictly increasing percentages ending at 100. On any
/// error the transfer is marked failed.
pub async fn send_file<C, P>(
    channel: &C,
    transfer: &mut FileTransfer,
    data: &Bytes,
    mut on_progress: P,
) -> Result<(), TransferError>
where
    C: FrameChannel + ?Sized,
    P: FnMut(f64),
{
    if transfer.is_terminal() {
        return Err(TransferError::AlreadyFinished);
    }

    let res = stream_chunks(channel, transfer, data, &mut on_progress).await;
    if let Err(e) = &res {
        warn!(
            "Transfer {} of {} failed: {}",
            transfer.id(),
            transfer.metadata().name,
            e
        );
        transfer.fail(e.to_string());
    }
    res
}

async fn stream_chunks<C, P>(
    channel: &C,
    transfer: &mut FileTransfer,
    data: &Bytes,
    on_progress: &mut P,
) -> Result<(), TransferError>
where
    C: FrameChannel + ?Sized,
    P: FnMut(f64),
{
    let metadata = transfer.metadata().clone();
    if data.len() as u64 != metadata.size {
        return Err(TransferError::SizeMismatch {
            declared: metadata.size,
            actual: data.len() as u64,
        });
    }

    let closed = channel.closed();
    transfer.begin();

    channel
        .send_text(TransferMessage::File(metadata.clone()).encode()?)
        .await?;

    let chunk_size = metadata.chunk_size as usize;
    for index in 0..metadata.total_chunks {
        if *closed.borrow() {
            return Err(TransferError::ChannelClosed);
        }

        let start = index as usize * chunk_size;
        let end = (start + chunk_size).min(data.len());
        channel.send_binary(data.slice(start..end)).await?;

        if let Some(progress) = transfer.record_chunk() {
            on_progress(progress);
        }

        tokio::task::yield_now().await;
    }

    if *closed.borrow() {
        return Err(TransferError::ChannelClosed);
    }
    channel
        .send_text(TransferMessage::FileComplete.encode()?)
        .await?;

    transfer.complete();
    if metadata.total_chunks == 0 {
        on_progress(100.0);
    }

    debug!(
        "Sent {} ({} bytes, {} chunks)",
        metadata.name, metadata.size, metadata.total_chunks
    );
    Ok(())
}

/// Sends files on behalf of one session, recording each in the activity log.
pub struct FileSender {
    room_id: RoomId,
    session_id: SessionId,
    chunk_size: u32,
    log: Arc<dyn TransferLog>,
}

impl FileSender {
    pub fn new(
        room_id: RoomId,
        session_id: SessionId,
        chunk_size: u32,
        log: Arc<dyn TransferLog>,
    ) -> Self {
        Self {
            room_id,
            session_id,
            chunk_size,
            log,
        }
    }

    pub async fn send<C, P>(
        &self,
        channel: &C,
        file: &OutgoingFile,
        on_progress: P,
    ) -> Result<FileTransfer, TransferError>
    where
        C: FrameChannel + ?Sized,
        P: FnMut(f64),
    {
        let mut transfer = file.prepare(self.chunk_size, Some(self.session_id))?;

        self.log
            .record(FileLogEntry::new(
                self.room_id.clone(),
                self.session_id,
                &file.name,
                file.size(),
            ))
            .await;

        info!(
            "Starting transfer {} of {} ({} chunks)",
            transfer.id(),
            file.name,
            transfer.metadata().total_chunks
        );
        send_file(channel, &mut transfer, &file.data, on_progress).await?;
        Ok(transfer)
    }
}
