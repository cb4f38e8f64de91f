use crate::error::TransferError;
use crate::transfer::Frame;
use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;

/// Outbound side of an ordered, reliable message channel.
#[async_trait]
pub trait FrameChannel: Send + Sync {
    async fn send_text(&self, text: String) -> Result<(), TransferError>;

    async fn send_binary(&self, data: Bytes) -> Result<(), TransferError>;

    /// Flips to `true` once the channel is closed and stays there.
    fn closed(&self) -> watch::Receiver<bool>;

    fn is_closed(&self) -> bool {
        *self.closed().borrow()
    }
}

/// Pause sending while more than this many bytes sit in the SCTP buffer.
pub const BUFFERED_AMOUNT_HIGH: usize = 1024 * 1024;

const BACKPRESSURE_POLL: Duration = Duration::from_millis(10);

/// A webrtc-rs data channel with buffered-amount backpressure.
pub struct RtcFrameChannel {
    dc: Arc<RTCDataChannel>,
    closed: watch::Receiver<bool>,
}

impl RtcFrameChannel {
    pub fn new(dc: Arc<RTCDataChannel>, closed: watch::Receiver<bool>) -> Self {
        Self { dc, closed }
    }

    pub fn label(&self) -> &str {
        self.dc.label()
    }

    /// Runs a webrtc call, giving up as soon as the channel closes. A pending
    /// SCTP write never completes once the association is torn down.
    async fn until_closed<F, T>(&self, fut: F) -> Result<T, TransferError>
    where
        F: Future<Output = T>,
    {
        let mut closed = self.closed.clone();
        tokio::select! {
            biased;
            _ = closed.wait_for(|closed| *closed) => Err(TransferError::ChannelClosed),
            out = fut => Ok(out),
        }
    }

    async fn wait_for_room(&self, next: usize) -> Result<(), TransferError> {
        loop {
            if self.dc.ready_state() != RTCDataChannelState::Open {
                return Err(TransferError::ChannelClosed);
            }
            let buffered = self.until_closed(self.dc.buffered_amount()).await?;
            if buffered + next <= BUFFERED_AMOUNT_HIGH {
                return Ok(());
            }

            debug!("Channel {} buffer full, waiting", self.dc.label());
            self.until_closed(tokio::time::sleep(BACKPRESSURE_POLL))
                .await?;
        }
    }
}

#[async_trait]
impl FrameChannel for RtcFrameChannel {
    async fn send_text(&self, text: String) -> Result<(), TransferError> {
        self.wait_for_room(text.len()).await?;
        self.until_closed(self.dc.send_text(text))
            .await?
            .map(|_| ())
            .map_err(|e| TransferError::Send(e.to_string()))
    }

    async fn send_binary(&self, data: Bytes) -> Result<(), TransferError> {
        self.wait_for_room(data.len()).await?;
        self.until_closed(self.dc.send(&data))
            .await?
            .map(|_| ())
            .map_err(|e| TransferError::Send(e.to_string()))
    }

    fn closed(&self) -> watch::Receiver<bool> {
        self.closed.clone()
    }
}

/// In-process channel: frames go into a bounded queue read by a
/// [`MemoryChannelPeer`].
pub struct MemoryChannel {
    tx: mpsc::Sender<Frame>,
    closed: watch::Receiver<bool>,
}

/// Receiving end of a [`MemoryChannel`].
pub struct MemoryChannelPeer {
    rx: mpsc::Receiver<Frame>,
    close_tx: Arc<watch::Sender<bool>>,
}

impl MemoryChannel {
    /// `capacity` frames may be in flight before sends wait.
    pub fn new(capacity: usize) -> (Self, MemoryChannelPeer) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (close_tx, closed) = watch::channel(false);

        (
            Self { tx, closed },
            MemoryChannelPeer {
                rx,
                close_tx: Arc::new(close_tx),
            },
        )
    }

    async fn push(&self, frame: Frame) -> Result<(), TransferError> {
        let mut closed = self.closed.clone();
        if *closed.borrow() {
            return Err(TransferError::ChannelClosed);
        }

        tokio::select! {
            sent = self.tx.send(frame) => sent.map_err(|_| TransferError::ChannelClosed),
            _ = closed.wait_for(|closed| *closed) => Err(TransferError::ChannelClosed),
        }
    }
}

#[async_trait]
impl FrameChannel for MemoryChannel {
    async fn send_text(&self, text: String) -> Result<(), TransferError> {
        self.push(Frame::Text(text)).await
    }

    async fn send_binary(&self, data: Bytes) -> Result<(), TransferError> {
        self.push(Frame::Binary(data)).await
    }

    fn closed(&self) -> watch::Receiver<bool> {
        self.closed.clone()
    }
}

impl MemoryChannelPeer {
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }

    /// Drains everything sent so far.
    pub fn drain(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = self.try_recv() {
            frames.push(frame);
        }
        frames
    }

    pub fn close(&self) {
        if self.close_tx.send(true).is_err() {
            warn!("Memory channel closed with no sender left");
        }
    }

    /// A handle that can close the channel from another task.
    pub fn closer(&self) -> Arc<watch::Sender<bool>> {
        self.close_tx.clone()
    }
}
