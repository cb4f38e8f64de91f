use thiserror::Error;

/// A data channel frame that breaks the transfer protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed control frame: {0}")]
    Malformed(String),

    #[error("binary frame received before file metadata")]
    ChunkBeforeMetadata,

    #[error("completion frame received with no transfer in progress")]
    CompletionWithoutTransfer,

    #[error("file metadata received while another transfer is in progress")]
    UnexpectedMetadata,

    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("metadata declares {declared} chunks, size {size} with chunk size {chunk_size} needs {expected}")]
    InconsistentChunkCount {
        declared: u64,
        expected: u64,
        size: u64,
        chunk_size: u32,
    },

    #[error("declared file size {size} exceeds limit {limit}")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("chunk {index} is {len} bytes, expected {expected}")]
    WrongChunkLength { index: u64, len: usize, expected: usize },

    #[error("received more than the declared {declared} chunks")]
    TooManyChunks { declared: u64 },

    #[error("completion after {received} of {declared} chunks")]
    EarlyCompletion { received: u64, declared: u64 },
}
