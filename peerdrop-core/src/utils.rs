pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

/// Bytes per binary frame unless both ends agree otherwise.
pub const DEFAULT_CHUNK_SIZE: u32 = 16 * 1024;

/// Label of the ordered data channel that carries files.
pub const FILE_CHANNEL_LABEL: &str = "files";
