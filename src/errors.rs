use std::io;
use thiserror::Error;

/// Errors raised by the `Store` layer (append-only byte file).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open store file: {path}")]
    OpenFailed {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write to store at position {position}")]
    WriteFailed {
        position: u64,
        #[source]
        source: io::Error,
    },

    #[error("failed to read from store at position {position}")]
    ReadFailed {
        position: u64,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove store file: {path}")]
    RemoveFailed {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Errors raised by the `Index` layer (fixed-width mmap table).
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to open index file: {path}")]
    OpenFailed {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to resize index file to {target_size} bytes")]
    ResizeFailed {
        target_size: u64,
        #[source]
        source: io::Error,
    },

    #[error("memory mapping failed for size {size}")]
    MmapFailed {
        size: u64,
        #[source]
        source: io::Error,
    },

    #[error("failed to sync index to disk")]
    SyncFailed {
        #[source]
        source: io::Error,
    },

    /// The pre-sized mapping has no room left for another entry. This is
    /// the spec's "EndOfSegment" soft failure: the caller treats it as
    /// "segment full", not as a hard error.
    #[error("index is full")]
    Full,

    /// No entry exists at the requested ordinal (empty index, or an
    /// ordinal beyond `size / ENTRY_WIDTH`).
    #[error("no index entry at ordinal {ordinal}")]
    OffsetNotFound { ordinal: i64 },
}

/// Errors raised by `Segment` (couples one Store and one Index).
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("failed to encode record")]
    Encode(#[from] prost::EncodeError),

    #[error("failed to decode record")]
    Decode(#[from] prost::DecodeError),
}

/// Errors raised by `Log` (coordinates many segments).
#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to access log directory {path}")]
    DirectoryError {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("offset {offset} out of range (log covers {lowest}..{highest})")]
    OffsetOutOfRange {
        offset: u64,
        lowest: u64,
        highest: u64,
    },

    #[error(transparent)]
    Segment(#[from] SegmentError),
}
