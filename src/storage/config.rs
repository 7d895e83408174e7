//! Configuration shared by Segment and Log.

/// Per-segment sizing. Zero values are normalized to 1024 bytes by
/// `Log::open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentConfig {
    /// Store is rotated once its size reaches this many bytes.
    pub max_store_bytes: u64,
    /// Index is rotated once its logical size reaches this many bytes.
    pub max_index_bytes: u64,
    /// Base offset of the first segment when a log directory is empty.
    pub initial_offset: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: 1024,
            max_index_bytes: 1024,
            initial_offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    pub segment: SegmentConfig,
}
