use crate::errors::{IndexError, StorageError};
use crate::{IndexResult, StorageResult};
use std::io;

pub mod config;
pub mod index;
pub mod log;
pub mod record;
pub mod segment;
pub mod store;

pub use config::{Config, SegmentConfig};
pub use log::Log;
pub use record::Record;

/// Attaches store-layer context to a raw `io::Error`.
pub trait StorageContext<T> {
    fn with_open_context(self, path: &str) -> StorageResult<T>;
    fn with_write_context(self, position: u64) -> StorageResult<T>;
    fn with_read_context(self, position: u64) -> StorageResult<T>;
}

impl<T> StorageContext<T> for Result<T, io::Error> {
    fn with_open_context(self, path: &str) -> StorageResult<T> {
        self.map_err(|source| StorageError::OpenFailed {
            path: path.to_string(),
            source,
        })
    }

    fn with_write_context(self, position: u64) -> StorageResult<T> {
        self.map_err(|source| StorageError::WriteFailed { position, source })
    }

    fn with_read_context(self, position: u64) -> StorageResult<T> {
        self.map_err(|source| StorageError::ReadFailed { position, source })
    }
}

/// Attaches index-layer context to a raw `io::Error`.
pub trait IndexContext<T> {
    fn with_open_context(self, path: &str) -> IndexResult<T>;
    fn with_resize_context(self, target_size: u64) -> IndexResult<T>;
    fn with_mmap_context(self, size: u64) -> IndexResult<T>;
    fn with_sync_context(self) -> IndexResult<T>;
}

impl<T> IndexContext<T> for Result<T, io::Error> {
    fn with_open_context(self, path: &str) -> IndexResult<T> {
        self.map_err(|source| IndexError::OpenFailed {
            path: path.to_string(),
            source,
        })
    }

    fn with_resize_context(self, target_size: u64) -> IndexResult<T> {
        self.map_err(|source| IndexError::ResizeFailed {
            target_size,
            source,
        })
    }

    fn with_mmap_context(self, size: u64) -> IndexResult<T> {
        self.map_err(|source| IndexError::MmapFailed { size, source })
    }

    fn with_sync_context(self) -> IndexResult<T> {
        self.map_err(|source| IndexError::SyncFailed { source })
    }
}
