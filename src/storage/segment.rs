//! Segment couples one Store and one Index around a common
//! `base_offset`, translating between absolute offsets and the
//! (ordinal, position) pairs the Store and Index deal in.

use crate::SegmentResult;
use crate::errors::StorageError;
use crate::storage::SegmentConfig;
use crate::storage::index::Index;
use crate::storage::record::Record;
use crate::storage::store::Store;
use prost::Message;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct Segment {
    store: Arc<Store>,
    index: Index,
    base_offset: u64,
    next_offset: u64,
    config: SegmentConfig,
}

impl Segment {
    #[instrument(skip(config), fields(base_offset))]
    pub fn new(dir: &Path, base_offset: u64, config: SegmentConfig) -> SegmentResult<Self> {
        let store = Arc::new(Store::new(dir.join(format!("{base_offset}.store")))?);
        let mut index = Index::new(
            dir.join(format!("{base_offset}.index")),
            config.max_index_bytes,
        )?;

        let next_offset = match index.read(-1) {
            Ok((relative_offset, _)) => base_offset + relative_offset as u64 + 1,
            Err(_) => base_offset,
        };

        debug!(base_offset, next_offset, "segment opened");

        Ok(Segment {
            store,
            index,
            base_offset,
            next_offset,
            config,
        })
    }

    /// Shared handle to this segment's store, used by `Log::reader` to
    /// keep streaming bytes after the log's lock is released.
    pub fn store_handle(&self) -> Arc<Store> {
        Arc::clone(&self.store)
    }

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Appends `record`, assigning it `self.next_offset` and writing it
    /// through to both the store and the index.
    #[instrument(skip(self, record))]
    pub fn append(&mut self, mut record: Record) -> SegmentResult<u64> {
        let offset = self.next_offset;
        record.offset = offset;

        let payload = record.encode_to_vec();
        let (_, position) = self.store.append(&payload)?;
        self.index
            .write((offset - self.base_offset) as u32, position)?;

        self.next_offset += 1;
        Ok(offset)
    }

    /// Reads the record at `offset`. The caller is trusted to have
    /// already checked `offset` falls within `[base_offset,
    /// next_offset)`, see `Log::read`.
    #[instrument(skip(self))]
    pub fn read(&self, offset: u64) -> SegmentResult<Record> {
        let relative = offset.saturating_sub(self.base_offset);
        let (_, position) = self.index.read(relative as i64)?;
        let payload = self.store.read(position)?;
        Ok(Record::decode(payload.as_slice())?)
    }

    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes
            || self.index.size() >= self.config.max_index_bytes
    }

    pub fn close(&mut self) -> SegmentResult<()> {
        self.index.close()?;
        self.store.close()?;
        Ok(())
    }

    /// Closes and unlinks both backing files. Safe even if another
    /// thread is still mid-read through a cloned `Arc<Store>`: unlinking
    /// an open file is a no-op for existing descriptors on POSIX
    /// filesystems, they keep reading until they drop it.
    pub fn remove(mut self) -> SegmentResult<()> {
        self.close()?;
        let store_path = self.store.path().to_path_buf();
        let index_path = self.index.name().to_path_buf();
        std::fs::remove_file(&store_path).map_err(|source| StorageError::RemoveFailed {
            path: store_path.to_string_lossy().into_owned(),
            source,
        })?;
        std::fs::remove_file(&index_path).map_err(|source| StorageError::RemoveFailed {
            path: index_path.to_string_lossy().into_owned(),
            source,
        })?;
        Ok(())
    }
}
