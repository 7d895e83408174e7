//! Index is a fixed-width, memory-mapped file mapping a segment's
//! relative offsets to byte positions in its Store. Each entry is 12
//! bytes: a 4-byte big-endian relative offset followed by an 8-byte
//! big-endian store position. The file is pre-sized to `max_bytes` so
//! writes become plain slice copies into the mapping; `close` truncates
//! it back down to the bytes actually written.

use crate::IndexResult;
use crate::errors::IndexError;
use crate::storage::IndexContext;
use memmap2::{MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

const OFFSET_WIDTH: u64 = 4;
const POSITION_WIDTH: u64 = 8;
const ENTRY_WIDTH: u64 = OFFSET_WIDTH + POSITION_WIDTH;

pub struct Index {
    file: File,
    mmap: MmapMut,
    path: PathBuf,
    max_bytes: u64,
    /// Bytes actually written so far; always a multiple of `ENTRY_WIDTH`.
    size: u64,
}

impl Index {
    #[instrument(skip_all, fields(path = ?path.as_ref(), max_bytes))]
    pub fn new(path: impl AsRef<Path>, max_bytes: u64) -> IndexResult<Self> {
        let path = path.as_ref().to_path_buf();
        let path_str = path.to_string_lossy();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .with_open_context(&path_str)?;

        let size = file.metadata().with_open_context(&path_str)?.len();

        file.set_len(max_bytes).with_resize_context(max_bytes)?;

        let mmap = unsafe {
            MmapOptions::new()
                .len(max_bytes as usize)
                .map_mut(&file)
                .with_mmap_context(max_bytes)?
        };

        debug!(size, "index opened");

        Ok(Index {
            file,
            mmap,
            path,
            max_bytes,
            size,
        })
    }

    pub fn name(&self) -> &Path {
        &self.path
    }

    /// Logical size in bytes; always a multiple of 12.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn len(&self) -> u64 {
        self.size / ENTRY_WIDTH
    }

    /// Appends an entry at the end of the index. Fails with
    /// `IndexError::Full` if the pre-sized mapping has no room left;
    /// the caller treats that as "segment full", not a hard error.
    pub fn write(&mut self, relative_offset: u32, position: u64) -> IndexResult<()> {
        if self.max_bytes < self.size + ENTRY_WIDTH {
            return Err(IndexError::Full);
        }

        let start = self.size as usize;
        self.mmap[start..start + OFFSET_WIDTH as usize]
            .copy_from_slice(&relative_offset.to_be_bytes());
        self.mmap[start + OFFSET_WIDTH as usize..start + ENTRY_WIDTH as usize]
            .copy_from_slice(&position.to_be_bytes());
        self.size += ENTRY_WIDTH;
        Ok(())
    }

    /// Reads the entry at `ordinal`, or the last entry if `ordinal ==
    /// -1`. Returns `(relative_offset, position)`.
    pub fn read(&self, ordinal: i64) -> IndexResult<(u32, u64)> {
        if self.size == 0 {
            return Err(IndexError::OffsetNotFound { ordinal });
        }

        let ordinal = if ordinal == -1 {
            (self.size / ENTRY_WIDTH) - 1
        } else if ordinal < 0 {
            return Err(IndexError::OffsetNotFound { ordinal });
        } else {
            ordinal as u64
        };

        let byte_position = ordinal * ENTRY_WIDTH;
        if self.size < byte_position + ENTRY_WIDTH {
            return Err(IndexError::OffsetNotFound {
                ordinal: ordinal as i64,
            });
        }

        let start = byte_position as usize;
        let relative_offset = u32::from_be_bytes(self.mmap[start..start + 4].try_into().unwrap());
        let position = u64::from_be_bytes(self.mmap[start + 4..start + 12].try_into().unwrap());
        Ok((relative_offset, position))
    }

    /// Syncs the mapping and file, then truncates the file back to its
    /// logical size so a fresh open doesn't see a zero-padded tail.
    pub fn close(&mut self) -> IndexResult<()> {
        self.mmap.flush_async().with_sync_context()?;
        self.file.sync_all().with_sync_context()?;
        self.file
            .set_len(self.size)
            .with_resize_context(self.size)?;
        Ok(())
    }
}
