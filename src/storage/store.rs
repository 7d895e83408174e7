//! Store is an append-only byte file holding length-prefixed record
//! frames. Each frame is an 8-byte big-endian length followed by that
//! many payload bytes. Writes go through a buffered writer to coalesce
//! many small appends into fewer syscalls; reads are positional and
//! bypass the writer's own cursor so readers and the appender never
//! fight over a single file position.

use crate::StorageResult;
use crate::storage::StorageContext;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, instrument};

const LEN_WIDTH: u64 = 8;

struct StoreState {
    reader: File,
    writer: BufWriter<File>,
    size: u64,
}

/// Append-only file of length-prefixed frames, guarded by a single
/// mutex so append/read/read_at/close never interleave.
pub struct Store {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl Store {
    #[instrument(skip_all, fields(path = ?path.as_ref()))]
    pub fn new(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let path_str = path.to_string_lossy();

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .with_open_context(&path_str)?;

        let size = file.metadata().with_open_context(&path_str)?.len();
        let reader = file.try_clone().with_open_context(&path_str)?;
        let writer = BufWriter::new(file);

        debug!(size, "store opened");

        Ok(Store {
            path,
            state: Mutex::new(StoreState {
                reader,
                writer,
                size,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the store in bytes.
    pub fn size(&self) -> u64 {
        self.state.lock().unwrap().size
    }

    /// Appends `payload` as a length-prefixed frame. Returns
    /// `(bytes_written, position)` where `position` is where the frame
    /// starts.
    #[instrument(skip(self, payload), fields(len = payload.len()))]
    pub fn append(&self, payload: &[u8]) -> StorageResult<(u64, u64)> {
        let mut state = self.state.lock().unwrap();
        let position = state.size;

        let len = payload.len() as u64;
        state
            .writer
            .write_all(&len.to_be_bytes())
            .with_write_context(position)?;
        state
            .writer
            .write_all(payload)
            .with_write_context(position)?;

        let written = LEN_WIDTH + len;
        state.size += written;

        Ok((written, position))
    }

    /// Reads the frame starting at `position`, flushing any buffered
    /// writes first so the read observes bytes not yet synced to disk.
    #[instrument(skip(self), fields(position))]
    pub fn read(&self, position: u64) -> StorageResult<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.writer.flush().with_write_context(position)?;

        let mut len_buf = [0u8; LEN_WIDTH as usize];
        state
            .reader
            .read_exact_at(&mut len_buf, position)
            .with_read_context(position)?;
        let len = u64::from_be_bytes(len_buf);

        let mut payload = vec![0u8; len as usize];
        state
            .reader
            .read_exact_at(&mut payload, position + LEN_WIDTH)
            .with_read_context(position)?;

        Ok(payload)
    }

    /// Positional read into `buf`, used by the whole-log sequential
    /// reader. Flushes the write buffer first, same as `read`.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> StorageResult<usize> {
        let mut state = self.state.lock().unwrap();
        state.writer.flush().with_write_context(offset)?;
        state.reader.read_at(buf, offset).with_read_context(offset)
    }

    /// Flushes buffered writes. The underlying file descriptor closes
    /// implicitly when the last `Arc<Store>` is dropped.
    pub fn close(&self) -> StorageResult<()> {
        let mut state = self.state.lock().unwrap();
        let size = state.size;
        state.writer.flush().with_write_context(size)
    }
}
