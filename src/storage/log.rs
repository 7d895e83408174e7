//! Log coordinates an ordered sequence of segments, presenting a
//! single append-only offset space with bounded per-segment storage
//! and concurrent readers alongside one appender.

use crate::LogResult;
use crate::errors::{IndexError, LogError, SegmentError};
use crate::storage::config::Config;
use crate::storage::record::Record;
use crate::storage::segment::Segment;
use crate::storage::store::Store;
use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, instrument, warn};

struct LogState {
    segments: Vec<Segment>,
    active: usize,
}

/// Coordinates many segments under a single readers-writer lock:
/// append/truncate/close/remove/reset take the exclusive mode, read
/// and reader take the shared mode.
pub struct Log {
    dir: PathBuf,
    config: Config,
    state: RwLock<LogState>,
}

impl Log {
    #[instrument(skip(config), fields(dir = ?dir.as_ref()))]
    pub fn open(dir: impl AsRef<Path>, mut config: Config) -> LogResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        if config.segment.max_store_bytes == 0 {
            config.segment.max_store_bytes = 1024;
        }
        if config.segment.max_index_bytes == 0 {
            config.segment.max_index_bytes = 1024;
        }

        fs::create_dir_all(&dir).map_err(|source| LogError::DirectoryError {
            path: dir.to_string_lossy().into_owned(),
            source,
        })?;

        let segments = Self::load_segments(&dir, &config)?;
        let active = segments.len() - 1;

        info!(segments = segments.len(), "log opened");

        Ok(Log {
            dir,
            config,
            state: RwLock::new(LogState { segments, active }),
        })
    }

    fn load_segments(dir: &Path, config: &Config) -> LogResult<Vec<Segment>> {
        let base_offsets = Self::discover_base_offsets(dir)?;

        let mut segments = Vec::new();
        if base_offsets.is_empty() {
            segments.push(Segment::new(dir, config.segment.initial_offset, config.segment)?);
        } else {
            for base_offset in base_offsets {
                segments.push(Segment::new(dir, base_offset, config.segment)?);
            }
        }
        Ok(segments)
    }

    /// Scans the directory for `{base_offset}.store`/`{base_offset}.index`
    /// pairs. Files whose stem doesn't parse as a number contribute 0,
    /// which is later deduped against a genuine segment at offset 0.
    fn discover_base_offsets(dir: &Path) -> LogResult<Vec<u64>> {
        let entries = fs::read_dir(dir).map_err(|source| LogError::DirectoryError {
            path: dir.to_string_lossy().into_owned(),
            source,
        })?;

        let mut offsets = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|source| LogError::DirectoryError {
                path: dir.to_string_lossy().into_owned(),
                source,
            })?;
            let stem = entry
                .path()
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("")
                .to_string();
            offsets.insert(stem.parse::<u64>().unwrap_or(0));
        }
        Ok(offsets.into_iter().collect())
    }

    fn new_segment(&self, base_offset: u64) -> LogResult<Segment> {
        Segment::new(&self.dir, base_offset, self.config.segment).map_err(LogError::from)
    }

    /// Appends `record` to the active segment, assigning it the next
    /// offset. Rotates to a new segment afterwards if the active
    /// segment is now full. If the index filled before `is_maxed` had a
    /// chance to catch it, the failed append is retried once against a
    /// freshly rotated segment.
    #[instrument(skip(self, record))]
    pub fn append(&self, record: Record) -> LogResult<u64> {
        let mut state = self.state.write().unwrap();

        let active = state.active;
        let result = state.segments[active].append(record.clone());
        let offset = match result {
            Ok(offset) => offset,
            Err(SegmentError::Index(IndexError::Full)) => {
                warn!("active segment's index filled before is_maxed caught it, rotating");
                let base = state.segments[state.active].next_offset();
                let fresh = self.new_segment(base)?;
                state.segments.push(fresh);
                state.active = state.segments.len() - 1;
                let active = state.active;
                state.segments[active].append(record)?
            }
            Err(e) => return Err(e.into()),
        };

        if state.segments[state.active].is_maxed() {
            let base = offset + 1;
            let fresh = self.new_segment(base)?;
            state.segments.push(fresh);
            state.active = state.segments.len() - 1;
        }

        Ok(offset)
    }

    /// Reads the record at `offset`, searching segments for the one
    /// whose range covers it.
    #[instrument(skip(self))]
    pub fn read(&self, offset: u64) -> LogResult<Record> {
        let state = self.state.read().unwrap();

        let segment = state
            .segments
            .iter()
            .find(|s| s.base_offset() <= offset && offset < s.next_offset());

        match segment {
            Some(segment) => Ok(segment.read(offset)?),
            None => Err(LogError::OffsetOutOfRange {
                offset,
                lowest: state.segments.first().map(|s| s.base_offset()).unwrap_or(0),
                highest: self.highest_offset_locked(&state),
            }),
        }
    }

    fn highest_offset_locked(&self, state: &LogState) -> u64 {
        let next = state.segments[state.active].next_offset();
        next.saturating_sub(1)
    }

    pub fn lowest_offset(&self) -> u64 {
        let state = self.state.read().unwrap();
        state.segments.first().map(|s| s.base_offset()).unwrap_or(0)
    }

    pub fn highest_offset(&self) -> u64 {
        let state = self.state.read().unwrap();
        self.highest_offset_locked(&state)
    }

    /// Removes every segment whose highest record offset is strictly
    /// less than `lowest`. If that would leave zero segments, a fresh
    /// empty one is bootstrapped at the removed segments' last
    /// `next_offset`, so offsets stay monotonic and a subsequent
    /// `append` has somewhere to go.
    #[instrument(skip(self))]
    pub fn truncate(&self, lowest: u64) -> LogResult<()> {
        let mut state = self.state.write().unwrap();

        let fallback_base = state
            .segments
            .last()
            .map(|s| s.next_offset())
            .unwrap_or(self.config.segment.initial_offset);

        let mut kept = Vec::new();
        for segment in std::mem::take(&mut state.segments) {
            if segment.next_offset() <= lowest + 1 {
                segment.remove()?;
            } else {
                kept.push(segment);
            }
        }

        state.segments = kept;
        if state.segments.is_empty() {
            info!(fallback_base, "truncate emptied the log, bootstrapping a fresh segment");
            state.segments.push(self.new_segment(fallback_base)?);
        }
        state.active = state.segments.len() - 1;

        Ok(())
    }

    /// Returns a reader that concatenates every segment's store bytes
    /// from position 0, in `base_offset` order. The segment list is
    /// snapshotted under the shared lock; rotations that happen after
    /// this call are invisible to the returned reader.
    pub fn reader(&self) -> LogReader {
        let state = self.state.read().unwrap();
        let stores = state.segments.iter().map(|s| s.store_handle()).collect();
        LogReader::new(stores)
    }

    pub fn close(&self) -> LogResult<()> {
        let mut state = self.state.write().unwrap();
        for segment in state.segments.iter_mut() {
            segment.close()?;
        }
        Ok(())
    }

    pub fn remove(&self) -> LogResult<()> {
        self.close()?;
        fs::remove_dir_all(&self.dir).map_err(|source| LogError::DirectoryError {
            path: self.dir.to_string_lossy().into_owned(),
            source,
        })
    }

    pub fn reset(&self) -> LogResult<()> {
        self.remove()?;
        let segments = Self::load_segments(&self.dir, &self.config)?;
        let active = segments.len() - 1;
        let mut state = self.state.write().unwrap();
        state.segments = segments;
        state.active = active;
        Ok(())
    }
}

/// Concatenates a snapshot of segment stores into a single byte
/// stream, so a consumer can parse the whole log as a run of
/// length-prefixed frames without addressing by offset.
pub struct LogReader {
    stores: VecDeque<Arc<Store>>,
    position: u64,
}

impl LogReader {
    fn new(stores: VecDeque<Arc<Store>>) -> Self {
        LogReader { stores, position: 0 }
    }
}

impl Read for LogReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let Some(store) = self.stores.front() else {
                return Ok(0);
            };

            let n = store
                .read_at(buf, self.position)
                .map_err(|e| io::Error::other(e.to_string()))?;

            if n == 0 {
                self.stores.pop_front();
                self.position = 0;
                continue;
            }

            self.position += n as u64;
            return Ok(n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::config::SegmentConfig;
    use tempfile::TempDir;

    fn record(value: &[u8]) -> Record {
        Record {
            value: value.to_vec(),
            offset: 0,
        }
    }

    fn config(max_store_bytes: u64, max_index_bytes: u64) -> Config {
        Config {
            segment: SegmentConfig {
                max_store_bytes,
                max_index_bytes,
                initial_offset: 0,
            },
        }
    }

    #[test]
    fn basic_append_and_read() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), config(1024, 1024)).unwrap();

        let offsets: Vec<u64> = ["hello", "world", ""]
            .iter()
            .map(|s| log.append(record(s.as_bytes())).unwrap())
            .collect();

        assert_eq!(offsets, vec![0, 1, 2]);
        assert_eq!(log.read(0).unwrap().value, b"hello");
        assert_eq!(log.read(2).unwrap().value, Vec::<u8>::new());
        assert_eq!(log.highest_offset(), 2);
    }

    #[test]
    fn rotation_by_index_size() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), config(1 << 20, 36)).unwrap();

        log.append(record(b"a")).unwrap();
        log.append(record(b"b")).unwrap();
        log.append(record(b"c")).unwrap();

        let fourth = log.append(record(b"d")).unwrap();
        assert_eq!(fourth, 3);

        let count = log.state.read().unwrap().segments.len();
        assert_eq!(count, 2);
        assert_eq!(log.read(3).unwrap().value, b"d");
    }

    #[test]
    fn rotation_by_store_size() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), config(32, 1 << 20)).unwrap();

        log.append(record(&[0u8; 25])).unwrap();
        assert!(log.state.read().unwrap().segments[0].is_maxed());

        let second = log.append(record(b"next segment")).unwrap();
        assert_eq!(second, 1);
        assert_eq!(log.state.read().unwrap().segments.len(), 2);
    }

    #[test]
    fn durable_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let log = Log::open(dir.path(), config(1024, 1024)).unwrap();
            log.append(record(b"first")).unwrap();
            log.append(record(b"second")).unwrap();
            log.close().unwrap();
        }

        let log = Log::open(dir.path(), config(1024, 1024)).unwrap();
        assert_eq!(log.lowest_offset(), 0);
        assert_eq!(log.highest_offset(), 1);
        assert_eq!(log.read(0).unwrap().value, b"first");
        assert_eq!(log.read(1).unwrap().value, b"second");
    }

    #[test]
    fn truncate_removes_old_segments() {
        let dir = TempDir::new().unwrap();
        // tiny max_store_bytes forces one record per segment
        let log = Log::open(dir.path(), config(1, 1024)).unwrap();

        for i in 0..5u8 {
            log.append(record(&[i])).unwrap();
        }

        log.truncate(2).unwrap();

        assert!(matches!(
            log.read(0),
            Err(LogError::OffsetOutOfRange { .. })
        ));
        assert_eq!(log.read(3).unwrap().value, vec![3]);
        assert_eq!(log.read(4).unwrap().value, vec![4]);
    }

    #[test]
    fn sequential_reader_yields_frames_in_order() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), config(1024, 1024)).unwrap();

        log.append(record(b"a")).unwrap();
        log.append(record(b"bb")).unwrap();
        log.append(record(b"ccc")).unwrap();

        let mut reader = log.reader();
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).unwrap();

        let mut lens = Vec::new();
        let mut cursor = &bytes[..];
        while !cursor.is_empty() {
            let len = u64::from_be_bytes(cursor[..8].try_into().unwrap());
            lens.push(len);
            cursor = &cursor[8 + len as usize..];
        }
        assert_eq!(lens, vec![1 + 2, 2 + 2, 3 + 2]); // encoded Record, not raw payload
    }

    #[test]
    fn read_on_empty_log_is_out_of_range() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), config(1024, 1024)).unwrap();
        assert!(matches!(
            log.read(0),
            Err(LogError::OffsetOutOfRange { .. })
        ));
    }

    #[test]
    fn read_one_past_the_end_is_out_of_range() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), config(1024, 1024)).unwrap();
        log.append(record(b"only")).unwrap();
        assert!(matches!(
            log.read(1),
            Err(LogError::OffsetOutOfRange { .. })
        ));
    }
}
