use proglog_rs::errors::LogError;
use proglog_rs::storage::{Config, Log, Record};
use std::io::Read;
use tempfile::TempDir;

fn record(value: &str) -> Record {
    Record {
        value: value.as_bytes().to_vec(),
        offset: 0,
    }
}

#[test]
fn append_then_read_round_trips_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let log = Log::open(dir.path(), Config::default())?;

    let records = [
        "Hello, World!",
        "This is record 2",
        "Short",
        "This is a much longer record with more text to see variable sizing",
        "Final record",
    ];

    let offsets: Vec<u64> = records
        .iter()
        .map(|r| log.append(record(r)).unwrap())
        .collect();
    assert_eq!(offsets, vec![0, 1, 2, 3, 4]);

    for (i, expected) in records.iter().enumerate() {
        let got = log.read(i as u64)?;
        assert_eq!(got.value, expected.as_bytes());
        assert_eq!(got.offset, i as u64);
    }

    Ok(())
}

#[test]
fn random_access_reads_any_offset_independent_of_write_order() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let log = Log::open(dir.path(), Config::default())?;

    let records = ["First", "Second", "Third", "Fourth", "Fifth"];
    for r in &records {
        log.append(record(r))?;
    }

    for &offset in &[2u64, 0, 4, 1, 3] {
        let got = log.read(offset)?;
        assert_eq!(got.value, records[offset as usize].as_bytes());
    }

    Ok(())
}

#[test]
fn segment_rotates_once_index_capacity_is_reached() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    // 3 entries per segment (3 * 12 bytes)
    let mut config = Config::default();
    config.segment.max_index_bytes = 36;
    config.segment.max_store_bytes = 1 << 20;
    let log = Log::open(dir.path(), config)?;

    for i in 0..7u8 {
        let offset = log.append(record(&format!("record-{i}")))?;
        assert_eq!(offset, i as u64);
    }

    for i in 0..7u8 {
        assert_eq!(log.read(i as u64)?.value, format!("record-{i}").into_bytes());
    }

    Ok(())
}

#[test]
fn durability_survives_a_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;

    {
        let log = Log::open(dir.path(), Config::default())?;
        log.append(record("before restart 1"))?;
        log.append(record("before restart 2"))?;
        log.close()?;
    }

    let log = Log::open(dir.path(), Config::default())?;
    assert_eq!(log.highest_offset(), 1);
    assert_eq!(log.read(0)?.value, b"before restart 1");
    assert_eq!(log.read(1)?.value, b"before restart 2");

    // appends after reopen continue the offset sequence
    let offset = log.append(record("after restart"))?;
    assert_eq!(offset, 2);

    Ok(())
}

#[test]
fn truncate_drops_segments_below_the_watermark() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut config = Config::default();
    config.segment.max_store_bytes = 1; // force one record per segment
    let log = Log::open(dir.path(), config)?;

    for i in 0..5u8 {
        log.append(record(&format!("{i}")))?;
    }

    log.truncate(2)?;

    assert!(matches!(log.read(0), Err(LogError::OffsetOutOfRange { .. })));
    assert!(matches!(log.read(2), Err(LogError::OffsetOutOfRange { .. })));
    assert_eq!(log.read(3)?.value, b"3");
    assert_eq!(log.read(4)?.value, b"4");

    Ok(())
}

#[test]
fn sequential_reader_streams_the_whole_log_in_offset_order() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut config = Config::default();
    config.segment.max_store_bytes = 40; // force multiple segments
    let log = Log::open(dir.path(), config)?;

    let values = ["alpha", "beta", "gamma", "delta", "epsilon"];
    for v in &values {
        log.append(record(v))?;
    }

    let mut reader = log.reader();
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let mut decoded = Vec::new();
    let mut cursor = &bytes[..];
    while !cursor.is_empty() {
        let len = u64::from_be_bytes(cursor[..8].try_into().unwrap()) as usize;
        let payload = &cursor[8..8 + len];
        decoded.push(prost::Message::decode(payload).map(|r: Record| r).unwrap());
        cursor = &cursor[8 + len..];
    }

    let got_values: Vec<Vec<u8>> = decoded.iter().map(|r| r.value.clone()).collect();
    let want_values: Vec<Vec<u8>> = values.iter().map(|v| v.as_bytes().to_vec()).collect();
    assert_eq!(got_values, want_values);

    Ok(())
}
